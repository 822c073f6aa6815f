//! Symbol offset resolution via `objdump`.
//!
//! The non-address-taken probe must reach a routine whose address is never
//! taken anywhere in the program, so its location cannot come from a Rust
//! function-pointer expression. Instead the disassembly of the running
//! binary is scanned for symbol labels and the displacement is computed from
//! image offsets. Displacements between two symbols of the same image are
//! load-bias invariant, so they survive ASLR.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::Mutex;

// Resolved offsets keyed by (binary, symbol). Disassembling is by far the
// expensive step, so repeat lookups must not shell out again.
static OFFSET_CACHE: Mutex<Vec<(PathBuf, String, u64)>> = Mutex::new(Vec::new());

/// Failure to resolve a symbol offset.
#[derive(Debug)]
pub enum ResolveError {
    Spawn(std::io::Error),
    ToolFailed { status: Option<i32>, stderr: String },
    SymbolNotFound(String),
    Malformed(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Spawn(e) => write!(f, "failed to spawn objdump: {e}"),
            ResolveError::ToolFailed { status, stderr } => {
                write!(f, "objdump failed (status {status:?}): {}", stderr.trim())
            }
            ResolveError::SymbolNotFound(symbol) => {
                write!(f, "symbol '{symbol}' not found in disassembly")
            }
            ResolveError::Malformed(line) => {
                write!(f, "unparseable symbol label line: '{line}'")
            }
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Path of the running binary, the image all probe symbols live in.
pub fn self_exe() -> std::io::Result<PathBuf> {
    std::env::current_exe()
}

/// True when an `objdump` binary is runnable on this host.
#[must_use]
pub fn objdump_available() -> bool {
    Command::new("objdump")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn disassemble(binary: &Path) -> Result<String, ResolveError> {
    let output = Command::new("objdump")
        .arg("-d")
        .arg(binary)
        .output()
        .map_err(ResolveError::Spawn)?;
    if !output.status.success() {
        return Err(ResolveError::ToolFailed {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_label_offset(disassembly: &str, symbol: &str) -> Result<u64, ResolveError> {
    // Symbol labels look like `0000000000041c20 <unit_from_unit>:`.
    let needle = format!("<{symbol}>:");
    for line in disassembly.lines() {
        let line = line.trim_end();
        if !line.ends_with(&needle) {
            continue;
        }
        let Some(hex) = line.split_whitespace().next() else {
            return Err(ResolveError::Malformed(line.to_string()));
        };
        return u64::from_str_radix(hex, 16)
            .map_err(|_| ResolveError::Malformed(line.to_string()));
    }
    Err(ResolveError::SymbolNotFound(symbol.to_string()))
}

/// Image offset of `symbol` inside `binary`, memoized across calls.
pub fn symbol_offset(binary: &Path, symbol: &str) -> Result<u64, ResolveError> {
    {
        let cache = OFFSET_CACHE.lock();
        if let Some((_, _, offset)) = cache
            .iter()
            .find(|(path, name, _)| path == binary && name == symbol)
        {
            return Ok(*offset);
        }
    }
    let disassembly = disassemble(binary)?;
    let offset = parse_label_offset(&disassembly, symbol)?;
    OFFSET_CACHE
        .lock()
        .push((binary.to_path_buf(), symbol.to_string(), offset));
    Ok(offset)
}

/// Signed byte displacement from `from` to `to` within `binary`, computed
/// entirely from the on-disk image.
pub fn resolve_displacement(binary: &Path, from: &str, to: &str) -> Result<isize, ResolveError> {
    let from_offset = symbol_offset(binary, from)?;
    let to_offset = symbol_offset(binary, to)?;
    Ok((to_offset as i64).wrapping_sub(from_offset as i64) as isize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
binary:     file format elf64-x86-64

Disassembly of section .text:

0000000000041c20 <unit_from_unit>:
   41c20:\t55                   \tpush   %rbp
   41c21:\tc3                   \tret

0000000000041c40 <unit_from_unit_hidden>:
   41c40:\tc3                   \tret
";

    #[test]
    fn label_lines_parse() {
        assert_eq!(
            parse_label_offset(SAMPLE, "unit_from_unit").expect("offset"),
            0x41c20
        );
        assert_eq!(
            parse_label_offset(SAMPLE, "unit_from_unit_hidden").expect("offset"),
            0x41c40
        );
    }

    #[test]
    fn missing_symbols_are_reported() {
        let err = parse_label_offset(SAMPLE, "no_such_symbol").unwrap_err();
        assert!(matches!(err, ResolveError::SymbolNotFound(_)));
    }

    #[test]
    fn cached_offsets_skip_the_tool() {
        // A nonexistent binary can only succeed through the cache.
        let binary = Path::new("/nonexistent/cfieval-cache-test");
        OFFSET_CACHE
            .lock()
            .push((binary.to_path_buf(), "seeded_symbol".to_string(), 0x1234));
        assert_eq!(symbol_offset(binary, "seeded_symbol").expect("cache hit"), 0x1234);
        assert!(symbol_offset(binary, "unseeded_symbol").is_err());
    }

    #[test]
    fn instruction_lines_are_not_mistaken_for_labels() {
        // Operand text can mention `<symbol+0x4>` but never ends with `:`.
        let with_operand = "   41c25:\te8 00 00 00 00 \tcall 41c40 <unit_from_unit_hidden+0x4>\n";
        let err = parse_label_offset(with_operand, "unit_from_unit_hidden").unwrap_err();
        assert!(matches!(err, ResolveError::SymbolNotFound(_)));
    }
}
