//! Process-isolated trial execution.
//!
//! One trial is one `fork`: the child performs the corruption and the
//! single dispatch call in its private copy-on-write image, then exits; the
//! parent reaps it and decodes the termination mode. A watchdog deadline
//! kills hung children and reports them as a distinct outcome instead of
//! blocking the sweep forever.

use std::fmt;
use std::io::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Child exit code used when the trial body panicked instead of returning.
const PANIC_EXIT_CODE: i32 = 70;

/// Observed termination mode of one isolated trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum TrialOutcome {
    /// Child returned from the dispatch and exited 0.
    CleanExit,
    /// Child exited with a non-zero status.
    Exited(i32),
    /// Child was terminated by a signal (the usual trap shape).
    Signaled(i32),
    /// Child outlived the watchdog deadline and was killed.
    TimedOut,
}

impl TrialOutcome {
    /// True for every termination mode a detector trap would produce.
    #[must_use]
    pub fn is_abnormal(self) -> bool {
        !matches!(self, TrialOutcome::CleanExit)
    }
}

/// Failure to run a trial at all (as opposed to a trial that crashed).
#[derive(Debug)]
pub enum TrialError {
    ForkFailed(i32),
    WaitFailed(i32),
}

impl fmt::Display for TrialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialError::ForkFailed(errno) => write!(f, "fork failed (errno {errno})"),
            TrialError::WaitFailed(errno) => write!(f, "waitpid failed (errno {errno})"),
        }
    }
}

impl std::error::Error for TrialError {}

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn decode_wait_status(status: libc::c_int) -> TrialOutcome {
    if libc::WIFEXITED(status) {
        let code = libc::WEXITSTATUS(status);
        if code == 0 {
            TrialOutcome::CleanExit
        } else {
            TrialOutcome::Exited(code)
        }
    } else if libc::WIFSIGNALED(status) {
        TrialOutcome::Signaled(libc::WTERMSIG(status))
    } else {
        // Stopped/continued never happens without ptrace; treat as signaled.
        TrialOutcome::Signaled(0)
    }
}

/// Run `trial_body` in a freshly forked child and report how the child
/// terminated.
///
/// The parent's memory is never touched by the trial: any corruption the
/// body performs dies with the child image. The call blocks until the child
/// is reaped, at most `timeout` plus one kill round-trip.
pub fn run_isolated<F: FnOnce()>(trial_body: F, timeout: Duration) -> Result<TrialOutcome, TrialError> {
    // Flush buffered output so the child does not replay it.
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    // SAFETY: fork has no preconditions; both return paths are handled.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(TrialError::ForkFailed(last_errno()));
    }
    if pid == 0 {
        let clean = catch_unwind(AssertUnwindSafe(trial_body)).is_ok();
        let _ = std::io::stdout().flush();
        let code = if clean { 0 } else { PANIC_EXIT_CODE };
        // SAFETY: terminate the child image directly, without running the
        // parent's atexit state twice.
        unsafe { libc::_exit(code) };
    }

    let deadline = Instant::now() + timeout;
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: pid is the child forked above; status is a valid out-slot.
        let reaped = unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) };
        if reaped == pid {
            return Ok(decode_wait_status(status));
        }
        if reaped < 0 {
            return Err(TrialError::WaitFailed(last_errno()));
        }
        if Instant::now() >= deadline {
            // SAFETY: kill/waitpid on our own still-running child.
            unsafe {
                libc::kill(pid, libc::SIGKILL);
                libc::waitpid(pid, &mut status, 0);
            }
            return Ok(TrialOutcome::TimedOut);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
