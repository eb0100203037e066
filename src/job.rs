use crate::command::ExitCode;
use anyhow::{Context, Result};
use log::info;
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// Signals the terminal sends to its whole foreground process group.
pub const KEYBOARD_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// Makes the calling process immune to Ctrl-C and Ctrl-\.
///
/// Line processes share the interpreter's process group, so without this an
/// interrupt meant for a foreground line would end the session as well.
/// Stages put the default dispositions back before exec.
pub fn ignore_keyboard_signals() -> Result<()> {
    for sig in KEYBOARD_SIGNALS {
        unsafe { signal::signal(sig, SigHandler::SigIgn) }
            .with_context(|| format!("cannot ignore {sig}"))?;
    }
    Ok(())
}

/// Exit code of a finished process, using the shell convention of
/// `128 + signal` for processes killed by a signal.
///
/// Returns `None` for statuses that do not mean termination.
pub fn exit_code(status: WaitStatus) -> Option<ExitCode> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
        _ => None,
    }
}

/// Blocks until `pid` terminates and returns its exit code.
pub fn wait_for(pid: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(code) = exit_code(status) {
                    return Ok(code);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).with_context(|| format!("waiting for process {pid}")),
        }
    }
}

/// Collects every child that has already terminated, without blocking.
///
/// Returns the number of children reclaimed.
pub fn reap_finished() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    info!("reaped process {} ({:?})", pid, status);
                }
                reaped += 1;
            }
            Err(Errno::EINTR) => continue,
            // ECHILD: no children left.
            Err(_) => break,
        }
    }
    reaped
}
