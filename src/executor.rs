//! Process orchestration: pipes, redirections and program image replacement.
//!
//! The session forks once per line with [`spawn`]. The forked *line process*
//! then runs [`Pipeline::run`], which peels every stage but the last off into
//! its own child connected through an anonymous pipe and finally becomes the
//! right-most stage itself. Nothing in here returns to the caller once the
//! line process has been forked: each process either replaces its image or
//! terminates with a failure status.

use crate::command::{Command, ExitCode};
use crate::job::KEYBOARD_SIGNALS;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::{CStr, CString};
use std::fmt;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

/// Status of a stage whose program could not be found.
pub const NOT_FOUND: ExitCode = 127;
/// Status of a stage whose program was found but could not be executed.
pub const NOT_EXECUTABLE: ExitCode = 126;
/// Status of a process that failed while wiring pipes or redirections.
pub const SETUP_FAILED: ExitCode = 1;

/// A stage with every string already converted for the exec call.
///
/// Conversion happens before forking, so a bad argument is reported by the
/// session instead of by a half-wired child.
#[derive(Debug)]
pub struct PreparedStage {
    argv: Vec<CString>,
    input: Option<CString>,
    output: Option<CString>,
}

impl PreparedStage {
    fn prepare(mut stage: Command) -> Result<Self> {
        let argv = std::mem::take(&mut stage.argv)
            .into_iter()
            .map(|arg| CString::new(arg).context("argument contains a NUL byte"))
            .collect::<Result<Vec<_>>>()?;
        let input = stage.input.take().map(c_path).transpose()?;
        let output = stage.output.take().map(c_path).transpose()?;
        Ok(PreparedStage {
            argv,
            input,
            output,
        })
    }

    #[cfg(test)]
    pub(crate) fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// Applies the stage's redirections and replaces the process image.
    ///
    /// Background stages keep ignoring keyboard signals, as asynchronous
    /// commands do in a shell without job control.
    fn exec(&self, background: bool) -> ! {
        // The Rust runtime ignores SIGPIPE, and ignored dispositions survive exec.
        let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };
        if !background {
            for sig in KEYBOARD_SIGNALS {
                let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
            }
        }
        if let Err(e) = self.apply_redirections() {
            report(format_args!("{e:#}"));
            terminate(SETUP_FAILED);
        }
        // A stage made only of redirections has done all of its work.
        let Some(program) = self.argv.first() else {
            terminate(0);
        };
        let err = match unistd::execvp(program, self.argv.as_slice()) {
            Ok(never) => match never {},
            Err(err) => err,
        };
        report(format_args!("{}: {}", program.to_string_lossy(), err.desc()));
        terminate(if err == Errno::ENOENT {
            NOT_FOUND
        } else {
            NOT_EXECUTABLE
        })
    }

    fn apply_redirections(&self) -> Result<()> {
        if let Some(path) = &self.output {
            let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
            redirect_file(path, flags, libc::STDOUT_FILENO)
                .with_context(|| path.to_string_lossy().into_owned())?;
        }
        if let Some(path) = &self.input {
            redirect_file(path, OFlag::O_RDONLY, libc::STDIN_FILENO)
                .with_context(|| path.to_string_lossy().into_owned())?;
        }
        Ok(())
    }
}

impl fmt::Display for PreparedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<_> = self.argv.iter().map(|a| a.to_string_lossy()).collect();
        write!(f, "{}", words.join(" "))?;
        if let Some(path) = &self.input {
            write!(f, " < {}", path.to_string_lossy())?;
        }
        if let Some(path) = &self.output {
            write!(f, " > {}", path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// A parsed command chain in execution order, first-typed stage first.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<PreparedStage>,
    background: bool,
}

impl Pipeline {
    /// Consumes the chain headed by `head` (its right-most stage).
    pub fn prepare(head: Command) -> Result<Self> {
        let background = head.background;
        let stages = head
            .into_pipeline()
            .into_iter()
            .map(PreparedStage::prepare)
            .collect::<Result<Vec<_>>>()?;
        Ok(Pipeline { stages, background })
    }

    pub fn stages(&self) -> &[PreparedStage] {
        &self.stages
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Wires up and executes every stage. Runs inside the line process.
    ///
    /// Stages to the left of the last one are forked off with their standard
    /// output on a fresh pipe whose read end becomes the next stage's standard
    /// input. The last stage is executed by the calling process.
    pub fn run(&self) -> ! {
        let Some((last, upstream)) = self.stages.split_last() else {
            terminate(0);
        };

        let mut feed: Option<OwnedFd> = None;
        for stage in upstream {
            let (read, write) = match unistd::pipe() {
                Ok(ends) => ends,
                Err(e) => fail("pipe", e),
            };
            match unsafe { unistd::fork() } {
                Ok(ForkResult::Child) => {
                    drop(read);
                    if let Some(fd) = feed.take() {
                        install(fd, libc::STDIN_FILENO).unwrap_or_else(|e| fail("dup2", e));
                    }
                    install(write, libc::STDOUT_FILENO).unwrap_or_else(|e| fail("dup2", e));
                    stage.exec(self.background);
                }
                Ok(ForkResult::Parent { .. }) => {
                    drop(write);
                    feed = Some(read);
                }
                Err(e) => fail("fork", e),
            }
        }

        if let Some(fd) = feed {
            install(fd, libc::STDIN_FILENO).unwrap_or_else(|e| fail("dup2", e));
        }
        last.exec(self.background)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{stage}")?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}

/// Forks the line process for `pipeline` and returns its pid.
pub fn spawn(pipeline: &Pipeline) -> Result<Pid> {
    match unsafe { unistd::fork() }.context("cannot fork")? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => pipeline.run(),
    }
}

fn c_path(path: String) -> Result<CString> {
    CString::new(path).context("file name contains a NUL byte")
}

/// Makes `fd` the process's `target` descriptor and closes the original.
fn install(fd: OwnedFd, target: RawFd) -> nix::Result<()> {
    if fd.as_raw_fd() == target {
        let _ = fd.into_raw_fd();
        return Ok(());
    }
    unistd::dup2(fd.as_raw_fd(), target)?;
    Ok(())
}

fn redirect_file(path: &CStr, flags: OFlag, target: RawFd) -> nix::Result<()> {
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    let raw = fcntl::open(path, flags, mode)?;
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };
    install(fd, target)
}

fn report(message: fmt::Arguments<'_>) {
    let _ = writeln!(io::stderr(), "osh: {message}");
}

fn fail(what: &str, err: Errno) -> ! {
    report(format_args!("{}: {}", what, err.desc()));
    terminate(SETUP_FAILED)
}

/// Leaves a forked process without running any of the parent's cleanup.
fn terminate(code: ExitCode) -> ! {
    unsafe { libc::_exit(code) }
}
