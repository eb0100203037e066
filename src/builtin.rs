use crate::command::{Command, ExitCode};
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::path::PathBuf;

/// What the session does after a builtin ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue(ExitCode),
    Exit,
}

/// Commands that must run inside the interpreter process itself.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// without forking.
pub(crate) trait Builtin: Sized + FromArgs {
    /// Canonical name of the command, e.g. "exit" or "cd".
    fn name() -> &'static str;

    fn execute(self, out: &mut dyn Write) -> Result<Flow>;
}

#[derive(FromArgs)]
/// Leave the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl Builtin for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _out: &mut dyn Write) -> Result<Flow> {
        Ok(Flow::Exit)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl Builtin for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _out: &mut dyn Write) -> Result<Flow> {
        let target = match self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => std::env::var_os("HOME")
                .map(PathBuf::from)
                .context("cd: no target and HOME not set")?,
        };
        std::env::set_current_dir(&target)
            .with_context(|| format!("cd: {}", target.display()))?;
        Ok(Flow::Continue(0))
    }
}

fn try_run<T: Builtin>(name: &str, args: &[&str], out: &mut dyn Write) -> Option<Result<Flow>> {
    if name != T::name() {
        return None;
    }
    let result: Result<Flow> = match T::from_args(&[name], args) {
        Ok(cmd) => match cmd.execute(out) {
            Ok(flow) => Ok(flow),
            Err(e) => writeln!(out, "{e:#}")
                .map(|_| Flow::Continue(1))
                .map_err(Into::into),
        },
        Err(EarlyExit { output, status }) => out
            .write_all(output.as_bytes())
            .map(|_| Flow::Continue(if status.is_err() { 1 } else { 0 }))
            .map_err(Into::into),
    };
    Some(result)
}

/// Runs `command` as a builtin if it is one.
///
/// Only a lone stage without redirections or `&` is considered; anything
/// else is left to the external program of the same name.
pub fn dispatch(command: &Command, out: &mut dyn Write) -> Option<Result<Flow>> {
    let (name, rest) = lone_stage(command)?.argv.split_first()?;
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    try_run::<Exit>(name, &args, out).or_else(|| try_run::<Cd>(name, &args, out))
}

/// Whether `command` would run the `exit` builtin.
pub fn ends_session(command: &Command) -> bool {
    lone_stage(command).and_then(Command::program) == Some(Exit::name())
}

fn lone_stage(command: &Command) -> Option<&Command> {
    if command.predecessor.is_some() || command.has_redirections() || command.background {
        return None;
    }
    Some(command)
}
