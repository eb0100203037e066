use crate::builtin::{self, Flow};
use crate::command::{Command, ExitCode};
use crate::config::Config;
use crate::executor::{self, Pipeline};
use crate::job;
use crate::parser::{self, Parsed};
use log::{debug, error, info, warn};
use nix::unistd::Pid;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// What happened to one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Blank line.
    Empty,
    /// The line was refused; a diagnostic has been written.
    Rejected,
    /// A foreground line or builtin finished with this status.
    Completed(ExitCode),
    /// A background line is running as this process.
    Background(Pid),
    /// The session should end.
    Exit,
}

/// An interactive command interpreter.
///
/// The interpreter keeps a single slot of history: the last line that parsed
/// to a runnable command, replayed by `!!`. A line that ends the session is
/// never stored.
///
/// Creating an interpreter makes the process ignore keyboard interrupts for
/// the rest of its life; foreground stages restore them before exec.
///
/// Example
/// ```no_run
/// use osh::{Config, Interpreter, Outcome};
/// let mut sh = Interpreter::new(Config::default());
/// let outcome = sh.eval_line("echo hello world").unwrap();
/// assert_eq!(outcome, Outcome::Completed(0));
/// ```
pub struct Interpreter {
    config: Config,
    previous: Option<String>,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        if let Err(e) = job::ignore_keyboard_signals() {
            warn!("{:#}", e);
        }
        Self {
            config,
            previous: None,
        }
    }

    /// The line `!!` would replay, if any.
    pub fn previous_line(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// Evaluate one line, writing diagnostics to standard output.
    pub fn eval_line(&mut self, line: &str) -> anyhow::Result<Outcome> {
        self.eval_line_with_output(line, &mut std::io::stdout())
    }

    /// Evaluate one line, writing diagnostics and history echoes to `out`.
    ///
    /// Only the text before the first line terminator is considered. Parse
    /// and history problems are reported to `out` and yield
    /// [`Outcome::Rejected`]; an `Err` means the line could not be started
    /// at all.
    pub fn eval_line_with_output(
        &mut self,
        line: &str,
        out: &mut dyn Write,
    ) -> anyhow::Result<Outcome> {
        let line = line.lines().next().unwrap_or_default();
        if line.len() >= self.config.max_line {
            warn!("rejected line of {} bytes", line.len());
            writeln!(out, "Line too long.")?;
            return Ok(Outcome::Rejected);
        }

        let command = match parser::parse(line, self.config.max_args) {
            Ok(Parsed::Empty) => return Ok(Outcome::Empty),
            Ok(Parsed::Ready(command)) => {
                if !builtin::ends_session(&command) {
                    self.previous = Some(line.to_owned());
                }
                command
            }
            Ok(Parsed::History) => match self.replay(out)? {
                Some(command) => command,
                None => return Ok(Outcome::Rejected),
            },
            Err(e) => {
                if e.is_syntax_error() {
                    warn!("rejected {:?}: {}", line, e);
                } else {
                    info!("rejected {:?}: {}", line, e);
                }
                writeln!(out, "{e}")?;
                return Ok(Outcome::Rejected);
            }
        };
        out.flush()?;
        self.execute(command, out)
    }

    fn replay(&self, out: &mut dyn Write) -> anyhow::Result<Option<Command>> {
        let Some(previous) = self.previous.as_deref() else {
            writeln!(out, "No commands in history.")?;
            return Ok(None);
        };
        writeln!(out, "{previous}")?;
        match parser::parse(previous, self.config.max_args) {
            Ok(Parsed::Ready(command)) => Ok(Some(command)),
            other => {
                warn!("history line {:?} no longer parses: {:?}", previous, other);
                writeln!(out, "Error parsing history.")?;
                Ok(None)
            }
        }
    }

    fn execute(&mut self, command: Command, out: &mut dyn Write) -> anyhow::Result<Outcome> {
        if let Some(result) = builtin::dispatch(&command, out) {
            return match result? {
                Flow::Continue(code) => Ok(Outcome::Completed(code)),
                Flow::Exit => Ok(Outcome::Exit),
            };
        }

        let pipeline = Pipeline::prepare(command)?;
        debug!("running {} ({} stages)", pipeline, pipeline.stages().len());
        let pid = executor::spawn(&pipeline)?;
        let outcome = if pipeline.is_background() {
            info!("started background process {} for {}", pid, pipeline);
            Outcome::Background(pid)
        } else {
            let code = job::wait_for(pid)?;
            info!("process {} exited with {}", pid, code);
            Outcome::Completed(code)
        };
        job::reap_finished();
        Ok(outcome)
    }

    /// Read-Eval-Print Loop over the terminal until `exit` or end of input.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let readline = rl.readline(&self.config.prompt);
            match readline {
                Ok(line) => match self.eval_line(&line) {
                    Ok(Outcome::Exit) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("{:#}", e);
                        eprintln!("osh: {:#}", e);
                    }
                },
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        println!("Ciao!");
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
