//! A small interactive command interpreter.
//!
//! Each input line goes through three stages:
//!
//! - [`lexer`] splits it into words and the operators `|`, `<`, `>`, `&`
//!   and `!!`;
//! - [`parser`] builds a chain of [`command::Command`] stages, head first,
//!   checking where redirections and pipes may appear;
//! - [`executor`] forks one process per stage, connects neighbours with
//!   pipes, applies file redirections and replaces each process image with
//!   the requested program.
//!
//! [`Interpreter`] ties them together with a prompt, a one-line history for
//! `!!`, foreground waiting and background reclamation.

mod builtin;
pub mod command;
pub mod config;
pub mod executor;
mod interpreter;
pub mod job;
pub mod lexer;
pub mod logging;
pub mod parser;

pub use builtin::Flow;
pub use command::{Command, ExitCode};
pub use config::Config;
pub use interpreter::{Interpreter, Outcome};
