use argh::FromArgs;
use log::LevelFilter;
use std::path::PathBuf;

/// Longest accepted input line, in bytes, including the terminator.
pub const MAX_LINE: usize = 80;
/// Most words accepted in a single pipeline stage.
pub const MAX_ARGS: usize = MAX_LINE / 2;
pub const DEFAULT_PROMPT: &str = "osh> ";

/// Runtime settings of an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    /// Lines of this many bytes or more are rejected.
    pub max_line: usize,
    pub max_args: usize,
    /// Log destination; `None` selects [`crate::logging::default_log_path`].
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line: MAX_LINE,
            max_args: MAX_ARGS,
            log_file: None,
            log_level: LevelFilter::Info,
        }
    }
}

#[derive(FromArgs, Debug)]
/// A small interactive shell with pipes, redirections and background jobs.
pub struct Args {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt shown before every line.
    pub prompt: String,

    #[argh(option, default = "MAX_LINE")]
    /// longest accepted input line in bytes, including the terminator.
    pub max_line: usize,

    #[argh(option, default = "MAX_ARGS")]
    /// most words accepted per pipeline stage.
    pub max_args: usize,

    #[argh(option)]
    /// file to append the log to. Defaults to ~/.local/share/osh/osh.log.
    pub log_file: Option<PathBuf>,

    #[argh(option, default = "LevelFilter::Info")]
    /// log verbosity: off, error, warn, info, debug or trace.
    pub log_level: LevelFilter,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            prompt: args.prompt,
            max_line: args.max_line.max(1),
            max_args: args.max_args.max(1),
            log_file: args.log_file,
            log_level: args.log_level,
        }
    }
}
