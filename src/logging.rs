use crate::config::Config;
use simplelog::WriteLogger;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

/// `~/.local/share/osh/osh.log`, or `None` when `HOME` is unset.
pub fn default_log_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".local/share/osh/osh.log"))
}

/// Install the global file logger.
///
/// Best-effort: if the directory cannot be created or the file cannot be
/// opened, logging stays disabled and the session runs anyway.
pub fn init(config: &Config) {
    let Some(path) = config.log_file.clone().or_else(default_log_path) else {
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let _ = WriteLogger::init(config.log_level, simplelog::Config::default(), file);
}
