use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

use crate::config::LoggingConfig;

/// Initializes the global logger. Returns the log file path when logging
/// to a directory.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.as_str()));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} :: {} :: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            record.level(),
            record.args()
        )
    });

    let path = match config.dir.as_deref() {
        Some(dir) => {
            let path = log_file_path(Path::new(dir), chrono::Local::now());
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir))?;
            let file = File::create(&path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
            Some(path)
        }
        None => None,
    };

    builder.try_init()?;
    Ok(path)
}

pub fn log_file_path<Tz>(dir: &Path, now: chrono::DateTime<Tz>) -> PathBuf
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!("permissions_{}.log", now.format("%m%d%Y_%H%M%S")))
}
