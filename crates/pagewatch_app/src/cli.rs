use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use pagewatch_logging::{LogDestination, LogSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Poll paginated listing pages and report items not seen before.
#[derive(Debug, Parser)]
#[command(name = "pagewatch", version)]
pub struct Cli {
    /// RON file describing the scrape jobs
    #[arg(short, long, default_value = "pagewatch.ron")]
    pub config: PathBuf,

    /// Where log output goes
    #[arg(long = "log", value_enum, default_value_t = LogTarget::Terminal)]
    pub log_target: LogTarget,

    /// Log file used with `--log file` or `--log both`
    #[arg(long, default_value = "./pagewatch.log")]
    pub log_file: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            destination: self.log_target.into(),
            level: if self.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            file_path: self.log_file.clone(),
        }
    }
}
