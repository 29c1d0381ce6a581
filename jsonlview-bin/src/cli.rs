use clap::Parser;
use jsonlview_render::timestamp::DEFAULT_SHIFT_HOURS;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "jsonlview",
    version,
    about = "Format and display JSON-lines log files with pagination or follow mode."
)]
pub struct Args {
    /// Path to the log file or directory to process (auto-detected if not provided)
    pub logfile: Option<PathBuf>,

    /// Follow mode - continuously track new log entries
    #[arg(short, long)]
    pub follow: bool,

    /// Directory to monitor for new log files (used with -f when no logfile is given)
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// In follow mode, switch to a newer log file as soon as one appears
    #[arg(long)]
    pub follow_newest: bool,

    /// Project root searched when no logfile is given
    #[arg(long, value_name = "DIR", env = "JSONLVIEW_PROJECTS_DIR")]
    pub projects_dir: Option<PathBuf>,

    /// Disable ANSI colors
    #[arg(long)]
    pub no_color: bool,

    /// Hours added to every timestamp before display
    #[arg(
        long,
        value_name = "HOURS",
        default_value_t = DEFAULT_SHIFT_HOURS,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-24..=24)
    )]
    pub utc_offset: i32,

    /// Write debug logs to this file
    #[arg(long, value_name = "PATH")]
    pub debug_log: Option<PathBuf>,
}
