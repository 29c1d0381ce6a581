mod cli;
mod desc;
mod follow;
mod keys;
mod pager;
mod source;
mod summary;

use anyhow::Result;
use clap::Parser;
use cli::Args;
use crossterm::terminal::disable_raw_mode;
use desc::ViewerDesc;
use follow::Follower;
use keys::TerminalKeys;
use pager::{Pager, PagerExit};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::{
    fs::File,
    io::{self, Write},
    panic,
    path::Path,
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

const INTERRUPTED_EXIT_CODE: i32 = 130;

enum Outcome {
    Finished,
    Interrupted,
}

fn main() {
    let args = Args::parse();

    if let Some(path) = &args.debug_log {
        init_logger(path);
    }
    log::debug!("jsonlview starting: {:?}", args);

    // Ensure we restore the terminal on panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        original_hook(panic_info);
    }));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            log::debug!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let desc = ViewerDesc::from_args(&args);
    let result = if args.follow {
        run_follow(&args, &desc, &stop)
    } else {
        run_pager(&args, &desc, &stop)
    };

    match result {
        Ok(Outcome::Finished) => {}
        Ok(Outcome::Interrupted) => process::exit(INTERRUPTED_EXIT_CODE),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

fn init_logger(path: &Path) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    match File::create(path) {
        Ok(log_file) => {
            let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
        }
        Err(e) => eprintln!("Cannot create debug log {}: {}", path.display(), e),
    }
}

fn run_pager(args: &Args, desc: &ViewerDesc, stop: &AtomicBool) -> Result<Outcome> {
    let path = source::resolve_static(args.logfile.as_deref(), desc)?;
    if args.logfile.as_deref().is_none_or(Path::is_dir) {
        println!("Using latest file: {}", path.display());
    }
    let lines = source::load_lines(&path)?;
    log::debug!("Loaded {} lines from {}", lines.len(), path.display());

    let stdout = io::stdout();
    let mut pager = Pager::new(
        &lines,
        TerminalKeys,
        stdout.lock(),
        desc.painter,
        desc.page_size,
    )
    .with_interrupt(stop);

    let exit = pager.run()?;
    drop(pager);
    if let Some(notice) = exit.closing_notice() {
        println!("{}", notice);
    }

    match exit {
        PagerExit::Interrupted => {
            println!("\nExiting...");
            Ok(Outcome::Interrupted)
        }
        PagerExit::Quit | PagerExit::EndOfFile => Ok(Outcome::Finished),
    }
}

fn run_follow(args: &Args, desc: &ViewerDesc, stop: &AtomicBool) -> Result<Outcome> {
    let tracker = source::resolve_follow(
        args.logfile.as_deref(),
        args.directory.as_deref(),
        desc,
    )?;

    let stdout = io::stdout();
    let mut follower = Follower::new(tracker, desc.painter, stdout.lock());
    follower.write_banner()?;
    follower.run(stop)?;
    drop(follower);

    let mut stdout = io::stdout();
    writeln!(stdout, "\nStopping...")?;
    stdout.flush()?;
    Ok(Outcome::Interrupted)
}
