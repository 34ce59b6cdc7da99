//! skinhost - headless driver for the skin host core.
//!
//! # Overview
//!
//! Runs the host without any windows: skins are created as headless instances
//! and everything the UI would show is written to the log. Useful for checking
//! a skin tree and a settings file, and for running bangs against them.
//!
//! # Execution Flow
//!
//! 1. Resolve the settings file (argument, portable, or per-user default)
//! 2. Read the global options and set up logging
//! 3. Scan skins and themes, activate the configs marked active
//! 4. Run each `--bang`, then the deferred queue
//! 5. Print the skin menu and tear everything down

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use skinhost::config::load_options;
use skinhost::host::{Host, LoggingShell};
use skinhost::instance::HeadlessFactory;
use skinhost::logging::{self, RecentLog};
use skinhost::models::MenuEntry;
use skinhost::{APP_NAME, HostPaths, VERSION};

#[derive(Parser, Debug)]
#[command(name = "skinhost", version, about = "Headless desktop skin host")]
struct Cli {
    /// Settings file, or a folder holding Rainmeter.ini
    #[arg(short, long)]
    settings: Option<String>,

    /// Bang to run after startup (repeatable)
    #[arg(short, long = "bang")]
    bangs: Vec<String>,

    /// Also log to the console
    #[arg(long)]
    console: bool,

    /// Debug-level logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let exe = std::env::current_exe().context("Failed to locate the executable")?;
    let program_dir = exe
        .parent()
        .map(|dir| Utf8PathBuf::try_from(dir.to_path_buf()))
        .transpose()
        .context("Program directory is not valid UTF-8")?
        .unwrap_or_else(|| Utf8PathBuf::from("."));

    let paths = HostPaths::resolve(&program_dir, cli.settings.as_deref())?;
    let options = load_options(&paths.settings_file)?;
    let debug = cli.debug || options.debug;

    let recent = RecentLog::new();
    let _guard = if options.logging {
        let log_prefix = paths.log_file.file_name().unwrap_or("skinhost.log");
        Some(logging::setup_logging_with_console(
            paths.settings_dir.as_str(),
            log_prefix,
            debug,
            cli.console,
            &recent,
        )?)
    } else {
        logging::setup_console_logging(debug, &recent)?;
        None
    };

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Settings: {}", paths.settings_file);

    let mut host = Host::new(
        paths,
        options,
        Box::new(HeadlessFactory::new()),
        Box::new(LoggingShell),
    );
    let mut events = host.events().subscribe();

    host.initialize();
    host.pump();

    for bang in &cli.bangs {
        if let Err(e) = host.execute_command(bang, None) {
            tracing::warn!("Bang failed: {}", e);
        }
        host.pump();
        if host.quit_requested() {
            break;
        }
    }

    let mut event_count = 0;
    while let Ok(event) = events.try_recv() {
        tracing::debug!("Event: {:?}", event);
        event_count += 1;
    }
    tracing::debug!("{} host events", event_count);

    println!("Skins in {}:", host.paths().skin_root);
    print_menu(&host.config_menu(), 1);
    println!("Running: {}", host.running_names().join(", "));

    host.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_menu(entries: &[MenuEntry], depth: usize) {
    let indent = "  ".repeat(depth);
    for entry in entries {
        match entry {
            MenuEntry::Variant { label, checked, .. } | MenuEntry::Item { label, checked, .. } => {
                let mark = if *checked { "*" } else { " " };
                println!("{indent}{mark} {label}");
            }
            MenuEntry::Submenu { label, children } => {
                println!("{indent}{label}\\");
                print_menu(children, depth + 1);
            }
            MenuEntry::Separator => println!("{indent}--"),
        }
    }
}
