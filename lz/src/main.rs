//! lz - lazy section activation
//!
//! CLI entry point for simulating and checking section group pages.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use lazysection::catalog::GroupId;
use lazysection::cli::{Cli, Command, OutputFormat, get_log_path};
use lazysection::config::PageConfig;
use lazysection::simulate::Simulation;

fn setup_logging(level_str: Option<&str>) -> Result<PathBuf> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let level = match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(log_path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Simulate {
            format,
            events_log,
            no_color,
        } => {
            let config = PageConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
            cmd_simulate(config, format, events_log.as_deref(), !no_color)
        }
        Command::Check => {
            let config = PageConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
            cmd_check(&config)
        }
        Command::Sections { format } => cmd_sections(format),
    }
}

/// Play the page script on a paused clock so it completes instantly
fn cmd_simulate(config: PageConfig, format: OutputFormat, events_log: Option<&Path>, color: bool) -> Result<()> {
    debug!(?format, ?events_log, "cmd_simulate: called");
    let simulation = Simulation::new(config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .context("Failed to build runtime")?;
    let report = runtime.block_on(simulation.run(events_log))?;

    match format {
        OutputFormat::Text => print!("{}", report.render_text(color)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn cmd_check(config: &PageConfig) -> Result<()> {
    debug!("cmd_check: called");
    config.validate().context("Invalid page configuration")?;

    let sections: usize = config.groups.iter().map(|g| g.placements().len()).sum();
    println!(
        "Configuration OK: {} groups, {} sections, {} script steps",
        config.groups.len(),
        sections,
        config.script.len()
    );
    Ok(())
}

fn cmd_sections(format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_sections: called");
    match format {
        OutputFormat::Text => {
            for group in GroupId::ALL {
                let config = group.default_config();
                println!(
                    "{} ({}): debounce {}ms, preload {}, grace {}ms, stagger {}ms",
                    group,
                    group.title(),
                    config.debounce_ms,
                    if config.preload { "on" } else { "off" },
                    config.preload_grace_ms,
                    config.preload_stagger_ms
                );
                for section in group.sections() {
                    println!("  {:<24} {}", section.to_string(), section.title());
                }
            }
        }
        OutputFormat::Json => {
            let groups: Vec<_> = GroupId::ALL
                .into_iter()
                .map(|group| {
                    serde_json::json!({
                        "group": group,
                        "title": group.title(),
                        "sections": group.sections(),
                        "tunables": group.default_config(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
    }
    Ok(())
}
