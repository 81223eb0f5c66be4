use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use clap::Parser;
use mover_executor::{ScriptError, ScriptHost};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod dump;
mod settings;
mod setup;

use dump::TableDump;
use settings::MoverSettings;

#[derive(Debug, Parser)]
#[command(name = "mover")]
pub(crate) struct Args {
    /// Script files to load. Overrides the list in the settings file.
    #[clap(long = "script", short = 's')]
    scripts: Vec<PathBuf>,

    #[clap(long, short = 'f', default_value = "mover-settings.json")]
    settings_file: PathBuf,

    /// Seed for initial positions and random slot assignment.
    #[clap(long)]
    seed: Option<u64>,

    #[clap(long, default_value = "info")]
    log_level: String,

    /// Also write JSON logs to this file.
    #[clap(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logging(&args)?;

    let mut settings = MoverSettings::load(&args.settings_file)?;
    if !args.scripts.is_empty() {
        settings.scripts = args.scripts.clone();
    }
    let seed = args.seed.or(settings.seed);

    let mut host = ScriptHost::new();
    for path in &settings.scripts {
        match host.load_script(path) {
            Ok(_) => {}
            Err(err @ ScriptError::CapacityExceeded { .. }) => {
                tracing::warn!("Skipping remaining scripts: {}", err);
                break;
            }
            // Already logged by the pool; a broken script just isn't registered.
            Err(_) => {}
        }
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    setup::populate(&mut host, settings.assignments.as_deref(), &mut rng)?;

    print!("{}", TableDump(&host));
    let report = host.run();
    print!("{}", TableDump(&host));

    if report.is_clean() {
        tracing::info!("All {} slots processed", report.invoked);
    } else {
        tracing::warn!(
            "{} slot(s) processed, {} failed",
            report.invoked,
            report.failures.len()
        );
    }
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let log_level = tracing::Level::from_str(&args.log_level)
        .with_context(|| format!("Invalid log level: {}", args.log_level))?;

    let (logfile_layer, guard) = match &args.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::Layer::default()
                .json()
                .with_ansi(false)
                .with_writer(non_blocking_appender);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = fmt::Layer::default()
        .without_time()
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .with(stdout_layer)
        .with(logfile_layer)
        .try_init()
        .context("Unable to set global tracing subscriber")?;

    if let Some(path) = &args.log_file {
        tracing::info!("Saving logs to {}", path.display());
    }
    Ok(guard)
}
