use anyhow::Context;
use clap::Parser;
use drivesync::journal::{Journal, RunHeader};
use drivesync::platform::NativePlatform;
use drivesync::{EnvResolver, MountStatus, Reconciler, load_specs};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

/// Brings mapped network drives in line with a configuration file.
///
/// Meant to be run periodically by a scheduler; each run is a full pass.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mount list (TOML, or JSON with a .json extension)
    #[arg(short, long, value_name = "FILE", default_value = "drivesync.toml")]
    config: PathBuf,

    /// Directory for the run journal
    #[arg(short, long, value_name = "DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Do not write the run journal
    #[arg(long)]
    no_journal: bool,

    /// More console logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{e:?}");
            eprintln!("drivesync: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every mount ended up in place.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let header = RunHeader::now(&cli.config);
    let specs = load_specs(&cli.config)
        .with_context(|| format!("configuration {} rejected", cli.config.display()))?;
    info!("drivesync v{}: {} mount(s) configured", env!("CARGO_PKG_VERSION"), specs.len());

    let mut reconciler = Reconciler::new(NativePlatform::new(), EnvResolver::new());
    let outcomes = reconciler.reconcile(&specs)?;

    for outcome in &outcomes {
        match &outcome.status {
            MountStatus::Skipped => info!("{} already mounted", outcome.drive_letter),
            MountStatus::Mounted => {
                info!("{} mounted to {}", outcome.drive_letter, outcome.remote_path)
            }
            MountStatus::Failed(reason) => eprintln!("{}: {reason}", outcome.drive_letter),
        }
    }

    if !cli.no_journal {
        let journal = Journal::new(&cli.log_dir);
        match journal.record(&header, &outcomes) {
            Ok(Some(path)) => info!("run journal written to {}", path.display()),
            Ok(None) => {}
            Err(e) => error!("{:#}", anyhow::Error::new(e)),
        }
    }

    Ok(outcomes.iter().all(|o| !o.is_failed()))
}
