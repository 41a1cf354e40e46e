use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use geograph_sync::{ErrorKind, LocationError};
use geograph_sync_cli::reconcile::reconcile_page;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Wikitext of the file page to reconcile
    #[arg(value_name = "PAGE")]
    page: PathBuf,

    /// Archive mirror row as JSON
    #[arg(short, long, value_name = "FILE")]
    record: PathBuf,

    /// Write the transformed wikitext here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// ISO 3166 region code to tag new facts with
    #[arg(long, value_name = "CODE")]
    region: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<LocationError>() {
            // Pages outside our remit are logged and skipped, exactly as the
            // unattended run would treat them.
            Some(skip) if skip.kind() == ErrorKind::NotApplicable => {
                info!("skipping page: {skip}");
                ExitCode::SUCCESS
            }
            _ => {
                error!("{err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let outcome = reconcile_page(&args.page, &args.record, args.region.clone())?;

    if !outcome.changed {
        info!("nothing to do");
        return Ok(());
    }

    match &args.out {
        Some(path) => {
            fs::write(path, &outcome.text)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("written transformed page: {}", path.display());
        }
        None => print!("{}", outcome.text),
    }
    Ok(())
}
