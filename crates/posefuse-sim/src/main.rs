use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use posefuse_sim::cli::Args;
use posefuse_sim::report::save_json;
use posefuse_sim::{Result, Simulator};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Simulation failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    info!(
        seed = config.seed,
        duration = config.duration,
        particles = config.filters.particle_filter.num_particles,
        "Starting simulation"
    );

    let report = Simulator::new(config)?.run()?;

    info!(
        "EKF: position RMSE {:.3} m, heading RMSE {:.3} rad",
        report.ekf_errors.position_rmse, report.ekf_errors.heading_rmse
    );
    info!(
        "PF:  position RMSE {:.3} m, heading RMSE {:.3} rad",
        report.pf_errors.position_rmse, report.pf_errors.heading_rmse
    );

    if let Some(path) = &args.output {
        save_json(&report, path)?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
