use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use portfolio_sweep::config::SESSIONS_PATH;
use portfolio_sweep::data::text_file;
use portfolio_sweep::engine::{
    JobOutcome, LocalGrid, ReferenceSolver, SessionId, SweepEngine, SweepReport, WaitResult,
};
use portfolio_sweep::{Cli, DEFAULT_RHO, Input, Output, RangeError, RhoRange, example_input};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    std::process::exit(run(cli));
}

/// Exit codes: 0 on success (including a clean detach), 1 when anything
/// goes wrong at runtime, 2 specifically for a rejected rho/step combination
/// so scripts can tell a typo apart from a failed run.
fn run(cli: Cli) -> i32 {
    let range = match parse_range(&cli) {
        Ok(range) => range,
        Err(e) => {
            log::error!("{}", e);
            return 2;
        }
    };

    match sweep(&cli, &range) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            1
        }
    }
}

fn parse_range(cli: &Cli) -> Result<RhoRange, RangeError> {
    // A data-file run must spell the sweep out in full: a lone rho max or a
    // lone step is rejected there instead of silently degraded. Without a
    // data file a partial pair degenerates to the single rho-min point.
    if cli.data.is_some() {
        let has_max = cli.rho.as_deref().is_some_and(|rho| rho.contains(','));
        if has_max != cli.step.is_some() {
            return Err(RangeError::PartialRange);
        }
    }
    match &cli.rho {
        Some(rho) => RhoRange::from_args(rho, cli.step),
        None => RhoRange::new(DEFAULT_RHO, None, cli.step),
    }
}

fn sweep(cli: &Cli, range: &RhoRange) -> Result<i32> {
    let grid = LocalGrid::new(SESSIONS_PATH, Arc::new(ReferenceSolver))
        .context("failed to start the local grid")?;
    let engine = SweepEngine::new(grid);

    let mut session = match &cli.session {
        Some(id) => engine
            .reattach(SessionId(id.clone()))
            .with_context(|| format!("cannot reattach to session {}", id))?,
        None => {
            let base = base_input(cli, range)?;
            let session = engine.submit_sweep(&base, range)?;
            println!(
                "Session {}: {} sweep point(s) submitted.",
                session.id,
                session.jobs.len()
            );
            session
        }
    };

    if cli.no_wait {
        engine.detach(&mut session)?;
        println!("Detached. Reattach with --session={}", session.id);
        return Ok(0);
    }

    let timeout = cli
        .timeout
        .filter(|&secs| secs > 0)
        .map(|secs| Duration::from_secs(secs as u64));

    match engine.wait(&mut session, timeout)? {
        WaitResult::NotReady { resolved, total } => {
            println!(
                "{} of {} job(s) resolved; try again later with --session={}",
                resolved, total, session.id
            );
            engine.detach(&mut session)?;
            Ok(0)
        }
        WaitResult::Ready(report) => {
            print_report(&report);
            let failed = report.failed();
            engine.discard(session)?;
            Ok(if failed { 1 } else { 0 })
        }
    }
}

fn base_input(cli: &Cli, range: &RhoRange) -> Result<Input> {
    match &cli.data {
        Some(path) => {
            let wealth = cli.wealth.context("--data requires --wealth")?;
            if cli.rho.is_none() {
                bail!("--data requires --rho");
            }
            let (investments, covariance) = text_file::load_path(path)
                .with_context(|| format!("cannot load problem file {}", path.display()))?;
            Ok(Input::new(investments, covariance, wealth, range.min()))
        }
        None => Ok(example_input(cli.wealth.unwrap_or(f64::NAN), range.min())),
    }
}

fn print_report(report: &SweepReport) {
    for entry in &report.entries {
        match &entry.outcome {
            JobOutcome::Success(output) => print_output(output),
            JobOutcome::Failure { code, message } => {
                println!("rho {}: FAILED (code {}): {}", entry.rho, code, message);
            }
        }
    }
    if report.failed() {
        println!("Sweep finished with failures.");
    }
}

fn print_output(output: &Output) {
    if !output.optimal {
        println!(
            "rho {}: no feasible allocation for wealth {}",
            output.rho, output.wealth
        );
        return;
    }
    println!(
        "Optimal allocation for wealth {} at rho {}:",
        output.wealth, output.rho
    );
    for inv in &output.investments {
        println!("  {:>4}  {:<24} {:>12.4}", inv.id, inv.name, inv.allocation);
    }
    println!(
        "  expected return {:.6}  variance {:.6}  objective {:.6}",
        output.total_return, output.total_variance, output.objective_value
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cli(data: Option<&str>, rho: Option<&str>, step: Option<f64>) -> Cli {
        Cli {
            data: data.map(PathBuf::from),
            wealth: None,
            rho: rho.map(String::from),
            step,
            no_wait: false,
            session: None,
            timeout: None,
        }
    }

    #[test]
    fn test_partial_range_without_data_file_runs_single_point() {
        let range = parse_range(&cli(None, Some("0,1"), None)).unwrap();
        assert_eq!(range.points(), vec![0.0]);

        let range = parse_range(&cli(None, None, Some(0.5))).unwrap();
        assert_eq!(range.points(), vec![DEFAULT_RHO]);
    }

    #[test]
    fn test_partial_range_with_data_file_is_rejected() {
        assert_eq!(
            parse_range(&cli(Some("problem.txt"), Some("0,1"), None)),
            Err(RangeError::PartialRange)
        );
        assert_eq!(
            parse_range(&cli(Some("problem.txt"), Some("0.5"), Some(0.1))),
            Err(RangeError::PartialRange)
        );
    }

    #[test]
    fn test_full_range_with_data_file_is_accepted() {
        let range = parse_range(&cli(Some("problem.txt"), Some("0,1"), Some(0.5))).unwrap();
        assert_eq!(range.points(), vec![0.0, 0.5, 1.0]);
    }
}
