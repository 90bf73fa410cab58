// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use eikonal_fsm::core::{velocity_to_slowness, Hypocenter, PatchGrid};
use eikonal_fsm::io;
use eikonal_fsm::sweep::{FastSweepSolver, ResidualNorm, SweepProgress};

#[derive(Parser)]
#[command(
    name = "eikonal-fsm",
    version,
    about = "Fast Sweeping Method solver for rupture onset times"
)]
struct Cli {
    /// Number of patches along strike and along dip (e.g., 20,10)
    #[arg(short = 's', long)]
    size: String,

    /// Hypocenter patch indices along strike and dip, starting at 0 (e.g., 10,5)
    #[arg(long, conflicts_with = "hypocenter_position")]
    hypocenter: Option<String>,

    /// Hypocenter position along strike and dip, in the length unit of --patch-size
    #[arg(long)]
    hypocenter_position: Option<String>,

    /// Edge length of one square patch
    #[arg(long, default_value = "1.0")]
    patch_size: f64,

    /// Slowness field: "uniform:<s>", "velocity:<v>", "gradient:<v0>,<g>",
    /// "slowness-file:<path>", or "velocity-file:<path>"
    #[arg(long, default_value = "uniform:1.0")]
    slowness: String,

    /// Convergence tolerance on the sweep residual
    #[arg(short = 't', long, default_value = "0.1")]
    tolerance: f64,

    /// Maximum number of four-direction iterations (0 = unbounded)
    #[arg(long, default_value = "1000")]
    max_iterations: usize,

    /// Residual reduction: "sum" (sum of squares) or "mean" (per patch)
    #[arg(long, default_value = "sum")]
    residual_norm: String,

    /// Fail instead of writing a best-effort result when not converged
    #[arg(long)]
    require_convergence: bool,

    /// Output file path (.npy or .mat)
    #[arg(short = 'o', long, default_value = "onset_time.npy")]
    output: PathBuf,

    /// Log convergence progress (see --progress-interval)
    #[arg(long)]
    progress: bool,

    /// Progress reporting interval in milliseconds (used with --progress)
    #[arg(long, default_value = "500")]
    progress_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn parse_pair<T: std::str::FromStr>(s: &str, flag: &str) -> Result<[T; 2]>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let parts: Vec<T> = s
        .split(',')
        .map(|p| p.trim().parse::<T>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --{}: '{}'", flag, s))?;
    match <[T; 2]>::try_from(parts) {
        Ok(pair) => Ok(pair),
        Err(parts) => bail!(
            "--{} needs 2 comma-separated components, got {}",
            flag,
            parts.len()
        ),
    }
}

fn parse_size(s: &str) -> Result<[usize; 2]> {
    parse_pair(s, "size")
}

fn parse_residual_norm(s: &str) -> Result<ResidualNorm> {
    match s {
        "sum" => Ok(ResidualNorm::SumOfSquares),
        "mean" => Ok(ResidualNorm::MeanSquare),
        _ => bail!("unknown --residual-norm '{}': expected 'sum' or 'mean'", s),
    }
}

fn build_slowness_field(mode: &str, shape: [usize; 2], h: f64) -> Result<Vec<f64>> {
    let num = shape[0]
        .checked_mul(shape[1])
        .with_context(|| format!("--size {}x{} has too many patches", shape[0], shape[1]))?;

    if let Some(val_str) = mode.strip_prefix("uniform:") {
        let val: f64 = val_str.parse().context("invalid uniform slowness value")?;
        return Ok(vec![val; num]);
    }

    if let Some(val_str) = mode.strip_prefix("velocity:") {
        let v: f64 = val_str.parse().context("invalid uniform velocity value")?;
        return Ok(velocity_to_slowness(&vec![v; num])?);
    }

    if let Some(params) = mode.strip_prefix("gradient:") {
        // Rupture velocity grows linearly with depth along dip, sampled at patch centres
        let [v0, g]: [f64; 2] = parse_pair(params, "slowness")?;
        let mut velocity = vec![0.0; num];
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                let depth = (j as f64 + 0.5) * h;
                velocity[i * shape[1] + j] = v0 + g * depth;
            }
        }
        return velocity_to_slowness(&velocity)
            .with_context(|| format!("gradient '{}' gives a non-positive velocity", params));
    }

    if let Some(path_str) = mode.strip_prefix("slowness-file:") {
        return Ok(io::load_slowness(Path::new(path_str), shape)?);
    }

    if let Some(path_str) = mode.strip_prefix("velocity-file:") {
        return Ok(io::load_velocity_as_slowness(Path::new(path_str), shape)?);
    }

    bail!(
        "unknown --slowness mode: '{}'. Expected 'uniform:<s>', 'velocity:<v>', \
         'gradient:<v0>,<g>', 'slowness-file:<path>', or 'velocity-file:<path>'",
        mode
    );
}

fn resolve_hypocenter(cli: &Cli) -> Result<Hypocenter> {
    if let Some(idx) = &cli.hypocenter {
        let [row, col]: [usize; 2] = parse_pair(idx, "hypocenter")?;
        return Ok(Hypocenter::new(row, col));
    }
    if let Some(pos) = &cli.hypocenter_position {
        let [strike, dip]: [f64; 2] = parse_pair(pos, "hypocenter-position")?;
        return Ok(Hypocenter::from_position(strike, dip, cli.patch_size)?);
    }
    bail!("one of --hypocenter or --hypocenter-position must be specified");
}

fn parse_log_level(s: &str) -> Result<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!(
            "unknown --log-level '{}': expected trace, debug, info, warn or error",
            s
        ),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level = parse_log_level(level)?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let shape: [usize; 2] = parse_size(&cli.size)?;
    let hypocenter = resolve_hypocenter(&cli)?;
    let slowness = build_slowness_field(&cli.slowness, shape, cli.patch_size)?;

    let grid = PatchGrid::new(shape, cli.patch_size, slowness)?;
    let mut solver = FastSweepSolver::new(grid, hypocenter)?
        .with_tolerance(cli.tolerance)?
        .with_residual_norm(parse_residual_norm(&cli.residual_norm)?);
    solver = if cli.max_iterations == 0 {
        solver.without_iteration_limit()
    } else {
        solver.with_max_iterations(cli.max_iterations)
    };

    if cli.progress {
        let interval_ms = cli.progress_interval;
        let last_print = AtomicU64::new(0);
        solver = solver.with_progress(Box::new(move |p: SweepProgress| {
            let now_ms = p.elapsed.as_millis() as u64;
            if p.iteration == 1 || now_ms >= last_print.load(Ordering::Relaxed) + interval_ms {
                last_print.store(now_ms, Ordering::Relaxed);
                info!(
                    iteration = p.iteration,
                    residual = p.residual,
                    elapsed_s = p.elapsed.as_secs_f64(),
                    "progress"
                );
            }
        }));
    }

    info!(
        rows = shape[0],
        cols = shape[1],
        hyp_row = solver.hypocenter().row,
        hyp_col = solver.hypocenter().col,
        "solving onset times"
    );
    let report = solver.solve();
    if cli.require_convergence {
        report.ensure_converged()?;
    }

    solver
        .save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(
        output = %cli.output.display(),
        iterations = report.iterations,
        converged = report.converged,
        "onset times written"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_names() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(parse_log_level("verbose").is_err());
        assert!(parse_log_level("").is_err());
    }

    #[test]
    fn residual_norm_names() {
        assert_eq!(parse_residual_norm("sum").unwrap(), ResidualNorm::SumOfSquares);
        assert_eq!(parse_residual_norm("mean").unwrap(), ResidualNorm::MeanSquare);
        assert!(parse_residual_norm("max").is_err());
    }

    #[test]
    fn oversized_grid_rejected() {
        assert!(build_slowness_field("uniform:1.0", [usize::MAX, 2], 1.0).is_err());
        assert_eq!(build_slowness_field("uniform:0.5", [2, 3], 1.0).unwrap(), vec![0.5; 6]);
    }
}
