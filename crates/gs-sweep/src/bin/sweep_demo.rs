use anyhow::Context;
use gs_sweep::{axis, DataPoint, ParamCombination, ProgressPhase, SweepConfig, SweepRunner};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn linear(params: &ParamCombination<i64>, point: &DataPoint<i64>) -> f64 {
    (params[0] * point[0] + params[1] * point[1]) as f64
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("GRIDSWEEP_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading sweep config from {path}"))?;
            SweepConfig::from_json(&json)?
        }
        Err(_) => SweepConfig::default(),
    };

    let axes = vec![axis::int_range(0, 79), axis::int_range(0, 79)];
    let points: Vec<DataPoint<i64>> = [
        (0, 1, 11),
        (1, 3, 41),
        (2, 5, 71),
        (3, 7, 101),
        (4, 9, 131),
        (5, 11, 161),
        (6, 13, 191),
        (7, 15, 221),
        (8, 17, 251),
        (9, 19, 281),
    ]
    .iter()
    .map(|&(a, b, y)| DataPoint::new(vec![a, b, y]))
    .collect();

    let runner = SweepRunner::new(Arc::new(linear), axes, points, &config)?.with_progress(|p| {
        if p.phase == ProgressPhase::Aggregating || p.completed == p.total {
            info!("{p}");
        }
    });
    info!(
        "Sweeping {} param combinations with {} workers",
        runner.total_combinations(),
        runner.settings().worker_count
    );

    let report = runner.run()?;
    print!("{report}");
    info!(
        "Best of {} combinations found in {} ms",
        report.total_combinations,
        report.duration().num_milliseconds()
    );

    Ok(())
}
