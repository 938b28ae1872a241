use anyhow::Result;
use dynstream_bench::{BenchmarkConfig, StreamingBenchmark};
use dynstream_engine::logging::{init_logging, LoggingConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = BenchmarkConfig::from_env()?;
    let strategy = config.strategy;
    let (width, height) = (config.width, config.height);

    log::info!(
        "dynstream: {} points, batch {}, strategy {strategy}",
        config.num_points,
        config.batch_size,
    );

    let report = StreamingBenchmark::with_config(config)?.run(strategy.build(), width, height)?;

    println!("{report}");
    Ok(())
}
