use std::time::Duration;

use anyhow::{Context, Result};
use dynstream_engine::coords::ColorRgba;
use dynstream_engine::device::GpuInit;
use dynstream_engine::time::CostTimer;

use crate::strategy::StrategyKind;

/// Environment variable selecting the strategy by name.
pub const ENV_STRATEGY: &str = "DYNSTREAM_STRATEGY";
/// Environment variable overriding the point count.
pub const ENV_POINTS: &str = "DYNSTREAM_POINTS";
/// Environment variable overriding the update batch size.
pub const ENV_BATCH: &str = "DYNSTREAM_BATCH";
/// Environment variable fixing the RNG seed.
pub const ENV_SEED: &str = "DYNSTREAM_SEED";

/// Benchmark run parameters.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of simulated points.
    pub num_points: usize,

    /// Points per `update` call.
    pub batch_size: usize,

    pub width: u32,
    pub height: u32,

    /// Strategy the demo builds when none is passed explicitly.
    pub strategy: StrategyKind,

    /// Seed for the initial point set. `None` draws one from the OS.
    pub seed: Option<u64>,

    /// Minimum interval between window title refreshes.
    pub title_refresh: Duration,

    /// Frames per rolling average log line. `0` disables the periodic line.
    pub report_every: u64,

    pub point_color: ColorRgba,
    pub clear_color: ColorRgba,

    pub gpu: GpuInit,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            num_points: 10_000,
            batch_size: 1,
            width: 800,
            height: 600,
            strategy: StrategyKind::PersistentMapped,
            seed: None,
            title_refresh: Duration::from_millis(250),
            report_every: CostTimer::DEFAULT_REPORT_EVERY,
            point_color: ColorRgba::red(),
            clear_color: ColorRgba::white(),
            gpu: GpuInit::benchmark(),
        }
    }
}

impl BenchmarkConfig {
    /// Default configuration with selected process environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    ///
    /// Unset or blank variables leave the field untouched. A value that does not
    /// parse is an error naming the variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_STRATEGY) {
            self.strategy = v.parse().with_context(|| format!("invalid {ENV_STRATEGY}"))?;
        }
        if let Some(v) = get(ENV_POINTS) {
            self.num_points = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_POINTS}={v:?}"))?;
        }
        if let Some(v) = get(ENV_BATCH) {
            self.batch_size = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_BATCH}={v:?}"))?;
        }
        if let Some(v) = get(ENV_SEED) {
            self.seed = Some(
                v.trim()
                    .parse()
                    .with_context(|| format!("invalid {ENV_SEED}={v:?}"))?,
            );
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.num_points > 0, "point count must be positive");
        anyhow::ensure!(self.batch_size > 0, "update batch size must be positive");
        anyhow::ensure!(
            self.num_points <= u32::MAX as usize,
            "point count {} exceeds the drawable vertex range",
            self.num_points
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_reference_run() {
        let c = BenchmarkConfig::default();
        assert_eq!(c.num_points, 10_000);
        assert_eq!(c.batch_size, 1);
        assert_eq!((c.width, c.height), (800, 600));
        assert_eq!(c.strategy, StrategyKind::PersistentMapped);
        assert_eq!(c.report_every, 1000);
        assert_eq!(c.gpu.present_mode, wgpu::PresentMode::AutoNoVsync);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn overrides_replace_fields() {
        let mut c = BenchmarkConfig::default();
        c.apply_overrides(env(&[
            (ENV_STRATEGY, "map-unmap"),
            (ENV_POINTS, " 500 "),
            (ENV_BATCH, "64"),
            (ENV_SEED, "9"),
        ]))
        .unwrap();
        assert_eq!(c.strategy, StrategyKind::MapUnmapPerUpdate);
        assert_eq!(c.num_points, 500);
        assert_eq!(c.batch_size, 64);
        assert_eq!(c.seed, Some(9));
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut c = BenchmarkConfig::default();
        c.apply_overrides(env(&[(ENV_POINTS, "  ")])).unwrap();
        assert_eq!(c.num_points, 10_000);
    }

    #[test]
    fn unparsable_value_names_the_variable() {
        let mut c = BenchmarkConfig::default();
        let err = c.apply_overrides(env(&[(ENV_BATCH, "lots")])).unwrap_err();
        assert!(format!("{err:#}").contains(ENV_BATCH));
    }

    #[test]
    fn zero_batch_fails_validation() {
        let mut c = BenchmarkConfig::default();
        let err = c.apply_overrides(env(&[(ENV_BATCH, "0")])).unwrap_err();
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let mut c = BenchmarkConfig::default();
        assert!(c.apply_overrides(env(&[(ENV_STRATEGY, "bogus")])).is_err());
    }
}
