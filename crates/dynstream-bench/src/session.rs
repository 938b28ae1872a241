use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use dynstream_engine::device::GpuContext;
use dynstream_engine::time::{as_millis, CostTimer};

use crate::batch::BatchPlan;
use crate::buffer::PositionBuffer;
use crate::points::PointSet;
use crate::strategy::BufferUpdateStrategy;

/// One benchmark run without the window: points, buffer, strategy and timer.
///
/// `begin` runs the strategy's `init`, each `step` is one simulated frame up to
/// (not including) the draw, and `finish` shuts the strategy down before the
/// buffer is released.
pub struct StreamSession {
    points: PointSet,
    plan: BatchPlan,
    buffer: PositionBuffer,
    strategy: Box<dyn BufferUpdateStrategy>,
    timer: CostTimer,
    frames: u64,
}

impl StreamSession {
    pub fn begin(
        gpu: &GpuContext,
        points: PointSet,
        batch_size: usize,
        mut strategy: Box<dyn BufferUpdateStrategy>,
        report_every: u64,
    ) -> Result<Self> {
        let plan = BatchPlan::new(points.len(), batch_size)?;
        let mut buffer = PositionBuffer::new(points.len());
        buffer.check_fits(&gpu.device().limits())?;

        strategy
            .init(gpu, &mut buffer, points.positions())
            .with_context(|| format!("{}: init failed", strategy.name()))?;

        log::info!(
            "{}: streaming {} points in {} batches of {}",
            strategy.name(),
            plan.len(),
            plan.batch_count(),
            plan.batch_size(),
        );

        Ok(Self {
            points,
            plan,
            buffer,
            strategy,
            timer: CostTimer::with_report_interval("update cost", report_every),
            frames: 0,
        })
    }

    /// Integrates the points by `dt` seconds and streams every batch to the buffer.
    ///
    /// Returns the measured cost of the batch updates plus the strategy flush.
    pub fn step(&mut self, gpu: &GpuContext, dt: f32) -> Result<Duration> {
        self.points.integrate(dt);

        self.timer.start();
        let positions = self.points.positions();
        for range in &self.plan {
            self.strategy
                .update(gpu, &self.buffer, positions, range)
                .with_context(|| {
                    format!("{}: update [{}, {}) failed", self.strategy.name(), range.start, range.end)
                })?;
        }
        self.strategy
            .flush(gpu, &self.buffer)
            .with_context(|| format!("{}: flush failed", self.strategy.name()))?;
        let cost = self.timer.stop();

        self.frames += 1;
        Ok(cost)
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn buffer(&self) -> &PositionBuffer {
        &self.buffer
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn timer(&self) -> &CostTimer {
        &self.timer
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Shuts the strategy down, then releases the buffer.
    pub fn finish(mut self, gpu: &GpuContext) -> BenchmarkReport {
        self.strategy.shutdown(gpu);
        self.buffer.release();

        BenchmarkReport {
            strategy: self.strategy.name(),
            points: self.plan.len(),
            batch_size: self.plan.batch_size(),
            batches_per_frame: self.plan.batch_count(),
            frames: self.frames,
            average_update: self.timer.average(),
            total_update: self.timer.total(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub strategy: &'static str,
    pub points: usize,
    pub batch_size: usize,
    pub batches_per_frame: usize,
    pub frames: u64,

    /// Mean per-frame cost of the update step.
    pub average_update: Duration,
    pub total_update: Duration,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} points, batch {} ({} per frame), {} frames, avg update cost {:.4} ms",
            self.strategy,
            self.points,
            self.batch_size,
            self.batches_per_frame,
            self.frames,
            as_millis(self.average_update),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_display_includes_average_in_millis() {
        let report = BenchmarkReport {
            strategy: "replace-whole",
            points: 10,
            batch_size: 3,
            batches_per_frame: 4,
            frames: 2,
            average_update: Duration::from_micros(1500),
            total_update: Duration::from_millis(3),
        };
        let s = report.to_string();
        assert!(s.starts_with("replace-whole: 10 points, batch 3 (4 per frame)"));
        assert!(s.ends_with("avg update cost 1.5000 ms"));
    }
}
