use std::time::Instant;

use anyhow::{Context, Result};
use dynstream_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use dynstream_engine::device::Gpu;
use dynstream_engine::time::as_millis;
use dynstream_engine::window::{Runtime, RuntimeConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::BenchmarkConfig;
use crate::points::PointSet;
use crate::render::PointRenderer;
use crate::session::{BenchmarkReport, StreamSession};
use crate::strategy::BufferUpdateStrategy;

/// Windowed benchmark: simulates, streams, draws and times until the window closes.
#[derive(Debug, Clone)]
pub struct StreamingBenchmark {
    config: BenchmarkConfig,
}

impl StreamingBenchmark {
    /// Default configuration with the given point count and batch size.
    ///
    /// Both must be positive. A batch size larger than the point count yields
    /// a single batch.
    pub fn configure(num_points: usize, batch_size: usize) -> Result<Self> {
        Self::with_config(BenchmarkConfig {
            num_points,
            batch_size,
            ..BenchmarkConfig::default()
        })
    }

    pub fn with_config(config: BenchmarkConfig) -> Result<Self> {
        config.validate().context("invalid benchmark configuration")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Opens a `width` x `height` window and runs `strategy` until it is closed.
    ///
    /// If the window or GPU context can not be created, the error is returned
    /// and no strategy method has been called.
    pub fn run(
        &self,
        strategy: Box<dyn BufferUpdateStrategy>,
        width: u32,
        height: u32,
    ) -> Result<BenchmarkReport> {
        anyhow::ensure!(width > 0 && height > 0, "viewport must not be empty ({width}x{height})");

        let title = format!("dynstream | {}", strategy.name());
        let app = BenchApp::new(self.config.clone(), strategy, title.clone());

        let app = Runtime::run(
            RuntimeConfig::new(title, width, height),
            self.config.gpu.clone(),
            app,
        )?;
        app.into_report()
    }
}

struct BenchApp {
    config: BenchmarkConfig,
    title: String,

    pending: Option<Box<dyn BufferUpdateStrategy>>,
    session: Option<StreamSession>,
    renderer: PointRenderer,

    title_since: Option<Instant>,
    title_frames: u32,

    report: Option<BenchmarkReport>,
    error: Option<anyhow::Error>,
}

impl BenchApp {
    fn new(config: BenchmarkConfig, strategy: Box<dyn BufferUpdateStrategy>, title: String) -> Self {
        let renderer = PointRenderer::new(config.point_color);
        Self {
            config,
            title,
            pending: Some(strategy),
            session: None,
            renderer,
            title_since: None,
            title_frames: 0,
            report: None,
            error: None,
        }
    }

    fn into_report(self) -> Result<BenchmarkReport> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.report
            .context("benchmark ended before its window was created")
    }

    /// Shows frames per second over the last refresh interval in the title.
    fn refresh_title(&mut self, window: &WindowCtx<'_>, now: Instant, last_cost: f64) {
        self.title_frames += 1;

        let since = *self.title_since.get_or_insert(now);
        let elapsed = now.duration_since(since);
        if elapsed < self.config.title_refresh {
            return;
        }

        let fps = self.title_frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        window.set_title(&format!("{} | {fps:.0} fps | update {last_cost:.4} ms", self.title));

        self.title_since = Some(now);
        self.title_frames = 0;
    }
}

impl App for BenchApp {
    fn on_start(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> Result<()> {
        let strategy = self
            .pending
            .take()
            .context("benchmark strategy already consumed")?;

        let info = gpu.context().adapter().get_info();
        let (width, height) = window.physical_size();
        log::info!(
            "{}: {width}x{height} on {} ({:?}, {:?})",
            self.title,
            info.name,
            info.backend,
            gpu.surface_format(),
        );

        let seed = self.config.seed.unwrap_or_else(rand::random);
        log::info!("point seed: {seed}");
        let points = PointSet::random(self.config.num_points, &mut StdRng::seed_from_u64(seed));

        self.session = Some(StreamSession::begin(
            gpu.context(),
            points,
            self.config.batch_size,
            strategy,
            self.config.report_every,
        )?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(session) = self.session.as_mut() else {
            return AppControl::Exit;
        };

        let cost = match session.step(ctx.gpu.context(), ctx.time.dt) {
            Ok(cost) => cost,
            Err(err) => {
                log::error!("{err:#}");
                self.error = Some(err);
                return AppControl::Exit;
            }
        };

        let renderer = &mut self.renderer;
        let buffer = session.buffer();
        let control = ctx.render(self.config.clear_color, |rctx, target| {
            renderer.render(rctx, target, buffer);
        });

        self.refresh_title(&ctx.window, ctx.time.now, as_millis(cost));
        control
    }

    fn on_exit(&mut self, gpu: &Gpu<'_>) {
        let Some(session) = self.session.take() else { return };
        let report = session.finish(gpu.context());
        log::info!("{report}");
        self.report = Some(report);
    }
}
