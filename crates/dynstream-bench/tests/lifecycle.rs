use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use anyhow::Result;
use dynstream_bench::{
    BatchRange, BufferUpdateStrategy, Lifecycle, PointSet, PositionBuffer, StrategyKind, StreamSession,
};
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;

fn gpu() -> Option<GpuContext> {
    match GpuContext::headless_blocking() {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping: no GPU adapter ({err:#})");
            None
        }
    }
}

fn positions() -> Vec<Vec3> {
    (0..6).map(|i| Vec3::new(0.1 * i as f32, -0.1 * i as f32, 0.0)).collect()
}

#[test]
fn update_is_rejected_before_init() {
    let Some(gpu) = gpu() else { return };
    let positions = positions();

    for kind in StrategyKind::ALL {
        let mut strategy = kind.build();
        let buffer = PositionBuffer::new(positions.len());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = strategy.update(&gpu, &buffer, &positions, BatchRange::new(0, 2));
        }));
        assert!(result.is_err(), "{kind} accepted update before init");
    }
}

#[test]
fn update_is_rejected_after_shutdown() {
    let Some(gpu) = gpu() else { return };
    let positions = positions();

    for kind in StrategyKind::ALL {
        let mut strategy = kind.build();
        let mut buffer = PositionBuffer::new(positions.len());

        strategy.init(&gpu, &mut buffer, &positions).unwrap();
        assert_eq!(strategy.lifecycle(), Lifecycle::Initialized);
        strategy.update(&gpu, &buffer, &positions, BatchRange::new(0, 6)).unwrap();
        strategy.flush(&gpu, &buffer).unwrap();
        strategy.shutdown(&gpu);
        assert_eq!(strategy.lifecycle(), Lifecycle::Shutdown);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = strategy.update(&gpu, &buffer, &positions, BatchRange::new(0, 2));
        }));
        assert!(result.is_err(), "{kind} accepted update after shutdown");

        buffer.release();
    }
}

#[test]
fn malformed_range_is_rejected() {
    let Some(gpu) = gpu() else { return };
    let positions = positions();

    for kind in StrategyKind::ALL {
        let mut strategy = kind.build();
        let mut buffer = PositionBuffer::new(positions.len());
        strategy.init(&gpu, &mut buffer, &positions).unwrap();

        for range in [BatchRange::new(3, 3), BatchRange::new(4, 7)] {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                let _ = strategy.update(&gpu, &buffer, &positions, range);
            }));
            assert!(result.is_err(), "{kind} accepted {range:?}");
        }

        strategy.shutdown(&gpu);
        buffer.release();
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Init(usize),
    Update(usize, usize),
    Flush,
    Shutdown,
}

/// Records every call the session makes; touches no device state.
struct Recording {
    lifecycle: Lifecycle,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl Recording {
    const NAME: &'static str = "recording";

    fn new() -> (Self, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let strategy = Self {
            lifecycle: Lifecycle::default(),
            calls: Rc::clone(&calls),
        };
        (strategy, calls)
    }
}

impl BufferUpdateStrategy for Recording {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn init(&mut self, _gpu: &GpuContext, _buffer: &mut PositionBuffer, positions: &[Vec3]) -> Result<()> {
        self.lifecycle.begin(Self::NAME);
        self.calls.borrow_mut().push(Call::Init(positions.len()));
        Ok(())
    }

    fn update(
        &mut self,
        _gpu: &GpuContext,
        _buffer: &PositionBuffer,
        positions: &[Vec3],
        range: BatchRange,
    ) -> Result<()> {
        self.lifecycle.assert_initialized(Self::NAME, "update");
        range.assert_within(positions.len());
        self.calls.borrow_mut().push(Call::Update(range.start, range.end));
        Ok(())
    }

    fn flush(&mut self, _gpu: &GpuContext, _buffer: &PositionBuffer) -> Result<()> {
        self.lifecycle.assert_initialized(Self::NAME, "flush");
        self.calls.borrow_mut().push(Call::Flush);
        Ok(())
    }

    fn shutdown(&mut self, _gpu: &GpuContext) {
        self.lifecycle.end(Self::NAME);
        self.calls.borrow_mut().push(Call::Shutdown);
    }
}

fn still_points(len: usize) -> PointSet {
    PointSet::from_parts(vec![Vec3::zero(); len], vec![Vec3::zero(); len])
}

#[test]
fn session_dispatches_batches_in_order_then_flushes() {
    let Some(gpu) = gpu() else { return };
    let (strategy, calls) = Recording::new();

    let mut session = StreamSession::begin(&gpu, still_points(5), 2, Box::new(strategy), 0).unwrap();
    assert_eq!(*calls.borrow(), vec![Call::Init(5)]);

    let frame = [Call::Update(0, 2), Call::Update(2, 4), Call::Update(4, 5), Call::Flush];

    session.step(&gpu, 0.1).unwrap();
    assert_eq!(calls.borrow()[1..], frame);

    session.step(&gpu, 0.1).unwrap();
    let report = session.finish(&gpu);
    assert_eq!(report.frames, 2);
    assert_eq!(report.batches_per_frame, 3);

    let mut expected = vec![Call::Init(5)];
    expected.extend(frame.iter().cloned());
    expected.extend(frame.iter().cloned());
    expected.push(Call::Shutdown);
    assert_eq!(*calls.borrow(), expected);
}

#[test]
fn oversized_buffer_is_an_error_before_init() {
    let limits = wgpu::Limits {
        max_buffer_size: 4096,
        ..wgpu::Limits::default()
    };
    let gpu = match pollster::block_on(GpuContext::headless_with_limits(limits)) {
        Ok(gpu) => gpu,
        Err(err) => {
            eprintln!("skipping: no GPU adapter ({err:#})");
            return;
        }
    };
    let (strategy, calls) = Recording::new();

    // 400 points need 4800 bytes.
    let result = StreamSession::begin(&gpu, still_points(400), 16, Box::new(strategy), 0);
    let err = match result {
        Ok(_) => panic!("oversized buffer was accepted"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("buffer limit"), "{err:#}");
    assert!(calls.borrow().is_empty(), "strategy was called: {:?}", calls.borrow());
}

#[test]
fn oversized_buffer_is_rejected_for_real_strategies() {
    let limits = wgpu::Limits {
        max_buffer_size: 4096,
        ..wgpu::Limits::default()
    };
    let Ok(gpu) = pollster::block_on(GpuContext::headless_with_limits(limits)) else {
        return;
    };

    for kind in StrategyKind::ALL {
        let result = StreamSession::begin(&gpu, still_points(400), 16, kind.build(), 0);
        assert!(result.is_err(), "{kind} accepted an oversized buffer");
    }
}
