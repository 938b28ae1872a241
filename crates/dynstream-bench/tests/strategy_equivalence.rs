//! Device-backed checks that every strategy leaves the same bytes in the buffer.
//!
//! Each test returns early when no adapter is available.

use dynstream_bench::strategy::{BufferUpdateStrategy, PersistentMapped};
use dynstream_bench::{BatchRange, PointSet, PositionBuffer, StrategyKind, StreamSession};
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn gpu() -> Option<GpuContext> {
    match GpuContext::headless_blocking() {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping: no GPU adapter ({err:#})");
            None
        }
    }
}

fn seeded_points(len: usize) -> PointSet {
    PointSet::random(len, &mut StdRng::seed_from_u64(3))
}

fn run_frames(gpu: &GpuContext, kind: StrategyKind, len: usize, batch: usize, frames: u32) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut session = StreamSession::begin(gpu, seeded_points(len), batch, kind.build(), 0).unwrap();
    for _ in 0..frames {
        session.step(gpu, 0.5).unwrap();
    }
    let cpu = session.points().positions().to_vec();
    let device = session.buffer().read_back(gpu).unwrap();

    let report = session.finish(gpu);
    assert_eq!(report.frames, frames as u64);
    (cpu, device)
}

#[test]
fn initial_upload_matches_points() {
    let Some(gpu) = gpu() else { return };

    for kind in StrategyKind::ALL {
        let (cpu, device) = run_frames(&gpu, kind, 37, 5, 0);
        assert_eq!(device, cpu, "{kind} initial contents");
    }
}

#[test]
fn buffer_follows_simulation_for_every_strategy() {
    let Some(gpu) = gpu() else { return };

    for kind in StrategyKind::ALL {
        for batch in [1, 4, 5, 37, 100] {
            let (cpu, device) = run_frames(&gpu, kind, 37, batch, 4);
            assert_eq!(device, cpu, "{kind} with batch {batch}");
        }
    }
}

#[test]
fn strategies_produce_identical_bytes() {
    let Some(gpu) = gpu() else { return };

    let results: Vec<Vec<Vec3>> = StrategyKind::ALL
        .iter()
        .map(|&kind| run_frames(&gpu, kind, 250, 7, 6).1)
        .collect();

    let bytes = |v: &Vec<Vec3>| bytemuck::cast_slice::<Vec3, u8>(v).to_vec();
    assert_eq!(bytes(&results[0]), bytes(&results[1]));
    assert_eq!(bytes(&results[1]), bytes(&results[2]));
}

#[test]
fn disjoint_ranges_leave_the_gap_untouched() {
    let Some(gpu) = gpu() else { return };

    let before: Vec<Vec3> = (0..10).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let after: Vec<Vec3> = (0..10).map(|i| Vec3::new(i as f32, 1.0, -1.0)).collect();

    for kind in StrategyKind::ALL {
        let mut strategy = kind.build();
        let mut buffer = PositionBuffer::new(before.len());
        assert!(!buffer.is_allocated());
        strategy.init(&gpu, &mut buffer, &before).unwrap();
        assert!(buffer.is_allocated(), "{kind} left the buffer unallocated");

        strategy.update(&gpu, &buffer, &after, BatchRange::new(2, 4)).unwrap();
        strategy.update(&gpu, &buffer, &after, BatchRange::new(7, 9)).unwrap();
        strategy.flush(&gpu, &buffer).unwrap();

        let device = buffer.read_back(&gpu).unwrap();
        for (i, p) in device.iter().enumerate() {
            let expected = if (2..4).contains(&i) || (7..9).contains(&i) { after[i] } else { before[i] };
            assert_eq!(*p, expected, "{kind} index {i}");
        }

        strategy.shutdown(&gpu);
        buffer.release();
        assert!(!buffer.is_allocated());
    }
}

#[test]
fn persistent_mapping_coalesces_adjacent_batches() {
    let Some(gpu) = gpu() else { return };

    let points = seeded_points(9);
    let mut strategy = PersistentMapped::new();
    let mut buffer = PositionBuffer::new(points.len());
    strategy.init(&gpu, &mut buffer, points.positions()).unwrap();
    assert!(strategy.pending().is_empty());

    for start in [0, 3, 6] {
        strategy
            .update(&gpu, &buffer, points.positions(), BatchRange::new(start, start + 3))
            .unwrap();
    }
    assert_eq!(strategy.pending(), &[BatchRange::new(0, 9)]);

    strategy.flush(&gpu, &buffer).unwrap();
    assert!(strategy.pending().is_empty());

    strategy.shutdown(&gpu);
    buffer.release();
}
