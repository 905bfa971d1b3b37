// benches/benchmarks.rs -- Per-stage and full-cycle CPU benchmarks.
//
//   cargo bench
//
// Frames come from the synthetic drifting scene, so every block has a true
// match inside the search window and the early-out path is exercised the
// way a panning desktop would exercise it.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use interframe::capture::SyntheticCapture;
use interframe::generator::{CpuFrameGenerator, FrameGenerator};
use interframe::image::{Frame, FrameSize};
use interframe::motion::{MotionEstimator, MotionField, MotionParams};
use interframe::synth::FrameSynthesizer;

// ============================================================
// Helpers
// ============================================================

const SIZES: [(u32, u32); 3] = [(640, 360), (1280, 720), (1920, 1080)];

/// Frames n and n+1 of the synthetic scene.
fn frame_pair(size: FrameSize) -> (Frame, Frame) {
    let scene = SyntheticCapture::unpaced(size).with_velocity(2, 1);
    let (w, h) = (size.width as usize, size.height as usize);
    (
        Frame::from_rgba_bytes(w, h, &scene.render_frame(0)),
        Frame::from_rgba_bytes(w, h, &scene.render_frame(1)),
    )
}

// ============================================================
// Per-stage benchmarks
// ============================================================

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate");
    for (w, h) in SIZES {
        let size = FrameSize::new(w, h);
        let (prev, curr) = frame_pair(size);
        let params = MotionParams::default();
        let est = MotionEstimator::new(params);
        let mut field = MotionField::new(size, &params);
        group.bench_with_input(BenchmarkId::new("early_out", size), &size, |b, _| {
            b.iter(|| est.estimate(&prev, &curr, &mut field))
        });

        // Exhaustive scan for comparison.
        let exhaustive = MotionParams {
            early_out_threshold: 0.0,
            ..params
        };
        let est = MotionEstimator::new(exhaustive);
        group.bench_with_input(BenchmarkId::new("exhaustive", size), &size, |b, _| {
            b.iter(|| est.estimate(&prev, &curr, &mut field))
        });
    }
    group.finish();
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    for (w, h) in SIZES {
        let size = FrameSize::new(w, h);
        let (prev, curr) = frame_pair(size);
        let params = MotionParams::default();
        let mut field = MotionField::new(size, &params);
        MotionEstimator::new(params).estimate(&prev, &curr, &mut field);
        let mut out = Frame::new(w as usize, h as usize);
        let synth = FrameSynthesizer::new();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| synth.synthesize(&prev, &field, &mut out))
        });
    }
    group.finish();
}

// ============================================================
// Full cycle: ingest → estimate → synthesize
// ============================================================

fn bench_cycle(c: &mut Criterion) {
    let size = FrameSize::new(1280, 720);
    let scene = SyntheticCapture::unpaced(size);
    let captures: Vec<Vec<u8>> = (0..8).map(|n| scene.render_frame(n)).collect();
    let mut gen = CpuFrameGenerator::new(size, MotionParams::default()).expect("generator");

    let mut n = 0;
    c.bench_function("cpu_cycle_1280x720", |b| {
        b.iter(|| {
            gen.advance(&captures[n % captures.len()]).expect("advance");
            gen.generate().expect("generate");
            n += 1;
        })
    });
}

// ============================================================
// Register
// ============================================================

criterion_group!(benches, bench_estimate, bench_synthesize, bench_cycle);
criterion_main!(benches);
