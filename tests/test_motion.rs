// tests/test_motion.rs — Block-matching motion estimation scenarios.

use interframe::capture::SyntheticCapture;
use interframe::image::{Frame, FrameSize};
use interframe::motion::{
    block_sad, candidate_offsets, normalize, MotionEstimator, MotionField, MotionParams, MotionVector,
};

/// Deterministic noise frame (LCG), opaque.
fn noise_frame(w: usize, h: usize, seed: u32) -> Frame {
    let mut rng = seed;
    Frame::from_fn(w, h, |_, _| {
        let mut px = [0u8, 0, 0, 255];
        for c in px.iter_mut().take(3) {
            rng = rng.wrapping_mul(1664525).wrapping_add(1013904223);
            *c = (rng >> 24) as u8;
        }
        px
    })
}

/// Frames n and n+1 of a scene drifting (dx, dy) px per frame.
fn shifted_pair(size: FrameSize, dx: i32, dy: i32) -> (Frame, Frame) {
    let scene = SyntheticCapture::unpaced(size).with_velocity(dx, dy);
    let (w, h) = (size.width as usize, size.height as usize);
    (
        Frame::from_rgba_bytes(w, h, &scene.render_frame(0)),
        Frame::from_rgba_bytes(w, h, &scene.render_frame(1)),
    )
}

fn window_in_bounds(size: FrameSize, bx: usize, by: usize, b: usize, v: MotionVector) -> bool {
    let sx = bx as i64 + v.dx as i64;
    let sy = by as i64 + v.dy as i64;
    sx >= 0 && sy >= 0 && sx + b as i64 <= size.width as i64 && sy + b as i64 <= size.height as i64
}

// ===== Scenarios =====

#[test]
fn identical_frames_give_zero_field() {
    let prev = noise_frame(64, 48, 11);
    let params = MotionParams::default();
    let mut field = MotionField::new(prev.size(), &params);
    MotionEstimator::new(params).estimate(&prev, &prev, &mut field);

    for gy in 0..field.grid_height() {
        for gx in 0..field.grid_width() {
            assert_eq!(field.offset(gx, gy), MotionVector::ZERO, "block ({gx},{gy})");
            assert_eq!(field.normalized(gx, gy), [0.5, 0.5]);
        }
    }
}

#[test]
fn shift_is_recovered_where_the_window_fits() {
    // 48×32 with B=16, R=3: the (2,1) window fits for the two top-left
    // blocks only. Block (2,0) would read past the right edge and the bottom
    // row past the bottom edge, so they never see the true offset.
    let size = FrameSize::new(48, 32);
    let (prev, curr) = shifted_pair(size, 2, 1);
    let params = MotionParams::default();
    let mut field = MotionField::new(size, &params);
    MotionEstimator::new(params).estimate(&prev, &curr, &mut field);

    assert_eq!(field.offset(0, 0), MotionVector::new(2, 1));
    assert_eq!(field.offset(1, 0), MotionVector::new(2, 1));
    let [x, y] = field.vector(1, 0);
    assert!((x - 2.0).abs() < 1e-5 && (y - 1.0).abs() < 1e-5);
}

#[test]
fn shift_is_recovered_on_interior_blocks_of_a_large_frame() {
    let size = FrameSize::new(128, 96);
    let (prev, curr) = shifted_pair(size, -3, 2);
    let params = MotionParams::default();
    let mut field = MotionField::new(size, &params);
    MotionEstimator::new(params).estimate(&prev, &curr, &mut field);

    let b = params.block_size;
    for gy in 0..field.grid_height() {
        for gx in 0..field.grid_width() {
            if window_in_bounds(size, gx * b, gy * b, b, MotionVector::new(-3, 2)) {
                assert_eq!(field.offset(gx, gy), MotionVector::new(-3, 2), "block ({gx},{gy})");
            }
        }
    }
}

#[test]
fn estimation_is_deterministic() {
    let prev = noise_frame(80, 56, 5);
    let curr = noise_frame(80, 56, 6);
    let params = MotionParams {
        early_out_threshold: 130.0,
        ..MotionParams::default()
    };
    let est = MotionEstimator::new(params);

    let mut a = MotionField::new(prev.size(), &params);
    let mut b = MotionField::new(prev.size(), &params);
    est.estimate(&prev, &curr, &mut a);
    est.estimate(&prev, &curr, &mut b);
    assert_eq!(a, b);
}

#[test]
fn field_is_fully_rewritten_every_call() {
    let size = FrameSize::new(48, 48);
    let (prev, curr) = shifted_pair(size, 1, 1);
    let params = MotionParams::default();
    let est = MotionEstimator::new(params);
    let mut field = MotionField::new(size, &params);

    est.estimate(&prev, &curr, &mut field);
    assert_ne!(field.offset(1, 1), MotionVector::ZERO);

    est.estimate(&curr, &curr, &mut field);
    assert!(field.as_slice().iter().all(|&c| c == [0.5, 0.5]));
}

#[test]
fn smooth_identical_content_accepts_first_in_bounds_candidate() {
    // Neighbouring windows of a gentle gradient already score below the
    // default threshold, so the scan stops at the first candidate that fits
    // instead of reaching (0, 0).
    let prev = Frame::from_fn(40, 24, |x, y| {
        [(x * 5) as u8, (y * 7) as u8, ((x + y) * 3) as u8, 255]
    });
    let est = MotionEstimator::new(MotionParams::default());
    let m = est.estimate_block(&prev, &prev, 16, 0);
    assert!(m.early_out);
    assert_eq!(m.visited, 1);
    assert_eq!(m.offset, MotionVector::new(-3, 0));
    assert!(m.sad.unwrap() < 100.0);

    // With early-out disabled the exact match wins.
    let est = MotionEstimator::new(MotionParams {
        early_out_threshold: 0.0,
        ..MotionParams::default()
    });
    assert_eq!(est.estimate_block(&prev, &prev, 16, 0).offset, MotionVector::ZERO);
}

// ===== Boundary safety =====

#[test]
fn every_offset_stays_in_bounds() {
    for &(w, h, b, r) in &[(37usize, 23usize, 8usize, 4u32), (50, 50, 16, 3), (17, 40, 16, 6), (9, 9, 4, 2)] {
        let prev = noise_frame(w, h, w as u32);
        let curr = noise_frame(w, h, h as u32);
        let params = MotionParams {
            block_size: b,
            search_radius: r,
            early_out_threshold: 0.0,
        };
        let size = prev.size();
        let mut field = MotionField::new(size, &params);
        let est = MotionEstimator::new(params);
        est.estimate(&prev, &curr, &mut field);

        assert_eq!(field.grid_width(), w.div_ceil(b));
        assert_eq!(field.grid_height(), h.div_ceil(b));
        for gy in 0..field.grid_height() {
            for gx in 0..field.grid_width() {
                let (bx, by) = (gx * b, gy * b);
                let m = est.estimate_block(&prev, &curr, bx, by);
                let expected_visited = if bx + b <= w && by + b <= h {
                    candidate_offsets(r)
                        .filter(|&v| window_in_bounds(size, bx, by, b, v))
                        .count()
                } else {
                    0
                };
                assert_eq!(m.visited, expected_visited, "{w}×{h} B={b} block ({gx},{gy})");
                if m.visited == 0 {
                    assert_eq!(m.offset, MotionVector::ZERO);
                } else {
                    assert!(window_in_bounds(size, bx, by, b, m.offset));
                }
                assert_eq!(field.offset(gx, gy), m.offset);
            }
        }
    }
}

#[test]
fn frame_smaller_than_one_block() {
    let prev = noise_frame(10, 6, 1);
    let params = MotionParams::default();
    let mut field = MotionField::new(prev.size(), &params);
    MotionEstimator::new(params).estimate(&prev, &noise_frame(10, 6, 2), &mut field);
    assert_eq!((field.grid_width(), field.grid_height()), (1, 1));
    assert_eq!(field.offset(0, 0), MotionVector::ZERO);
}

// ===== Early-out =====

#[test]
fn early_out_accepts_first_sub_threshold_candidate_in_scan_order() {
    let prev = noise_frame(64, 64, 21);
    let curr = noise_frame(64, 64, 22);
    let (bx, by, b) = (16usize, 32usize, 16usize);
    let r = 3;

    // Brute-force SADs in scan order.
    let sads: Vec<(MotionVector, f32)> = candidate_offsets(r)
        .map(|v| {
            let sx = (bx as i32 + v.dx) as usize;
            let sy = (by as i32 + v.dy) as usize;
            (v, block_sad(&prev, &curr, bx, by, sx, sy, b))
        })
        .collect();

    // Pick a threshold that some, but not all, candidates beat.
    let mut sorted: Vec<f32> = sads.iter().map(|&(_, s)| s).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let threshold = sorted[sorted.len() / 2];

    let est = MotionEstimator::new(MotionParams {
        block_size: b,
        search_radius: r,
        early_out_threshold: threshold,
    });
    let m = est.estimate_block(&prev, &curr, bx, by);

    let first = sads.iter().position(|&(_, s)| s < threshold).unwrap();
    assert!(m.early_out);
    assert_eq!(m.offset, sads[first].0);
    assert_eq!(m.visited, first + 1);
    assert!(m.sad.unwrap() < threshold);
}

#[test]
fn without_early_out_the_global_minimum_wins() {
    let prev = noise_frame(64, 64, 31);
    let curr = noise_frame(64, 64, 32);
    let (bx, by, b) = (16usize, 16usize, 16usize);
    let est = MotionEstimator::new(MotionParams {
        early_out_threshold: 0.0,
        ..MotionParams::default()
    });
    let m = est.estimate_block(&prev, &curr, bx, by);

    let mut best: Option<(MotionVector, f32)> = None;
    for v in candidate_offsets(3) {
        let s = block_sad(&prev, &curr, bx, by, (16 + v.dx) as usize, (16 + v.dy) as usize, b);
        if best.map_or(true, |(_, min)| s < min) {
            best = Some((v, s));
        }
    }
    let (v, s) = best.unwrap();
    assert!(!m.early_out);
    assert_eq!(m.visited, 49);
    assert_eq!(m.offset, v);
    assert_eq!(m.sad, Some(s));
}

#[test]
fn early_out_never_visits_more_than_the_full_window() {
    let prev = noise_frame(48, 48, 41);
    let curr = noise_frame(48, 48, 42);
    for threshold in [0.0, 50.0, 200.0, 1000.0] {
        let est = MotionEstimator::new(MotionParams {
            early_out_threshold: threshold,
            ..MotionParams::default()
        });
        let m = est.estimate_block(&prev, &curr, 16, 16);
        assert!(m.visited <= 49);
        if threshold >= 1000.0 {
            // Every SAD is below 768, so the very first candidate wins.
            assert_eq!(m.visited, 1);
            assert_eq!(m.offset, MotionVector::new(-3, -3));
        }
    }
}

// ===== Normalization =====

#[test]
fn normalized_cells_stay_in_unit_square() {
    let size = FrameSize::new(96, 64);
    let (prev, curr) = shifted_pair(size, 3, -3);
    let params = MotionParams::default();
    let mut field = MotionField::new(size, &params);
    MotionEstimator::new(params).estimate(&prev, &curr, &mut field);
    for &[x, y] in field.as_slice() {
        assert!((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y));
    }
    assert!(field.as_slice().contains(&normalize(MotionVector::new(3, -3), 3)));
}
