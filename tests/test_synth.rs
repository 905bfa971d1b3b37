// tests/test_synth.rs — Motion-compensated synthesis.

use interframe::image::{Frame, FrameSize};
use interframe::motion::{MotionEstimator, MotionField, MotionParams, MotionVector};
use interframe::synth::FrameSynthesizer;

fn gradient(w: usize, h: usize) -> Frame {
    Frame::from_fn(w, h, |x, y| [(x * 5) as u8, (y * 7) as u8, ((x + y) * 3) as u8, 255])
}

fn uniform_field(size: FrameSize, params: &MotionParams, v: MotionVector) -> MotionField {
    let mut field = MotionField::new(size, params);
    for gy in 0..field.grid_height() {
        for gx in 0..field.grid_width() {
            field.set_offset(gx, gy, v);
        }
    }
    field
}

/// Deterministic noise frame (LCG), opaque. Shifted windows never score
/// below the default early-out threshold.
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

#[test]
fn identity_reproduces_previous_frame() {
    let prev = noise_frame(40, 24, 17);
    let params = MotionParams::default();
    let mut field = MotionField::new(prev.size(), &params);
    MotionEstimator::new(params).estimate(&prev, &prev, &mut field);

    let mut out = Frame::new(40, 24);
    FrameSynthesizer::new().synthesize(&prev, &field, &mut out);
    assert_eq!(out, prev);
}

#[test]
fn zero_field_reproduces_smooth_content() {
    let prev = gradient(40, 24);
    let field = MotionField::new(prev.size(), &MotionParams::default());
    let mut out = Frame::new(40, 24);
    FrameSynthesizer::new().synthesize(&prev, &field, &mut out);
    assert_eq!(out, prev);
}

#[test]
fn uniform_even_vector_is_a_half_shift() {
    // v = (2, -2): every pixel samples (px - 1, py + 1).
    let prev = gradient(32, 32);
    let params = MotionParams::default();
    let field = uniform_field(prev.size(), &params, MotionVector::new(2, -2));
    let mut out = Frame::new(32, 32);
    FrameSynthesizer::new().synthesize(&prev, &field, &mut out);

    for y in 0..31 {
        for x in 1..32 {
            assert_eq!(out.get(x, y), prev.get(x - 1, y + 1), "pixel ({x},{y})");
        }
    }
}

#[test]
fn samples_outside_the_frame_clamp_to_the_edge() {
    let prev = gradient(16, 16);
    let params = MotionParams::default();
    let field = uniform_field(prev.size(), &params, MotionVector::new(2, 2));
    let mut out = Frame::new(16, 16);
    FrameSynthesizer::new().synthesize(&prev, &field, &mut out);

    // (0,0) samples (-1,-1) → clamped to (0,0).
    assert_eq!(out.get(0, 0), prev.get(0, 0));
    // (5,0) samples (4,-1) → clamped to (4,0).
    assert_eq!(out.get(5, 0), prev.get(4, 0));
}

#[test]
fn no_blending_across_block_seams() {
    let prev = gradient(32, 16);
    let params = MotionParams::default();
    let mut field = MotionField::new(prev.size(), &params);
    field.set_offset(0, 0, MotionVector::new(2, 0));
    field.set_offset(1, 0, MotionVector::new(-2, 0));
    let mut out = Frame::new(32, 16);
    FrameSynthesizer::new().synthesize(&prev, &field, &mut out);

    // Last column of block 0 pulls from the left, first column of block 1
    // from the right.
    assert_eq!(out.get(15, 4), prev.get(14, 4));
    assert_eq!(out.get(16, 4), prev.get(17, 4));
}

#[test]
fn partial_edge_blocks_use_their_own_cell() {
    // 20×20 with B=16: pixels 16..20 belong to the partial blocks.
    let prev = gradient(20, 20);
    let params = MotionParams::default();
    let mut field = MotionField::new(prev.size(), &params);
    field.set_offset(1, 1, MotionVector::new(-2, -2));
    let mut out = Frame::new(20, 20);
    FrameSynthesizer::new().synthesize(&prev, &field, &mut out);

    assert_eq!(out.get(17, 17), prev.get(18, 18));
    assert_eq!(out.get(10, 10), prev.get(10, 10));
}
