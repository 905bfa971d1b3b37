// synth.rs — Motion-compensated intermediate frame synthesis (CPU reference).
//
// Each output pixel looks up the vector of the block that owns it and pulls
// colour from the previous frame half-way back along that vector:
//
//   sample = (px, py) − 0.5 · v
//
// There is no blending across block seams. Edges clamp, so pixels whose
// sample point leaves the frame repeat the border colour.
//
// TEXEL ADDRESSING
// ────────────────
// Texel centres sit at integer pixel coordinates, so `sample` is used as is
// and a zero vector copies `previous` bit-exactly. This is chosen over
// corner addressing (sampling at p / size in texture space), which would
// blur by half a texel. The GPU kernel matches it by sampling at
// (p + 0.5) / size.

use crate::image::{quantize_rgba, sample_bilinear, Frame};
use crate::motion::MotionField;

/// Resamples the previous frame along a motion field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameSynthesizer;

impl FrameSynthesizer {
    pub fn new() -> Self {
        FrameSynthesizer
    }

    /// Overwrite every pixel of `output` with the interpolated frame.
    ///
    /// # Panics
    /// Panics if `output` and `previous` differ in size, or if `field` was
    /// not built for this frame size.
    pub fn synthesize(&self, previous: &Frame, field: &MotionField, output: &mut Frame) {
        assert_eq!(previous.size(), output.size(), "previous/output size mismatch");
        assert_eq!(
            field.frame_size(),
            previous.size(),
            "motion field grid does not cover the frame"
        );

        let b = field.block_size();
        for py in 0..output.height() {
            let gy = py / b;
            let row = output.row_mut(py);
            for (px, dst) in row.iter_mut().enumerate() {
                let [vx, vy] = field.vector(px / b, gy);
                let sx = px as f32 - 0.5 * vx;
                let sy = py as f32 - 0.5 * vy;
                *dst = quantize_rgba(sample_bilinear(previous, sx, sy));
            }
        }
    }
}
