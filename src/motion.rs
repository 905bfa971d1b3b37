// motion.rs — Block-matching motion estimation (CPU reference).
//
// For every B×B block of the previous frame, search the current frame for
// the best-matching window within ±R pixels and record the offset.
//
//   previous                     current
//   ┌────┬────┬────┐             ┌────┬────┬────┐
//   │    │ ▣  │    │   (dx,dy)   │    │   ▣│    │
//   ├────┼────┼────┤   ───────►  ├────┼────┼────┤
//   │    │    │    │             │    │    │    │
//   └────┴────┴────┘             └────┴────┴────┘
//   reference block at (bx,by)   search window at (bx+dx, by+dy)
//
// SCAN ORDER AND EARLY-OUT
// ────────────────────────
// Candidates are visited row-major: dy outer, dx inner, both ascending from
// -R to +R. The first candidate whose SAD drops below the early-out
// threshold is accepted immediately, so the result is NOT necessarily the
// global minimum. The scan order therefore decides which offset wins, and
// the GPU kernel (shaders/motion.wgsl) walks the exact same sequence.
//
// BOUNDARIES
// ──────────
// A candidate whose window would read outside the frame does not exist:
// it is skipped, never penalized. A block that cannot visit any candidate
// (partial edge block, or a frame smaller than one block) gets the zero
// vector.
//
// STORAGE
// ───────
// Offsets are stored normalized to [0,1]² so the field fits an unorm
// texture:  v_norm = (v / R) · 0.5 + 0.5,   v = (v_norm − 0.5) · 2 · R.

use std::ops::ControlFlow;

use crate::error::{Error, Result};
use crate::image::{Frame, FrameSize, Image};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Tuning constants shared by the estimator, the synthesizer and the GPU
/// kernels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Block edge length B in pixels.
    pub block_size: usize,
    /// Search radius R in pixels. Offsets range over [-R, R] on each axis.
    pub search_radius: u32,
    /// SAD below which a candidate is accepted without scanning further.
    /// SAD is measured on [0,1] channels, so a 16×16 block ranges 0..=768.
    pub early_out_threshold: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        MotionParams {
            block_size: 16,
            search_radius: 3,
            early_out_threshold: 100.0,
        }
    }
}

impl MotionParams {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::Config("block size must be at least 1".into()));
        }
        if self.search_radius == 0 {
            return Err(Error::Config(
                "search radius must be at least 1 (it is the normalization divisor)".into(),
            ));
        }
        if !self.early_out_threshold.is_finite() || self.early_out_threshold < 0.0 {
            return Err(Error::Config(format!(
                "early-out threshold must be finite and non-negative, got {}",
                self.early_out_threshold
            )));
        }
        Ok(())
    }

    /// Motion-field grid dimensions for a frame: ceil(w/B) × ceil(h/B).
    pub fn grid_size(&self, frame: FrameSize) -> (usize, usize) {
        let b = self.block_size;
        (
            (frame.width as usize).div_ceil(b),
            (frame.height as usize).div_ceil(b),
        )
    }
}

// ---------------------------------------------------------------------------
// Motion vectors
// ---------------------------------------------------------------------------

/// An integer block displacement in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MotionVector {
    pub dx: i32,
    pub dy: i32,
}

impl MotionVector {
    pub const ZERO: MotionVector = MotionVector { dx: 0, dy: 0 };

    pub const fn new(dx: i32, dy: i32) -> Self {
        MotionVector { dx, dy }
    }
}

/// Map an offset in [-R, R]² to [0, 1]².
#[inline]
pub fn normalize(v: MotionVector, search_radius: u32) -> [f32; 2] {
    let r = search_radius as f32;
    [
        (v.dx as f32 / r) * 0.5 + 0.5,
        (v.dy as f32 / r) * 0.5 + 0.5,
    ]
}

/// Inverse of [`normalize`]: a [0, 1]² cell back to pixel units.
#[inline]
pub fn denormalize(n: [f32; 2], search_radius: u32) -> [f32; 2] {
    let r = search_radius as f32;
    [(n[0] - 0.5) * 2.0 * r, (n[1] - 0.5) * 2.0 * r]
}

/// All candidate offsets in scan order: dy outer, dx inner, ascending.
pub fn candidate_offsets(search_radius: u32) -> impl Iterator<Item = MotionVector> {
    let r = search_radius as i32;
    (-r..=r).flat_map(move |dy| (-r..=r).map(move |dx| MotionVector::new(dx, dy)))
}

// ---------------------------------------------------------------------------
// MotionField
// ---------------------------------------------------------------------------

/// One normalized motion vector per block, covering the whole frame.
///
/// Allocated once per session and overwritten every cycle.
#[derive(Clone, PartialEq)]
pub struct MotionField {
    cells: Image<[f32; 2]>,
    frame: FrameSize,
    block_size: usize,
    search_radius: u32,
}

impl MotionField {
    /// A field for `frame` with every cell at the normalized zero vector.
    pub fn new(frame: FrameSize, params: &MotionParams) -> Self {
        let (gw, gh) = params.grid_size(frame);
        let zero = normalize(MotionVector::ZERO, params.search_radius);
        MotionField {
            cells: Image::from_vec(gw, gh, vec![zero; gw * gh]),
            frame,
            block_size: params.block_size,
            search_radius: params.search_radius,
        }
    }

    /// Build a field from raw normalized cells (e.g. a GPU readback).
    ///
    /// # Panics
    /// Panics if `cells` does not have one entry per grid cell.
    pub fn from_normalized(frame: FrameSize, params: &MotionParams, cells: Vec<[f32; 2]>) -> Self {
        let (gw, gh) = params.grid_size(frame);
        MotionField {
            cells: Image::from_vec(gw, gh, cells),
            frame,
            block_size: params.block_size,
            search_radius: params.search_radius,
        }
    }

    #[inline]
    pub fn grid_width(&self) -> usize {
        self.cells.width()
    }

    #[inline]
    pub fn grid_height(&self) -> usize {
        self.cells.height()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn search_radius(&self) -> u32 {
        self.search_radius
    }

    /// Size of the frame this field covers.
    #[inline]
    pub fn frame_size(&self) -> FrameSize {
        self.frame
    }

    /// The stored [0,1]² value of cell `(gx, gy)`.
    #[inline]
    pub fn normalized(&self, gx: usize, gy: usize) -> [f32; 2] {
        self.cells.get(gx, gy)
    }

    /// Cell `(gx, gy)` in pixel units.
    #[inline]
    pub fn vector(&self, gx: usize, gy: usize) -> [f32; 2] {
        denormalize(self.cells.get(gx, gy), self.search_radius)
    }

    /// Cell `(gx, gy)` rounded back to an integer offset.
    pub fn offset(&self, gx: usize, gy: usize) -> MotionVector {
        let [x, y] = self.vector(gx, gy);
        MotionVector::new(x.round() as i32, y.round() as i32)
    }

    /// The vector of the block owning pixel `(px, py)`. Nearest-block
    /// lookup: no blending across block seams.
    #[inline]
    pub fn vector_at_pixel(&self, px: usize, py: usize) -> [f32; 2] {
        self.vector(px / self.block_size, py / self.block_size)
    }

    #[inline]
    pub fn set_offset(&mut self, gx: usize, gy: usize, v: MotionVector) {
        self.cells.set(gx, gy, normalize(v, self.search_radius));
    }

    pub fn as_slice(&self) -> &[[f32; 2]] {
        self.cells.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [[f32; 2]] {
        self.cells.as_mut_slice()
    }
}

impl std::fmt::Debug for MotionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionField")
            .field("frame", &self.frame)
            .field("grid", &(self.grid_width(), self.grid_height()))
            .field("block_size", &self.block_size)
            .field("search_radius", &self.search_radius)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Block matching
// ---------------------------------------------------------------------------

/// Outcome of the search for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMatch {
    /// Accepted offset. Zero when no candidate was visited.
    pub offset: MotionVector,
    /// SAD of the accepted candidate, `None` when nothing was visited.
    pub sad: Option<f32>,
    /// Number of in-bounds candidates whose SAD was computed.
    pub visited: usize,
    /// True when the scan stopped at a sub-threshold candidate.
    pub early_out: bool,
}

/// Sum of absolute RGB differences between the B×B block of `previous` at
/// `(bx, by)` and the B×B window of `current` at `(sx, sy)`, on [0,1]
/// channels. Alpha does not participate.
///
/// # Panics
/// Panics if either window is out of bounds.
pub fn block_sad(
    previous: &Frame,
    current: &Frame,
    bx: usize,
    by: usize,
    sx: usize,
    sy: usize,
    block_size: usize,
) -> f32 {
    let mut sum: u32 = 0;
    for row in 0..block_size {
        let a = &previous.row(by + row)[bx..bx + block_size];
        let b = &current.row(sy + row)[sx..sx + block_size];
        for (pa, pb) in a.iter().zip(b) {
            sum += pa[0].abs_diff(pb[0]) as u32
                + pa[1].abs_diff(pb[1]) as u32
                + pa[2].abs_diff(pb[2]) as u32;
        }
    }
    sum as f32 / 255.0
}

/// CPU block-matching motion estimator.
///
/// Pure function of (previous, current, params): the same inputs always
/// produce the same field.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    params: MotionParams,
}

impl MotionEstimator {
    /// # Panics
    /// Panics if `params` fails validation.
    pub fn new(params: MotionParams) -> Self {
        if let Err(e) = params.validate() {
            panic!("MotionEstimator::new: {e}");
        }
        MotionEstimator { params }
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Recompute every cell of `field` from `previous` → `current`.
    ///
    /// # Panics
    /// Panics if the frames differ in size or `field` was built for a
    /// different frame size or block size.
    pub fn estimate(&self, previous: &Frame, current: &Frame, field: &mut MotionField) {
        assert_eq!(previous.size(), current.size(), "previous/current size mismatch");
        assert_eq!(
            field.frame_size(),
            previous.size(),
            "motion field was built for a different frame size"
        );
        assert_eq!(field.block_size(), self.params.block_size, "motion field block size mismatch");
        assert_eq!(
            field.search_radius(),
            self.params.search_radius,
            "motion field search radius mismatch"
        );

        let b = self.params.block_size;
        for gy in 0..field.grid_height() {
            for gx in 0..field.grid_width() {
                let m = self.estimate_block(previous, current, gx * b, gy * b);
                field.set_offset(gx, gy, m.offset);
            }
        }
    }

    /// Search for the block whose top-left corner is `(bx, by)`.
    pub fn estimate_block(&self, previous: &Frame, current: &Frame, bx: usize, by: usize) -> BlockMatch {
        let b = self.params.block_size;
        let (w, h) = (current.width(), current.height());

        let none = BlockMatch {
            offset: MotionVector::ZERO,
            sad: None,
            visited: 0,
            early_out: false,
        };

        // The reference block itself must be readable.
        if bx + b > previous.width() || by + b > previous.height() {
            return none;
        }

        let in_bounds = |c: &MotionVector| {
            let sx = bx as i64 + c.dx as i64;
            let sy = by as i64 + c.dy as i64;
            sx >= 0 && sy >= 0 && sx + b as i64 <= w as i64 && sy + b as i64 <= h as i64
        };

        let threshold = self.params.early_out_threshold;
        let mut visited = 0usize;

        let scan = candidate_offsets(self.params.search_radius)
            .filter(in_bounds)
            .try_fold(None::<(MotionVector, f32)>, |best, c| {
                visited += 1;
                let sx = (bx as i64 + c.dx as i64) as usize;
                let sy = (by as i64 + c.dy as i64) as usize;
                let sad = block_sad(previous, current, bx, by, sx, sy, b);

                // A sub-threshold SAD is necessarily a new minimum: any
                // earlier candidate at or below it would already have
                // stopped the scan.
                if sad < threshold {
                    return ControlFlow::Break((c, sad));
                }
                match best {
                    Some((_, min)) if sad >= min => ControlFlow::Continue(best),
                    _ => ControlFlow::Continue(Some((c, sad))),
                }
            });

        match scan {
            ControlFlow::Break((offset, sad)) => BlockMatch {
                offset,
                sad: Some(sad),
                visited,
                early_out: true,
            },
            ControlFlow::Continue(Some((offset, sad))) => BlockMatch {
                offset,
                sad: Some(sad),
                visited,
                early_out: false,
            },
            ControlFlow::Continue(None) => none,
        }
    }
}
