// image.rs — Runtime-sized 2D grid container, generic over sample type.
//
// Two concrete grids flow through the pipeline:
//
//   Frame         = Image<Rgba>     : captured / synthesized RGBA8 frames
//   motion cells  = Image<[f32; 2]> : one normalized vector per block
//
// Both are row-major and tightly packed (stride == width). GPU uploads pad
// rows to 256 bytes in a staging step (see gpu/frame.rs), so the CPU side
// never has to carry padding around.
//
// Frames are allocated once per session and overwritten in place every
// cycle, which is why the API leans on `copy_from` / `as_mut_slice` rather
// than constructors that return fresh images.

use std::fmt;

// ---------------------------------------------------------------------------
// Pixel trait
// ---------------------------------------------------------------------------

/// Trait for types that can be stored in an `Image`.
///
///   Copy   : samples are moved around by value in the hot loops
///   Default: zero value used by `Image::new`
///   Send + Sync + 'static: images may be handed to other threads by callers
pub trait Pixel: Copy + Default + Send + Sync + 'static {}

impl Pixel for u8 {}
impl Pixel for f32 {}
impl Pixel for [u8; 4] {}
impl Pixel for [f32; 2] {}

/// One RGBA8 sample: `[r, g, b, a]`.
pub type Rgba = [u8; 4];

/// A captured, aged or synthesized display frame.
pub type Frame = Image<Rgba>;

/// Frame dimensions in pixels. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        FrameSize { width, height }
    }

    /// Number of pixels in a frame of this size.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes in a tightly packed RGBA8 frame of this size.
    #[inline]
    pub fn rgba_len(&self) -> usize {
        self.pixel_count() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D grid with runtime dimensions, generic over sample type `T`.
pub struct Image<T: Pixel> {
    /// Samples in row-major order. Length = width * height.
    data: Vec<T>,
    width: usize,
    height: usize,
}

// Manual Clone: a deep copy of the heap buffer, never done on the hot path.
impl<T: Pixel> Clone for Image<T> {
    fn clone(&self) -> Self {
        Image {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T: Pixel + PartialEq> PartialEq for Image<T> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.data == other.data
    }
}

impl<T: Pixel> Image<T> {
    /// Create a zero-initialized image.
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            data: vec![T::default(); width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing sample vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height }
    }

    /// Build an image by evaluating `f(x, y)` for every sample.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image { data, width, height }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the sample at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Get a sample without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height. Used in the SAD and
    /// bilinear inner loops where bounds are validated once per block.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(
            x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        *self.data.get_unchecked(y * self.width + x)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.bounds_check(x, y);
        let idx = y * self.width + x;
        self.data[idx] = value;
    }

    /// Borrow a single row as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &mut self.data[start..start + self.width]
    }

    /// Iterate over all samples as `(x, y, value)` tuples.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y, self.data[y * self.width + x])))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Overwrite every sample with `other`'s, reusing this image's buffer.
    ///
    /// # Panics
    /// Panics if the dimensions differ.
    pub fn copy_from(&mut self, other: &Image<T>) {
        assert!(
            self.width == other.width && self.height == other.height,
            "copy_from: size mismatch {}×{} ← {}×{}",
            self.width,
            self.height,
            other.width,
            other.height,
        );
        self.data.copy_from_slice(&other.data);
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

impl Image<Rgba> {
    /// Frame dimensions as a `FrameSize`.
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width as u32, self.height as u32)
    }

    /// Create a frame from tightly packed RGBA8 bytes.
    ///
    /// # Panics
    /// Panics if `bytes.len() != width * height * 4`.
    pub fn from_rgba_bytes(width: usize, height: usize, bytes: &[u8]) -> Self {
        let mut frame = Image::new(width, height);
        frame.copy_from_rgba_bytes(bytes);
        frame
    }

    /// View the frame as tightly packed RGBA8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Overwrite the frame from tightly packed RGBA8 bytes.
    ///
    /// # Panics
    /// Panics if the byte count does not match the frame size.
    pub fn copy_from_rgba_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(
            bytes.len(),
            self.data.len() * 4,
            "RGBA byte count ({}) does not match {}×{} frame",
            bytes.len(),
            self.width,
            self.height,
        );
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut self.data);
        dst.copy_from_slice(bytes);
    }
}

impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
        )?;
        for y in 0..self.height.min(4) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(6) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 6 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 4 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bilinear sampling
// ---------------------------------------------------------------------------

/// Bilinear sample of an RGBA frame at a sub-pixel position.
///
/// Texel centres sit at integer coordinates: sampling at `(x, y)` with
/// integral values returns that pixel exactly. Coordinates outside
/// `[0, w-1] × [0, h-1]` are clamped to the edge, matching a GPU sampler
/// with `ClampToEdge` addressing.
///
/// Returns channels as f32 in [0, 255] so callers can choose the rounding.
///
/// # Panics
/// Panics if the frame is empty.
pub fn sample_bilinear(img: &Frame, x: f32, y: f32) -> [f32; 4] {
    assert!(img.width() > 0 && img.height() > 0, "cannot sample an empty frame");

    let max_x = (img.width() - 1) as f32;
    let max_y = (img.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);

    // SAFETY: x0, x1 < width and y0, y1 < height after clamping.
    let (p00, p10, p01, p11) = unsafe {
        (
            img.get_unchecked(x0, y0),
            img.get_unchecked(x1, y0),
            img.get_unchecked(x0, y1),
            img.get_unchecked(x1, y1),
        )
    };

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        out[c] = w00 * p00[c] as f32
            + w10 * p10[c] as f32
            + w01 * p01[c] as f32
            + w11 * p11[c] as f32;
    }
    out
}

/// Round a [0, 255] float colour back to RGBA8.
#[inline]
pub fn quantize_rgba(c: [f32; 4]) -> Rgba {
    [
        c[0].clamp(0.0, 255.0).round() as u8,
        c[1].clamp(0.0, 255.0).round() as u8,
        c[2].clamp(0.0, 255.0).round() as u8,
        c[3].clamp(0.0, 255.0).round() as u8,
    ]
}
