// capture/synthetic.rs — A drifting procedural scene standing in for a
// display.
//
// Frame n shows a fixed texture translated by n·velocity pixels, so
// consecutive frames differ by an exact integer shift that the estimator
// should recover. The texture is per-pixel hash noise, so any misaligned
// 16×16 window scores a SAD far above the default early-out threshold.
//
// Frames are paced at the configured rate. An acquisition that would have
// to wait longer than its timeout sleeps for the timeout and reports
// `Timeout`, like a real duplication API on a static desktop.

use std::thread;
use std::time::{Duration, Instant};

use super::{AcquireStatus, CaptureBackend};
use crate::image::FrameSize;

pub struct SyntheticCapture {
    size: FrameSize,
    velocity: (i64, i64),
    interval: Option<Duration>,
    next_due: Option<Instant>,
    loss_after: Option<u64>,
    delivered: u64,
    buffer: Vec<u8>,
    held: bool,
}

impl SyntheticCapture {
    /// Paced at `fps` frames per second, drifting (2, 1) px per frame.
    pub fn new(size: FrameSize, fps: u32) -> Self {
        SyntheticCapture {
            size,
            velocity: (2, 1),
            interval: (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64)),
            next_due: None,
            loss_after: None,
            delivered: 0,
            buffer: vec![0; size.rgba_len()],
            held: false,
        }
    }

    /// Deliver frames as fast as they are requested.
    pub fn unpaced(size: FrameSize) -> Self {
        SyntheticCapture {
            interval: None,
            ..SyntheticCapture::new(size, 0)
        }
    }

    /// Scene displacement per frame, in pixels.
    pub fn with_velocity(mut self, dx: i32, dy: i32) -> Self {
        self.velocity = (dx as i64, dy as i64);
        self
    }

    /// Report access loss after `frames` frames have been delivered.
    pub fn with_loss_after(mut self, frames: u64) -> Self {
        self.loss_after = Some(frames);
        self
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Render frame `n` of the scene into a fresh byte vector.
    pub fn render_frame(&self, n: u64) -> Vec<u8> {
        let mut out = vec![0; self.size.rgba_len()];
        render_into(&mut out, self.size, self.velocity, n);
        out
    }

    fn wait_for_next(&mut self, timeout_ms: u32) -> bool {
        let Some(interval) = self.interval else {
            return true;
        };
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            let wait = due - now;
            let timeout = Duration::from_millis(timeout_ms as u64);
            if wait > timeout {
                thread::sleep(timeout);
                return false;
            }
            thread::sleep(wait);
        }
        // Do not try to catch up after a stall.
        let next = due + interval;
        self.next_due = Some(if next < now { now + interval } else { next });
        true
    }
}

impl CaptureBackend for SyntheticCapture {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn acquire_next_frame(&mut self, timeout_ms: u32) -> AcquireStatus {
        if self.held {
            return AcquireStatus::Failed {
                frame_held: true,
                reason: "previous frame was not released".into(),
            };
        }
        if self.loss_after.is_some_and(|n| self.delivered >= n) {
            return AcquireStatus::Lost { frame_held: false };
        }
        if !self.wait_for_next(timeout_ms) {
            return AcquireStatus::Timeout;
        }
        render_into(&mut self.buffer, self.size, self.velocity, self.delivered);
        self.delivered += 1;
        self.held = true;
        AcquireStatus::Acquired
    }

    fn frame_data(&self) -> Option<&[u8]> {
        self.held.then_some(self.buffer.as_slice())
    }

    fn release_frame(&mut self) {
        self.held = false;
    }
}

fn render_into(out: &mut [u8], size: FrameSize, velocity: (i64, i64), n: u64) {
    let (w, h) = (size.width as usize, size.height as usize);
    let ox = velocity.0 * n as i64;
    let oy = velocity.1 * n as i64;
    for y in 0..h {
        let row = &mut out[y * w * 4..(y + 1) * w * 4];
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&texel(x as i64 - ox, y as i64 - oy));
        }
    }
}

/// Scene colour at texture coordinate `(u, v)`.
pub fn texel(u: i64, v: i64) -> [u8; 4] {
    let h = hash(u, v);
    [h as u8, (h >> 8) as u8, (h >> 16) as u8, 255]
}

fn hash(u: i64, v: i64) -> u32 {
    let mut h = (u as u32).wrapping_mul(0x9E37_79B1) ^ (v as u32).wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h
}
