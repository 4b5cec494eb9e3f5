// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Frames-per-second accounting over a short sliding window.
//! The renderer calls `finished_frame` after every buffer swap; any thread
//! may read the current rate.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct FpsCounter {
    window: Duration,
    frames: Mutex<VecDeque<Instant>>,
}

impl FpsCounter {
    /// `seconds` is the averaging window, 3 is a good middle ground between
    /// jitter and responsiveness.
    pub fn new(seconds: u64) -> Self {
        Self {
            window: Duration::from_secs(seconds.max(1)),
            frames: Mutex::new(VecDeque::new()),
        }
    }

    pub fn finished_frame(&self) {
        let now = Instant::now();
        let mut frames = self.frames.lock();
        frames.push_back(now);
        while let Some(&front) = frames.front() {
            if now.duration_since(front) > self.window {
                frames.pop_front();
            } else {
                break;
            }
        }
    }

    /// Average frames per second over the window.
    pub fn fps(&self) -> u32 {
        let frames = self.frames.lock();
        if frames.len() < 2 {
            return 0;
        }
        let span = frames
            .back()
            .and_then(|b| frames.front().map(|f| b.duration_since(*f)))
            .unwrap_or_default();
        if span.is_zero() {
            return 0;
        }
        ((frames.len() - 1) as f64 / span.as_secs_f64()).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_empty() {
        let c = FpsCounter::new(3);
        assert_eq!(c.fps(), 0);
        c.finished_frame();
        // one frame is not a rate yet
        assert_eq!(c.fps(), 0);
    }

    #[test]
    fn test_fps_counts_frames() {
        let c = FpsCounter::new(3);
        for _ in 0..5 {
            c.finished_frame();
            std::thread::sleep(Duration::from_millis(10));
        }
        let fps = c.fps();
        // 5 frames 10ms apart, roughly 100 fps, leave slack for scheduling
        assert!(fps > 20 && fps < 200, "fps {}", fps);
    }
}
