//! Eased count-up for the headline total.

use std::io::{self, Write};
use std::time::Duration;

pub const COUNTER_DURATION: Duration = Duration::from_millis(1500);
/// Roughly one display refresh.
pub const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy)]
pub struct CounterAnimation {
    pub target: u64,
    pub duration: Duration,
}

impl CounterAnimation {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            duration: COUNTER_DURATION,
        }
    }

    /// Cubic ease-out: `floor(target * (1 - (1 - t/d)^3))`, exactly `target`
    /// once `t >= d`.
    pub fn value_at(&self, elapsed: Duration) -> u64 {
        if elapsed >= self.duration || self.duration.is_zero() {
            return self.target;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - (1.0 - progress).powi(3);
        ((self.target as f64 * eased).floor() as u64).min(self.target)
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Displayed values sampled every `frame`, ending with the target.
    pub fn frames(&self, frame: Duration) -> Vec<u64> {
        let mut out = Vec::new();
        if frame.is_zero() {
            out.push(self.target);
            return out;
        }
        let mut t = Duration::ZERO;
        while !self.is_finished(t) {
            out.push(self.value_at(t));
            t += frame;
        }
        out.push(self.target);
        out
    }

    /// Plays the count-up on a terminal line.
    pub async fn play<W: Write>(&self, out: &mut W, label: &str) -> io::Result<()> {
        let mut ticker = tokio::time::interval(FRAME);
        let started = tokio::time::Instant::now();
        loop {
            ticker.tick().await;
            let elapsed = started.elapsed();
            write!(out, "\r{}: {}", label, self.value_at(elapsed))?;
            out.flush()?;
            if self.is_finished(elapsed) {
                break;
            }
        }
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_ends_at_target() {
        let anim = CounterAnimation::new(47);
        assert_eq!(anim.value_at(Duration::ZERO), 0);
        assert_eq!(anim.value_at(COUNTER_DURATION), 47);
        assert_eq!(anim.value_at(Duration::from_secs(10)), 47);
    }

    #[test]
    fn non_decreasing() {
        let anim = CounterAnimation::new(1234);
        let mut last = 0;
        for ms in 0..=1600 {
            let v = anim.value_at(Duration::from_millis(ms));
            assert!(v >= last, "value dropped at {}ms", ms);
            assert!(v <= 1234);
            last = v;
        }
    }

    #[test]
    fn halfway_is_past_half() {
        let anim = CounterAnimation::new(100);
        // 1 - 0.5^3 = 0.875
        assert_eq!(anim.value_at(Duration::from_millis(750)), 87);
    }

    #[test]
    fn frames_end_on_target() {
        let frames = CounterAnimation::new(20).frames(FRAME);
        assert_eq!(frames.first(), Some(&0));
        assert_eq!(frames.last(), Some(&20));
        assert!(frames.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        let anim = CounterAnimation { target: 9, duration: Duration::ZERO };
        assert_eq!(anim.value_at(Duration::ZERO), 9);
    }
}
