// SPDX-License-Identifier: GPL-3.0-only
//! Brightness calculation logic
//!
//! Shared by the GUI, the hotkey integrations and the command line so that
//! every path clamps, steps and encodes brightness fractions the same way.

use crate::config::Config;

/// Clamp a fraction into `[0.0, 1.0]`. NaN has no meaningful brightness and is rejected.
pub fn clamp_fraction(fraction: f32) -> Option<f32> {
    if fraction.is_nan() {
        None
    } else {
        Some(fraction.clamp(0.0, 1.0))
    }
}

/// String form handed to `xrandr --brightness`.
///
/// Uses the shortest representation that parses back to the same `f32`,
/// so `0.5` becomes `"0.5"` and `1.0` becomes `"1"`.
pub fn encode(fraction: f32) -> String {
    fraction.to_string()
}

pub fn to_percent(fraction: f32) -> u16 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u16
}

pub fn from_percent(percent: u16) -> f32 {
    (percent.min(100) as f32) / 100.0
}

/// Brightness shown for the whole desktop: the primary output wins,
/// otherwise the mean of all outputs.
pub fn aggregate<I>(outputs: I) -> Option<f32>
where
    I: IntoIterator<Item = (f32, bool)>,
{
    let mut sum = 0.0;
    let mut count = 0usize;

    for (fraction, primary) in outputs {
        if primary {
            return Some(fraction);
        }
        sum += fraction;
        count += 1;
    }

    (count > 0).then(|| sum / count as f32)
}

/// Coarse level used to pick icons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Off,
    Low,
    Medium,
    High,
}

impl Level {
    pub fn of(fraction: f32) -> Self {
        if fraction > 0.66 {
            Level::High
        } else if fraction > 0.33 {
            Level::Medium
        } else if fraction > 0.0 {
            Level::Low
        } else {
            Level::Off
        }
    }

    /// Freedesktop icon name for this level
    pub fn icon_name(self) -> &'static str {
        match self {
            Level::High => "display-brightness-high-symbolic",
            Level::Medium => "display-brightness-medium-symbolic",
            Level::Low => "display-brightness-low-symbolic",
            Level::Off => "display-brightness-off-symbolic",
        }
    }
}

/// Handles brightness calculations with the configured floor and hotkey step
#[derive(Debug, Clone, Copy)]
pub struct BrightnessCalculator {
    floor: f32,
    step: f32,
}

impl BrightnessCalculator {
    pub fn new(floor: f32, step: f32) -> Self {
        Self {
            floor: floor.clamp(0.0, 1.0),
            step: step.abs(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_brightness, config.hotkey_step)
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Clamp a requested value into `[floor, 1.0]`
    pub fn limit(&self, fraction: f32) -> Option<f32> {
        let value = clamp_fraction(fraction)?;
        if value < self.floor {
            tracing::debug!(
                requested = %value,
                floor = %self.floor,
                "Clamping brightness to minimum"
            );
            return Some(self.floor);
        }
        Some(value)
    }

    /// Add a signed delta to `current` and clamp the result
    pub fn stepped(&self, current: f32, delta: f32) -> Option<f32> {
        self.limit(current + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_fraction() {
        assert_eq!(clamp_fraction(0.5), Some(0.5));
        assert_eq!(clamp_fraction(-3.0), Some(0.0));
        assert_eq!(clamp_fraction(7.5), Some(1.0));
        assert_eq!(clamp_fraction(f32::INFINITY), Some(1.0));
        assert_eq!(clamp_fraction(f32::NAN), None);
    }

    #[test]
    fn test_encoding_parses_back_exactly() {
        for percent in 0..=100u16 {
            let fraction = from_percent(percent);
            let encoded = encode(fraction);
            assert_eq!(encoded.parse::<f32>().unwrap(), fraction, "{encoded}");
        }
        assert_eq!(encode(0.5), "0.5");
        assert_eq!(encode(1.0), "1");
    }

    #[test]
    fn test_percent_conversion() {
        assert_eq!(to_percent(0.8), 80);
        assert_eq!(to_percent(1.7), 100);
        assert_eq!(from_percent(250), 1.0);
    }

    #[test]
    fn test_aggregate_prefers_primary() {
        let outputs = [(0.4, false), (0.9, true), (0.2, false)];
        assert_eq!(aggregate(outputs), Some(0.9));
    }

    #[test]
    fn test_aggregate_mean_without_primary() {
        let outputs = [(0.4, false), (0.8, false)];
        let mean = aggregate(outputs).unwrap();
        assert!((mean - 0.6).abs() < 1e-6);
        assert_eq!(aggregate(std::iter::empty()), None);
    }

    #[test]
    fn test_min_brightness_clamping() {
        let calculator = BrightnessCalculator::new(0.1, 0.1);
        assert_eq!(calculator.limit(0.0), Some(0.1));
        assert_eq!(calculator.limit(0.5), Some(0.5));
        assert_eq!(calculator.limit(1.5), Some(1.0));
    }

    #[test]
    fn test_steps_stop_at_bounds() {
        let calculator = BrightnessCalculator::new(0.1, 0.1);
        assert_eq!(calculator.stepped(0.95, 0.1), Some(1.0));
        assert_eq!(calculator.stepped(0.15, -0.1), Some(0.1));
        let up = calculator.stepped(0.5, 0.1).unwrap();
        assert!((up - 0.6).abs() < 1e-6);
        assert_eq!(calculator.stepped(f32::NAN, 0.1), None);
    }

    #[test]
    fn test_negative_step_is_normalized() {
        let calculator = BrightnessCalculator::new(0.0, -0.2);
        assert_eq!(calculator.step(), 0.2);
        let down = calculator.stepped(0.5, -calculator.step()).unwrap();
        assert!((down - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_level_buckets() {
        assert_eq!(Level::of(1.0), Level::High);
        assert_eq!(Level::of(0.5), Level::Medium);
        assert_eq!(Level::of(0.1), Level::Low);
        assert_eq!(Level::of(0.0), Level::Off);
    }
}
