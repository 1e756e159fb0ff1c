// SPDX-License-Identifier: GPL-3.0-only
//! xrandr front end
//!
//! Enumerates connected outputs with their software brightness and applies
//! new brightness values, one `xrandr --output` invocation per output.

mod parse;
pub mod runner;

use std::time::Duration;

use crate::brightness;
use crate::error::{AppError, Result};

pub use parse::{parse_listmonitors, parse_verbose};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};

pub const XRANDR: &str = "xrandr";

/// Output name as reported by xrandr, e.g. "eDP-1"
pub type OutputName = String;

/// Where a monitor's brightness value comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrightnessSource {
    /// xrandr software brightness from `--verbose`
    #[default]
    Gamma,
    /// Not reported by xrandr; `--listmonitors` only carries names
    Assumed,
    /// Backlight of a DDC/CI monitor, ddcutil `--display N`
    Ddc { display: u8, max: u16 },
}

/// A connected output and its current brightness
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub name: OutputName,
    /// Between 0 and 1
    pub brightness: f32,
    pub primary: bool,
    pub source: BrightnessSource,
}

#[derive(Debug, Clone)]
pub struct Xrandr<R = SystemRunner> {
    runner: R,
}

impl Xrandr<SystemRunner> {
    pub fn new(timeout: Duration) -> Self {
        Self::with_runner(SystemRunner::new(timeout))
    }
}

impl<R: CommandRunner> Xrandr<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// The runner also drives other desktop tools, e.g. gsettings
    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn query(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let output = match self.runner.run(XRANDR, &args).await {
            Ok(output) => output,
            Err(AppError::Timeout { command, after }) => {
                return Err(AppError::Query {
                    tool: XRANDR.to_string(),
                    reason: format!("{command} timed out after {after:?}"),
                });
            }
            Err(e) => return Err(e),
        };

        if !output.success {
            return Err(AppError::Query {
                tool: XRANDR.to_string(),
                reason: output.failure_reason(),
            });
        }
        Ok(output.stdout)
    }

    /// First line of `xrandr --version`, used by the environment check
    pub async fn version(&self) -> Result<String> {
        let text = self.query(&["--version"]).await?;
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    /// List connected outputs with their current brightness
    ///
    /// Falls back to `--listmonitors` (names only, brightness 1.0) when the
    /// verbose query itself fails.
    pub async fn enumerate(&self) -> Result<Vec<Monitor>> {
        info!("=== START ENUMERATE ===");

        let monitors = match self.query(&["--verbose"]).await {
            Ok(text) => parse_verbose(&text)?,
            Err(AppError::Query { reason, .. }) => {
                warn!("xrandr --verbose failed ({}), trying --listmonitors", reason);
                let text = self.query(&["--listmonitors"]).await?;
                parse_listmonitors(&text)?
            }
            Err(e) => return Err(e),
        };

        for m in &monitors {
            info!(
                "  - Output: {} at {:.0}%{}",
                m.name,
                m.brightness * 100.0,
                if m.primary { " (primary)" } else { "" }
            );
        }
        Ok(monitors)
    }

    /// Apply `fraction` to `output` and return the value actually sent
    ///
    /// The fraction is clamped to `[0, 1]` first; NaN is rejected without
    /// running the tool.
    pub async fn set_brightness(&self, output: &str, fraction: f32) -> Result<f32> {
        let value = brightness::clamp_fraction(fraction).ok_or(AppError::InvalidBrightness(fraction))?;

        let args = vec![
            "--output".to_string(),
            output.to_string(),
            "--brightness".to_string(),
            brightness::encode(value),
        ];

        let result = match self.runner.run(XRANDR, &args).await {
            Ok(result) => result,
            Err(AppError::Timeout { after, .. }) => {
                return Err(AppError::Apply {
                    output: output.to_string(),
                    reason: format!("timed out after {after:?}"),
                });
            }
            Err(e) => return Err(e),
        };

        if !result.success {
            return Err(AppError::Apply {
                output: output.to_string(),
                reason: result.failure_reason(),
            });
        }

        debug!("Set {} to {}", output, args[3]);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::runner::fake::{FakeRunner, Reply};
    use super::*;

    const ONE_OUTPUT: &str = "Screen 0: minimum 8 x 8, current 1920 x 1080, maximum 32767 x 32767\neDP-1 connected primary 1920x1080+0+0\n\tBrightness: 0.80\n";

    #[tokio::test]
    async fn test_enumerate_uses_verbose_query() {
        let runner = FakeRunner::new().reply("--verbose", Reply::Ok(ONE_OUTPUT.to_string()));
        let xrandr = Xrandr::with_runner(runner.clone());

        let monitors = xrandr.enumerate().await.unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].name, "eDP-1");
        assert_eq!(monitors[0].brightness, 0.8);
        assert_eq!(runner.calls(), vec![vec!["--verbose".to_string()]]);
    }

    #[tokio::test]
    async fn test_enumerate_falls_back_to_listmonitors() {
        let runner = FakeRunner::new()
            .reply("--verbose", Reply::Fails("bad option".to_string()))
            .reply(
                "--listmonitors",
                Reply::Ok("Monitors: 1\n 0: +*DP-3 2560/597x1440/336+0+0  DP-3\n".to_string()),
            );
        let xrandr = Xrandr::with_runner(runner.clone());

        let monitors = xrandr.enumerate().await.unwrap();
        assert_eq!(monitors[0].name, "DP-3");
        assert_eq!(monitors[0].brightness, 1.0);
        assert_eq!(monitors[0].source, BrightnessSource::Assumed);
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_enumerate_missing_tool() {
        let runner = FakeRunner::new().reply("--verbose", Reply::Missing);
        let err = Xrandr::with_runner(runner).enumerate().await.unwrap_err();
        assert!(matches!(err, AppError::ToolUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_enumerate_malformed_output() {
        let runner = FakeRunner::new().reply("--verbose", Reply::Ok("garbage".to_string()));
        let err = Xrandr::with_runner(runner).enumerate().await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[tokio::test]
    async fn test_set_brightness_passes_fraction_through() {
        let runner = FakeRunner::new();
        let xrandr = Xrandr::with_runner(runner.clone());

        for percent in [0u16, 1, 10, 33, 50, 80, 99, 100] {
            let fraction = brightness::from_percent(percent);
            let applied = xrandr.set_brightness("eDP-1", fraction).await.unwrap();
            assert_eq!(applied, fraction);
        }

        for (output, arg) in runner.applied() {
            assert_eq!(output, "eDP-1");
            let value: f32 = arg.parse().unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
        assert_eq!(
            runner.calls()[4],
            vec!["--output", "eDP-1", "--brightness", "0.5"]
        );
    }

    #[tokio::test]
    async fn test_set_brightness_clamps_out_of_range() {
        let runner = FakeRunner::new();
        let xrandr = Xrandr::with_runner(runner.clone());

        assert_eq!(xrandr.set_brightness("HDMI-1", 1.7).await.unwrap(), 1.0);
        assert_eq!(xrandr.set_brightness("HDMI-1", -0.4).await.unwrap(), 0.0);
        assert_eq!(
            runner.applied(),
            vec![
                ("HDMI-1".to_string(), "1".to_string()),
                ("HDMI-1".to_string(), "0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_brightness_rejects_nan_without_running() {
        let runner = FakeRunner::new();
        let xrandr = Xrandr::with_runner(runner.clone());

        let err = xrandr.set_brightness("eDP-1", f32::NAN).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidBrightness(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_brightness_non_zero_exit_is_apply_error() {
        let runner = FakeRunner::new().reply(
            "--output",
            Reply::Fails("warning: output HDMI-9 not found; ignoring".to_string()),
        );
        let err = Xrandr::with_runner(runner)
            .set_brightness("HDMI-9", 0.5)
            .await
            .unwrap_err();
        match err {
            AppError::Apply { output, reason } => {
                assert_eq!(output, "HDMI-9");
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_brightness_timeout_is_apply_error() {
        let runner = FakeRunner::new().reply("--output", Reply::TimesOut);
        let err = Xrandr::with_runner(runner)
            .set_brightness("eDP-1", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Apply { .. }));
    }
}
