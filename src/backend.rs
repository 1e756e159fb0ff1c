// SPDX-License-Identifier: GPL-3.0-only
//! Brightness backend used by the worker and the command line
//!
//! xrandr always provides the list of outputs. Outputs that ddcutil can reach
//! over DDC/CI get their real backlight read and written instead of the
//! xrandr gamma value; when a DDC/CI transaction fails the output falls back
//! to xrandr for that change.

use std::collections::HashMap;
use std::time::Duration;

use crate::brightness;
use crate::ddc::Ddcutil;
use crate::error::{AppError, Result};
use crate::xrandr::{BrightnessSource, CommandRunner, Monitor, OutputName, SystemRunner, Xrandr};

#[derive(Debug)]
pub struct Backend<R = SystemRunner> {
    xrandr: Xrandr<R>,
    ddc: Option<Ddcutil<R>>,
    /// ddcutil display number and VCP maximum per output, from the last enumeration
    ddc_outputs: HashMap<OutputName, (u8, u16)>,
}

impl Backend<SystemRunner> {
    pub fn new(timeout: Duration, use_ddc: bool) -> Self {
        Self {
            xrandr: Xrandr::new(timeout),
            ddc: use_ddc.then(|| Ddcutil::new(timeout)),
            ddc_outputs: HashMap::new(),
        }
    }
}

impl<R: CommandRunner + Clone> Backend<R> {
    pub fn with_runner(runner: R, use_ddc: bool) -> Self {
        Self {
            xrandr: Xrandr::with_runner(runner.clone()),
            ddc: use_ddc.then(|| Ddcutil::with_runner(runner)),
            ddc_outputs: HashMap::new(),
        }
    }
}

impl<R: CommandRunner> Backend<R> {
    /// The runner also drives other desktop tools, e.g. gsettings
    pub fn runner(&self) -> &R {
        self.xrandr.runner()
    }

    /// Enumerate through xrandr, then read DDC/CI brightness where possible
    pub async fn enumerate(&mut self) -> Result<Vec<Monitor>> {
        let mut monitors = self.xrandr.enumerate().await?;
        self.ddc_outputs.clear();

        let Some(ddc) = &self.ddc else {
            return Ok(monitors);
        };

        let displays = match ddc.detect().await {
            Ok(displays) => displays,
            Err(AppError::ToolUnavailable { .. }) => {
                info!("ddcutil not installed, using xrandr brightness only");
                self.ddc = None;
                return Ok(monitors);
            }
            Err(err) => {
                warn!("ddcutil detect failed: {}", err);
                return Ok(monitors);
            }
        };

        for m in &mut monitors {
            let Some(display) = displays.iter().find(|d| d.matches(&m.name)) else {
                continue;
            };
            match ddc.get_brightness(display.number).await {
                Ok(luminance) => {
                    info!(
                        "  - {} is DDC/CI display {} at {}/{}",
                        m.name, display.number, luminance.current, luminance.max
                    );
                    m.brightness = luminance.fraction();
                    m.source = BrightnessSource::Ddc {
                        display: display.number,
                        max: luminance.max,
                    };
                    self.ddc_outputs
                        .insert(m.name.clone(), (display.number, luminance.max));
                }
                Err(err) => warn!("{}: DDC/CI read failed ({}), using xrandr", m.name, err),
            }
        }

        Ok(monitors)
    }

    /// Apply `fraction` to `output` and return the value actually set
    pub async fn set_brightness(&self, output: &str, fraction: f32) -> Result<f32> {
        let value = brightness::clamp_fraction(fraction).ok_or(AppError::InvalidBrightness(fraction))?;

        if let (Some(ddc), Some(&(display, max))) = (&self.ddc, self.ddc_outputs.get(output)) {
            match ddc.set_brightness(display, value, max).await {
                Ok(applied) => return Ok(applied),
                Err(err) => warn!("{}: DDC/CI write failed ({}), falling back to xrandr", output, err),
            }
        }

        self.xrandr.set_brightness(output, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddc::DDCUTIL;
    use crate::xrandr::XRANDR;
    use crate::xrandr::runner::fake::{FakeRunner, Reply};

    const TWO_OUTPUTS: &str = "Screen 0: minimum 8 x 8\neDP-1 connected primary 1920x1080+0+0\n\tBrightness: 0.80\nHDMI-1 connected 1920x1080+1920+0\n\tBrightness: 1.0\n";
    const DETECT: &str = "Display 1\n   I2C bus:          /dev/i2c-5\n   DRM connector:    card0-HDMI-A-1\n   Monitor:          GSM:LG HDR 4K:\n";
    const VCP: &str = "VCP code 0x10 (Brightness                    ): current value =    30, max value =   100\n";

    fn runner() -> FakeRunner {
        FakeRunner::new()
            .reply("--verbose", Reply::Ok(TWO_OUTPUTS.to_string()))
            .reply_for(DDCUTIL, "detect", Reply::Ok(DETECT.to_string()))
            .reply_for(DDCUTIL, "getvcp", Reply::Ok(VCP.to_string()))
    }

    #[tokio::test]
    async fn test_ddc_display_replaces_gamma_brightness() {
        let runner = runner();
        let mut backend = Backend::with_runner(runner.clone(), true);

        let monitors = backend.enumerate().await.unwrap();
        assert_eq!(monitors[0].source, BrightnessSource::Gamma);
        assert_eq!(monitors[0].brightness, 0.8);
        assert_eq!(
            monitors[1].source,
            BrightnessSource::Ddc {
                display: 1,
                max: 100
            }
        );
        assert_eq!(monitors[1].brightness, 0.3);

        assert_eq!(backend.set_brightness("HDMI-1", 0.6).await.unwrap(), 0.6);
        assert_eq!(backend.set_brightness("eDP-1", 0.6).await.unwrap(), 0.6);

        assert_eq!(
            runner.calls_to(DDCUTIL).last().unwrap(),
            &vec!["setvcp", "0x10", "60", "--display", "1"]
        );
        assert_eq!(
            runner.applied(),
            vec![("eDP-1".to_string(), "0.6".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_ddc_write_falls_back_to_xrandr() {
        let runner = runner().reply_for(
            DDCUTIL,
            "setvcp",
            Reply::Fails("DDC communication failed".to_string()),
        );
        let mut backend = Backend::with_runner(runner.clone(), true);
        backend.enumerate().await.unwrap();

        assert_eq!(backend.set_brightness("HDMI-1", 0.5).await.unwrap(), 0.5);
        assert_eq!(
            runner.applied(),
            vec![("HDMI-1".to_string(), "0.5".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_ddc_read_keeps_xrandr_value() {
        let runner = runner().reply_for(DDCUTIL, "getvcp", Reply::TimesOut);
        let mut backend = Backend::with_runner(runner.clone(), true);

        let monitors = backend.enumerate().await.unwrap();
        assert_eq!(monitors[1].source, BrightnessSource::Gamma);
        assert_eq!(monitors[1].brightness, 1.0);

        backend.set_brightness("HDMI-1", 0.4).await.unwrap();
        assert_eq!(runner.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ddcutil_is_not_retried() {
        let runner = FakeRunner::new()
            .reply("--verbose", Reply::Ok(TWO_OUTPUTS.to_string()))
            .reply_for(DDCUTIL, "detect", Reply::Missing);
        let mut backend = Backend::with_runner(runner.clone(), true);

        assert_eq!(backend.enumerate().await.unwrap().len(), 2);
        backend.enumerate().await.unwrap();
        assert_eq!(runner.calls_to(DDCUTIL).len(), 1);
        assert_eq!(runner.calls_to(XRANDR).len(), 2);
    }

    #[tokio::test]
    async fn test_ddc_disabled() {
        let runner = runner();
        let mut backend = Backend::with_runner(runner.clone(), false);

        let monitors = backend.enumerate().await.unwrap();
        assert!(monitors.iter().all(|m| m.source == BrightnessSource::Gamma));
        backend.set_brightness("HDMI-1", 0.5).await.unwrap();
        assert!(runner.calls_to(DDCUTIL).is_empty());
    }

    #[tokio::test]
    async fn test_nan_is_rejected_before_any_tool_runs() {
        let runner = runner();
        let backend = Backend::with_runner(runner.clone(), true);
        assert!(matches!(
            backend.set_brightness("eDP-1", f32::NAN).await,
            Err(AppError::InvalidBrightness(_))
        ));
        assert!(runner.calls().is_empty());
    }
}
