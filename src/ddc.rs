// SPDX-License-Identifier: GPL-3.0-only
//! Hardware brightness through ddcutil
//!
//! External monitors that speak DDC/CI expose brightness as VCP feature 0x10.
//! ddcutil numbers them `Display 1`, `Display 2`, ... and reports the DRM
//! connector each one hangs off, which is how they are matched to xrandr
//! outputs.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::xrandr::{CommandRunner, SystemRunner};

pub const DDCUTIL: &str = "ddcutil";

/// VCP feature code for luminance
const BRIGHTNESS_VCP: &str = "0x10";

static DISPLAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Display\s+(\d+)").expect("valid display pattern"));

static CONNECTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*DRM connector:\s*(\S+)").expect("valid connector pattern")
});

static VCP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"current value\s*=\s*(\d+),\s*max value\s*=\s*(\d+)").expect("valid vcp pattern")
});

/// A DDC/CI capable display found by `ddcutil detect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdcDisplay {
    /// ddcutil display number, passed as `--display N`
    pub number: u8,
    /// DRM connector without the card prefix, e.g. "DP-1" or "HDMI-A-1"
    pub connector: Option<String>,
}

impl DdcDisplay {
    /// Whether this display is the one xrandr calls `output`
    ///
    /// The kernel names HDMI connectors `HDMI-A-n` while the modesetting
    /// driver calls the same port `HDMI-n`.
    pub fn matches(&self, output: &str) -> bool {
        let Some(connector) = self.connector.as_deref() else {
            return false;
        };
        connector == output
            || connector
                .strip_prefix("HDMI-A-")
                .is_some_and(|n| output.strip_prefix("HDMI-") == Some(n))
    }
}

/// Raw VCP 0x10 reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Luminance {
    pub current: u16,
    pub max: u16,
}

impl Luminance {
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            return 1.0;
        }
        (self.current as f32 / self.max as f32).clamp(0.0, 1.0)
    }
}

/// Parse `ddcutil detect --terse`
///
/// ```text
/// Display 1
///    I2C bus:          /dev/i2c-4
///    DRM connector:    card1-DP-1
///    Monitor:          DEL:DELL U2719D:ABC123
///
/// Invalid display
///    I2C bus:          /dev/i2c-6
/// ```
pub fn parse_detect(text: &str) -> Vec<DdcDisplay> {
    let mut displays = Vec::new();
    let mut current: Option<DdcDisplay> = None;

    for line in text.lines() {
        let is_header = line.chars().next().is_some_and(|c| !c.is_whitespace());
        if is_header {
            displays.extend(current.take());
            current = DISPLAY_RE
                .captures(line)
                .and_then(|caps| caps[1].parse().ok())
                .map(|number| DdcDisplay {
                    number,
                    connector: None,
                });
            continue;
        }

        let Some(display) = current.as_mut() else {
            continue;
        };
        if let Some(caps) = CONNECTOR_RE.captures(line) {
            display.connector = Some(strip_card(&caps[1]).to_string());
        }
    }
    displays.extend(current.take());

    displays
}

/// "card1-DP-1" -> "DP-1"
fn strip_card(connector: &str) -> &str {
    match connector.split_once('-') {
        Some((card, rest)) if card.starts_with("card") => rest,
        _ => connector,
    }
}

/// Parse the reply of `ddcutil getvcp 0x10`
///
/// ```text
/// VCP code 0x10 (Brightness                    ): current value =    80, max value =   100
/// ```
pub fn parse_vcp(text: &str) -> Result<Luminance> {
    let caps = VCP_RE
        .captures(text)
        .ok_or_else(|| AppError::Parse(format!("no brightness in ddcutil reply {:?}", text.trim())))?;

    let number = |i: usize| {
        caps[i]
            .parse::<u16>()
            .map_err(|_| AppError::Parse(format!("bad ddcutil value {:?}", &caps[i])))
    };
    Ok(Luminance {
        current: number(1)?,
        max: number(2)?,
    })
}

/// Raw value to send for `fraction` on a display whose maximum is `max`
pub fn raw_value(fraction: f32, max: u16) -> u16 {
    (fraction.clamp(0.0, 1.0) * max as f32).round() as u16
}

#[derive(Debug, Clone)]
pub struct Ddcutil<R = SystemRunner> {
    runner: R,
}

impl Ddcutil<SystemRunner> {
    /// DDC/CI transactions are slow; allow at least a few seconds per call
    pub fn new(timeout: Duration) -> Self {
        Self::with_runner(SystemRunner::new(timeout.max(Duration::from_secs(3))))
    }
}

impl<R: CommandRunner> Ddcutil<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    async fn query(&self, args: &[String]) -> Result<String> {
        let output = self.runner.run(DDCUTIL, args).await?;
        if !output.success {
            return Err(AppError::Query {
                tool: DDCUTIL.to_string(),
                reason: output.failure_reason(),
            });
        }
        Ok(output.stdout)
    }

    /// First line of `ddcutil --version`
    pub async fn version(&self) -> Result<String> {
        let text = self.query(&["--version".to_string()]).await?;
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    pub async fn detect(&self) -> Result<Vec<DdcDisplay>> {
        let text = self
            .query(&["detect".to_string(), "--terse".to_string()])
            .await?;
        let displays = parse_detect(&text);
        debug!("ddcutil found {} display(s)", displays.len());
        Ok(displays)
    }

    pub async fn get_brightness(&self, display: u8) -> Result<Luminance> {
        let args = vec![
            "getvcp".to_string(),
            BRIGHTNESS_VCP.to_string(),
            "--display".to_string(),
            display.to_string(),
        ];
        parse_vcp(&self.query(&args).await?)
    }

    /// Write `fraction` scaled to the display's maximum, returning the fraction the raw value represents
    pub async fn set_brightness(&self, display: u8, fraction: f32, max: u16) -> Result<f32> {
        let raw = raw_value(fraction, max);
        let args = vec![
            "setvcp".to_string(),
            BRIGHTNESS_VCP.to_string(),
            raw.to_string(),
            "--display".to_string(),
            display.to_string(),
        ];

        let output = self.runner.run(DDCUTIL, &args).await?;
        if !output.success {
            return Err(AppError::Apply {
                output: format!("display {display}"),
                reason: output.failure_reason(),
            });
        }

        debug!("Set display {} to {}/{}", display, raw, max);
        Ok(Luminance { current: raw, max }.fraction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrandr::runner::fake::{FakeRunner, Reply};

    const DETECT: &str = "\
Display 1
   I2C bus:          /dev/i2c-4
   DRM connector:    card1-DP-1
   Monitor:          DEL:DELL U2719D:ABC123

Display 2
   I2C bus:          /dev/i2c-5
   DRM connector:    card0-HDMI-A-1
   Monitor:          GSM:LG HDR 4K:

Invalid display
   I2C bus:          /dev/i2c-6
   DRM connector:    card1-eDP-1
";

    #[test]
    fn test_detect_reads_numbers_and_connectors() {
        assert_eq!(
            parse_detect(DETECT),
            vec![
                DdcDisplay {
                    number: 1,
                    connector: Some("DP-1".to_string()),
                },
                DdcDisplay {
                    number: 2,
                    connector: Some("HDMI-A-1".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_detect_without_connector_lines() {
        let displays = parse_detect("Display 3\n   I2C bus:  /dev/i2c-7\n   Monitor:  AUS:VG248:\n");
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].number, 3);
        assert!(!displays[0].matches("DP-1"));
        assert!(parse_detect("No displays found.\n").is_empty());
    }

    #[test]
    fn test_connector_matching() {
        let hdmi = DdcDisplay {
            number: 2,
            connector: Some("HDMI-A-1".to_string()),
        };
        assert!(hdmi.matches("HDMI-A-1"));
        assert!(hdmi.matches("HDMI-1"));
        assert!(!hdmi.matches("HDMI-2"));
        assert!(!hdmi.matches("DP-1"));
    }

    #[test]
    fn test_vcp_reply() {
        let reply = "VCP code 0x10 (Brightness                    ): current value =    80, max value =   100\n";
        let luminance = parse_vcp(reply).unwrap();
        assert_eq!(luminance, Luminance { current: 80, max: 100 });
        assert_eq!(luminance.fraction(), 0.8);

        assert!(matches!(
            parse_vcp("Display not found\n"),
            Err(AppError::Parse(_))
        ));
    }

    #[test]
    fn test_raw_value_scales_to_max() {
        assert_eq!(raw_value(0.5, 100), 50);
        assert_eq!(raw_value(0.5, 255), 128);
        assert_eq!(raw_value(1.4, 100), 100);
        assert_eq!(Luminance { current: 7, max: 0 }.fraction(), 1.0);
    }

    #[tokio::test]
    async fn test_set_brightness_arguments() {
        let runner = FakeRunner::new();
        let ddc = Ddcutil::with_runner(runner.clone());

        let applied = ddc.set_brightness(2, 0.4, 100).await.unwrap();
        assert_eq!(applied, 0.4);
        assert_eq!(
            runner.calls_to(DDCUTIL),
            vec![vec!["setvcp", "0x10", "40", "--display", "2"]]
        );
    }

    #[tokio::test]
    async fn test_failed_write_is_apply_error() {
        let runner = FakeRunner::new().reply_for(
            DDCUTIL,
            "setvcp",
            Reply::Fails("DDC communication failed".to_string()),
        );
        let err = Ddcutil::with_runner(runner)
            .set_brightness(1, 0.5, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Apply { .. }));
    }
}
