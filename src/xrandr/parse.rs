//! Parsers for xrandr query output

use crate::error::{AppError, Result};

use super::{BrightnessSource, Monitor};

/// Parse `xrandr --verbose`
///
/// ```text
/// Screen 0: minimum 8 x 8, current 1920 x 1080, maximum 32767 x 32767
/// eDP-1 connected primary 1920x1080+0+0 (0x47) normal (...) 344mm x 194mm
///         Identifier: 0x42
///         Brightness: 0.80
/// HDMI-1 disconnected (normal left inverted right x axis y axis)
/// ```
pub fn parse_verbose(text: &str) -> Result<Vec<Monitor>> {
    let mut monitors = Vec::new();
    let mut current: Option<(Monitor, bool)> = None;
    let mut saw_screen = false;

    for line in text.lines() {
        let is_header = line.chars().next().is_some_and(|c| !c.is_whitespace());

        if is_header {
            if let Some((monitor, _)) = current.take() {
                monitors.push(monitor);
            }

            if line.starts_with("Screen ") {
                saw_screen = true;
                continue;
            }

            let mut words = line.split_whitespace();
            let (Some(name), Some(state)) = (words.next(), words.next()) else {
                continue;
            };
            if state == "connected" {
                let primary = words.next() == Some("primary");
                current = Some((
                    Monitor {
                        name: name.to_string(),
                        brightness: 1.0,
                        primary,
                        source: BrightnessSource::Gamma,
                    },
                    false,
                ));
            }
            continue;
        }

        let Some((monitor, has_brightness)) = current.as_mut() else {
            continue;
        };
        if *has_brightness {
            continue;
        }

        if let Some(value) = line.trim().strip_prefix("Brightness:") {
            let value = value.trim();
            let brightness: f32 = value.parse().map_err(|_| {
                AppError::Parse(format!(
                    "bad brightness value {:?} for {}",
                    value, monitor.name
                ))
            })?;
            if brightness.is_nan() {
                return Err(AppError::Parse(format!(
                    "bad brightness value {:?} for {}",
                    value, monitor.name
                )));
            }
            monitor.brightness = brightness.clamp(0.0, 1.0);
            *has_brightness = true;
        }
    }

    if let Some((monitor, _)) = current.take() {
        monitors.push(monitor);
    }

    if !saw_screen {
        return Err(AppError::Parse("no screen section found".to_string()));
    }

    Ok(monitors)
}

/// Parse `xrandr --listmonitors`, which only carries names
///
/// ```text
/// Monitors: 2
///  0: +*eDP-1 1920/344x1080/194+0+0  eDP-1
///  1: +HDMI-1 1920/527x1080/296+1920+0  HDMI-1
/// ```
pub fn parse_listmonitors(text: &str) -> Result<Vec<Monitor>> {
    let mut lines = text.lines();

    let header = lines.next().unwrap_or_default();
    if !header.trim_start().starts_with("Monitors:") {
        return Err(AppError::Parse(format!(
            "unexpected listmonitors header {:?}",
            header
        )));
    }

    let monitors = lines
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            Some(Monitor {
                name: parts[3].to_string(),
                brightness: 1.0,
                primary: parts[1].contains('*'),
                source: BrightnessSource::Assumed,
            })
        })
        .collect();

    Ok(monitors)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const VERBOSE: &str = "\
Screen 0: minimum 8 x 8, current 3840 x 1080, maximum 32767 x 32767
eDP-1 connected primary 1920x1080+0+0 (0x47) normal (normal left inverted right x axis y axis) 344mm x 194mm
\tIdentifier: 0x42
\tTimestamp:  21374
\tSubpixel:   unknown
\tGamma:      1.0:1.0:1.0
\tBrightness: 0.80
\tClones:
\tCRTC:       0
  1920x1080 (0x47) 138.700MHz +HSync -VSync *current +preferred
        h: width  1920 start 1968 end 2000 total 2080 skew    0 clock  66.68KHz
        v: height 1080 start 1083 end 1088 total 1111           clock  60.02Hz
HDMI-1 connected 1920x1080+1920+0 (0x4a) normal (normal left inverted right x axis y axis) 527mm x 296mm
\tIdentifier: 0x43
\tGamma:      1.0:1.0:1.0
\tBrightness: 0.55
\tCRTC:       1
DP-1 disconnected (normal left inverted right x axis y axis)
\tIdentifier: 0x44
\tBrightness: 0.10
";

    #[test]
    fn test_verbose_connected_outputs() {
        let monitors = parse_verbose(VERBOSE).unwrap();
        assert_eq!(
            monitors,
            vec![
                Monitor {
                    name: "eDP-1".to_string(),
                    brightness: 0.8,
                    primary: true,
                    source: BrightnessSource::Gamma,
                },
                Monitor {
                    name: "HDMI-1".to_string(),
                    brightness: 0.55,
                    primary: false,
                    source: BrightnessSource::Gamma,
                },
            ]
        );
    }

    #[test]
    fn test_verbose_without_brightness_line_defaults_to_full() {
        let text = "Screen 0: minimum 8 x 8\nVGA-1 connected (normal left inverted right)\n\tIdentifier: 0x1\n";
        let monitors = parse_verbose(text).unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].brightness, 1.0);
        assert!(!monitors[0].primary);
    }

    #[test]
    fn test_verbose_clamps_out_of_range_brightness() {
        let text = "Screen 0: minimum 8 x 8\nDP-2 connected 800x600+0+0\n\tBrightness: 1.50\n";
        assert_eq!(parse_verbose(text).unwrap()[0].brightness, 1.0);
    }

    #[test]
    fn test_verbose_no_outputs_is_empty_not_error() {
        let text = "Screen 0: minimum 8 x 8, current 0 x 0, maximum 32767 x 32767\n";
        assert!(parse_verbose(text).unwrap().is_empty());
    }

    #[test]
    fn test_verbose_garbage_is_parse_error() {
        assert!(matches!(
            parse_verbose("Can't open display :0\n"),
            Err(AppError::Parse(_))
        ));
        assert!(matches!(parse_verbose(""), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_verbose_bad_brightness_is_parse_error() {
        let text = "Screen 0: minimum 8 x 8\neDP-1 connected\n\tBrightness: bright\n";
        assert!(matches!(parse_verbose(text), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_listmonitors() {
        let text = "Monitors: 2\n 0: +*eDP-1 1920/344x1080/194+0+0  eDP-1\n 1: +HDMI-1 1920/527x1080/296+1920+0  HDMI-1\n";
        let monitors = parse_listmonitors(text).unwrap();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[0].name, "eDP-1");
        assert!(monitors[0].primary);
        assert_eq!(monitors[0].source, BrightnessSource::Assumed);
        assert_eq!(monitors[1].name, "HDMI-1");
        assert!(!monitors[1].primary);
    }

    #[test]
    fn test_listmonitors_bad_header() {
        assert!(parse_listmonitors("nothing here").is_err());
    }
}
