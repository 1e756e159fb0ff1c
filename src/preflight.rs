// SPDX-License-Identifier: GPL-3.0-only
//! Environment check run at startup
//!
//! Brightness changes only work when xrandr can be spawned and talks to an
//! X server. ddcutil is optional. The report is logged and shown in the
//! window on request.

use std::time::Duration;

use cosmic::iced::{
    futures::{SinkExt, Stream},
    stream,
};

use crate::app::AppMsg;
use crate::ddc::Ddcutil;
use crate::integration::Desktop;
use crate::xrandr::{CommandRunner, Xrandr};

#[derive(Debug, Clone)]
pub struct EnvironmentReport {
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub name: String,
    pub description: String,
    pub status: RequirementStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequirementStatus {
    Met,
    NotMet,
    NotApplicable,
    Partial, // works with limitations, not blocking
}

impl RequirementStatus {
    pub fn symbol(self) -> &'static str {
        match self {
            RequirementStatus::Met => "✓",
            RequirementStatus::NotMet => "✗",
            RequirementStatus::NotApplicable => "-",
            RequirementStatus::Partial => "ⓘ",
        }
    }
}

impl EnvironmentReport {
    pub fn has_issues(&self) -> bool {
        self.requirements
            .iter()
            .any(|r| r.status == RequirementStatus::NotMet)
    }

    pub fn summary(&self) -> String {
        let not_met = self
            .requirements
            .iter()
            .filter(|r| r.status == RequirementStatus::NotMet)
            .count();

        if not_met == 0 {
            let met = self
                .requirements
                .iter()
                .filter(|r| r.status == RequirementStatus::Met)
                .count();
            format!("✓ All {} requirements met", met)
        } else {
            format!("{} requirement(s) not met", not_met)
        }
    }

    pub fn log(&self) {
        debug!("Environment check results:");
        for req in &self.requirements {
            debug!("  {} {}: {}", req.status.symbol(), req.name, req.description);
        }

        if self.has_issues() {
            warn!("Environment issues detected:");
            for req in &self.requirements {
                if req.status == RequirementStatus::NotMet {
                    warn!("  ✗ {}: {}", req.name, req.description);
                }
            }
        } else {
            info!("{}", self.summary());
        }
    }
}

/// What was observed about the running session
#[derive(Debug, Clone)]
pub struct Facts {
    /// First line of `xrandr --version`, or why it failed
    pub xrandr: Result<String, String>,
    pub display: Option<String>,
    pub session_type: Option<String>,
    pub desktop: Desktop,
    pub tray: &'static str,
    pub hotkeys: &'static str,
    /// First line of `ddcutil --version`; None when DDC/CI is turned off
    pub ddcutil: Option<Result<String, String>>,
}

pub fn assess(facts: &Facts) -> EnvironmentReport {
    let mut requirements = Vec::new();

    // 1. The tool itself
    requirements.push(match &facts.xrandr {
        Ok(version) => Requirement {
            name: "xrandr".to_string(),
            description: version.clone(),
            status: RequirementStatus::Met,
        },
        Err(reason) => Requirement {
            name: "xrandr".to_string(),
            description: reason.clone(),
            status: RequirementStatus::NotMet,
        },
    });

    // 2. An X display to talk to
    let display = facts.display.as_deref().filter(|d| !d.is_empty());
    requirements.push(Requirement {
        name: "X display".to_string(),
        description: match display {
            Some(d) => format!("DISPLAY={}", d),
            None => "DISPLAY is not set".to_string(),
        },
        status: if display.is_some() {
            RequirementStatus::Met
        } else {
            RequirementStatus::NotMet
        },
    });

    // 3. Session type: xrandr under Wayland only reaches XWayland
    let session = facts.session_type.as_deref().unwrap_or("").to_ascii_lowercase();
    requirements.push(Requirement {
        name: "Session type".to_string(),
        description: match session.as_str() {
            "x11" => "X11 session".to_string(),
            "wayland" => "Wayland session, only XWayland outputs are affected".to_string(),
            "" => "Unknown session type".to_string(),
            other => format!("{} session", other),
        },
        status: match session.as_str() {
            "x11" => RequirementStatus::Met,
            "wayland" => RequirementStatus::Partial,
            _ => RequirementStatus::NotApplicable,
        },
    });

    // 4. Optional integrations
    for (name, chosen) in [("Tray icon", facts.tray), ("Hotkeys", facts.hotkeys)] {
        requirements.push(Requirement {
            name: name.to_string(),
            description: if chosen == "none" {
                format!("Not available on {}", facts.desktop)
            } else {
                format!("Using {}", chosen)
            },
            status: if chosen == "none" {
                RequirementStatus::NotApplicable
            } else {
                RequirementStatus::Met
            },
        });
    }

    // 5. Hardware brightness for external monitors
    requirements.push(Requirement {
        name: "DDC/CI".to_string(),
        description: match &facts.ddcutil {
            None => "Turned off in settings".to_string(),
            Some(Ok(version)) => format!("{}, external monitors use their backlight", version),
            Some(Err(_)) => "ddcutil not found, brightness is applied in software".to_string(),
        },
        status: match &facts.ddcutil {
            None => RequirementStatus::NotApplicable,
            Some(Ok(_)) => RequirementStatus::Met,
            Some(Err(_)) => RequirementStatus::Partial,
        },
    });

    EnvironmentReport { requirements }
}

pub async fn gather<R: CommandRunner>(
    xrandr: &Xrandr<R>,
    ddcutil: Option<&Ddcutil<R>>,
    desktop: Desktop,
    tray: &'static str,
    hotkeys: &'static str,
) -> Facts {
    let ddcutil = match ddcutil {
        Some(ddcutil) => Some(ddcutil.version().await.map_err(|e| e.to_string())),
        None => None,
    };

    Facts {
        xrandr: xrandr.version().await.map_err(|e| e.to_string()),
        ddcutil,
        display: std::env::var("DISPLAY").ok(),
        session_type: std::env::var("XDG_SESSION_TYPE").ok(),
        desktop,
        tray,
        hotkeys,
    }
}

/// Run the check once and report it to the app
pub fn sub(
    desktop: Desktop,
    integrations: (&'static str, &'static str),
    timeout: Duration,
    use_ddc: bool,
) -> impl Stream<Item = AppMsg> {
    stream::channel(1, move |mut output| async move {
        let ddcutil = use_ddc.then(|| Ddcutil::new(timeout));
        let facts = gather(
            &Xrandr::new(timeout),
            ddcutil.as_ref(),
            desktop,
            integrations.0,
            integrations.1,
        )
        .await;
        let report = assess(&facts);
        report.log();

        if output.send(AppMsg::EnvironmentChecked(report)).await.is_err() {
            return;
        }
        cosmic::iced::futures::future::pending::<()>().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddc::DDCUTIL;
    use crate::xrandr::runner::fake::{FakeRunner, Reply};

    fn good_facts() -> Facts {
        Facts {
            xrandr: Ok("xrandr program version       1.5.2".to_string()),
            display: Some(":0".to_string()),
            session_type: Some("x11".to_string()),
            desktop: Desktop::Xfce,
            tray: "status-notifier",
            hotkeys: "none",
            ddcutil: Some(Ok("ddcutil 2.1.4".to_string())),
        }
    }

    #[test]
    fn test_x11_session_has_no_issues() {
        let report = assess(&good_facts());
        assert!(!report.has_issues());
        assert_eq!(report.summary(), "✓ All 5 requirements met");
    }

    #[test]
    fn test_missing_tool_and_display() {
        let facts = Facts {
            xrandr: Err("xrandr is not available".to_string()),
            display: Some(String::new()),
            ..good_facts()
        };
        let report = assess(&facts);
        assert!(report.has_issues());
        assert_eq!(report.summary(), "2 requirement(s) not met");
    }

    #[test]
    fn test_wayland_is_partial() {
        let facts = Facts {
            session_type: Some("wayland".to_string()),
            ..good_facts()
        };
        let report = assess(&facts);
        assert!(!report.has_issues());
        let session = &report.requirements[2];
        assert_eq!(session.status, RequirementStatus::Partial);
    }

    #[test]
    fn test_missing_hotkeys_names_desktop() {
        let report = assess(&good_facts());
        let hotkeys = &report.requirements[4];
        assert_eq!(hotkeys.status, RequirementStatus::NotApplicable);
        assert_eq!(hotkeys.description, "Not available on Xfce");
    }

    #[test]
    fn test_missing_ddcutil_is_not_blocking() {
        let facts = Facts {
            ddcutil: Some(Err("ddcutil is not available".to_string())),
            ..good_facts()
        };
        let report = assess(&facts);
        assert!(!report.has_issues());
        assert_eq!(report.requirements[5].status, RequirementStatus::Partial);

        let off = assess(&Facts {
            ddcutil: None,
            ..good_facts()
        });
        assert_eq!(off.requirements[5].status, RequirementStatus::NotApplicable);
    }

    #[tokio::test]
    async fn test_gather_reads_version_line() {
        let runner = FakeRunner::new()
            .reply(
                "--version",
                Reply::Ok("xrandr program version       1.5.2\nServer reports RandR version 1.6\n".to_string()),
            )
            .reply_for(DDCUTIL, "--version", Reply::Ok("ddcutil 2.1.4\nBuilt with DRM support\n".to_string()));
        let ddcutil = Ddcutil::with_runner(runner.clone());
        let facts = gather(
            &Xrandr::with_runner(runner),
            Some(&ddcutil),
            Desktop::Unknown,
            "none",
            "none",
        )
        .await;
        assert_eq!(facts.xrandr.unwrap(), "xrandr program version       1.5.2");
        assert_eq!(facts.ddcutil, Some(Ok("ddcutil 2.1.4".to_string())));
    }
}
