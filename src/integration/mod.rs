// SPDX-License-Identifier: GPL-3.0-only
//! Desktop integrations: tray icon and brightness hotkeys
//!
//! Both are optional. Which implementation runs is decided once at startup
//! from `XDG_CURRENT_DESKTOP`, the session type, the enabled cargo features
//! and `--no-tray`; the no-op variants keep the rest of the app unaware of
//! the choice.

#[cfg(feature = "cosmic-keys")]
mod cosmic_keys;
pub mod gnome;
#[cfg(feature = "tray")]
mod tray;
#[cfg(feature = "x11-keys")]
mod x11_keys;

use std::fmt::Debug;
use std::sync::Arc;

use cosmic::iced::{
    futures::{SinkExt, Stream},
    stream,
};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::app::AppMsg;
use crate::xrandr::OutputName;

#[cfg(feature = "cosmic-keys")]
pub use cosmic_keys::CosmicBrightnessKeys;
pub use gnome::GnomeKeybindings;
#[cfg(feature = "tray")]
pub use tray::StatusNotifierTray;
#[cfg(feature = "x11-keys")]
pub use x11_keys::X11KeyGrab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Increase,
    Decrease,
    Reset,
}

/// Something the desktop asked the app to do
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    ShowWindow,
    Hotkey(HotkeyAction),
    /// Set every output to this fraction
    QuickLevel(f32),
    Quit,
}

pub trait TrayIntegration: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn start(&self, events: UnboundedSender<ShellEvent>) -> anyhow::Result<()>;

    /// Whether the icon is up, so hiding the window leaves a way back
    fn is_active(&self) -> bool {
        false
    }

    /// Reflect the current brightness in the icon and tooltip
    fn show_brightness(&self, _aggregate: Option<f32>, _outputs: &[(OutputName, u16)]) {}
}

pub trait HotkeyIntegration: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn start(&self, events: UnboundedSender<ShellEvent>) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct NoTray;

impl TrayIntegration for NoTray {
    fn name(&self) -> &'static str {
        "none"
    }

    fn start(&self, _events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct NoHotkeys;

impl HotkeyIntegration for NoHotkeys {
    fn name(&self) -> &'static str {
        "none"
    }

    fn start(&self, _events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Desktop {
    Cosmic,
    Gnome,
    Kde,
    Xfce,
    Other(String),
    Unknown,
}

impl Desktop {
    /// Parse a `XDG_CURRENT_DESKTOP` value such as `ubuntu:GNOME`
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Desktop::Unknown;
        };

        for part in value.split(':') {
            match part.to_ascii_uppercase().as_str() {
                "COSMIC" => return Desktop::Cosmic,
                "GNOME" => return Desktop::Gnome,
                "KDE" => return Desktop::Kde,
                "XFCE" => return Desktop::Xfce,
                _ => {}
            }
        }
        Desktop::Other(value.to_string())
    }

    pub fn current() -> Self {
        Self::parse(std::env::var("XDG_CURRENT_DESKTOP").ok().as_deref())
    }
}

impl std::fmt::Display for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Desktop::Cosmic => write!(f, "COSMIC"),
            Desktop::Gnome => write!(f, "GNOME"),
            Desktop::Kde => write!(f, "KDE"),
            Desktop::Xfce => write!(f, "Xfce"),
            Desktop::Other(name) => write!(f, "{}", name),
            Desktop::Unknown => write!(f, "this desktop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayChoice {
    StatusNotifier,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyChoice {
    CosmicKeys,
    Gnome,
    X11Grab,
    None,
}

/// Whether this is an X11 session, where keys can be grabbed on the root window
pub fn x11_session(session_type: Option<&str>, display: Option<&str>) -> bool {
    let wayland = session_type.is_some_and(|s| s.trim().eq_ignore_ascii_case("wayland"));
    !wayland && display.is_some_and(|d| !d.is_empty())
}

/// Pick integrations for a desktop
pub fn choose(desktop: &Desktop, x11: bool, no_tray: bool) -> (TrayChoice, HotkeyChoice) {
    let tray = if no_tray || !cfg!(feature = "tray") {
        TrayChoice::None
    } else {
        TrayChoice::StatusNotifier
    };

    let hotkeys = match desktop {
        Desktop::Cosmic if cfg!(feature = "cosmic-keys") => HotkeyChoice::CosmicKeys,
        Desktop::Gnome => HotkeyChoice::Gnome,
        _ if x11 && cfg!(feature = "x11-keys") => HotkeyChoice::X11Grab,
        _ => HotkeyChoice::None,
    };

    (tray, hotkeys)
}

#[derive(Debug, Clone)]
pub struct Capabilities {
    pub desktop: Desktop,
    pub tray: Arc<dyn TrayIntegration>,
    pub hotkeys: Arc<dyn HotkeyIntegration>,
}

impl Capabilities {
    pub fn detect(no_tray: bool, quick_levels: Vec<f32>) -> Self {
        let desktop = Desktop::current();
        let x11 = x11_session(
            std::env::var("XDG_SESSION_TYPE").ok().as_deref(),
            std::env::var("DISPLAY").ok().as_deref(),
        );
        let (tray_choice, hotkey_choice) = choose(&desktop, x11, no_tray);

        let tray: Arc<dyn TrayIntegration> = match tray_choice {
            #[cfg(feature = "tray")]
            TrayChoice::StatusNotifier => Arc::new(StatusNotifierTray::new(quick_levels)),
            _ => {
                let _ = quick_levels;
                Arc::new(NoTray)
            }
        };

        let hotkeys: Arc<dyn HotkeyIntegration> = match hotkey_choice {
            #[cfg(feature = "cosmic-keys")]
            HotkeyChoice::CosmicKeys => Arc::new(CosmicBrightnessKeys),
            HotkeyChoice::Gnome => Arc::new(GnomeKeybindings),
            #[cfg(feature = "x11-keys")]
            HotkeyChoice::X11Grab => Arc::new(X11KeyGrab),
            _ => Arc::new(NoHotkeys),
        };

        info!(
            "desktop {:?}: tray = {}, hotkeys = {}",
            desktop,
            tray.name(),
            hotkeys.name()
        );

        Self {
            desktop,
            tray,
            hotkeys,
        }
    }

    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            desktop: Desktop::Unknown,
            tray: Arc::new(NoTray),
            hotkeys: Arc::new(NoHotkeys),
        }
    }
}

/// Start the integrations and forward their events to the app
pub fn sub(capabilities: Capabilities) -> impl Stream<Item = AppMsg> {
    stream::channel(10, move |mut output| async move {
        let (tx, mut rx) = mpsc::unbounded_channel();

        if let Err(e) = capabilities.tray.start(tx.clone()) {
            warn!("tray icon unavailable: {:#}", e);
        }
        if let Err(e) = capabilities.hotkeys.start(tx) {
            warn!("hotkeys unavailable: {:#}", e);
        }

        while let Some(event) = rx.recv().await {
            debug!("shell event {:?}", event);
            if output.send(AppMsg::Shell(event)).await.is_err() {
                break;
            }
        }

        // No integration is sending anymore; keep the subscription alive
        cosmic::iced::futures::future::pending::<()>().await;
    })
}
