// SPDX-License-Identifier: GPL-3.0-only
//! GNOME custom keyboard shortcuts
//!
//! GNOME does not let an X11 client grab global keys reliably, so the
//! shortcuts are registered with gnome-settings-daemon and run
//! `lumonitor --brightness-step ...` / `lumonitor --brightness 1`.
//! The running window picks up those changes when it is refreshed.

use anyhow::Context;
use tokio::sync::mpsc::UnboundedSender;

use super::{HotkeyIntegration, ShellEvent};
use crate::error::{AppError, Result};
use crate::xrandr::CommandRunner;

const GSETTINGS: &str = "gsettings";
const MEDIA_KEYS: &str = "org.gnome.settings-daemon.plugins.media-keys";
const CUSTOM_KEY: &str = "custom-keybindings";
const BINDING_SCHEMA: &str = "org.gnome.settings-daemon.plugins.media-keys.custom-keybinding";
const BINDING_ROOT: &str = "/org/gnome/settings-daemon/plugins/media-keys/custom-keybindings";

/// One registered shortcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub name: &'static str,
    pub args: &'static str,
    pub binding: &'static str,
}

pub const SHORTCUTS: [Shortcut; 3] = [
    Shortcut {
        name: "lumonitor-increase",
        args: "--brightness-step=+0.1",
        binding: "<Super><Shift>Up",
    },
    Shortcut {
        name: "lumonitor-decrease",
        args: "--brightness-step=-0.1",
        binding: "<Super><Shift>Down",
    },
    Shortcut {
        name: "lumonitor-reset",
        args: "--brightness=1",
        binding: "<Super><Shift>r",
    },
];

pub fn binding_path(index: usize) -> String {
    format!("{BINDING_ROOT}/lumonitor{index}/")
}

fn is_ours(path: &str) -> bool {
    path.strip_prefix(BINDING_ROOT)
        .is_some_and(|rest| rest.starts_with("/lumonitor"))
}

/// Parse a gsettings string array: `@as []` or `['/a/', '/b/']`
pub fn parse_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let value = value.strip_prefix("@as").unwrap_or(value).trim();
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);

    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn format_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("[{}]", quoted.join(", "))
}

async fn gsettings<R: CommandRunner>(runner: &R, args: &[&str]) -> Result<String> {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let output = runner.run(GSETTINGS, &args).await?;
    if !output.success {
        return Err(AppError::Hotkeys(format!(
            "gsettings {}: {}",
            args.join(" "),
            output.failure_reason()
        )));
    }
    Ok(output.stdout)
}

async fn registered<R: CommandRunner>(runner: &R) -> Result<Vec<String>> {
    let current = gsettings(runner, &["get", MEDIA_KEYS, CUSTOM_KEY]).await?;
    Ok(parse_list(&current))
}

/// Whether all shortcuts are in the custom keybinding list
pub async fn is_installed<R: CommandRunner>(runner: &R) -> Result<bool> {
    let current = registered(runner).await?;
    Ok((0..SHORTCUTS.len()).all(|i| current.contains(&binding_path(i))))
}

/// Register the shortcuts, running `program` with the shortcut arguments
pub async fn install<R: CommandRunner>(runner: &R, program: &str) -> Result<()> {
    for (i, shortcut) in SHORTCUTS.iter().enumerate() {
        let schema = format!("{BINDING_SCHEMA}:{}", binding_path(i));
        let command = format!("{program} {}", shortcut.args);

        gsettings(runner, &["set", &schema, "name", shortcut.name]).await?;
        gsettings(runner, &["set", &schema, "command", &command]).await?;
        gsettings(runner, &["set", &schema, "binding", shortcut.binding]).await?;
        info!("registered {}: {}", shortcut.name, shortcut.binding);
    }

    let mut list = registered(runner).await?;
    for i in 0..SHORTCUTS.len() {
        let path = binding_path(i);
        if !list.contains(&path) {
            list.push(path);
        }
    }
    gsettings(runner, &["set", MEDIA_KEYS, CUSTOM_KEY, &format_list(&list)]).await?;
    Ok(())
}

/// Drop our entries from the custom keybinding list, keeping everyone else's
pub async fn uninstall<R: CommandRunner>(runner: &R) -> Result<()> {
    let list: Vec<String> = registered(runner)
        .await?
        .into_iter()
        .filter(|path| !is_ours(path))
        .collect();
    gsettings(runner, &["set", MEDIA_KEYS, CUSTOM_KEY, &format_list(&list)]).await?;

    for i in 0..SHORTCUTS.len() {
        let schema = format!("{BINDING_SCHEMA}:{}", binding_path(i));
        if let Err(e) = gsettings(runner, &["reset-recursively", &schema]).await {
            debug!("can't reset {}: {}", schema, e);
        }
    }
    info!("GNOME shortcuts removed");
    Ok(())
}

/// Hotkeys handled by gnome-settings-daemon
///
/// Starting only reports whether the shortcuts are registered. Presses run
/// the command line, not the window.
#[derive(Debug)]
pub struct GnomeKeybindings;

impl HotkeyIntegration for GnomeKeybindings {
    fn name(&self) -> &'static str {
        "gnome-keybindings"
    }

    fn start(&self, _events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
        tokio::spawn(async {
            let runner = crate::xrandr::SystemRunner::new(std::time::Duration::from_secs(5));
            match is_installed(&runner).await.context("can't read GNOME shortcuts") {
                Ok(true) => info!("GNOME brightness shortcuts are registered"),
                Ok(false) => info!("GNOME brightness shortcuts missing, run lumonitor --setup-hotkeys"),
                Err(e) => warn!("{:#}", e),
            }
        });
        Ok(())
    }
}
