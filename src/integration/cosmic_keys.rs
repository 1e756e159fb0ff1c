// SPDX-License-Identifier: GPL-3.0-only
//! Brightness keys on COSMIC
//!
//! cosmic-settings-daemon owns the brightness keys and publishes the result
//! as its DisplayBrightness property. Each change is turned into an
//! increase or decrease step for the xrandr outputs.

use anyhow::Context;
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use zbus::{Connection, proxy};

use super::{HotkeyAction, HotkeyIntegration, ShellEvent};

/// COSMIC Settings Daemon D-Bus proxy
#[proxy(
    interface = "com.system76.CosmicSettingsDaemon",
    default_service = "com.system76.CosmicSettingsDaemon",
    default_path = "/com/system76/CosmicSettingsDaemon"
)]
trait CosmicSettingsDaemon {
    /// DisplayBrightness property
    #[zbus(property)]
    fn display_brightness(&self) -> zbus::Result<i32>;
}

/// Direction of a property change, if any
pub fn action_for(previous: i32, current: i32) -> Option<HotkeyAction> {
    match current.cmp(&previous) {
        std::cmp::Ordering::Greater => Some(HotkeyAction::Increase),
        std::cmp::Ordering::Less => Some(HotkeyAction::Decrease),
        std::cmp::Ordering::Equal => None,
    }
}

#[derive(Debug)]
pub struct CosmicBrightnessKeys;

impl HotkeyIntegration for CosmicBrightnessKeys {
    fn name(&self) -> &'static str {
        "cosmic-settings-daemon"
    }

    fn start(&self, events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
        tokio::spawn(async move {
            match listen(events).await {
                Ok(()) => info!("brightness key subscription ended"),
                Err(e) => warn!("can't follow COSMIC brightness keys: {:#}", e),
            }
        });
        Ok(())
    }
}

async fn listen(events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
    let connection = Connection::session()
        .await
        .context("Failed to connect to D-Bus session bus")?;
    let proxy = CosmicSettingsDaemonProxy::new(&connection)
        .await
        .context("Failed to create CosmicSettingsDaemon proxy")?;

    let mut last = proxy.display_brightness().await.unwrap_or_default();
    let mut changes = proxy.receive_display_brightness_changed().await;
    debug!("listening for brightness keys, current value {}", last);

    while let Some(change) = changes.next().await {
        let Ok(value) = change.get().await else {
            continue;
        };

        if let Some(action) = action_for(last, value) {
            debug!("brightness key {:?} ({} -> {})", action, last, value);
            if events.send(ShellEvent::Hotkey(action)).is_err() {
                break;
            }
        }
        last = value;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_for_direction() {
        assert_eq!(action_for(10, 20), Some(HotkeyAction::Increase));
        assert_eq!(action_for(20, 10), Some(HotkeyAction::Decrease));
        assert_eq!(action_for(15, 15), None);
    }
}
