use cosmic::{
    cosmic_config::{self, CosmicConfigEntry, cosmic_config_derive::CosmicConfigEntry},
    iced::Subscription,
};
use serde::{Deserialize, Serialize};

use crate::app::{APPID, AppMsg};
use crate::xrandr::OutputName;

pub const CONFIG_VERSION: u64 = 1;

/// Application preferences, stored through cosmic-config.
///
/// Per-output brightness is not kept here; that lives in the settings store
/// so the command line can update it atomically.
#[derive(Clone, CosmicConfigEntry, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period before a slider change reaches xrandr
    pub debounce_ms: u64,
    /// Upper bound for a single xrandr invocation
    pub command_timeout_ms: u64,
    /// Fraction added or removed by one hotkey press
    pub hotkey_step: f32,
    /// Lowest fraction the GUI, hotkeys and command line will apply
    pub min_brightness: f32,
    /// Re-apply stored values at startup when xrandr reports something else
    pub restore_on_start: bool,
    /// Output the hotkeys act on; all outputs when unset
    pub hotkey_output: Option<OutputName>,
    /// Percentages offered as quick levels in the window and the tray
    pub quick_levels: Vec<u16>,
    /// Drive the backlight of DDC/CI monitors through ddcutil
    pub use_ddc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            command_timeout_ms: 5000,
            hotkey_step: 0.1,
            min_brightness: 0.1,
            restore_on_start: true,
            hotkey_output: None,
            quick_levels: vec![100, 75, 50, 25],
            use_ddc: true,
        }
    }
}

impl Config {
    /// Load the stored preferences, falling back to defaults
    pub fn load() -> (Option<cosmic_config::Config>, Self) {
        match cosmic_config::Config::new(APPID, CONFIG_VERSION) {
            Ok(config_handler) => {
                let config = match Config::get_entry(&config_handler) {
                    Ok(ok) => ok,
                    Err((errs, config)) => {
                        error!("errors loading config: {:?}", errs);
                        config
                    }
                };
                (Some(config_handler), config)
            }
            Err(err) => {
                error!("failed to create config handler: {}", err);
                (None, Config::default())
            }
        }
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }

    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.command_timeout_ms.max(100))
    }

    /// Quick levels as fractions, highest first, ignoring anything above 100
    pub fn quick_fractions(&self) -> Vec<f32> {
        let mut levels: Vec<u16> = self
            .quick_levels
            .iter()
            .copied()
            .filter(|level| *level <= 100)
            .collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();
        levels
            .into_iter()
            .map(crate::brightness::from_percent)
            .collect()
    }
}

pub fn sub() -> Subscription<AppMsg> {
    struct ConfigSubscription;

    cosmic_config::config_subscription(
        std::any::TypeId::of::<ConfigSubscription>(),
        APPID.into(),
        CONFIG_VERSION,
    )
    .map(|update| {
        if !update.errors.is_empty() {
            error!("can't load config {:?}: {:?}", update.keys, update.errors);
        }
        AppMsg::ConfigChanged(update.config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.min_brightness, 0.1);
        assert_eq!(config.hotkey_step, 0.1);
        assert!(config.hotkey_output.is_none());
        assert!(config.use_ddc);
    }

    #[test]
    fn test_quick_fractions_sorted_and_filtered() {
        let config = Config {
            quick_levels: vec![25, 100, 250, 50, 100],
            ..Config::default()
        };
        assert_eq!(config.quick_fractions(), vec![1.0, 0.5, 0.25]);
    }

    #[test]
    fn test_timeout_has_lower_bound() {
        let config = Config {
            command_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.command_timeout(), std::time::Duration::from_millis(100));
    }
}
