// SPDX-License-Identifier: GPL-3.0-only
//! Brightness state shared by every control surface
//!
//! The session tracks, per output, the value the slider shows and the value
//! the backend last accepted. It never runs a tool itself: operations return
//! [`ApplyRequest`]s for the worker, and the worker's results are fed back
//! through [`Session::applied`] and [`Session::apply_failed`].

use crate::brightness::{self, BrightnessCalculator};
use crate::error::Result;
use crate::settings::{BrightnessMap, SettingsStore};
use crate::xrandr::{BrightnessSource, Monitor, OutputName};

/// Values closer than this are treated as equal
const TOLERANCE: f32 = 0.005;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub name: OutputName,
    /// What the slider shows, between 0 and 1
    pub slider: f32,
    /// Last value the backend accepted
    pub applied: f32,
    pub primary: bool,
    pub source: BrightnessSource,
}

/// Brightness the worker should apply
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRequest {
    pub output: OutputName,
    pub fraction: f32,
}

impl ApplyRequest {
    fn new(output: &str, fraction: f32) -> Self {
        Self {
            output: output.to_string(),
            fraction,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    monitors: Vec<MonitorState>,
    store: Option<SettingsStore>,
    stored: BrightnessMap,
    calculator: BrightnessCalculator,
}

impl Session {
    pub fn new(store: Option<SettingsStore>, calculator: BrightnessCalculator) -> Self {
        let stored = store.as_ref().map(SettingsStore::load).unwrap_or_default();
        Self {
            monitors: Vec::new(),
            store,
            stored,
            calculator,
        }
    }

    pub fn monitors(&self) -> &[MonitorState] {
        &self.monitors
    }

    pub fn monitor(&self, name: &str) -> Option<&MonitorState> {
        self.monitors.iter().find(|m| m.name == name)
    }

    fn monitor_mut(&mut self, name: &str) -> Option<&mut MonitorState> {
        self.monitors.iter_mut().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn store(&self) -> Option<&SettingsStore> {
        self.store.as_ref()
    }

    /// Hotkey step size, always positive
    pub fn hotkey_step(&self) -> f32 {
        self.calculator.step()
    }

    pub fn set_calculator(&mut self, calculator: BrightnessCalculator) {
        self.calculator = calculator;
    }

    /// Replace the monitor list with a fresh enumeration
    ///
    /// Outputs seen for the first time take their stored value when `restore`
    /// is set and it differs from what xrandr reports; those come back as
    /// requests to apply. Known outputs keep tracking the hardware.
    pub fn discovered(&mut self, monitors: Vec<Monitor>, restore: bool) -> Vec<ApplyRequest> {
        let mut requests = Vec::new();

        let next = monitors
            .into_iter()
            .map(|m| {
                let known = self.monitor(&m.name).is_some();
                let stored = self.stored.get(&m.name).copied();

                let slider = match stored {
                    Some(value) if restore && !known => {
                        let value = self.calculator.limit(value).unwrap_or(m.brightness);
                        if (value - m.brightness).abs() > TOLERANCE {
                            info!("restoring {} to {:.0}%", m.name, value * 100.0);
                            requests.push(ApplyRequest::new(&m.name, value));
                        }
                        value
                    }
                    _ => m.brightness,
                };

                MonitorState {
                    name: m.name,
                    slider,
                    applied: m.brightness,
                    primary: m.primary,
                    source: m.source,
                }
            })
            .collect();

        self.monitors = next;
        requests
    }

    /// The user moved a slider
    pub fn slider_moved(&mut self, name: &str, fraction: f32) -> Option<ApplyRequest> {
        let value = self.calculator.limit(fraction)?;
        let monitor = self.monitor_mut(name)?;
        monitor.slider = value;
        Some(ApplyRequest::new(name, value))
    }

    /// Toggle between the floor and full brightness
    pub fn toggle_min_max(&mut self, name: &str) -> Option<ApplyRequest> {
        let floor = self.calculator.floor();
        let current = self.monitor(name)?.slider;
        let target = if current < 1.0 { 1.0 } else { floor };
        self.slider_moved(name, target)
    }

    /// Add a signed step to one output, or to every output when `target` is None
    pub fn step(&mut self, target: Option<&str>, delta: f32) -> Vec<ApplyRequest> {
        let calculator = &self.calculator;
        self.monitors
            .iter_mut()
            .filter(|m| target.is_none_or(|t| t == m.name))
            .filter_map(|m| {
                let value = calculator.stepped(m.slider, delta)?;
                m.slider = value;
                Some(ApplyRequest::new(&m.name, value))
            })
            .collect()
    }

    pub fn set_all(&mut self, fraction: f32) -> Vec<ApplyRequest> {
        let Some(value) = self.calculator.limit(fraction) else {
            return Vec::new();
        };
        self.monitors
            .iter_mut()
            .map(|m| {
                m.slider = value;
                ApplyRequest::new(&m.name, value)
            })
            .collect()
    }

    pub fn reset_all(&mut self) -> Vec<ApplyRequest> {
        self.set_all(1.0)
    }

    /// The backend accepted `fraction` for `name`; remember and persist it
    pub fn applied(&mut self, name: &str, fraction: f32) -> Result<()> {
        if let Some(monitor) = self.monitor_mut(name) {
            monitor.applied = fraction;
        }
        self.remember(name, fraction)
    }

    /// Persist one output without touching the others
    ///
    /// The file is re-read on every write so values stored by the command
    /// line in the meantime survive.
    fn remember(&mut self, name: &str, fraction: f32) -> Result<()> {
        let Some(store) = &self.store else {
            self.stored.insert(name.to_string(), fraction);
            return Ok(());
        };
        match store.update(name, fraction) {
            Ok(map) => {
                self.stored = map;
                Ok(())
            }
            Err(err) => {
                self.stored.insert(name.to_string(), fraction);
                Err(err)
            }
        }
    }

    /// Applying failed: put the slider back where the hardware is
    pub fn apply_failed(&mut self, name: &str) {
        if let Some(monitor) = self.monitor_mut(name) {
            debug!("reverting {} to {}", name, monitor.applied);
            monitor.slider = monitor.applied;
        }
    }

    /// The hardware was queried again and reported `fraction`
    ///
    /// A remembered value that no longer matches is replaced, so a later
    /// restore does not undo a change made by another tool.
    pub fn hardware_reported(&mut self, name: &str, fraction: f32) -> Result<()> {
        let Some(monitor) = self.monitor_mut(name) else {
            return Ok(());
        };
        monitor.slider = fraction;
        monitor.applied = fraction;

        let stale = self
            .stored
            .get(name)
            .is_some_and(|stored| (stored - fraction).abs() > TOLERANCE);
        if stale {
            self.remember(name, fraction)
        } else {
            Ok(())
        }
    }

    /// Re-read the settings file after another process wrote it
    ///
    /// Outputs whose stored value changed take it over as slider and applied
    /// value, since only a successful apply is ever stored. Returns the names
    /// of the outputs that moved.
    pub fn reload_stored(&mut self) -> Vec<OutputName> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let fresh = store.load();

        let mut changed: Vec<(OutputName, f32)> = fresh
            .iter()
            .filter(|(name, value)| {
                self.stored
                    .get(*name)
                    .is_none_or(|old| (old - *value).abs() > TOLERANCE)
            })
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        changed.sort_by(|a, b| a.0.cmp(&b.0));
        self.stored = fresh;

        changed
            .into_iter()
            .filter_map(|(name, value)| {
                let monitor = self.monitor_mut(&name)?;
                debug!("{} changed elsewhere to {}", name, value);
                monitor.slider = value;
                monitor.applied = value;
                Some(name)
            })
            .collect()
    }

    /// Brightness summarizing all outputs, see [`brightness::aggregate`]
    pub fn aggregate(&self) -> Option<f32> {
        brightness::aggregate(self.monitors.iter().map(|m| (m.slider, m.primary)))
    }

    /// Name and percentage per output, for the tray tooltip
    pub fn summary(&self) -> Vec<(OutputName, u16)> {
        self.monitors
            .iter()
            .map(|m| (m.name.clone(), brightness::to_percent(m.slider)))
            .collect()
    }
}
