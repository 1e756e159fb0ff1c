// SPDX-License-Identifier: GPL-3.0-only
//! Command line interface
//!
//! Without arguments the window starts. The one-shot options change or list
//! brightness and exit, which is what desktop shortcuts call.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;

use crate::backend::Backend;
use crate::brightness::{self, BrightnessCalculator};
use crate::config::Config;
use crate::integration::gnome;
use crate::settings::SettingsStore;
use crate::xrandr::{BrightnessSource, CommandRunner, Monitor};

#[derive(Parser, Debug, Default)]
#[command(
    name = "lumonitor",
    version,
    about = "Monitor brightness control through xrandr and DDC/CI"
)]
pub struct Cli {
    /// Run without a tray icon
    #[arg(long)]
    pub no_tray: bool,

    /// Set brightness (0.1 to 1.0) and exit
    #[arg(long, value_name = "LEVEL", conflicts_with = "brightness_step")]
    pub brightness: Option<f32>,

    /// Change brightness by a signed step such as +0.1 or -0.1 and exit
    #[arg(long, value_name = "STEP", allow_hyphen_values = true)]
    pub brightness_step: Option<f32>,

    /// Only change this output (default: all)
    #[arg(long, value_name = "NAME")]
    pub monitor: Option<String>,

    /// Print connected outputs and their brightness
    #[arg(long, conflicts_with_all = ["brightness", "brightness_step"])]
    pub list: bool,

    /// Register GNOME keyboard shortcuts (Super+Shift+Up/Down/R)
    #[arg(long, conflicts_with = "remove_hotkeys")]
    pub setup_hotkeys: bool,

    /// Remove the GNOME keyboard shortcuts
    #[arg(long)]
    pub remove_hotkeys: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OneShot {
    Set { level: f32, monitor: Option<String> },
    Step { delta: f32, monitor: Option<String> },
    List,
    SetupHotkeys,
    RemoveHotkeys,
}

impl Cli {
    /// The one-shot operation requested, if any
    pub fn one_shot(&self) -> Option<OneShot> {
        if let Some(level) = self.brightness {
            return Some(OneShot::Set {
                level,
                monitor: self.monitor.clone(),
            });
        }
        if let Some(delta) = self.brightness_step {
            return Some(OneShot::Step {
                delta,
                monitor: self.monitor.clone(),
            });
        }
        if self.list {
            return Some(OneShot::List);
        }
        if self.setup_hotkeys {
            return Some(OneShot::SetupHotkeys);
        }
        if self.remove_hotkeys {
            return Some(OneShot::RemoveHotkeys);
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
enum Change {
    To(f32),
    By(f32),
}

/// Number of outputs that could not be changed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub failed: usize,
}

fn targets(monitors: Vec<Monitor>, only: Option<&str>) -> anyhow::Result<Vec<Monitor>> {
    match only {
        None => Ok(monitors),
        Some(name) => {
            let found: Vec<Monitor> = monitors.into_iter().filter(|m| m.name == name).collect();
            if found.is_empty() {
                bail!("no connected output named {name}");
            }
            Ok(found)
        }
    }
}

pub async fn run<R: CommandRunner>(
    command: OneShot,
    backend: &mut Backend<R>,
    store: Option<&SettingsStore>,
    config: &Config,
    out: &mut impl Write,
) -> anyhow::Result<Outcome> {
    let calculator = BrightnessCalculator::from_config(config);

    let (monitor, change) = match command {
        OneShot::List => {
            for m in backend.enumerate().await? {
                writeln!(
                    out,
                    "{}: {}%{}{}",
                    m.name,
                    brightness::to_percent(m.brightness),
                    if m.primary { " (primary)" } else { "" },
                    match m.source {
                        BrightnessSource::Ddc { .. } => " (DDC/CI)",
                        BrightnessSource::Assumed => " (not reported)",
                        BrightnessSource::Gamma => "",
                    }
                )?;
            }
            return Ok(Outcome::default());
        }
        OneShot::SetupHotkeys => {
            let program = std::env::current_exe().context("can't locate lumonitor binary")?;
            gnome::install(backend.runner(), &program.to_string_lossy()).await?;
            writeln!(out, "GNOME shortcuts registered")?;
            return Ok(Outcome::default());
        }
        OneShot::RemoveHotkeys => {
            gnome::uninstall(backend.runner()).await?;
            writeln!(out, "GNOME shortcuts removed")?;
            return Ok(Outcome::default());
        }
        OneShot::Set { level, monitor } => (monitor, Change::To(level)),
        OneShot::Step { delta, monitor } => (monitor, Change::By(delta)),
    };

    let monitors = backend.enumerate().await?;
    let stored = store.map(SettingsStore::load).unwrap_or_default();
    let mut outcome = Outcome::default();

    for m in targets(monitors, monitor.as_deref())? {
        let value = match change {
            Change::To(level) => calculator.limit(level),
            Change::By(delta) => {
                // --listmonitors carries no brightness, the remembered value is the best guess
                let current = match m.source {
                    BrightnessSource::Assumed => stored.get(&m.name).copied().unwrap_or(m.brightness),
                    BrightnessSource::Gamma | BrightnessSource::Ddc { .. } => m.brightness,
                };
                calculator.stepped(current, delta)
            }
        };
        let Some(value) = value else {
            bail!("invalid brightness value");
        };

        match backend.set_brightness(&m.name, value).await {
            Ok(applied) => {
                if let Some(store) = store {
                    if let Err(err) = store.update(&m.name, applied) {
                        warn!("{}", err);
                    }
                }
                writeln!(out, "{}: {}%", m.name, brightness::to_percent(applied))?;
            }
            Err(err) => {
                error!("{}", err);
                writeln!(out, "{}: {}", m.name, err)?;
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

/// Run a one-shot operation on its own runtime and turn the result into an exit code
pub fn run_blocking(command: OneShot, config: &Config, store: Option<&SettingsStore>) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("lumonitor: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut backend = Backend::new(config.command_timeout(), config.use_ddc);
    let mut stdout = std::io::stdout();

    match runtime.block_on(run(command, &mut backend, store, config, &mut stdout)) {
        Ok(outcome) if outcome.failed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("lumonitor: {err:#}");
            ExitCode::FAILURE
        }
    }
}
