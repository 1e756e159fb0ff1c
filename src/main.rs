// SPDX-License-Identifier: GPL-3.0-only
use std::process::ExitCode;

use clap::Parser;
use cosmic::iced::Size;

use crate::app::{AppState, Flags};
use crate::cli::Cli;
use crate::config::Config;
use crate::integration::Capabilities;
use crate::localize::localize;
use crate::settings::SettingsStore;

#[macro_use]
extern crate tracing;

mod app;
mod backend;
mod brightness;
mod cli;
mod config;
mod ddc;
mod error;
mod hotplug;
mod icon;
mod integration;
mod localize;
mod preflight;
mod session;
mod settings;
mod view;
mod worker;
mod xrandr;

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=info",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> ExitCode {
    setup_logs();
    localize();

    let cli = Cli::parse();
    let (config_handler, config) = Config::load();
    let store = SettingsStore::default_location();
    match &store {
        Some(store) => debug!("brightness settings in {}", store.path().display()),
        None => warn!("no config directory, brightness values will not be remembered"),
    }

    if let Some(command) = cli.one_shot() {
        return cli::run_blocking(command, &config, store.as_ref());
    }

    let capabilities = Capabilities::detect(cli.no_tray, config.quick_fractions());

    let settings = cosmic::app::Settings::default()
        .size(Size::new(440.0, 560.0))
        .exit_on_close(false);

    let flags = Flags {
        config_handler,
        config,
        capabilities,
        store,
    };

    match cosmic::app::run::<AppState>(settings, flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
