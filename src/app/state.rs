use cosmic::app::Core;
use cosmic::cosmic_config::Config as CosmicConfig;
use tokio::sync::mpsc::UnboundedSender;

use crate::brightness::BrightnessCalculator;
use crate::config::Config;
use crate::error::Notice;
use crate::integration::Capabilities;
use crate::preflight::EnvironmentReport;
use crate::session::{ApplyRequest, Session};
use crate::settings::SettingsStore;
use crate::worker::WorkerCommand;

/// Everything the window needs at startup
pub struct Flags {
    pub config_handler: Option<CosmicConfig>,
    pub config: Config,
    pub capabilities: Capabilities,
    pub store: Option<SettingsStore>,
}

pub struct AppState {
    pub core: Core,
    pub session: Session,
    pub config: Config,
    pub(super) config_handler: Option<CosmicConfig>,
    pub capabilities: Capabilities,
    pub(super) sender: Option<UnboundedSender<WorkerCommand>>,
    pub notices: Vec<Notice>,
    /// False until the worker reported its first enumeration
    pub discovered: bool,
    pub environment: Option<EnvironmentReport>,
    pub show_environment_view: bool,
}

impl AppState {
    pub fn new(core: Core, flags: Flags) -> Self {
        let calculator = BrightnessCalculator::from_config(&flags.config);

        AppState {
            core,
            session: Session::new(flags.store, calculator),
            config: flags.config,
            config_handler: flags.config_handler,
            capabilities: flags.capabilities,
            sender: None,
            notices: Vec::new(),
            discovered: false,
            environment: None,
            show_environment_view: false,
        }
    }

    pub fn send(&self, e: WorkerCommand) {
        if let Some(sender) = &self.sender {
            if let Err(err) = sender.send(e) {
                // The worker is restarting, e.g. after a config change
                debug!("Failed to send command to worker: {:?}", err);
            }
        }
    }

    pub fn apply(&self, requests: Vec<ApplyRequest>) {
        for request in requests {
            self.send(WorkerCommand::Set(request));
        }
    }

    /// Brightness controls stay disabled while xrandr is missing
    pub fn controls_enabled(&self) -> bool {
        !self.notices.iter().any(Notice::disables_controls)
    }

    /// Show a notice, replacing an identical one
    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.retain(|n| n != &notice);
        self.notices.push(notice);
    }

    pub fn sync_tray(&self) {
        self.capabilities
            .tray
            .show_brightness(self.session.aggregate(), &self.session.summary());
    }

    pub fn write_config(&mut self, f: impl FnOnce(&mut Config, &CosmicConfig) -> Result<bool, cosmic::cosmic_config::Error>) {
        let Some(handler) = &self.config_handler else {
            warn!("no config handler, preference not saved");
            return;
        };
        if let Err(e) = f(&mut self.config, handler) {
            error!("can't write config: {e}");
        }
    }
}
