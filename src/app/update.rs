use cosmic::app::Task;
use cosmic::iced::window;

use crate::brightness::BrightnessCalculator;
use crate::error::{Notice, NoticeKind};
use crate::integration::{HotkeyAction, ShellEvent};
use crate::worker::WorkerCommand;

use super::messages::AppMsg;
use super::state::AppState;

impl AppState {
    pub fn update(&mut self, message: AppMsg) -> Task<AppMsg> {
        match &message {
            AppMsg::RefreshMonitors | AppMsg::HotplugDetected => info!(">>> UPDATE: {:?}", message),
            AppMsg::WorkerReady(discovery, _) => info!(
                ">>> UPDATE: AppMsg::WorkerReady with {} monitors",
                discovery.monitors.len()
            ),
            _ => debug!("{:?}", message),
        }

        match message {
            AppMsg::ConfigChanged(config) => {
                self.session
                    .set_calculator(BrightnessCalculator::from_config(&config));
                self.config = config;
            }
            AppMsg::SetRestoreOnStart(enabled) => {
                self.write_config(|config, handler| config.set_restore_on_start(handler, enabled));
            }
            AppMsg::SetUseDdc(enabled) => {
                self.write_config(|config, handler| config.set_use_ddc(handler, enabled));
            }
            AppMsg::SetScreenBrightness(name, fraction) => {
                if self.controls_enabled() {
                    let request = self.session.slider_moved(&name, fraction);
                    self.apply(request.into_iter().collect());
                }
            }
            AppMsg::ToggleMinMaxBrightness(name) => {
                if self.controls_enabled() {
                    let request = self.session.toggle_min_max(&name);
                    self.apply(request.into_iter().collect());
                }
            }
            AppMsg::SetAllBrightness(fraction) => {
                if self.controls_enabled() {
                    let requests = self.session.set_all(fraction);
                    self.apply(requests);
                }
            }
            AppMsg::ResetAll => {
                if self.controls_enabled() {
                    let requests = self.session.reset_all();
                    self.apply(requests);
                }
            }
            AppMsg::WorkerReady(discovery, sender) => {
                self.sender.replace(sender);
                self.discovered = true;
                self.notices.retain(|n| {
                    !matches!(
                        n.kind,
                        NoticeKind::ToolUnavailable | NoticeKind::QueryParseFailure
                    )
                });
                if let Some(problem) = discovery.problem {
                    self.push_notice(problem);
                }

                let restore = self.config.restore_on_start;
                let requests = self.session.discovered(discovery.monitors, restore);
                self.apply(requests);
            }
            AppMsg::BrightnessApplied(name, fraction) => {
                if let Err(err) = self.session.applied(&name, fraction) {
                    error!("{}", err);
                    self.push_notice(Notice::from(err));
                }
            }
            AppMsg::ApplyFailed(name, notice) => {
                self.session.apply_failed(&name);
                self.push_notice(notice);
            }
            AppMsg::BrightnessWasUpdated(name, fraction) => {
                if let Err(err) = self.session.hardware_reported(&name, fraction) {
                    error!("{}", err);
                    self.push_notice(Notice::from(err));
                }
            }
            AppMsg::RefreshMonitors | AppMsg::HotplugDetected => {
                self.send(WorkerCommand::ReEnumerate);
            }
            AppMsg::StoredBrightnessChanged => {
                let changed = self.session.reload_stored();
                if !changed.is_empty() {
                    info!("brightness changed elsewhere: {}", changed.join(", "));
                }
            }
            AppMsg::Shell(event) => return self.handle_shell_event(event),
            AppMsg::EnvironmentChecked(report) => {
                self.environment = Some(report);
            }
            AppMsg::ToggleEnvironmentView => {
                self.show_environment_view = !self.show_environment_view;
            }
            AppMsg::DismissNotice(index) => {
                if index < self.notices.len() && !self.notices[index].disables_controls() {
                    self.notices.remove(index);
                }
            }
            AppMsg::HideWindow => return self.hide_window(),
            AppMsg::CloseRequested => {
                if self.capabilities.tray.is_active() {
                    return self.hide_window();
                }
                info!("window closed without a tray icon, exiting");
                return cosmic::iced::exit();
            }
        }

        self.sync_tray();
        Task::none()
    }

    fn handle_shell_event(&mut self, event: ShellEvent) -> Task<AppMsg> {
        let requests = match event {
            ShellEvent::ShowWindow => {
                // Another tool may have changed brightness while hidden
                self.send(WorkerCommand::Refresh);
                return self.show_window();
            }
            ShellEvent::Quit => {
                info!("quit requested from the tray");
                return cosmic::iced::exit();
            }
            _ if !self.controls_enabled() => {
                debug!("brightness controls disabled, ignoring {:?}", event);
                return Task::none();
            }
            ShellEvent::QuickLevel(fraction) => self.session.set_all(fraction),
            ShellEvent::Hotkey(HotkeyAction::Reset) => self.session.reset_all(),
            ShellEvent::Hotkey(action) => {
                let step = self.session.hotkey_step();
                let delta = if action == HotkeyAction::Increase {
                    step
                } else {
                    -step
                };
                let target = self.config.hotkey_output.as_deref();
                self.session.step(target, delta)
            }
        };

        self.apply(requests);
        self.sync_tray();
        Task::none()
    }

    fn hide_window(&self) -> Task<AppMsg> {
        if !self.capabilities.tray.is_active() {
            return Task::none();
        }
        match self.core.main_window_id() {
            Some(id) => window::minimize(id, true),
            None => Task::none(),
        }
    }

    fn show_window(&self) -> Task<AppMsg> {
        match self.core.main_window_id() {
            Some(id) => Task::batch([window::minimize(id, false), window::gain_focus(id)]),
            None => Task::none(),
        }
    }
}
