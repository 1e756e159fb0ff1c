mod messages;
mod state;
mod update;

pub use messages::AppMsg;
pub use state::{AppState, Flags};

use cosmic::app::{Core, Task};
use cosmic::iced::{Subscription, window};
use cosmic::{ApplicationExt, Element};

use crate::worker::WorkerOptions;
use crate::{config, fl, hotplug, integration, preflight, settings, worker};

pub const APPID: &str = "io.github.lumonitor.Lumonitor";

impl cosmic::Application for AppState {
    type Executor = cosmic::SingleThreadExecutor;
    type Flags = Flags;
    type Message = AppMsg;
    const APP_ID: &'static str = APPID;

    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    fn init(core: Core, flags: Self::Flags) -> (Self, Task<Self::Message>) {
        let mut window = AppState::new(core, flags);

        let task = match window.core.main_window_id() {
            Some(id) => window.set_window_title(fl!("app_title"), id),
            None => Task::none(),
        };
        (window, task)
    }

    fn on_close_requested(&self, _id: window::Id) -> Option<AppMsg> {
        debug!("on_close_requested");
        Some(AppMsg::CloseRequested)
    }

    fn update(&mut self, message: Self::Message) -> Task<Self::Message> {
        self.update(message)
    }

    fn view(&self) -> Element<'_, Self::Message> {
        self.window_view()
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        let options = WorkerOptions::from_config(&self.config);
        let integrations = (
            self.capabilities.tray.name(),
            self.capabilities.hotkeys.name(),
        );

        let store_watch = match self.session.store() {
            Some(store) => Subscription::run_with_id(
                ("settings", store.path().to_path_buf()),
                settings::watch(store.clone()),
            ),
            None => Subscription::none(),
        };

        Subscription::batch([
            Subscription::run_with_id(("worker", options), worker::sub(options)),
            store_watch,
            Subscription::run(hotplug::hotplug_subscription),
            config::sub(),
            Subscription::run_with_id(
                "integrations",
                integration::sub(self.capabilities.clone()),
            ),
            Subscription::run_with_id(
                (
                    "preflight",
                    self.capabilities.desktop.clone(),
                    integrations,
                    options.use_ddc,
                ),
                preflight::sub(
                    self.capabilities.desktop.clone(),
                    integrations,
                    options.timeout,
                    options.use_ddc,
                ),
            ),
        ])
    }
}
