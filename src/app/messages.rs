use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::error::Notice;
use crate::integration::ShellEvent;
use crate::preflight::EnvironmentReport;
use crate::worker::{Discovery, WorkerCommand};
use crate::xrandr::OutputName;

#[derive(Clone, Debug)]
pub enum AppMsg {
    ConfigChanged(Config),
    SetRestoreOnStart(bool),
    SetUseDdc(bool),

    SetScreenBrightness(OutputName, f32),
    ToggleMinMaxBrightness(OutputName),
    /// Quick level for every output
    SetAllBrightness(f32),
    ResetAll,

    /// Sent from the worker
    WorkerReady(Discovery, UnboundedSender<WorkerCommand>),
    /// Sent from the worker
    BrightnessApplied(OutputName, f32),
    /// Sent from the worker
    ApplyFailed(OutputName, Notice),
    /// Sent from the worker
    BrightnessWasUpdated(OutputName, f32),
    RefreshMonitors,
    HotplugDetected,
    /// The settings file was written, possibly by another process
    StoredBrightnessChanged,

    Shell(ShellEvent),
    EnvironmentChecked(EnvironmentReport),
    ToggleEnvironmentView,
    DismissNotice(usize),

    HideWindow,
    CloseRequested,
}
