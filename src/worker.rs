// SPDX-License-Identifier: GPL-3.0-only
//! Background worker running every xrandr and ddcutil invocation
//!
//! The GUI talks to the worker through an unbounded channel handed out in
//! [`AppMsg::WorkerReady`]. Brightness requests are debounced per output:
//! a burst of slider events only applies the last value of each output once
//! the channel has been quiet for the configured period.

use std::time::Duration;

use cosmic::iced::{
    futures::{SinkExt, Stream},
    stream,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::app::AppMsg;
use crate::backend::Backend;
use crate::error::Notice;
use crate::session::ApplyRequest;
use crate::xrandr::{BrightnessSource, CommandRunner, Monitor, OutputName};

#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Set(ApplyRequest),
    /// Query current brightness of the known outputs
    Refresh,
    /// Outputs may have changed, enumerate from scratch
    ReEnumerate,
}

/// Result of one enumeration. Never an error: problems become a notice.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub monitors: Vec<Monitor>,
    pub problem: Option<Notice>,
}

/// Worker settings; a change restarts the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerOptions {
    pub debounce: Duration,
    pub timeout: Duration,
    pub use_ddc: bool,
}

impl WorkerOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            debounce: config.debounce(),
            timeout: config.command_timeout(),
            use_ddc: config.use_ddc,
        }
    }
}

pub async fn discover<R: CommandRunner>(backend: &mut Backend<R>) -> Discovery {
    match backend.enumerate().await {
        Ok(monitors) => Discovery {
            monitors,
            problem: None,
        },
        Err(err) => {
            warn!("monitor discovery failed: {}", err);
            Discovery {
                monitors: Vec::new(),
                problem: Some(Notice::from(err)),
            }
        }
    }
}

/// Latest requested value per output, in first-request order
#[derive(Debug, Default)]
pub struct PendingApplies {
    entries: Vec<(OutputName, f32)>,
}

impl PendingApplies {
    pub fn push(&mut self, request: ApplyRequest) {
        match self.entries.iter_mut().find(|(name, _)| *name == request.output) {
            Some(entry) => entry.1 = request.fraction,
            None => self.entries.push((request.output, request.fraction)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> Vec<(OutputName, f32)> {
        std::mem::take(&mut self.entries)
    }
}

/// Collect `Set` commands until the channel is quiet for `debounce`
///
/// Returns the first non-`Set` command that interrupted the burst so the
/// caller can handle it after applying.
pub async fn collect_burst(
    rx: &mut UnboundedReceiver<WorkerCommand>,
    debounce: Duration,
    pending: &mut PendingApplies,
) -> Option<WorkerCommand> {
    loop {
        match tokio::time::timeout(debounce, rx.recv()).await {
            Ok(Some(WorkerCommand::Set(request))) => pending.push(request),
            Ok(Some(other)) => return Some(other),
            Ok(None) | Err(_) => return None,
        }
    }
}

enum State {
    Fetch,
    Ready,
    Handle(WorkerCommand),
}

pub fn sub(options: WorkerOptions) -> impl Stream<Item = AppMsg> {
    stream::channel(100, move |mut output| async move {
        let mut backend = Backend::new(options.timeout, options.use_ddc);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = State::Fetch;

        loop {
            match state {
                State::Fetch => {
                    let discovery = discover(&mut backend).await;
                    if output
                        .send(AppMsg::WorkerReady(discovery, tx.clone()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                    state = State::Ready;
                }
                State::Ready => {
                    state = match rx.recv().await {
                        Some(command) => State::Handle(command),
                        None => break,
                    };
                }
                State::Handle(WorkerCommand::Set(request)) => {
                    let mut pending = PendingApplies::default();
                    pending.push(request);
                    let interrupted = collect_burst(&mut rx, options.debounce, &mut pending).await;

                    for (name, fraction) in pending.drain() {
                        let msg = match backend.set_brightness(&name, fraction).await {
                            Ok(value) => AppMsg::BrightnessApplied(name, value),
                            Err(err) => {
                                error!("{}", err);
                                AppMsg::ApplyFailed(name, Notice::from(err))
                            }
                        };
                        if output.send(msg).await.is_err() {
                            return;
                        }
                    }

                    state = interrupted.map_or(State::Ready, State::Handle);
                }
                State::Handle(WorkerCommand::Refresh) => {
                    match backend.enumerate().await {
                        Ok(monitors) => {
                            // listmonitors carries no brightness to report
                            let reported = monitors
                                .into_iter()
                                .filter(|m| m.source != BrightnessSource::Assumed);
                            for m in reported {
                                if output
                                    .send(AppMsg::BrightnessWasUpdated(m.name, m.brightness))
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                            }
                        }
                        Err(err) => error!("refresh failed: {}", err),
                    }
                    state = State::Ready;
                }
                State::Handle(WorkerCommand::ReEnumerate) => {
                    info!("ReEnumerate received, re-enumerating outputs");
                    state = State::Fetch;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoticeKind;
    use crate::xrandr::runner::fake::{FakeRunner, Reply};

    fn set(output: &str, fraction: f32) -> WorkerCommand {
        WorkerCommand::Set(ApplyRequest {
            output: output.to_string(),
            fraction,
        })
    }

    #[test]
    fn test_pending_keeps_latest_per_output() {
        let mut pending = PendingApplies::default();
        for (output, fraction) in [("eDP-1", 0.2), ("HDMI-1", 0.9), ("eDP-1", 0.6)] {
            pending.push(ApplyRequest {
                output: output.to_string(),
                fraction,
            });
        }
        assert_eq!(
            pending.drain(),
            vec![("eDP-1".to_string(), 0.6), ("HDMI-1".to_string(), 0.9)]
        );
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for i in 1..=10 {
            tx.send(set("eDP-1", i as f32 / 10.0)).unwrap();
        }

        let mut pending = PendingApplies::default();
        let interrupted = collect_burst(&mut rx, Duration::from_millis(20), &mut pending).await;

        assert!(interrupted.is_none());
        assert_eq!(pending.drain(), vec![("eDP-1".to_string(), 1.0)]);
    }

    #[tokio::test]
    async fn test_burst_stops_at_other_command() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(set("eDP-1", 0.3)).unwrap();
        tx.send(WorkerCommand::ReEnumerate).unwrap();
        tx.send(set("eDP-1", 0.7)).unwrap();

        let mut pending = PendingApplies::default();
        let interrupted = collect_burst(&mut rx, Duration::from_millis(20), &mut pending).await;

        assert!(matches!(interrupted, Some(WorkerCommand::ReEnumerate)));
        assert_eq!(pending.drain(), vec![("eDP-1".to_string(), 0.3)]);
    }

    #[tokio::test]
    async fn test_discover_malformed_output_is_empty_with_notice() {
        let runner = FakeRunner::new().reply("--verbose", Reply::Ok("not xrandr".to_string()));
        let discovery = discover(&mut Backend::with_runner(runner, false)).await;

        assert!(discovery.monitors.is_empty());
        let notice = discovery.problem.unwrap();
        assert_eq!(notice.kind, NoticeKind::QueryParseFailure);
        assert!(!notice.disables_controls());
    }

    #[tokio::test]
    async fn test_discover_missing_tool_disables_controls() {
        let runner = FakeRunner::new().reply("--verbose", Reply::Missing);
        let discovery = discover(&mut Backend::with_runner(runner, false)).await;

        assert!(discovery.monitors.is_empty());
        assert!(discovery.problem.unwrap().disables_controls());
    }
}
