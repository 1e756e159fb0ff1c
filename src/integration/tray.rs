// SPDX-License-Identifier: GPL-3.0-only
//! StatusNotifierItem tray icon

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use ksni::menu::{MenuItem, StandardItem};
use tokio::sync::mpsc::UnboundedSender;

use super::{HotkeyAction, ShellEvent, TrayIntegration};
use crate::brightness::{self, Level};
use crate::fl;
use crate::xrandr::OutputName;

struct LumonitorTray {
    events: UnboundedSender<ShellEvent>,
    quick_levels: Vec<f32>,
    icon: &'static str,
    tooltip: String,
}

impl LumonitorTray {
    fn emit(&self, event: ShellEvent) {
        if self.events.send(event).is_err() {
            debug!("app stopped listening to the tray");
        }
    }
}

impl ksni::Tray for LumonitorTray {
    fn id(&self) -> String {
        crate::app::APPID.into()
    }

    fn title(&self) -> String {
        fl!("app_title")
    }

    fn icon_name(&self) -> String {
        self.icon.into()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        ksni::ToolTip {
            title: fl!("app_title"),
            description: self.tooltip.clone(),
            ..Default::default()
        }
    }

    fn activate(&mut self, _x: i32, _y: i32) {
        self.emit(ShellEvent::ShowWindow);
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut items: Vec<MenuItem<Self>> = Vec::new();

        items.push(MenuItem::Standard(StandardItem {
            label: fl!("tray_show"),
            activate: Box::new(|this: &mut Self| this.emit(ShellEvent::ShowWindow)),
            ..Default::default()
        }));
        items.push(MenuItem::Separator);

        for fraction in self.quick_levels.iter().copied() {
            items.push(MenuItem::Standard(StandardItem {
                label: fl!("quick_level", percent = brightness::to_percent(fraction)),
                activate: Box::new(move |this: &mut Self| {
                    this.emit(ShellEvent::QuickLevel(fraction))
                }),
                ..Default::default()
            }));
        }

        items.push(MenuItem::Separator);
        items.push(MenuItem::Standard(StandardItem {
            label: fl!("reset_all"),
            activate: Box::new(|this: &mut Self| {
                this.emit(ShellEvent::Hotkey(HotkeyAction::Reset))
            }),
            ..Default::default()
        }));
        items.push(MenuItem::Standard(StandardItem {
            label: fl!("tray_quit"),
            icon_name: "application-exit".into(),
            activate: Box::new(|this: &mut Self| this.emit(ShellEvent::Quit)),
            ..Default::default()
        }));

        items
    }
}

/// Tray icon served over D-Bus by ksni
pub struct StatusNotifierTray {
    quick_levels: Vec<f32>,
    handle: Mutex<Option<ksni::Handle<LumonitorTray>>>,
    active: AtomicBool,
}

impl std::fmt::Debug for StatusNotifierTray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusNotifierTray")
            .field("quick_levels", &self.quick_levels)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}

impl StatusNotifierTray {
    pub fn new(quick_levels: Vec<f32>) -> Self {
        Self {
            quick_levels,
            handle: Mutex::new(None),
            active: AtomicBool::new(false),
        }
    }
}

impl TrayIntegration for StatusNotifierTray {
    fn name(&self) -> &'static str {
        "status-notifier"
    }

    fn start(&self, events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|_| anyhow!("tray handle lock poisoned"))?;
        if handle.is_some() {
            return Ok(());
        }

        let service = ksni::TrayService::new(LumonitorTray {
            events,
            quick_levels: self.quick_levels.clone(),
            icon: Level::High.icon_name(),
            tooltip: String::new(),
        });
        handle.replace(service.handle());
        service.spawn();

        self.active.store(true, Ordering::Relaxed);
        info!("tray icon registered");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn show_brightness(&self, aggregate: Option<f32>, outputs: &[(OutputName, u16)]) {
        let Ok(guard) = self.handle.lock() else {
            return;
        };
        let Some(handle) = guard.as_ref() else {
            return;
        };

        let icon = Level::of(aggregate.unwrap_or(1.0)).icon_name();
        let tooltip = if outputs.is_empty() {
            fl!("no_monitors")
        } else {
            outputs
                .iter()
                .map(|(name, percent)| format!("{name}: {percent}%"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        handle.update(move |tray: &mut LumonitorTray| {
            tray.icon = icon;
            tray.tooltip = tooltip;
        });
    }
}
