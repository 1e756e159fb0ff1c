// SPDX-License-Identifier: GPL-3.0-only
//! Output hotplug detection
//!
//! Watches udev's drm subsystem and asks the worker to enumerate again when
//! an output is plugged in or removed, so sliders follow the hardware.

mod subscription;
mod udev_monitor;

pub use subscription::hotplug_subscription;
