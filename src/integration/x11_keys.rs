// SPDX-License-Identifier: GPL-3.0-only
//! Global brightness hotkeys on plain X11
//!
//! Desktops without a shortcut service of their own get Ctrl+Alt+Up,
//! Ctrl+Alt+Down and Ctrl+Alt+Shift+R grabbed on the root window. X reports
//! Caps Lock and Num Lock as modifiers, so every key is grabbed once per
//! lock combination.

use anyhow::{Context, bail};
use tokio::sync::mpsc::UnboundedSender;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ConnectionExt, GrabMode, ModMask, Window};
use x11rb::rust_connection::RustConnection;

use super::{HotkeyAction, HotkeyIntegration, ShellEvent};

// Core protocol modifier bits
const SHIFT: u16 = 1 << 0;
const LOCK: u16 = 1 << 1;
const CONTROL: u16 = 1 << 2;
const MOD1: u16 = 1 << 3;
const MOD2: u16 = 1 << 4;
/// Key modifiers only; the high byte carries pointer buttons
const KEY_MODIFIERS: u16 = 0x00ff;

const LOCK_COMBINATIONS: [u16; 4] = [0, LOCK, MOD2, LOCK | MOD2];

const XK_UP: u32 = 0xff52;
const XK_DOWN: u32 = 0xff54;
const XK_LOWER_R: u32 = 0x0072;

#[derive(Debug, Clone, Copy)]
struct Binding {
    keysym: u32,
    modifiers: u16,
    action: HotkeyAction,
}

const BINDINGS: [Binding; 3] = [
    Binding {
        keysym: XK_UP,
        modifiers: CONTROL | MOD1,
        action: HotkeyAction::Increase,
    },
    Binding {
        keysym: XK_DOWN,
        modifiers: CONTROL | MOD1,
        action: HotkeyAction::Decrease,
    },
    Binding {
        keysym: XK_LOWER_R,
        modifiers: CONTROL | MOD1 | SHIFT,
        action: HotkeyAction::Reset,
    },
];

/// A binding resolved to a keycode of the current keyboard map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Grab {
    keycode: u8,
    modifiers: u16,
    action: HotkeyAction,
}

/// Keycodes whose row in a `GetKeyboardMapping` reply contains `keysym`
fn keycodes_for(keysym: u32, min_keycode: u8, per_keycode: u8, keysyms: &[u32]) -> Vec<u8> {
    if per_keycode == 0 {
        return Vec::new();
    }
    keysyms
        .chunks(per_keycode as usize)
        .enumerate()
        .filter(|(_, row)| row.contains(&keysym))
        .filter_map(|(i, _)| u8::try_from(min_keycode as usize + i).ok())
        .collect()
}

/// Action for a key press, ignoring lock keys and pointer buttons
fn action_for(grabs: &[Grab], keycode: u8, state: u16) -> Option<HotkeyAction> {
    let modifiers = state & KEY_MODIFIERS & !(LOCK | MOD2);
    grabs
        .iter()
        .find(|g| g.keycode == keycode && g.modifiers == modifiers)
        .map(|g| g.action)
}

#[derive(Debug)]
pub struct X11KeyGrab;

impl HotkeyIntegration for X11KeyGrab {
    fn name(&self) -> &'static str {
        "x11-key-grab"
    }

    fn start(&self, events: UnboundedSender<ShellEvent>) -> anyhow::Result<()> {
        let (conn, screen_num) =
            RustConnection::connect(None).context("Failed to connect to the X server")?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .context("X server has no such screen")?
            .root;

        let grabs = grab(&conn, root)?;
        if grabs.is_empty() {
            bail!("no hotkey could be grabbed, another program holds them");
        }
        info!("grabbed {} X11 hotkey(s)", grabs.len());

        std::thread::Builder::new()
            .name("x11-hotkeys".to_string())
            .spawn(move || listen(conn, grabs, events))
            .context("Failed to start hotkey thread")?;
        Ok(())
    }
}

fn grab(conn: &RustConnection, root: Window) -> anyhow::Result<Vec<Grab>> {
    let setup = conn.setup();
    let min = setup.min_keycode;
    let count = setup.max_keycode - min + 1;
    let mapping = conn.get_keyboard_mapping(min, count)?.reply()?;

    let mut grabs = Vec::new();
    for binding in BINDINGS {
        for keycode in keycodes_for(binding.keysym, min, mapping.keysyms_per_keycode, &mapping.keysyms) {
            let mut grabbed = true;
            for locks in LOCK_COMBINATIONS {
                let modifiers = ModMask::from(binding.modifiers | locks);
                let result = conn
                    .grab_key(true, root, modifiers, keycode, GrabMode::ASYNC, GrabMode::ASYNC)?
                    .check();
                if let Err(err) = result {
                    warn!("can't grab {:?} on keycode {}: {}", binding.action, keycode, err);
                    grabbed = false;
                    break;
                }
            }
            if grabbed {
                grabs.push(Grab {
                    keycode,
                    modifiers: binding.modifiers,
                    action: binding.action,
                });
            }
        }
    }
    conn.flush()?;

    Ok(grabs)
}

fn listen(conn: RustConnection, grabs: Vec<Grab>, events: UnboundedSender<ShellEvent>) {
    loop {
        let event = match conn.wait_for_event() {
            Ok(event) => event,
            Err(err) => {
                warn!("X11 hotkey connection closed: {}", err);
                return;
            }
        };

        let Event::KeyPress(press) = event else {
            continue;
        };
        if let Some(action) = action_for(&grabs, press.detail, u16::from(press.state)) {
            debug!("hotkey {:?}", action);
            if events.send(ShellEvent::Hotkey(action)).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two keysyms per keycode starting at keycode 8: 'r'/'R' on 9, Up on 10, Down on 11
    const MAPPING: [u32; 8] = [0, 0, XK_LOWER_R, 0x0052, XK_UP, 0, XK_DOWN, 0];

    #[test]
    fn test_keycodes_from_mapping() {
        assert_eq!(keycodes_for(XK_LOWER_R, 8, 2, &MAPPING), vec![9]);
        assert_eq!(keycodes_for(XK_UP, 8, 2, &MAPPING), vec![10]);
        assert_eq!(keycodes_for(XK_DOWN, 8, 2, &MAPPING), vec![11]);
        assert!(keycodes_for(0xffbe, 8, 2, &MAPPING).is_empty());
        assert!(keycodes_for(XK_UP, 8, 0, &MAPPING).is_empty());
    }

    #[test]
    fn test_press_matches_ignoring_locks() {
        let grabs = [
            Grab {
                keycode: 10,
                modifiers: CONTROL | MOD1,
                action: HotkeyAction::Increase,
            },
            Grab {
                keycode: 9,
                modifiers: CONTROL | MOD1 | SHIFT,
                action: HotkeyAction::Reset,
            },
        ];

        assert_eq!(action_for(&grabs, 10, CONTROL | MOD1), Some(HotkeyAction::Increase));
        assert_eq!(
            action_for(&grabs, 10, CONTROL | MOD1 | LOCK | MOD2),
            Some(HotkeyAction::Increase)
        );
        // Button 1 held
        assert_eq!(
            action_for(&grabs, 10, CONTROL | MOD1 | 0x0100),
            Some(HotkeyAction::Increase)
        );
        assert_eq!(action_for(&grabs, 9, CONTROL | MOD1 | SHIFT), Some(HotkeyAction::Reset));
        assert_eq!(action_for(&grabs, 9, CONTROL | MOD1), None);
        assert_eq!(action_for(&grabs, 10, CONTROL), None);
    }

    #[test]
    fn test_bindings_cover_every_action() {
        for action in [HotkeyAction::Increase, HotkeyAction::Decrease, HotkeyAction::Reset] {
            assert!(BINDINGS.iter().any(|b| b.action == action));
        }
        assert!(BINDINGS.iter().all(|b| b.modifiers & (CONTROL | MOD1) == CONTROL | MOD1));
    }
}
