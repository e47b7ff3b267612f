//! HID status snapshots and edge-triggered event synthesis.
//!
//! The I/O endpoint returns a fixed 24-byte status block produced by the USB
//! host stack inside the FPGA (opaque to this layer). Two consecutive
//! snapshots are diffed into discrete key/button/motion events.

use heapless::Vec;

/// Size of the raw status block returned by the I/O endpoint.
pub const HID_STATUS_BLOCK_LEN: usize = 24;

/// Keycode slots in a boot-protocol keyboard report.
pub const KEYBOARD_KEY_SLOTS: usize = 6;

/// Modifier keys map to the reserved keycode range 0xE0..=0xE7, one code per
/// modifier bit (left ctrl = bit 0 = 0xE0, and so on).
pub const MODIFIER_KEYCODE_BASE: u8 = 0xE0;

/// Boot-protocol rollover/error codes. A report carrying any of these in a
/// key slot is malformed and must not be diffed for regular keys.
pub const KEY_ERROR_ROLL_OVER: u8 = 0x01;
pub const KEY_POST_FAIL: u8 = 0x02;
pub const KEY_ERROR_UNDEFINED: u8 = 0x03;

/// Keyboard modifier bits as reported in the status block.
pub mod modifier {
    pub const LEFT_CTRL: u8 = 1;
    pub const LEFT_SHIFT: u8 = 2;
    pub const LEFT_ALT: u8 = 4;
    pub const LEFT_GUI: u8 = 8;
    pub const RIGHT_CTRL: u8 = 16;
    pub const RIGHT_SHIFT: u8 = 32;
    pub const RIGHT_ALT: u8 = 64;
    pub const RIGHT_GUI: u8 = 128;
}

/// Mouse button bits as reported in the status block.
pub mod mouse_button {
    pub const LEFT: u8 = 1;
    pub const RIGHT: u8 = 2;
    pub const MIDDLE: u8 = 4;
}

/// The keycode for a modifier bit index (0..8).
pub fn modifier_keycode(bit: u8) -> u8 {
    MODIFIER_KEYCODE_BASE | (bit & 0x07)
}

/// Parsed HID status snapshot.
///
/// Mouse X/Y/wheel are absolute wrap-safe counters maintained by the device;
/// deltas are computed by wrapping subtraction regardless of overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HidStatus {
    pub modifiers: u8,
    pub keys: [u8; KEYBOARD_KEY_SLOTS],
    pub mouse_buttons: u8,
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub mouse_wheel: i32,
}

impl HidStatus {
    /// Decode the raw 24-byte status block.
    ///
    /// Layout: byte 4 = mouse buttons, byte 5 = keyboard modifiers, bytes
    /// 6..12 = keycodes, bytes 12/16/20 = big-endian signed 32-bit mouse
    /// X/Y/wheel counters. Bytes 0..4 are reserved by the I/O bridge.
    pub fn parse(block: &[u8; HID_STATUS_BLOCK_LEN]) -> Self {
        let mut keys = [0u8; KEYBOARD_KEY_SLOTS];
        keys.copy_from_slice(&block[6..12]);

        let read_i32 = |offset: usize| {
            i32::from_be_bytes([
                block[offset],
                block[offset + 1],
                block[offset + 2],
                block[offset + 3],
            ])
        };

        Self {
            modifiers: block[5],
            keys,
            mouse_buttons: block[4],
            mouse_x: read_i32(12),
            mouse_y: read_i32(16),
            mouse_wheel: read_i32(20),
        }
    }

    fn has_rollover_error(&self) -> bool {
        self.keys
            .iter()
            .any(|&k| (KEY_ERROR_ROLL_OVER..=KEY_ERROR_UNDEFINED).contains(&k))
    }
}

/// A discrete input event synthesized from two consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidEvent {
    KeyDown { code: u8, modifiers: u8 },
    KeyUp { code: u8, modifiers: u8 },
    MouseMove { dx: i32, dy: i32, dwheel: i32, buttons: u8 },
    MouseButtonDown { button: u8 },
    MouseButtonUp { button: u8 },
}

/// Upper bound on events one diff can produce: 8 modifier edges, 6 key-ups,
/// 6 key-downs, 8 button edges and one motion event.
pub const MAX_EVENTS_PER_DIFF: usize = 32;

/// One diff round's worth of events.
pub type EventBatch = Vec<HidEvent, MAX_EVENTS_PER_DIFF>;

/// Synthesize events from the transition `previous` -> `current`.
///
/// Identical snapshots produce no events. Regular-key diffing is skipped for
/// the round when either snapshot carries a rollover error code; modifier and
/// mouse diffing still proceed.
pub fn diff(previous: &HidStatus, current: &HidStatus, out: &mut EventBatch) {
    if previous == current {
        return;
    }

    // Modifier edges, one reserved keycode per changed bit.
    let changed_modifiers = previous.modifiers ^ current.modifiers;
    for bit in 0..8 {
        if changed_modifiers & (1 << bit) == 0 {
            continue;
        }
        let code = modifier_keycode(bit);
        let event = if current.modifiers & (1 << bit) != 0 {
            HidEvent::KeyDown { code, modifiers: current.modifiers }
        } else {
            HidEvent::KeyUp { code, modifiers: current.modifiers }
        };
        push(out, event);
    }

    if !previous.has_rollover_error() && !current.has_rollover_error() {
        // Set difference both ways; slot order within a report is arbitrary.
        for &code in previous.keys.iter() {
            if code != 0 && !current.keys.contains(&code) {
                push(out, HidEvent::KeyUp { code, modifiers: current.modifiers });
            }
        }
        for &code in current.keys.iter() {
            if code != 0 && !previous.keys.contains(&code) {
                push(out, HidEvent::KeyDown { code, modifiers: current.modifiers });
            }
        }
    }

    let changed_buttons = previous.mouse_buttons ^ current.mouse_buttons;
    for bit in 0..8 {
        let button = 1 << bit;
        if changed_buttons & button == 0 {
            continue;
        }
        let event = if current.mouse_buttons & button != 0 {
            HidEvent::MouseButtonDown { button }
        } else {
            HidEvent::MouseButtonUp { button }
        };
        push(out, event);
    }

    // Wrapping subtraction keeps deltas correct across counter overflow.
    let dx = current.mouse_x.wrapping_sub(previous.mouse_x);
    let dy = current.mouse_y.wrapping_sub(previous.mouse_y);
    let dwheel = current.mouse_wheel.wrapping_sub(previous.mouse_wheel);

    if dx != 0 || dy != 0 || dwheel != 0 {
        push(
            out,
            HidEvent::MouseMove { dx, dy, dwheel, buttons: current.mouse_buttons },
        );
    }
}

fn push(out: &mut EventBatch, event: HidEvent) {
    // Cannot overflow: MAX_EVENTS_PER_DIFF exceeds the worst case above.
    let _ = out.push(event);
}
