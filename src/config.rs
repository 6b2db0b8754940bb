//! Compile-time configuration: the bindings table and the handful of
//! tunable constants. There is no runtime configuration file — settings
//! are plain Rust source, recompiled to change.

use x11::keysym::*;
use x11::xlib::{Mod1Mask, Mod4Mask, ShiftMask};

use crate::bindings::{Action, Argument, Binding};

bitflags! {
    /// Modifier mask, wrapping the raw X11 bitmask constants. Kept as a
    /// distinct bitflags type rather than a bare `u32`.
    pub struct Modifiers: u32 {
        const NONE  = 0;
        const SHIFT = ShiftMask as u32;
        const MOD1  = Mod1Mask as u32;
        const MOD4  = Mod4Mask as u32;
    }
}

/// The window-manager modifier used for all built-in bindings and for the
/// move/resize drag grabs.
pub const MOD_MASK: Modifiers = Modifiers::MOD4;

pub const BORDER_WIDTH: u32 = 1;
pub const BORDER_COLOR_FOCUSED: u64 = 0x458588;
pub const BORDER_COLOR_NORMAL: u64 = 0x3c3836;

/// Outer/inner gap in pixels at startup.
pub const INITIAL_GAP: i32 = 10;

/// Initial width in pixels of the special (primary) pane.
pub const INITIAL_SPECIAL_WIDTH: i32 = 960;

/// Clamp padding for `adjust_special_width`.
pub const SPECIAL_WIDTH_PADDING: i32 = 40;

/// Per-keypress step for `adjust_special_width`/`adjust_gap`.
pub const RESIZE_STEP: i32 = 20;

pub const TOTAL_WORKSPACES: usize = 9;

/// Floor under which a dragged/resized window may not shrink.
pub const MIN_RESIZE_DIM: u32 = 5;

/// The dedicated kill-client key, `Mod4+Shift+q`.
pub const KILL_CLIENT_KEYSYM: u64 = XK_q as u64;
pub const KILL_CLIENT_MODS: Modifiers =
    Modifiers::from_bits_truncate(Modifiers::MOD4.bits() | Modifiers::SHIFT.bits());

/// The compile-time bindings table. `switch_to_workspace`/`send_to_workspace`
/// are generated for keys 1-9 below rather than spelled out nine times each.
pub fn default_bindings() -> Vec<Binding> {
    let mut bindings = vec![
        Binding::new(
            Modifiers::MOD4,
            XK_Return as u64,
            Action::Spawn,
            Argument::Command(vec!["xterm".to_string()]),
        ),
        Binding::new(
            Modifiers::MOD4,
            XK_p as u64,
            Action::Spawn,
            Argument::Command(vec!["dmenu_run".to_string()]),
        ),
        Binding::new(
            Modifiers::from_bits_truncate(Modifiers::MOD4.bits() | Modifiers::SHIFT.bits()),
            XK_e as u64,
            Action::Quit,
            Argument::None,
        ),
        Binding::new(
            Modifiers::MOD4,
            XK_l as u64,
            Action::AdjustSpecialWidth,
            Argument::Amount(RESIZE_STEP),
        ),
        Binding::new(
            Modifiers::MOD4,
            XK_h as u64,
            Action::AdjustSpecialWidth,
            Argument::Amount(-RESIZE_STEP),
        ),
        Binding::new(
            Modifiers::from_bits_truncate(Modifiers::MOD4.bits() | Modifiers::SHIFT.bits()),
            XK_l as u64,
            Action::AdjustGap,
            Argument::Amount(RESIZE_STEP / 4),
        ),
        Binding::new(
            Modifiers::from_bits_truncate(Modifiers::MOD4.bits() | Modifiers::SHIFT.bits()),
            XK_h as u64,
            Action::AdjustGap,
            Argument::Amount(-(RESIZE_STEP / 4)),
        ),
        Binding::new(Modifiers::MOD4, XK_j as u64, Action::FocusNext, Argument::None),
        Binding::new(Modifiers::MOD4, XK_k as u64, Action::FocusPrev, Argument::None),
        Binding::new(
            Modifiers::MOD4,
            XK_Tab as u64,
            Action::MakeFocusedSpecial,
            Argument::None,
        ),
        Binding::new(
            Modifiers::MOD4,
            XK_space as u64,
            Action::ToggleFloat,
            Argument::None,
        ),
    ];

    let workspace_keys = [XK_1, XK_2, XK_3, XK_4, XK_5, XK_6, XK_7, XK_8, XK_9];
    for (n, keysym) in workspace_keys.iter().enumerate() {
        bindings.push(Binding::new(
            Modifiers::MOD4,
            *keysym as u64,
            Action::SwitchToWorkspace,
            Argument::Amount(n as i32),
        ));
        bindings.push(Binding::new(
            Modifiers::from_bits_truncate(Modifiers::MOD4.bits() | Modifiers::SHIFT.bits()),
            *keysym as u64,
            Action::SendToWorkspace,
            Argument::Amount(n as i32),
        ));
    }

    bindings
}
