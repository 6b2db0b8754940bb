//! Key bindings and the built-in action set. A binding is `(modifiers,
//! keysym, action, argument)`; actions are a closed enum dispatched through
//! a central `match` rather than type-erased closures.

use crate::config::Modifiers;
use crate::context::WmContext;
use crate::xconn::XConn;

/// The tagged argument payload a binding carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Command(Vec<String>),
    Amount(i32),
    None,
}

/// The closed set of built-in actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Spawn,
    Quit,
    AdjustSpecialWidth,
    AdjustGap,
    FocusNext,
    FocusPrev,
    MakeFocusedSpecial,
    ToggleFloat,
    SwitchToWorkspace,
    SendToWorkspace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub modifiers: Modifiers,
    pub keysym: u64,
    pub action: Action,
    pub argument: Argument,
}

impl Binding {
    pub fn new(modifiers: Modifiers, keysym: u64, action: Action, argument: Argument) -> Self {
        Binding {
            modifiers,
            keysym,
            action,
            argument,
        }
    }

    /// Two keys are equal iff both modifiers and keysym match exactly.
    fn matches(&self, modifiers: Modifiers, keysym: u64) -> bool {
        self.modifiers == modifiers && self.keysym == keysym
    }
}

/// Find the binding (if any) matching a pressed key, and dispatch its
/// action against the WM context via a central match over a small action
/// enum, rather than per-binding closures.
pub fn dispatch<X: XConn>(ctx: &mut WmContext<X>, bindings: &[Binding], modifiers: Modifiers, keysym: u64) {
    let Some(binding) = bindings.iter().find(|b| b.matches(modifiers, keysym)) else {
        return;
    };

    debug!("dispatching action {:?} with argument {:?}", binding.action, binding.argument);

    match binding.action {
        Action::Spawn => {
            if let Argument::Command(cmd) = &binding.argument {
                crate::process::spawn(cmd);
            }
        }
        Action::Quit => ctx.quit(),
        Action::AdjustSpecialWidth => {
            if let Argument::Amount(dx) = binding.argument {
                ctx.adjust_special_width(dx);
            }
        }
        Action::AdjustGap => {
            if let Argument::Amount(dx) = binding.argument {
                ctx.adjust_gap(dx);
            }
        }
        Action::FocusNext => ctx.focus_next(),
        Action::FocusPrev => ctx.focus_prev(),
        Action::MakeFocusedSpecial => ctx.make_focused_special(),
        Action::ToggleFloat => ctx.toggle_float(),
        Action::SwitchToWorkspace => {
            if let Argument::Amount(n) = binding.argument {
                ctx.switch_to_workspace(n as usize);
            }
        }
        Action::SendToWorkspace => {
            if let Argument::Amount(n) = binding.argument {
                ctx.send_to_workspace(n as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_equal_requires_both_fields() {
        let b = Binding::new(Modifiers::MOD4, 42, Action::FocusNext, Argument::None);
        assert!(b.matches(Modifiers::MOD4, 42));
        assert!(!b.matches(Modifiers::MOD4, 43));
        assert!(!b.matches(Modifiers::NONE, 42));
    }
}
