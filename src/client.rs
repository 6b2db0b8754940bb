//! The `Client` type — one managed top-level application window paired
//! with its WM-created frame.

use crate::geometry::Rect;

/// Sentinel used for a disabled size-hint axis.
pub const HINT_DISABLED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl Default for SizeHints {
    fn default() -> Self {
        SizeHints {
            min_width: HINT_DISABLED,
            min_height: HINT_DISABLED,
            max_width: HINT_DISABLED,
            max_height: HINT_DISABLED,
        }
    }
}

impl SizeHints {
    /// A client with equal, enabled min/max on both axes is fixed-size.
    pub fn is_fixed_size(&self) -> bool {
        self.max_width != HINT_DISABLED
            && self.max_width == self.min_width
            && self.max_height != HINT_DISABLED
            && self.max_height == self.min_height
    }

    /// Clamp a candidate dimension to `[min, max]` when those hints are
    /// enabled, with an absolute floor.
    pub fn clamp_width(&self, w: u32, floor: u32) -> u32 {
        clamp_dim(w, self.min_width, self.max_width, floor)
    }

    pub fn clamp_height(&self, h: u32, floor: u32) -> u32 {
        clamp_dim(h, self.min_height, self.max_height, floor)
    }
}

fn clamp_dim(d: u32, min: i32, max: i32, floor: u32) -> u32 {
    let mut d = d.max(floor);
    if min != HINT_DISABLED && d < min as u32 {
        d = min as u32;
    }
    if max != HINT_DISABLED && d > max as u32 {
        d = max as u32;
    }
    d.max(floor)
}

/// Which field a `ClientList::find_by_window` search key should be compared
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Frame,
    Window,
}

/// One managed top-level application window.
///
/// `next`/`prev` links are not stored here as pointers: `ClientList` (see
/// `client_list.rs`) holds clients in a slab keyed by stable index and
/// keeps the links as indices alongside.
#[derive(Debug, Clone)]
pub struct Client {
    pub window: u64,
    pub frame: u64,
    pub is_floating: bool,
    pub hints: SizeHints,
    pub geometry: Rect,
}

impl Client {
    pub fn new(window: u64, frame: u64, hints: SizeHints, geometry: Rect) -> Self {
        let is_floating = hints.is_fixed_size();
        Client {
            window,
            frame,
            is_floating,
            hints,
            geometry,
        }
    }

    pub fn id_for(&self, kind: WindowKind) -> u64 {
        match kind {
            WindowKind::Frame => self.frame,
            WindowKind::Window => self.window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_size_hints_start_floating() {
        let hints = SizeHints {
            min_width: 300,
            max_width: 300,
            min_height: 200,
            max_height: 200,
        };
        let c = Client::new(1, 2, hints, Rect::default());
        assert!(c.is_floating);
    }

    #[test]
    fn disabled_hints_do_not_float() {
        let c = Client::new(1, 2, SizeHints::default(), Rect::default());
        assert!(!c.is_floating);
    }

    #[test]
    fn clamp_respects_floor_and_bounds() {
        let hints = SizeHints {
            min_width: 100,
            max_width: 400,
            min_height: HINT_DISABLED,
            max_height: HINT_DISABLED,
        };
        assert_eq!(hints.clamp_width(1, 5), 100);
        assert_eq!(hints.clamp_width(1000, 5), 400);
        assert_eq!(hints.clamp_height(1, 5), 5);
    }
}
