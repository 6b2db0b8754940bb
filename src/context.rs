//! `WmContext` and everything it owns: the `AtomCache`, the `WindowMap`
//! framing/unframing pair, the tiling layout, focus control, drag control,
//! and the event dispatcher. These live as one `impl WmContext` block
//! rather than separate types — a single process-wide context threaded
//! explicitly through handlers, generic over the `XConn` abstraction so it
//! can run against a mock in tests.

use crate::bindings::{self, Binding};
use crate::client::{Client, WindowKind};
use crate::client_list::ClientId;
use crate::config::{
    Modifiers, BORDER_COLOR_FOCUSED, BORDER_COLOR_NORMAL, BORDER_WIDTH, INITIAL_GAP,
    KILL_CLIENT_KEYSYM, KILL_CLIENT_MODS, MIN_RESIZE_DIM, MOD_MASK, SPECIAL_WIDTH_PADDING,
    TOTAL_WORKSPACES,
};
use crate::error::WmError;
use crate::geometry::Rect;
use crate::workspace::Workspace;
use crate::xconn::{XConn, XEvent};

/// Atoms interned and cached at startup.
pub struct AtomCache {
    pub wm_protocols: u64,
    pub wm_delete_window: u64,
    pub wm_take_focus: u64,
    pub net_active_window: u64,
    pub net_wm_window_type: u64,
    pub net_wm_window_type_dialog: u64,
}

impl AtomCache {
    fn intern<X: XConn>(conn: &X) -> Result<Self, WmError> {
        Ok(AtomCache {
            wm_protocols: conn.intern_atom("WM_PROTOCOLS")?,
            wm_delete_window: conn.intern_atom("WM_DELETE_WINDOW")?,
            wm_take_focus: conn.intern_atom("WM_TAKE_FOCUS")?,
            net_active_window: conn.intern_atom("_NET_ACTIVE_WINDOW")?,
            net_wm_window_type: conn.intern_atom("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dialog: conn.intern_atom("_NET_WM_WINDOW_TYPE_DIALOG")?,
        })
    }
}

/// Drag/resize state: the dragged client (if any) plus the cursor/frame
/// geometry snapshot taken at drag start.
#[derive(Default)]
struct DragState {
    dragged: Option<(usize, ClientId)>,
    cursor_x0: i32,
    cursor_y0: i32,
    win_x0: i32,
    win_y0: i32,
    win_w0: u32,
    win_h0: u32,
}

pub struct WmContext<X: XConn> {
    conn: X,
    workspaces: Vec<Workspace>,
    current: usize,
    gap: i32,
    atoms: AtomCache,
    drag: DragState,
    has_moved_cursor: bool,
    is_running: bool,
}

/// The X-side effects of focusing `target` in `workspace_idx` (or clearing
/// focus), without touching the FocusStack. Free-standing rather than a
/// `&mut self` method so `unframe` can invoke it on the disjoint field
/// borrows it holds while inside the error-silenced region (see `unframe`).
fn apply_focus_to_x_raw<X: XConn>(
    conn: &X,
    atoms: &AtomCache,
    workspaces: &mut Vec<Workspace>,
    workspace_idx: usize,
    target: Option<ClientId>,
) {
    match target {
        None => {
            conn.set_input_focus_to_root();
            conn.set_active_window(atoms.net_active_window, None);
        }
        Some(id) => {
            let (frame, window) = {
                let client = workspaces[workspace_idx]
                    .clients
                    .get(id)
                    .expect("focus target must exist in its workspace");
                (client.frame, client.window)
            };
            conn.set_border_color(frame, BORDER_COLOR_FOCUSED);
            conn.set_active_window(atoms.net_active_window, Some(window));
            conn.set_input_focus(window);

            if conn.get_wm_protocols(window).contains(&atoms.wm_take_focus) {
                conn.send_client_message(window, atoms.wm_protocols, atoms.wm_take_focus);
            }
        }
    }
}

impl<X: XConn> WmContext<X> {
    /// Sets up substructure redirection, interns atoms, grabs the bindings'
    /// keys on root, and frames any already-mapped top-level windows.
    pub fn new(conn: X, bindings: &[Binding]) -> Result<Self, WmError> {
        conn.select_root_input()?;
        conn.set_default_cursor();
        let atoms = AtomCache::intern(&conn)?;

        let root = conn.root();
        for binding in bindings {
            conn.grab_key(binding.keysym, binding.modifiers.bits(), root);
        }

        let (screen_w, screen_h) = conn.screen_size();
        info!("screen {}x{}, root {:#x}", screen_w, screen_h, root);

        let mut workspaces = Vec::with_capacity(TOTAL_WORKSPACES);
        for _ in 0..TOTAL_WORKSPACES {
            workspaces.push(Workspace::new());
        }

        let mut ctx = WmContext {
            conn,
            workspaces,
            current: 0,
            gap: INITIAL_GAP,
            atoms,
            drag: DragState::default(),
            has_moved_cursor: false,
            is_running: true,
        };

        for window in ctx.conn.query_existing_windows()? {
            ctx.frame(window);
        }
        ctx.tile(ctx.current);

        Ok(ctx)
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    // ---- framing / unframing -------------------------------------------

    /// Frame `window`: create and map a wrapper, reparent the client into
    /// it, query its hints, and insert a `Client` into the active
    /// workspace. Returns `None` for override-redirect windows, which are
    /// never managed.
    fn frame(&mut self, window: u64) -> Option<ClientId> {
        let attrs = self.conn.get_window_attributes(window);
        if attrs.override_redirect {
            trace!("skipping override-redirect window {:#x}", window);
            return None;
        }

        let geometry = Rect::new(attrs.x, attrs.y, attrs.width, attrs.height);
        let frame = self.conn.create_frame(geometry, BORDER_WIDTH);
        self.conn.select_frame_input(frame);
        self.conn.add_to_save_set(window);
        self.conn.reparent(window, frame, 0, 0);
        self.conn.map_window(frame);
        self.conn.map_window(window);

        let hints = self.conn.get_size_hints(window);
        let mut client = Client::new(window, frame, hints, geometry);
        if self.should_float(window) {
            client.is_floating = true;
        }

        self.conn.grab_kill_key(window);
        self.conn.grab_drag_buttons(MOD_MASK.bits(), window);

        let id = self.workspaces[self.current].clients.insert(client);
        debug!(
            "framed window {:#x} as frame {:#x} on workspace {}",
            window, frame, self.current
        );
        Some(id)
    }

    /// Should-float policy. Fixed-size is handled inside
    /// `Client::new`/`SizeHints::is_fixed_size`; this covers the remaining
    /// two clauses.
    fn should_float(&self, window: u64) -> bool {
        match self.conn.get_window_type(window, self.atoms.net_wm_window_type) {
            Some(window_type) => window_type == self.atoms.net_wm_window_type_dialog,
            None => self.conn.has_transient_for(window),
        }
    }

    /// Unframe `client`: tear down the frame, transfer focus and remove the
    /// `Client` from its workspace, all with the error handler silenced.
    ///
    /// spec.md §4.3 numbers the whole procedure — including the focus
    /// transfer and the ClientList removal — under the single "with the X
    /// error handler temporarily swapped" clause, restoring only after a
    /// final sync; `original_source/src/window_manager.c`'s
    /// `unframe_client` confirms the ClientList-destroy half of this
    /// ordering runs before the handler is restored. The silenced region
    /// here therefore covers through the focus-transfer rather than ending
    /// at the four raw Xlib teardown calls.
    fn unframe(&mut self, workspace_idx: usize, id: ClientId) {
        let (window, frame) = {
            let client = self.workspaces[workspace_idx]
                .clients
                .get(id)
                .unwrap_or_else(|| panic!("unframe of unknown client {:?}", id));
            (client.window, client.frame)
        };

        debug!("unframing window {:#x} (frame {:#x})", window, frame);

        let conn = &self.conn;
        let atoms = &self.atoms;
        let workspaces = &mut self.workspaces;
        let drag = &mut self.drag;

        conn.with_errors_silenced(|| {
            conn.unmap_window(frame);
            conn.reparent(window, conn.root(), 0, 0);
            conn.remove_from_save_set(window);
            conn.destroy_window(frame);

            if drag.dragged.map(|(_, c)| c) == Some(id) {
                drag.dragged = None;
            }

            let was_focused = workspaces[workspace_idx].clients.focused() == Some(id);
            let replacement = if was_focused {
                let ws = &workspaces[workspace_idx];
                ws.clients.prev(id).or_else(|| ws.clients.next(id))
            } else {
                None
            };

            workspaces[workspace_idx].clients.destroy(id);

            if was_focused {
                apply_focus_to_x_raw(conn, atoms, workspaces, workspace_idx, replacement);
                if let Some(r) = replacement {
                    workspaces[workspace_idx].clients.focus_push(r);
                }
            }
        });
    }

    // ---- tiling layout ----------------------------------------------------

    /// Tile the non-floating clients of `workspace_idx` and clear the
    /// spurious-enter latch.
    pub fn tile(&mut self, workspace_idx: usize) {
        let (screen_w, screen_h) = self.conn.screen_size();
        let gap = self.gap;
        let special_width = self.workspaces[workspace_idx].special_width;

        let non_floating: Vec<u64> = self.workspaces[workspace_idx]
            .clients
            .iter()
            .filter(|(_, c)| !c.is_floating)
            .map(|(_, c)| c.frame)
            .collect();

        let n = non_floating.len();
        let w_max = screen_w as i32 - 2 * gap;
        let h_max = screen_h as i32 - 2 * gap;

        if n == 1 {
            self.conn
                .move_resize(non_floating[0], Rect::new(gap, gap, w_max.max(0) as u32, h_max.max(0) as u32));
        } else if n >= 2 {
            self.conn.move_resize(
                non_floating[0],
                Rect::new(gap, gap, special_width.max(0) as u32, h_max.max(0) as u32),
            );

            let rem_w = (w_max - special_width - gap).max(0) as u32;
            let other_h = ((h_max - gap * (n as i32 - 2)) / (n as i32 - 1)).max(0) as u32;
            let stack_x = special_width + 2 * gap;

            for (i, frame) in non_floating[1..].iter().enumerate() {
                let y = gap + i as i32 * (gap + other_h as i32);
                self.conn.move_resize(*frame, Rect::new(stack_x, y, rem_w, other_h));
            }
        }

        self.has_moved_cursor = false;
    }

    fn tile_active(&mut self) {
        self.tile(self.current);
    }

    // ---- focus control ------------------------------------------------

    /// Apply the X-side effects of focusing `target` (or clearing focus),
    /// without touching the FocusStack. Used both by `focus` and by
    /// `switch_to_workspace`, which must reassert focus on an
    /// already-"focused" (per the FocusStack) client whose frame was just
    /// remapped (see DESIGN.md's resolution of the matching Open Question).
    fn apply_focus_to_x(&mut self, workspace_idx: usize, target: Option<ClientId>) {
        apply_focus_to_x_raw(&self.conn, &self.atoms, &mut self.workspaces, workspace_idx, target);
    }

    /// Focus `target` in `workspace_idx`. Idempotent: focusing the
    /// already-focused client is a no-op.
    pub fn focus(&mut self, workspace_idx: usize, target: Option<ClientId>) {
        let currently_focused = self.workspaces[workspace_idx].clients.focused();
        if currently_focused == target {
            return;
        }

        if let Some(prev_id) = currently_focused {
            if let Some(prev_client) = self.workspaces[workspace_idx].clients.get(prev_id) {
                self.conn.set_border_color(prev_client.frame, BORDER_COLOR_NORMAL);
            }
        }

        self.apply_focus_to_x(workspace_idx, target);

        if let Some(id) = target {
            self.workspaces[workspace_idx].clients.focus_push(id);
        }
    }

    // ---- drag / resize control ------------------------------------------

    fn on_button_press(&mut self, window: u64, modifiers: u32, root_x: i32, root_y: i32) {
        if modifiers & MOD_MASK.bits() == 0 {
            return;
        }
        let Some(id) = self.workspaces[self.current]
            .clients
            .find_by_window(window, WindowKind::Window)
        else {
            return;
        };

        let frame = self.workspaces[self.current].clients.get(id).unwrap().frame;
        let geometry = self.conn.get_geometry(frame);
        self.conn.raise_window(frame);

        self.drag.dragged = Some((self.current, id));
        self.drag.cursor_x0 = root_x;
        self.drag.cursor_y0 = root_y;
        self.drag.win_x0 = geometry.x;
        self.drag.win_y0 = geometry.y;
        self.drag.win_w0 = geometry.w;
        self.drag.win_h0 = geometry.h;

        let was_tiled = {
            let client = self.workspaces[self.current].clients.get_mut(id).unwrap();
            let was_tiled = !client.is_floating;
            client.is_floating = true;
            was_tiled
        };
        if was_tiled {
            self.tile_active();
        }
    }

    fn on_motion_notify(&mut self, root_x: i32, root_y: i32, button1_held: bool, button3_held: bool) {
        self.has_moved_cursor = true;

        let Some((workspace_idx, id)) = self.drag.dragged else {
            return;
        };
        let Some(frame) = self.workspaces[workspace_idx].clients.get(id).map(|c| c.frame) else {
            return;
        };

        let dx = root_x - self.drag.cursor_x0;
        let dy = root_y - self.drag.cursor_y0;

        let new_geometry = if button1_held {
            Some(Rect::new(self.drag.win_x0 + dx, self.drag.win_y0 + dy, self.drag.win_w0, self.drag.win_h0))
        } else if button3_held {
            let hints = self.workspaces[workspace_idx].clients.get(id).unwrap().hints;
            let w = hints.clamp_width((self.drag.win_w0 as i32 + dx).max(0) as u32, MIN_RESIZE_DIM);
            let h = hints.clamp_height((self.drag.win_h0 as i32 + dy).max(0) as u32, MIN_RESIZE_DIM);
            Some(Rect::new(self.drag.win_x0, self.drag.win_y0, w, h))
        } else {
            None
        };

        if let Some(geometry) = new_geometry {
            self.conn.move_resize(frame, geometry);
            if let Some(client) = self.workspaces[workspace_idx].clients.get_mut(id) {
                client.geometry = geometry;
            }
        }
    }

    fn on_button_release(&mut self) {
        self.drag.dragged = None;
    }

    // ---- built-in key-binding actions -----------------------------------

    pub fn quit(&mut self) {
        info!("quit requested, shutting down event loop");
        self.is_running = false;
    }

    pub fn adjust_special_width(&mut self, dx: i32) {
        let (screen_w, _) = self.conn.screen_size();
        let max = (screen_w as i32 - 2 * self.gap - SPECIAL_WIDTH_PADDING).max(SPECIAL_WIDTH_PADDING);
        let ws = &mut self.workspaces[self.current];
        ws.special_width = (ws.special_width + dx).clamp(SPECIAL_WIDTH_PADDING, max);
        self.tile_active();
    }

    pub fn adjust_gap(&mut self, dx: i32) {
        self.gap = (self.gap + dx).max(0);
        self.tile_active();
    }

    /// Wrap-around focus advance over main list order; a no-op for lists
    /// of length <= 1.
    fn focus_relative(&mut self, direction: i32) {
        let ws = &self.workspaces[self.current];
        if ws.clients.len() <= 1 {
            return;
        }
        let order: Vec<ClientId> = ws.clients.iter().map(|(id, _)| id).collect();
        let idx = ws
            .clients
            .focused()
            .and_then(|id| order.iter().position(|&x| x == id))
            .unwrap_or(0);

        let len = order.len() as i32;
        let next_idx = (idx as i32 + direction).rem_euclid(len) as usize;
        let next_id = order[next_idx];
        self.focus(self.current, Some(next_id));
    }

    pub fn focus_next(&mut self) {
        self.focus_relative(1);
    }

    pub fn focus_prev(&mut self) {
        self.focus_relative(-1);
    }

    /// Remove the focused non-floating client and reinsert it at the head
    /// of the main list, making it the special pane.
    pub fn make_focused_special(&mut self) {
        let Some(old_id) = self.workspaces[self.current].clients.focused() else {
            return;
        };
        match self.workspaces[self.current].clients.get(old_id) {
            Some(c) if !c.is_floating => {}
            _ => return,
        }

        let ws = &mut self.workspaces[self.current];
        let client = ws.clients.remove(old_id);
        let new_id = ws.clients.insert(client);
        ws.clients.focus_remove(old_id);
        ws.clients.focus_push(new_id);

        self.tile_active();
    }

    pub fn toggle_float(&mut self) {
        let Some(id) = self.workspaces[self.current].clients.focused() else {
            return;
        };
        if let Some(client) = self.workspaces[self.current].clients.get_mut(id) {
            client.is_floating = !client.is_floating;
        }
        self.tile_active();
    }

    /// Switch the active workspace. Reasserts focus on `n`'s MRU head by
    /// going straight through `apply_focus_to_x`: the FocusStack's notion
    /// of "focused" didn't change across the switch, but the frame's X
    /// input focus was lost when it was unmapped, so `focus`'s idempotence
    /// guard must be bypassed here (see DESIGN.md).
    pub fn switch_to_workspace(&mut self, n: usize) {
        if n >= self.workspaces.len() || n == self.current {
            return;
        }

        let current_frames: Vec<u64> = self.workspaces[self.current].clients.iter().map(|(_, c)| c.frame).collect();
        for frame in current_frames {
            self.conn.unmap_window(frame);
        }

        self.current = n;
        self.has_moved_cursor = false;

        let new_frames: Vec<u64> = self.workspaces[n].clients.iter().map(|(_, c)| c.frame).collect();
        for frame in new_frames {
            self.conn.map_window(frame);
        }

        let target = self.workspaces[n].clients.focused();
        self.apply_focus_to_x(n, target);
    }

    /// Move the focused client to workspace `n` without unmapping/mapping
    /// it on its new workspace.
    pub fn send_to_workspace(&mut self, n: usize) {
        if n >= self.workspaces.len() || n == self.current {
            return;
        }
        let source = self.current;
        let Some(id) = self.workspaces[source].clients.focused() else {
            return;
        };

        let client = self.workspaces[source].clients.remove(id);
        let frame = client.frame;
        self.workspaces[source].clients.focus_remove(id);

        let new_id = self.workspaces[n].clients.insert(client);
        self.workspaces[n].clients.focus_push(new_id);

        self.conn.unmap_window(frame);

        // `focus_remove(id)` above already dropped the source FocusStack's
        // own entry for the moved client, so `source_replacement` here is
        // by construction identical to what `focus`'s idempotence guard
        // would read back — going through `focus` would always treat this
        // as a no-op and skip the X-side effects. Apply them directly.
        let source_replacement = self.workspaces[source].clients.focused();
        self.apply_focus_to_x(source, source_replacement);
        if let Some(r) = source_replacement {
            self.workspaces[source].clients.focus_push(r);
        }

        self.tile(source);
        self.tile(n);
    }

    // ---- kill-client ------------------------------------------------------

    pub fn kill_client(&mut self, window: u64) {
        let supports_delete = self.conn.get_wm_protocols(window).contains(&self.atoms.wm_delete_window);
        if supports_delete {
            self.conn
                .send_client_message(window, self.atoms.wm_protocols, self.atoms.wm_delete_window);
        } else {
            self.conn.kill_client(window);
        }
    }

    // ---- event dispatch ---------------------------------------------------

    fn process_event(&mut self, event: XEvent, bindings: &[Binding]) {
        match event {
            XEvent::KeyPress { modifiers, keysym, window } => {
                trace!("KeyPress mods={:#x} keysym={:#x} window={:#x}", modifiers, keysym, window);
                if modifiers == KILL_CLIENT_MODS.bits() && keysym == KILL_CLIENT_KEYSYM {
                    self.kill_client(window);
                } else {
                    bindings::dispatch(self, bindings, Modifiers::from_bits_truncate(modifiers), keysym);
                }
            }
            XEvent::ButtonPress { window, modifiers, root_x, root_y, .. } => {
                trace!("ButtonPress window={:#x}", window);
                self.on_button_press(window, modifiers, root_x, root_y);
            }
            XEvent::ButtonRelease { .. } => self.on_button_release(),
            XEvent::MotionNotify { root_x, root_y, button1_held, button3_held } => {
                self.on_motion_notify(root_x, root_y, button1_held, button3_held);
            }
            XEvent::ConfigureRequest(req) => {
                trace!("ConfigureRequest window={:#x}", req.window);
                self.conn.configure_raw(&req);
            }
            XEvent::MapRequest { window } => {
                debug!("MapRequest window={:#x}", window);
                if let Some(id) = self.frame(window) {
                    self.conn.sync();
                    self.focus(self.current, Some(id));
                    self.tile_active();
                }
            }
            XEvent::UnmapNotify { window, .. } => {
                // Looked up only in the active workspace: self-issued unmaps
                // during a workspace switch target a client whose workspace
                // is no longer current by the time this event is processed,
                // so they never reach this path.
                if let Some(id) = self.workspaces[self.current].clients.find_by_window(window, WindowKind::Window) {
                    self.unframe(self.current, id);
                    self.tile_active();
                }
            }
            XEvent::EnterNotify { window } => {
                if self.has_moved_cursor {
                    if let Some(id) = self.workspaces[self.current].clients.find_by_window(window, WindowKind::Frame) {
                        self.focus(self.current, Some(id));
                    }
                }
            }
            XEvent::Other => {}
        }
    }

    /// The main event loop: blocks on the next X event, classifies it, and
    /// dispatches. Exits when `is_running` is false.
    pub fn run(&mut self, bindings: &[Binding]) {
        while self.is_running {
            let event = self.conn.next_event();
            self.process_event(event, bindings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SizeHints;
    use crate::xconn::mock::{Call, MockConn};

    const SCREEN_W: u32 = 1920;
    const SCREEN_H: u32 = 1080;

    fn new_ctx() -> WmContext<MockConn> {
        let conn = MockConn::new(SCREEN_W, SCREEN_H);
        WmContext::new(conn, &[]).expect("setup against a mock never fails")
    }

    fn map(ctx: &mut WmContext<MockConn>, window: u64) -> ClientId {
        ctx.process_event(XEvent::MapRequest { window }, &[]);
        ctx.workspaces[ctx.current]
            .clients
            .find_by_window(window, WindowKind::Window)
            .expect("window should have been framed")
    }

    fn last_move_resize_for(ctx: &WmContext<MockConn>, frame: u64) -> Rect {
        ctx.conn
            .calls
            .borrow()
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::MoveResize(f, r) if *f == frame => Some(*r),
                _ => None,
            })
            .expect("expected a MoveResize call for this frame")
    }

    fn frame_of(ctx: &WmContext<MockConn>, id: ClientId) -> u64 {
        ctx.workspaces[ctx.current].clients.get(id).unwrap().frame
    }

    /// A single mapped window gets the full screen minus gaps, and is
    /// focused with `_NET_ACTIVE_WINDOW` set.
    #[test]
    fn single_window_fills_screen_and_is_focused() {
        let mut ctx = new_ctx();
        let id = map(&mut ctx, 1);
        let frame = frame_of(&ctx, id);

        assert_eq!(last_move_resize_for(&ctx, frame), Rect::new(10, 10, 1900, 1060));
        assert_eq!(ctx.workspaces[0].clients.focused(), Some(id));
        assert!(ctx
            .conn
            .calls
            .borrow()
            .iter()
            .any(|c| matches!(c, Call::SetActiveWindow(Some(1)))));
    }

    /// Two windows split special/stack; the newest (head) is special,
    /// and focus follows the newest.
    #[test]
    fn two_windows_split_special_and_stack() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let w2 = map(&mut ctx, 2);

        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w1)), Rect::new(10, 10, 960, 1060));
        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w2)), Rect::new(980, 10, 910, 1060));
        assert_eq!(ctx.workspaces[0].clients.focused(), Some(w2));
    }

    /// Three windows; the last mapped (at head) is special, the other two
    /// stack at equal heights.
    #[test]
    fn three_windows_stack_evenly() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let w2 = map(&mut ctx, 2);
        let w3 = map(&mut ctx, 3);

        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w3)), Rect::new(10, 10, 960, 1060));
        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w2)), Rect::new(980, 10, 910, 525));
        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w1)), Rect::new(980, 545, 910, 525));
        assert_eq!(ctx.workspaces[0].clients.focused(), Some(w3));
    }

    /// `make_focused_special` promotes the focused (non-special) client
    /// to the head, re-tiling with it as special.
    #[test]
    fn make_focused_special_promotes_to_head() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let w2 = map(&mut ctx, 2);
        let w3 = map(&mut ctx, 3);
        let _ = w1;

        ctx.focus(0, Some(w2));
        ctx.make_focused_special();

        assert_eq!(ctx.workspaces[0].clients.head(), Some(w2));
        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w2)), Rect::new(10, 10, 960, 1060));
        let _ = w3;
    }

    /// Sending the focused client to another workspace unmaps its
    /// frame, leaves the source workspace's remaining client focused and
    /// full-screen, and marks the target's focus without asserting it on X.
    #[test]
    fn send_to_workspace_unmaps_and_transfers_focus() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let w2 = map(&mut ctx, 2);
        let w2_frame = frame_of(&ctx, w2);
        let w1_frame = frame_of(&ctx, w1);

        let calls_before_send = ctx.conn.calls.borrow().len();
        ctx.send_to_workspace(1);
        let calls_since_send: Vec<Call> = ctx.conn.calls.borrow()[calls_before_send..].to_vec();

        assert!(calls_since_send.iter().any(|c| matches!(c, Call::Unmap(f) if *f == w2_frame)));
        assert_eq!(ctx.workspaces[0].clients.len(), 1);
        assert_eq!(ctx.workspaces[0].clients.focused(), Some(w1));
        assert_eq!(ctx.workspaces[1].clients.len(), 1);

        let moved_id = ctx.workspaces[1].clients.find_by_window(2, WindowKind::Window).unwrap();
        assert_eq!(ctx.workspaces[1].clients.focused(), Some(moved_id));
        assert_eq!(last_move_resize_for(&ctx, frame_of(&ctx, w1)), Rect::new(10, 10, 1900, 1060));

        // The source workspace's remaining client must actually receive the
        // X-side focus effects as part of *this* call, not just the
        // FocusStack bookkeeping it already had from being mapped earlier.
        assert!(calls_since_send
            .iter()
            .any(|c| matches!(c, Call::SetBorderColor(f, color) if *f == w1_frame && *color == BORDER_COLOR_FOCUSED)));
        assert!(calls_since_send.iter().any(|c| matches!(c, Call::SetInputFocus(w) if *w == 1)));
    }

    /// A fixed-size window is floating on arrival and untouched by the
    /// tiler.
    #[test]
    fn fixed_size_window_starts_floating_and_is_not_tiled() {
        let mut ctx = new_ctx();
        ctx.conn.set_hints(
            7,
            SizeHints { min_width: 300, max_width: 300, min_height: 200, max_height: 200 },
        );
        ctx.conn.set_attrs(7, crate::xconn::WindowAttributes { x: 50, y: 60, width: 300, height: 200, override_redirect: false, viewable: true });

        let id = map(&mut ctx, 7);
        assert!(ctx.workspaces[0].clients.get(id).unwrap().is_floating);

        let frame = frame_of(&ctx, id);
        assert!(!ctx.conn.calls.borrow().iter().any(|c| matches!(c, Call::MoveResize(f, _) if *f == frame)));
    }

    /// Tiling twice in a row yields identical geometry and clears the
    /// cursor-moved latch.
    #[test]
    fn tile_is_idempotent_and_clears_latch() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let w2 = map(&mut ctx, 2);
        ctx.process_event(XEvent::MotionNotify { root_x: 1, root_y: 1, button1_held: false, button3_held: false }, &[]);
        assert!(ctx.has_moved_cursor);

        ctx.tile(0);
        let first = (last_move_resize_for(&ctx, frame_of(&ctx, w1)), last_move_resize_for(&ctx, frame_of(&ctx, w2)));
        ctx.tile(0);
        let second = (last_move_resize_for(&ctx, frame_of(&ctx, w1)), last_move_resize_for(&ctx, frame_of(&ctx, w2)));

        assert_eq!(first, second);
        assert!(!ctx.has_moved_cursor);
    }

    /// Switching workspaces unmaps the old workspace's frames, maps the
    /// new one's, updates the active index, and clears the latch.
    #[test]
    fn switch_workspace_unmaps_and_maps_frames() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        ctx.process_event(XEvent::MotionNotify { root_x: 5, root_y: 5, button1_held: false, button3_held: false }, &[]);

        ctx.switch_to_workspace(2);

        assert_eq!(ctx.current, 2);
        assert!(!ctx.has_moved_cursor);
        let frame = frame_in(&ctx, 0, w1);
        assert!(ctx.conn.calls.borrow().iter().any(|c| matches!(c, Call::Unmap(f) if *f == frame)));
    }

    fn frame_in(ctx: &WmContext<MockConn>, workspace_idx: usize, id: ClientId) -> u64 {
        ctx.workspaces[workspace_idx].clients.get(id).unwrap().frame
    }

    /// Destroying the focused client transfers focus to its previous
    /// list neighbour (or next, if no previous).
    #[test]
    fn destroy_focused_transfers_to_prev_then_next() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let w2 = map(&mut ctx, 2);
        let w3 = map(&mut ctx, 3);
        let w2_frame = frame_of(&ctx, w2);

        // List order (head to tail): w3, w2, w1. w3 is focused (most recent map).
        let calls_before = ctx.conn.calls.borrow().len();
        ctx.unframe(0, w3);
        assert_eq!(ctx.workspaces[0].clients.focused(), Some(w2));

        // The replacement must actually receive the X-side focus effects,
        // not just become the FocusStack's new top: the idempotence guard
        // in `focus` would otherwise treat this as already-focused and
        // skip the border repaint / input focus / `_NET_ACTIVE_WINDOW`
        // update entirely.
        let calls_since_unframe: Vec<Call> = ctx.conn.calls.borrow()[calls_before..].to_vec();
        assert!(calls_since_unframe
            .iter()
            .any(|c| matches!(c, Call::SetBorderColor(f, color) if *f == w2_frame && *color == BORDER_COLOR_FOCUSED)));
        assert!(calls_since_unframe.iter().any(|c| matches!(c, Call::SetInputFocus(w) if *w == 2)));

        ctx.focus(0, Some(w1));
        ctx.unframe(0, w1);
        // w1 is the tail; its prev is w2, so focus transfers to w2.
        assert_eq!(ctx.workspaces[0].clients.focused(), Some(w2));
    }

    /// Destroying the last remaining client in a workspace clears
    /// `_NET_ACTIVE_WINDOW` on root, not just the FocusStack.
    #[test]
    fn destroy_last_client_clears_active_window() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);

        let calls_before = ctx.conn.calls.borrow().len();
        ctx.unframe(0, w1);
        assert_eq!(ctx.workspaces[0].clients.focused(), None);

        let calls_since_unframe: Vec<Call> = ctx.conn.calls.borrow()[calls_before..].to_vec();
        assert!(calls_since_unframe
            .iter()
            .any(|c| matches!(c, Call::SetActiveWindow(None))));
        assert!(calls_since_unframe.iter().any(|c| matches!(c, Call::SetInputFocusRoot)));
    }

    /// Kill sends WM_DELETE_WINDOW when supported, else falls back to
    /// XKillClient.
    #[test]
    fn kill_prefers_delete_window_protocol() {
        let mut ctx = new_ctx();
        let delete_atom = ctx.atoms.wm_delete_window;
        ctx.conn.protocols.borrow_mut().insert(1, vec![delete_atom]);
        ctx.kill_client(1);
        assert!(ctx
            .conn
            .calls
            .borrow()
            .iter()
            .any(|c| matches!(c, Call::SendClientMessage(1, _, d) if *d == delete_atom)));

        ctx.kill_client(2);
        assert!(ctx.conn.calls.borrow().iter().any(|c| matches!(c, Call::KillClient(2))));
    }

    /// Focusing the already-focused client is a no-op.
    #[test]
    fn focus_is_idempotent() {
        let mut ctx = new_ctx();
        let w1 = map(&mut ctx, 1);
        let calls_before = ctx.conn.calls.borrow().len();
        ctx.focus(0, Some(w1));
        assert_eq!(ctx.conn.calls.borrow().len(), calls_before);
    }
}
