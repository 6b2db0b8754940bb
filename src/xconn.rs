//! The X11 connection abstraction: a trait/interface behind which a mock
//! can record requests and inject events. `XlibConn` is the real,
//! Xlib-backed implementation, written in an unsafe-`x11`-crate style;
//! `mock::MockConn` (test-only) records calls and lets unit tests inject
//! synthetic geometry/attribute replies and synthetic events.

use std::os::raw::{c_int, c_uint, c_ulong, c_void};
use std::sync::atomic::{AtomicBool, Ordering};

use x11::xlib;

/// Set by `detect_other_wm` when a `BadAccess` arrives while selecting
/// substructure redirection on root; checked right after the `XSync`
/// barrier in `select_root_input` to turn it into a `Result`.
static REDIRECTION_REFUSED: AtomicBool = AtomicBool::new(false);

use crate::error::WmError;
use crate::geometry::Rect;

/// Which field of a `ClientList` lookup key a caller wants compared
/// (re-exported here for convenience at the X boundary).
pub use crate::client::WindowKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowAttributes {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub override_redirect: bool,
    pub viewable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequestEvent {
    pub window: u64,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub value_mask: u64,
    pub above: u64,
    pub detail: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XEvent {
    KeyPress { modifiers: u32, keysym: u64, window: u64 },
    ButtonPress { window: u64, button: u32, modifiers: u32, root_x: i32, root_y: i32 },
    ButtonRelease { button: u32 },
    MotionNotify { root_x: i32, root_y: i32, button1_held: bool, button3_held: bool },
    ConfigureRequest(ConfigureRequestEvent),
    MapRequest { window: u64 },
    UnmapNotify { window: u64, event_window: u64 },
    EnterNotify { window: u64 },
    Other,
}

/// A handle on a live (or mocked) X connection. Generic code throughout the
/// crate is written against this trait rather than `x11::xlib` directly, so
/// it can be exercised without a running X server.
pub trait XConn {
    fn root(&self) -> u64;
    fn screen_size(&self) -> (u32, u32);

    fn flush(&self);
    fn sync(&self);

    /// Select substructure redirection/notify + pointer motion on root.
    /// Fails with `RedirectionRefused` if another WM already holds it.
    fn select_root_input(&self) -> Result<(), WmError>;

    fn set_default_cursor(&self);

    /// Existing top-level windows under root, in stacking order, queried at
    /// startup so already-mapped windows get framed too.
    fn query_existing_windows(&self) -> Result<Vec<u64>, WmError>;

    fn get_window_attributes(&self, window: u64) -> WindowAttributes;
    fn get_size_hints(&self, window: u64) -> crate::client::SizeHints;
    fn get_geometry(&self, window: u64) -> Rect;

    /// `_NET_WM_WINDOW_TYPE`'s sole value, if the property is set.
    fn get_window_type(&self, window: u64, net_wm_window_type: u64) -> Option<u64>;
    /// Whether `WM_TRANSIENT_FOR` is set on `window`.
    fn has_transient_for(&self, window: u64) -> bool;

    fn create_frame(&self, geometry: Rect, border_width: u32) -> u64;
    fn select_frame_input(&self, frame: u64);
    fn add_to_save_set(&self, window: u64);
    fn remove_from_save_set(&self, window: u64);
    fn reparent(&self, window: u64, parent: u64, x: i32, y: i32);
    fn map_window(&self, window: u64);
    fn unmap_window(&self, window: u64);
    fn destroy_window(&self, window: u64);
    /// Forcibly terminates the client's connection, distinct from
    /// `destroy_window`'s `XDestroyWindow` on a window the WM itself owns.
    fn kill_client(&self, window: u64);

    fn move_resize(&self, window: u64, geometry: Rect);
    fn configure_raw(&self, event: &ConfigureRequestEvent);
    fn raise_window(&self, window: u64);

    fn set_border_color(&self, window: u64, color: u64);

    fn grab_key(&self, keysym: u64, modifiers: u32, window: u64);
    fn grab_kill_key(&self, window: u64);
    fn grab_drag_buttons(&self, modifiers: u32, window: u64);

    fn set_input_focus(&self, window: u64);
    fn set_input_focus_to_root(&self);

    fn intern_atom(&self, name: &str) -> Result<u64, WmError>;
    fn get_wm_protocols(&self, window: u64) -> Vec<u64>;
    fn send_client_message(&self, window: u64, message_type: u64, data0: u64);

    fn set_active_window(&self, net_active_window: u64, window: Option<u64>);

    /// Block for the next X event.
    fn next_event(&self) -> XEvent;

    /// Run `f` with the process-wide X error handler swapped to a silencer,
    /// then `sync` and restore the previous handler — even if `f` panics.
    fn with_errors_silenced(&self, f: impl FnOnce());
}

/// The real, Xlib-backed connection. Every method is a thin, mostly-unsafe
/// wrapper directly over an `x11::xlib` call.
pub struct XlibConn {
    display: *mut xlib::Display,
    root: u64,
    screen_w: u32,
    screen_h: u32,
}

// Xlib's `Display*` is only ever touched from the single event-loop thread,
// so it is sound to let this type cross thread boundaries even though the
// raw pointer is not `Send`/`Sync` by default.
unsafe impl Send for XlibConn {}

impl XlibConn {
    /// Opens `$DISPLAY`. Fails with `WmError::NoDisplay`/`NoScreen`.
    pub fn open() -> Result<Self, WmError> {
        let display = unsafe { xlib::XOpenDisplay(std::ptr::null()) };
        if display.is_null() {
            return Err(WmError::NoDisplay);
        }
        let screen = unsafe { xlib::XDefaultScreenOfDisplay(display) };
        if screen.is_null() {
            return Err(WmError::NoScreen);
        }
        let root = unsafe { xlib::XDefaultRootWindow(display) };
        let (w, h) = unsafe { ((*screen).width as u32, (*screen).height as u32) };

        Ok(XlibConn {
            display,
            root,
            screen_w: w,
            screen_h: h,
        })
    }
}

impl Drop for XlibConn {
    fn drop(&mut self) {
        unsafe {
            xlib::XCloseDisplay(self.display);
        }
        info!("closed X display");
    }
}

impl XConn for XlibConn {
    fn root(&self) -> u64 {
        self.root
    }

    fn screen_size(&self) -> (u32, u32) {
        (self.screen_w, self.screen_h)
    }

    fn flush(&self) {
        unsafe {
            xlib::XFlush(self.display);
        }
    }

    fn sync(&self) {
        unsafe {
            xlib::XSync(self.display, xlib::False);
        }
    }

    fn select_root_input(&self) -> Result<(), WmError> {
        unsafe extern "C" fn detect_other_wm(
            _display: *mut xlib::Display,
            event: *mut xlib::XErrorEvent,
        ) -> c_int {
            if (*event).error_code == xlib::BadAccess {
                REDIRECTION_REFUSED.store(true, Ordering::SeqCst);
            }
            0
        }

        REDIRECTION_REFUSED.store(false, Ordering::SeqCst);
        unsafe {
            xlib::XSetErrorHandler(Some(detect_other_wm));
            xlib::XSelectInput(
                self.display,
                self.root,
                xlib::SubstructureRedirectMask
                    | xlib::SubstructureNotifyMask
                    | xlib::PointerMotionMask,
            );
            xlib::XSync(self.display, xlib::False);
            xlib::XSetErrorHandler(Some(fatal_error_handler));
        }

        if REDIRECTION_REFUSED.load(Ordering::SeqCst) {
            error!("substructure redirection refused, is another WM running?");
            return Err(WmError::RedirectionRefused);
        }
        Ok(())
    }

    fn set_default_cursor(&self) {
        unsafe {
            let cursor = xlib::XCreateFontCursor(self.display, x11::cursorfont::XC_left_ptr);
            xlib::XDefineCursor(self.display, self.root, cursor);
        }
    }

    fn query_existing_windows(&self) -> Result<Vec<u64>, WmError> {
        unsafe {
            let mut root_return: xlib::Window = 0;
            let mut parent_return: xlib::Window = 0;
            let mut children: *mut xlib::Window = std::ptr::null_mut();
            let mut nchildren: c_uint = 0;

            let ok = xlib::XQueryTree(
                self.display,
                self.root,
                &mut root_return,
                &mut parent_return,
                &mut children,
                &mut nchildren,
            );
            if ok == 0 {
                return Err(WmError::QueryTreeFailed);
            }

            let slice = std::slice::from_raw_parts(children, nchildren as usize);
            let windows = slice.to_vec();
            xlib::XFree(children as *mut c_void);
            Ok(windows)
        }
    }

    fn get_window_attributes(&self, window: u64) -> WindowAttributes {
        unsafe {
            let mut attrs: xlib::XWindowAttributes = std::mem::zeroed();
            xlib::XGetWindowAttributes(self.display, window, &mut attrs);
            WindowAttributes {
                x: attrs.x,
                y: attrs.y,
                width: attrs.width as u32,
                height: attrs.height as u32,
                override_redirect: attrs.override_redirect != 0,
                viewable: attrs.map_state == xlib::IsViewable,
            }
        }
    }

    fn get_size_hints(&self, window: u64) -> crate::client::SizeHints {
        use crate::client::HINT_DISABLED;
        unsafe {
            let mut hints: xlib::XSizeHints = std::mem::zeroed();
            let mut supplied: c_int = 0;
            let ok = xlib::XGetWMNormalHints(self.display, window, &mut hints, &mut supplied);

            let has = |flag: i64| ok != 0 && (hints.flags & flag) != 0;

            crate::client::SizeHints {
                min_width: if has(xlib::PMinSize) { hints.min_width } else { HINT_DISABLED },
                min_height: if has(xlib::PMinSize) { hints.min_height } else { HINT_DISABLED },
                max_width: if has(xlib::PMaxSize) { hints.max_width } else { HINT_DISABLED },
                max_height: if has(xlib::PMaxSize) { hints.max_height } else { HINT_DISABLED },
            }
        }
    }

    fn get_geometry(&self, window: u64) -> Rect {
        unsafe {
            let mut root_return: xlib::Window = 0;
            let (mut x, mut y): (c_int, c_int) = (0, 0);
            let (mut w, mut h): (c_uint, c_uint) = (0, 0);
            let (mut border, mut depth): (c_uint, c_uint) = (0, 0);
            xlib::XGetGeometry(
                self.display,
                window,
                &mut root_return,
                &mut x,
                &mut y,
                &mut w,
                &mut h,
                &mut border,
                &mut depth,
            );
            Rect::new(x, y, w, h)
        }
    }

    fn get_window_type(&self, window: u64, net_wm_window_type: u64) -> Option<u64> {
        get_atom_property(self.display, window, net_wm_window_type)
    }

    fn has_transient_for(&self, window: u64) -> bool {
        unsafe {
            let mut transient: xlib::Window = 0;
            xlib::XGetTransientForHint(self.display, window, &mut transient) != 0
        }
    }

    fn create_frame(&self, geometry: Rect, border_width: u32) -> u64 {
        unsafe {
            xlib::XCreateSimpleWindow(
                self.display,
                self.root,
                geometry.x,
                geometry.y,
                geometry.w,
                geometry.h,
                border_width,
                crate::config::BORDER_COLOR_NORMAL as c_ulong,
                0x000000,
            )
        }
    }

    fn select_frame_input(&self, frame: u64) {
        unsafe {
            xlib::XSelectInput(
                self.display,
                frame,
                xlib::SubstructureNotifyMask | xlib::EnterWindowMask,
            );
        }
    }

    fn add_to_save_set(&self, window: u64) {
        unsafe {
            xlib::XAddToSaveSet(self.display, window);
        }
    }

    fn remove_from_save_set(&self, window: u64) {
        unsafe {
            xlib::XRemoveFromSaveSet(self.display, window);
        }
    }

    fn reparent(&self, window: u64, parent: u64, x: i32, y: i32) {
        unsafe {
            xlib::XReparentWindow(self.display, window, parent, x, y);
        }
    }

    fn map_window(&self, window: u64) {
        unsafe {
            xlib::XMapWindow(self.display, window);
        }
    }

    fn unmap_window(&self, window: u64) {
        unsafe {
            xlib::XUnmapWindow(self.display, window);
        }
    }

    fn destroy_window(&self, window: u64) {
        unsafe {
            xlib::XDestroyWindow(self.display, window);
        }
    }

    fn kill_client(&self, window: u64) {
        unsafe {
            xlib::XKillClient(self.display, window);
        }
    }

    fn move_resize(&self, window: u64, geometry: Rect) {
        unsafe {
            xlib::XMoveResizeWindow(self.display, window, geometry.x, geometry.y, geometry.w, geometry.h);
        }
    }

    fn configure_raw(&self, event: &ConfigureRequestEvent) {
        let mut changes = xlib::XWindowChanges {
            x: event.x,
            y: event.y,
            width: event.width as c_int,
            height: event.height as c_int,
            border_width: event.border_width as c_int,
            sibling: event.above,
            stack_mode: event.detail,
        };
        unsafe {
            xlib::XConfigureWindow(self.display, event.window, event.value_mask as c_uint, &mut changes);
        }
    }

    fn raise_window(&self, window: u64) {
        unsafe {
            xlib::XRaiseWindow(self.display, window);
        }
    }

    fn set_border_color(&self, window: u64, color: u64) {
        unsafe {
            xlib::XSetWindowBorder(self.display, window, color as c_ulong);
        }
    }

    fn grab_key(&self, keysym: u64, modifiers: u32, window: u64) {
        unsafe {
            let keycode = xlib::XKeysymToKeycode(self.display, keysym);
            xlib::XGrabKey(
                self.display,
                keycode as c_int,
                modifiers,
                window,
                xlib::True,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
            );
        }
    }

    fn grab_kill_key(&self, window: u64) {
        self.grab_key(
            crate::config::KILL_CLIENT_KEYSYM,
            crate::config::KILL_CLIENT_MODS.bits(),
            window,
        );
    }

    fn grab_drag_buttons(&self, modifiers: u32, window: u64) {
        unsafe {
            for button in [xlib::Button1, xlib::Button3] {
                xlib::XGrabButton(
                    self.display,
                    button as c_uint,
                    modifiers,
                    window,
                    xlib::True,
                    (xlib::ButtonPressMask | xlib::ButtonReleaseMask | xlib::PointerMotionMask) as c_uint,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    0,
                    0,
                );
            }
        }
    }

    fn set_input_focus(&self, window: u64) {
        unsafe {
            xlib::XSetInputFocus(self.display, window, xlib::RevertToPointerRoot, xlib::CurrentTime);
        }
    }

    fn set_input_focus_to_root(&self) {
        self.set_input_focus(self.root);
    }

    fn intern_atom(&self, name: &str) -> Result<u64, WmError> {
        let c_name = std::ffi::CString::new(name).map_err(|_| WmError::AtomInternFailed("<invalid>"))?;
        let atom = unsafe { xlib::XInternAtom(self.display, c_name.as_ptr(), xlib::False) };
        if atom == 0 {
            return Err(WmError::AtomInternFailed("<unknown>"));
        }
        Ok(atom)
    }

    fn get_wm_protocols(&self, window: u64) -> Vec<u64> {
        unsafe {
            let mut protocols: *mut xlib::Atom = std::ptr::null_mut();
            let mut count: c_int = 0;
            let ok = xlib::XGetWMProtocols(self.display, window, &mut protocols, &mut count);
            if ok == 0 || protocols.is_null() {
                return Vec::new();
            }
            let slice = std::slice::from_raw_parts(protocols, count as usize);
            let result = slice.to_vec();
            xlib::XFree(protocols as *mut c_void);
            result
        }
    }

    fn send_client_message(&self, window: u64, message_type: u64, data0: u64) {
        unsafe {
            let mut event: xlib::XClientMessageEvent = std::mem::zeroed();
            event.type_ = xlib::ClientMessage;
            event.window = window;
            event.message_type = message_type;
            event.format = 32;
            event.data.set_long(0, data0 as i64);
            event.data.set_long(1, xlib::CurrentTime as i64);

            let mut xevent = xlib::XEvent { client_message: event };
            xlib::XSendEvent(self.display, window, xlib::False, 0, &mut xevent);
        }
    }

    fn set_active_window(&self, net_active_window: u64, window: Option<u64>) {
        unsafe {
            match window {
                Some(w) => {
                    let data = w as c_ulong;
                    xlib::XChangeProperty(
                        self.display,
                        self.root,
                        net_active_window,
                        xlib::XA_WINDOW,
                        32,
                        xlib::PropModeReplace,
                        &data as *const c_ulong as *const u8,
                        1,
                    );
                }
                None => {
                    xlib::XDeleteProperty(self.display, self.root, net_active_window);
                }
            }
        }
    }

    fn next_event(&self) -> XEvent {
        unsafe {
            let mut event: xlib::XEvent = std::mem::zeroed();
            xlib::XNextEvent(self.display, &mut event);
            translate_event(&event)
        }
    }

    fn with_errors_silenced(&self, f: impl FnOnce()) {
        unsafe extern "C" fn ignore_all(_d: *mut xlib::Display, _e: *mut xlib::XErrorEvent) -> c_int {
            0
        }
        unsafe {
            xlib::XSetErrorHandler(Some(ignore_all));
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        self.sync();
        unsafe {
            xlib::XSetErrorHandler(Some(fatal_error_handler));
        }
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }
}

unsafe extern "C" fn fatal_error_handler(
    display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    let mut buf = [0i8; 1024];
    xlib::XGetErrorText(display, (*event).error_code as c_int, buf.as_mut_ptr(), buf.len() as c_int);
    let message = std::ffi::CStr::from_ptr(buf.as_ptr()).to_string_lossy();
    error!("fatal X error: {}", message);
    std::process::exit(1);
}

unsafe fn get_atom_property(display: *mut xlib::Display, window: u64, property: u64) -> Option<u64> {
    let mut actual_type: xlib::Atom = 0;
    let mut actual_format: c_int = 0;
    let mut nitems: c_ulong = 0;
    let mut bytes_after: c_ulong = 0;
    let mut data: *mut u8 = std::ptr::null_mut();

    let status = xlib::XGetWindowProperty(
        display,
        window,
        property,
        0,
        1,
        xlib::False,
        xlib::XA_ATOM,
        &mut actual_type,
        &mut actual_format,
        &mut nitems,
        &mut bytes_after,
        &mut data,
    );

    if status != 0 || data.is_null() || nitems == 0 {
        return None;
    }

    let value = *(data as *const xlib::Atom);
    xlib::XFree(data as *mut c_void);
    Some(value)
}

unsafe fn translate_event(event: &xlib::XEvent) -> XEvent {
    match event.get_type() {
        xlib::KeyPress => {
            let e = event.key;
            XEvent::KeyPress {
                modifiers: e.state,
                keysym: xlib::XKeycodeToKeysym(e.display, e.keycode as u8, 0) as u64,
                window: e.window,
            }
        }
        xlib::ButtonPress => {
            let e = event.button;
            XEvent::ButtonPress {
                window: e.window,
                button: e.button,
                modifiers: e.state,
                root_x: e.x_root,
                root_y: e.y_root,
            }
        }
        xlib::ButtonRelease => XEvent::ButtonRelease { button: event.button.button },
        xlib::MotionNotify => {
            let e = event.motion;
            XEvent::MotionNotify {
                root_x: e.x_root,
                root_y: e.y_root,
                button1_held: (e.state & xlib::Button1Mask) != 0,
                button3_held: (e.state & xlib::Button3Mask) != 0,
            }
        }
        xlib::ConfigureRequest => {
            let e = event.configure_request;
            XEvent::ConfigureRequest(ConfigureRequestEvent {
                window: e.window,
                x: e.x,
                y: e.y,
                width: e.width as u32,
                height: e.height as u32,
                border_width: e.border_width as u32,
                value_mask: e.value_mask,
                above: e.above,
                detail: e.detail,
            })
        }
        xlib::MapRequest => XEvent::MapRequest { window: event.map_request.window },
        xlib::UnmapNotify => XEvent::UnmapNotify {
            window: event.unmap.window,
            event_window: event.unmap.event,
        },
        xlib::EnterNotify => XEvent::EnterNotify { window: event.crossing.window },
        _ => XEvent::Other,
    }
}
