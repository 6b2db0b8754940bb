//! Process spawning and child-reaping signal setup. `spawn` forks and execs
//! directly via raw `libc` calls; signal disposition goes through `nix`.

use std::ffi::CString;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// Ignore SIGCHLD so spawned children are reaped automatically and the
/// blocking X event read resumes across an interrupted syscall rather than
/// failing with EINTR.
pub fn install_sigchld_handler() {
    let flags = SaFlags::SA_NOCLDWAIT | SaFlags::SA_NOCLDSTOP | SaFlags::SA_RESTART;
    let action = SigAction::new(SigHandler::SigIgn, flags, SigSet::empty());

    // Safe: installed once at startup before the event loop spawns threads.
    match unsafe { sigaction(Signal::SIGCHLD, &action) } {
        Ok(_) => debug!("installed SIGCHLD disposition (SA_NOCLDWAIT|SA_NOCLDSTOP|SA_RESTART)"),
        Err(err) => error!("failed to install SIGCHLD handler: {}", err),
    }
}

/// Fork and exec `cmd`. The parent never waits; reaping is automatic via
/// `install_sigchld_handler`.
pub fn spawn(cmd: &[String]) {
    let Some(program) = cmd.first() else {
        return;
    };

    match unsafe { libc::fork() } {
        -1 => error!("fork failed while spawning {:?}", cmd),
        0 => {
            // Child: exec replaces this image entirely; any failure past
            // this point is fatal only to the child.
            let argv: Vec<CString> = cmd
                .iter()
                .map(|s| CString::new(s.as_str()).unwrap_or_else(|_| CString::new("?").unwrap()))
                .collect();
            let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|s| s.as_ptr()).collect();
            argv_ptrs.push(std::ptr::null());

            unsafe {
                libc::execvp(argv_ptrs[0], argv_ptrs.as_ptr());
                libc::_exit(1);
            }
        }
        pid => debug!("spawned {:?} as pid {}", program, pid),
    }
}
