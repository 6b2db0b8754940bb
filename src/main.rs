//! Entry point: opens the display, builds the `WmContext`, and runs the
//! event loop. Logging goes through `log`+`env_logger`; setup failures are
//! fatal.

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;

mod bindings;
mod client;
mod client_list;
mod config;
mod context;
mod error;
mod geometry;
mod process;
mod workspace;
mod xconn;

use env_logger::WriteStyle::Auto;

use context::WmContext;
use error::{die, WmError};
use xconn::XlibConn;

fn run() -> Result<(), WmError> {
    let conn = XlibConn::open()?;
    process::install_sigchld_handler();

    let bindings = config::default_bindings();
    let mut ctx = WmContext::new(conn, &bindings)?;

    info!("rwm ready, entering event loop");
    ctx.run(&bindings);
    Ok(())
}

fn main() {
    env_logger::builder()
        .format_timestamp(None)
        .write_style(Auto)
        .init();
    info!("logger initialised");

    if let Err(err) = run() {
        die(&err);
    }

    info!("shut down cleanly");
}
