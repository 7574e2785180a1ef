//! still — freeze every Wayland output while a command runs.
//!
//! Each output is captured through wlr-screencopy and shown back as a
//! full-screen layer-shell overlay. Once every overlay is up the command runs
//! under `sh -c`; when it exits the overlays go away and its exit status
//! becomes ours.
//!
//! - Capture state machine (capture.rs, overlay.rs)
//! - Overlay presentation (render.rs)
//! - Launch gate and teardown (context.rs)
//! - Event loop and child supervision (scheduler.rs, supervisor.rs)
//! - Wayland backend (wayland/)

mod capture;
pub mod cli;
pub mod compositor;
pub mod context;
pub mod freeze;
pub mod overlay;
mod render;
pub mod scheduler;
pub mod supervisor;
pub mod wayland;

use cli::Invocation;
use freeze::{Launcher, WaylandLauncher};
use std::ffi::OsString;
use std::io::Write;

/// Parse `args`, run the freeze through `launcher` and return the exit code.
///
/// Usage problems are reported before `launcher` is ever consulted.
pub fn run_with<I, T>(
    args: I,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    launcher: &mut dyn Launcher,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match cli::parse(args) {
        Invocation::Help { bin } => {
            if let Err(e) = cli::write_usage(stdout, &bin) {
                log::warn!("[CLI] Failed to print usage: {}", e);
            }
            0
        }
        Invocation::Invalid { bin, message } => {
            let _ = writeln!(stderr, "ERROR: {}", message);
            let _ = cli::write_usage(stderr, &bin);
            1
        }
        Invocation::Freeze(config) => match launcher.freeze(&config) {
            Ok(outcome) => outcome.exit_code(),
            Err(e) => {
                log::error!("{}", e);
                1
            }
        },
    }
}

/// Entry point for the `still` binary.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let code = run_with(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
        &mut WaylandLauncher,
    );
    let _ = std::io::stdout().flush();
    std::process::exit(code)
}
