//! A complete freeze: set up the child bridge, connect, run the loop and
//! tear everything down again.

use crate::cli::Config;
use crate::scheduler::{self, LoopError, Outcome};
use crate::supervisor::{Supervisor, SupervisorError};
use crate::wayland::{ConnectError, WaylandSource};

#[derive(Debug, thiserror::Error)]
pub enum FreezeError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Loop(#[from] LoopError),
}

/// Runs a parsed freeze request. Nothing before this seam talks to the
/// compositor.
pub trait Launcher {
    fn freeze(&mut self, config: &Config) -> Result<Outcome, FreezeError>;
}

/// The real thing, against the session's Wayland compositor.
#[derive(Debug, Default)]
pub struct WaylandLauncher;

impl Launcher for WaylandLauncher {
    fn freeze(&mut self, config: &Config) -> Result<Outcome, FreezeError> {
        // The child bridge must exist before anything can be spawned.
        let mut supervisor = Supervisor::new()?;
        let mut source = WaylandSource::connect(config.overlay_cursor)?;

        let result = scheduler::run(&mut source, &mut supervisor, &config.command);
        source.shutdown();
        Ok(result?)
    }
}
