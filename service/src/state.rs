//! Service and refresher state definitions.

use std::fmt;

/// Service operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Created, background loops not spawned yet.
    Starting,
    /// Background loops are running.
    Running,
    /// Shutdown requested, loops finishing their current cycle.
    ShuttingDown,
    /// Both loops have exited.
    Stopped,
}

impl ServiceState {
    /// Check if the service is running.
    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Running)
    }

    /// Check if the service is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Stopped)
    }
}

/// Phase of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefresherState {
    /// Waiting for the next cycle.
    Idle,
    /// Quote request in flight.
    Fetching,
    /// Rates changed; table updated and metrics recomputed.
    Updating,
    /// Rates unchanged; recomputation skipped.
    Skipping,
}

impl fmt::Display for RefresherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefresherState::Idle => "idle",
            RefresherState::Fetching => "fetching",
            RefresherState::Updating => "updating",
            RefresherState::Skipping => "skipping",
        };
        f.write_str(name)
    }
}
