pub mod engine;
pub mod state;

pub use engine::{MonitorRegistry, MonitorStore, PgMonitorStore, TripMonitor};
pub use state::{AlertReason, MonitorConfig, MonitorEvent, MonitorState, TripPhase};
