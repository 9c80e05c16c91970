// Domain models: targets, host records, counter samples, cycle events

mod event;
mod host;
mod sample;
mod target;

pub use event::{CycleEvent, SessionKind};
pub use host::{HostRecord, SystemFields, UNKNOWN};
pub use sample::{CounterSample, InterfaceIndex};
pub use target::Target;

/// Milliseconds since the Unix epoch; 0 if the system clock is before it.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
