//! Process-wide tracing setup for binaries and tests embedding the saga engine.

/// Initialize tracing with the `info` default level.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Subscriber construction (filters, output format).
pub mod tracing;
