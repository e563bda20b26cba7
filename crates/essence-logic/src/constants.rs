//! Time units and default limits shared by the rules and the engine.

pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Longest offline stretch that catch-up will credit.
pub const DEFAULT_MAX_OFFLINE_SECS: f64 = 7.0 * SECONDS_PER_DAY;

/// Live tick interval while the game is open.
pub const DEFAULT_TICK_INTERVAL_SECS: f64 = 1.0;

/// Idle time before relationship decay starts.
pub const DEFAULT_DECAY_GRACE_SECS: f64 = SECONDS_PER_DAY;

/// Relationship points lost per idle day past the grace period.
pub const DEFAULT_DECAY_PER_DAY: f64 = 1.0;

/// Upper bound on a single bulk purchase.
pub const MAX_BULK_PURCHASE: u64 = 10_000;
