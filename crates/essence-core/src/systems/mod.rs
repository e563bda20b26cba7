//! Systems - the per-concern pieces a tick or command is built from

mod combat;
mod cooldowns;
mod production;
mod relationships;
mod unlocks;

pub use combat::*;
pub use cooldowns::*;
pub use production::*;
pub use relationships::*;
pub use unlocks::*;
