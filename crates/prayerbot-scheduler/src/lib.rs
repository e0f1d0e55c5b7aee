//! # Prayerbot Scheduler
//!
//! Group roster, per-group recurrence and the pairing engine.
//!
//! ```text
//! poll loop (tokio interval)
//!   └── TriggerEngine::check_and_trigger_due
//!         ├── ScheduleClock::is_due      per group
//!         ├── partition                  random pairs, one triple when odd
//!         ├── MessagingGateway           open conversation, intro, leave
//!         └── RosterStore::mark_triggered
//! ```

pub mod clock;
pub mod engine;
pub mod partition;
pub mod persistence;
pub mod poll;
pub mod roster;
pub mod schedule;

#[cfg(test)]
mod testing;

pub use clock::ScheduleClock;
pub use engine::{SubsetFailure, SweepReport, TriggerEngine, TriggerReport, TriggerResult, intro_message};
pub use partition::{partition, partition_with};
pub use persistence::load_legacy_json;
pub use poll::{run_poll_loop, spawn_poll_loop};
pub use roster::RosterStore;
pub use schedule::{GroupRecord, Schedule, canonical_group_name, parse_weekday, weekday_name};
