//! # prayerbot core
//! Shared building blocks for the prayerbot crates: configuration, the error
//! type, message types and the `MessagingGateway` trait the scheduler talks to.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::PrayerBotConfig;
pub use error::{PrayerError, Result};
pub use traits::MessagingGateway;
pub use types::{BotIdentity, IncomingMessage};
