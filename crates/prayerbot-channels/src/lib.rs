//! # prayerbot channels
//!
//! Slack transport and the chat command layer:
//! - [`slack::SlackGateway`]: Web API calls behind the `MessagingGateway` trait
//! - [`socket_mode::SocketModeListener`]: incoming mentions and DMs as a stream
//! - [`commands::CommandHandler`]: signup, stop, list, schedule, groups, trigger

pub mod commands;
pub mod slack;
pub mod socket_mode;

pub use commands::{Command, CommandHandler};
pub use slack::SlackGateway;
pub use socket_mode::{SocketModeListener, SocketModeStream};
