//! Trait definitions for the seams between the scheduler and the outside world.

pub mod gateway;

pub use gateway::MessagingGateway;
