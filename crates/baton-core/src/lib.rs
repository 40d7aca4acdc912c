//! Core types, config, errors, and the session turn-coordination model for Baton.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod names;
pub mod protocol;
pub mod roster;
pub mod session;
