//! WebSocket gateway for shared turn-based timers.
//!
//! The gateway hosts the HTTP/WebSocket server, keeps the process-wide
//! registry of sessions, runs one task per session that owns its state and
//! ticker, and fans personalized snapshots out to every participant.

pub mod broadcast;
pub mod connection;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod session_task;
pub mod state;

pub use registry::SessionRegistry;
pub use server::{build_router, start_gateway};
pub use session_task::{SessionHandle, SessionSettings};
pub use state::GatewayState;
