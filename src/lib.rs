//! Broker hook that delegates MQTT connect authentication and topic ACL checks
//! to a remote IAM service over gRPC, failing closed on every error path.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod metrics;
pub mod packets;
pub mod panic_handler;
pub mod proto;

pub use config::Config;
pub use error::{GatewayError, Result, TransportError};
pub use hooks::{Hook, HookEvent, HookRegistry, IamAuthHook};
