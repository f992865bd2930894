//! AIGA Core - composition root for the medical guide service.
//!
//! Wires configuration, storage, the hospital directory and the completion
//! clients into a [`TurnService`] that callers start and stop by session.

pub mod config;
pub mod context;
pub mod reply;
pub mod service;

pub use config::{AppConfig, AzureConfig};
pub use context::{AppContext, directory_from_file};
pub use reply::{failure_reply, shape_reply, stopped_reply};
pub use service::TurnService;
