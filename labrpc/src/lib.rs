//! A simulated RPC network living inside one process.
//!
//! Services are declared with [`service!`]; every server gets an id on a
//! [`Network`], and clients address servers by that id. Requests and
//! replies are JSON strings.

pub mod client;
mod macros;
pub mod network;
pub mod server;

pub use anyhow;
pub use async_trait::async_trait;
pub use futures;
pub use log;
pub use serde;
pub use serde_json;
pub use tokio;

pub use network::Network;
