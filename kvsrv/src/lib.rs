#![deny(missing_docs)]
#![deny(clippy::all)]
//! Single node KV store: one map behind one lock.

labrpc::service! {
    service kv_service {
        fn get(key: String) -> Option<String>;
        fn put(key: String, value: String) -> ();
        fn append(key: String, value: String) -> String;
    }
}

pub use kv_service::{Client as KvClient, Server as KvServer, Service as KvService};

/// KV Store Server.
pub mod kv;

/// KV Store Client.
pub mod client;

/// Util function for testing.
pub mod tests;

pub use client::Clerk;
pub use kv::KvStore;
