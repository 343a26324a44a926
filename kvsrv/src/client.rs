use super::KvClient;

use labrpc::anyhow::Result;

/// Client for a KV server.
///
/// Calls are not retried; a failed call is returned to the caller.
#[derive(Debug, Clone)]
pub struct Clerk {
    client: KvClient,
}

impl Clerk {
    /// Wrap a network client of the server.
    pub fn new(client: KvClient) -> Self {
        Self { client }
    }

    /// Value of `key`, `None` if it was never written.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client.get(key.to_owned()).await
    }

    /// Replace the value of `key`.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.client.put(key.to_owned(), value.to_owned()).await
    }

    /// Append to the value of `key`, returning the value before the append.
    pub async fn append(&self, key: &str, value: &str) -> Result<String> {
        self.client.append(key.to_owned(), value.to_owned()).await
    }
}
