use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::Future;
use log::{info, warn};
use tokio::sync::{
    mpsc::{self, Receiver, Sender},
    oneshot,
};

use crate::{client::Client, server::Server};

const CHANNEL_CAPACITY: usize = 100;

/// One request on its way to a server, with the channel to answer on.
#[derive(Debug)]
pub struct NetworkPackage {
    pub to: String,
    pub reply: oneshot::Sender<String>,
    pub data: String,
}

/// Routing table of a network, shared with whoever needs to inspect or cut
/// links while the network runs.
#[derive(Debug, Clone, Default)]
pub struct Nodes(Arc<Mutex<HashMap<String, Sender<NetworkPackage>>>>);

impl Nodes {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Sender<NetworkPackage>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: String, tx: Sender<NetworkPackage>) {
        self.lock().insert(id, tx);
    }

    fn get(&self, id: &str) -> Option<Sender<NetworkPackage>> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Cut `id` off the network. Requests to it fail until the server is
    /// rebuilt.
    pub fn disconnect(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }
}

pub struct Network {
    pub tx: Sender<NetworkPackage>,
    rx: Receiver<NetworkPackage>,
    nodes: Nodes,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            rx,
            nodes: Nodes::default(),
        }
    }

    pub fn nodes(&self) -> Nodes {
        self.nodes.clone()
    }

    /// Register a server under `id` and return a client for it, along with
    /// the routine driving the server.
    ///
    /// The server is reachable as soon as this returns. Whenever it fails it
    /// is rebuilt from `f`.
    pub fn register_service<S, C, F, V>(&self, id: String, f: F) -> (C, impl Future<Output = ()>)
    where
        F: Fn() -> V,
        S: Server<Service = V> + Send + 'static,
        C: Client,
    {
        let client = C::from_server(id.clone(), self.tx.clone());
        let mut server = S::from_service(f());
        self.nodes.insert(id.clone(), server.client_chan());

        let nodes = self.nodes.clone();
        (client, async move {
            while let Err(e) = server.run().await {
                info!("server {} restart: {}", id, e);
                server = S::from_service(f());
                nodes.insert(id.clone(), server.client_chan());
            }
        })
    }

    /// Forward packages to their servers.
    pub async fn run(&mut self) {
        while let Some(p) = self.rx.recv().await {
            match self.nodes.get(&p.to) {
                Some(node) => {
                    if node.send(p).await.is_err() {
                        warn!("send to node failed, dropped");
                    }
                }
                None => warn!("node {} not found, dropped", p.to),
            }
        }
    }
}
