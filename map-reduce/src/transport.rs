//! Request/response plumbing between workers and the coordinator.
//!
//! Calls are not retried here; a failed call is returned to the caller.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use futures::{future, prelude::*};
use tarpc::{
    client,
    server::{self, incoming::Incoming, Channel},
    tokio_serde::formats::Json,
};

use crate::{Coordinator, Service, ServiceClient};

const MAX_CHANNELS_PER_PEER: u32 = 64;
const MAX_CHANNELS: usize = 256;

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

/// Bind `addr` and return the bound address together with the accept loop.
///
/// Every request runs as its own task, so calls from different workers are
/// handled concurrently.
pub async fn listen(
    coordinator: Coordinator,
    addr: SocketAddr,
) -> io::Result<(SocketAddr, impl Future<Output = ()>)> {
    let mut listener = tarpc::serde_transport::tcp::listen(&addr, Json::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);
    let local = listener.local_addr();

    let accept = listener
        // Ignore accept errors.
        .filter_map(|r| future::ready(r.ok()))
        .map(server::BaseChannel::with_defaults)
        .max_channels_per_key(MAX_CHANNELS_PER_PEER, |t| {
            t.transport()
                .peer_addr()
                .map(|a| a.ip())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        })
        .map(move |channel| channel.execute(coordinator.clone().serve()).for_each(spawn))
        .buffer_unordered(MAX_CHANNELS)
        .for_each(|_| async {});
    Ok((local, accept))
}

pub async fn connect(addr: SocketAddr) -> io::Result<ServiceClient> {
    let mut transport = tarpc::serde_transport::tcp::connect(addr, Json::default);
    transport.config_mut().max_frame_length(usize::MAX);
    Ok(ServiceClient::new(client::Config::default(), transport.await?).spawn())
}

/// A client wired to `coordinator` through an in-memory channel.
///
/// Must be called from within a tokio runtime.
pub fn in_process(coordinator: Coordinator) -> ServiceClient {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    let server = server::BaseChannel::with_defaults(server_transport);
    tokio::spawn(server.execute(coordinator.serve()).for_each(spawn));
    ServiceClient::new(client::Config::default(), client_transport).spawn()
}
