use tokio::sync::mpsc::Sender;

use crate::network::NetworkPackage;

pub trait Client {
    /// A client sending every request to `server_id` through the network.
    fn from_server(server_id: String, net_tx: Sender<NetworkPackage>) -> Self;
}
