use crate::network::NetworkPackage;
use anyhow::Result;
use tokio::sync::mpsc::Sender;

#[async_trait::async_trait]
pub trait Server {
    type Service;
    fn from_service(svc: Self::Service) -> Self;
    /// Channel the network forwards this server's requests to.
    fn client_chan(&self) -> Sender<NetworkPackage>;
    /// Serve one request.
    async fn handle(&mut self) -> Result<()>;
    /// Serve requests until one fails.
    async fn run(&mut self) -> Result<()> {
        loop {
            self.handle().await?;
        }
    }
}
