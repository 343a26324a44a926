/// Declare a service: a request enum, a `Service` trait to implement, and a
/// matching `Client` and `Server` talking over a [`Network`](crate::Network).
#[macro_export]
macro_rules! service {
    () => {
        compile_error!("empty service is not allowed");
    };
    (
        $(#[$service_attr:meta])*
        service $svc_name:ident {
            $(
                $(#[$method_attr:meta])*
                fn $method_name:ident($($arg_id:ident: $arg_ty:ty),*) -> $output:ty;
            )*
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$service_attr])*
        pub mod $svc_name {
            use super::*;

            use $crate::network::NetworkPackage;
            use $crate::{server, client};

            use $crate::tokio::sync::{mpsc::{self, Sender, Receiver}, oneshot};
            use $crate::serde_json;
            use $crate::serde::{Serialize, Deserialize};
            use $crate::anyhow::{Result, anyhow};
            use $crate::async_trait;
            use $crate::log::{trace, warn};


            #[derive(Debug, Deserialize, Serialize)]
            pub enum Request {
                $(
                    #[allow(non_camel_case_types)]
                    $method_name {  $($arg_id : $arg_ty),* }
                ),*
            }

            mod response {
                use super::*;
                $(
                    #[derive(Deserialize, Serialize)]
                    #[allow(non_camel_case_types)]
                    pub struct $method_name {
                        pub data: $output
                    }
                )*
            }

            #[async_trait]
            pub trait Service: Send + 'static {
                $(
                    $(#[$method_attr])*
                    async fn $method_name(&mut self, $($arg_id : $arg_ty),* ) -> Result<$output>;
                )*
            }

            #[derive(Debug, Clone)]
            pub struct Client {
                server_id: String,
                tx: Sender<NetworkPackage>,
            }

            impl Client {

                $(
                    pub async fn $method_name(&self, $($arg_id : $arg_ty),* ) -> Result<$output> {
                        let req = Request::$method_name {
                            $($arg_id),*
                        };
                        let resp = self.call(serde_json::to_string(&req)?).await?;
                        let resp: response::$method_name = serde_json::from_str(&resp)?;
                        Ok(resp.data)
                    }
                )*

                pub async fn call(&self, req: String) -> Result<String> {
                    let (tx, rx) = oneshot::channel();
                    self.tx
                        .send(NetworkPackage { to: self.server_id.clone(), reply: tx, data: req.clone() })
                        .await
                        .map_err(|_| anyhow!("network is down"))?;
                    let resp = rx
                        .await
                        .map_err(|_| anyhow!("unable to receive from server {}", self.server_id))?;
                    trace!("req: {}, resp: {}", req, &resp);
                    Ok(resp)
                }
            }

            impl client::Client for Client {
                fn from_server(server_id: String, net_tx: Sender<NetworkPackage>) -> Self {
                    Self {
                        server_id,
                        tx: net_tx,
                    }
                }
            }

            #[derive(Debug)]
            pub struct Server<T: Service + Send> {
                svc: T,
                tx: Sender<NetworkPackage>,
                rx: Receiver<NetworkPackage>,
            }

            #[async_trait]
            impl<T: Service + Send> server::Server for Server<T> {
                type Service = T;

                fn from_service(svc: Self::Service) -> Self {
                    let (tx, rx) = mpsc::channel(100);
                    Self {svc, tx, rx}
                }

                fn client_chan(&self) -> Sender<NetworkPackage> {
                    self.tx.clone()
                }

                async fn handle(&mut self) -> Result<()> {
                    let NetworkPackage { reply, data, .. } = self
                        .rx
                        .recv()
                        .await
                        .ok_or_else(|| anyhow!("expected sender"))?;
                    trace!("handle recv: {}", &data);
                    let req: Request = serde_json::from_str(&data)?;
                    let resp = match req {
                        $(
                            Request::$method_name { $($arg_id),* } => {
                                let data = self.svc.$method_name($($arg_id),* ).await?;
                                serde_json::to_string(&response::$method_name { data })?
                            }
                        )*
                    };
                    trace!("handle send: {}", &resp);
                    if reply.send(resp).is_err() {
                        warn!("caller went away before the reply");
                    }
                    Ok(())
                }
            }
        }
    };
}
