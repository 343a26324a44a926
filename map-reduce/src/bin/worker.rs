use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use log::error;
use structopt::StructOpt;

use map_reduce::app::wc;
use map_reduce::{transport, Worker, WorkerConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "mrworker", version = env!("CARGO_PKG_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Coordinator address, e.g. 127.0.0.1:9999
    #[structopt(short, long)]
    server: SocketAddr,

    /// Directory for intermediate and output files
    #[structopt(short, long, default_value = ".", parse(from_os_str))]
    dir: PathBuf,

    /// Milliseconds to wait before asking again when no task is available
    #[structopt(long, default_value = "500")]
    retry_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let client = transport::connect(opt.server).await?;
    let config = WorkerConfig {
        dir: opt.dir,
        retry_interval: Duration::from_millis(opt.retry_ms),
    };
    let worker = Worker::new(client, config, wc::map, wc::reduce);
    if let Err(e) = worker.launch().await {
        error!("worker stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}
