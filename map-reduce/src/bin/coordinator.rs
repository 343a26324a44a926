use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use map_reduce::{Coordinator, CoordinatorConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "mrcoordinator", version = env!("CARGO_PKG_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Port to start coordinator server
    #[structopt(short, long)]
    port: u16,

    /// Seconds a task may stay in progress before it is reassigned
    #[structopt(short, long, default_value = "10")]
    timeout: u64,

    /// Milliseconds between two failure detector scans
    #[structopt(long, default_value = "500")]
    scan_interval_ms: u64,

    /// Number of reduce tasks
    #[structopt(long, default_value = "10")]
    nreduce: usize,

    /// Files to process, one map task each
    #[structopt(name = "FILE", parse(from_os_str))]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let config = CoordinatorConfig {
        nreduce: opt.nreduce,
        task_timeout: Duration::from_secs(opt.timeout),
        scan_interval: Duration::from_millis(opt.scan_interval_ms),
        ..Default::default()
    };
    let coordinator = Coordinator::new(opt.files, config)?;
    let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, opt.port);
    coordinator.launch(SocketAddr::V4(addr)).await?;
    Ok(())
}
