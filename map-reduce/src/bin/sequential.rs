//! Single process reference run, producing the same `mr-out-<bucket>` files
//! a distributed job would.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use log::trace;
use structopt::StructOpt;

use map_reduce::app::wc::{map, reduce};
use map_reduce::partition::{bucket_of, output_path, write_output};

#[derive(StructOpt, Debug)]
#[structopt(name = "mrsequential", version = env!("CARGO_PKG_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opt {
    /// Files to process
    #[structopt(name = "FILE", parse(from_os_str))]
    files: Vec<PathBuf>,

    /// Directory to write output files to
    #[structopt(short, long, default_value = ".", parse(from_os_str))]
    dir: PathBuf,

    #[structopt(long, default_value = "10")]
    nreduce: usize,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    anyhow::ensure!(opt.nreduce > 0, "--nreduce should be non-zero");

    let mut cnt = BTreeMap::<String, Vec<String>>::new();
    for fname in opt.files.iter() {
        let contents = fs::read_to_string(fname)
            .with_context(|| format!("cannot read {}", fname.display()))?;
        for kv in map(fname, &contents) {
            cnt.entry(kv.key).or_default().push(kv.value);
        }
    }

    // Keys come out of the BTreeMap sorted, so every bucket stays sorted.
    let mut result = vec![Vec::new(); opt.nreduce];
    for (k, vs) in cnt {
        let v = reduce(&k, &vs);
        result[bucket_of(&k, opt.nreduce)].push((k, v));
    }
    for (r, lines) in result.iter().enumerate() {
        let path = output_path(&opt.dir, r);
        write_output(&path, lines)?;
        trace!("output {:?} ({} keys)", path, lines.len());
    }
    Ok(())
}
