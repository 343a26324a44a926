//! On-disk contract between the map and reduce phases.
//!
//! Records go to bucket `ihash(key) % nreduce`. `ihash` is 64-bit FNV-1a over
//! the UTF-8 bytes of the key, truncated to 31 bits, so independently built
//! workers agree on the bucket of every key.
//!
//! Intermediate files are named `mr-<map id>-<bucket>` and hold one JSON
//! object per line; outputs are named `mr-out-<bucket>` and hold
//! `<key> <value>` lines in ascending key order. Every file is written to a
//! temporary name and renamed into place.

use std::fs::File;
use std::hash::Hasher;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use atomicwrites::{AllowOverwrite, AtomicFile};
use fnv::FnvHasher;

use crate::{Error, KeyValue, Result};

pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

pub fn bucket_of(key: &str, nreduce: usize) -> usize {
    ihash(key) as usize % nreduce
}

pub fn intermediate_path(dir: &Path, map_id: usize, bucket: usize) -> PathBuf {
    dir.join(format!("mr-{}-{}", map_id, bucket))
}

pub fn output_path(dir: &Path, bucket: usize) -> PathBuf {
    dir.join(format!("mr-out-{}", bucket))
}

/// Split records into `nreduce` buckets, keeping emission order inside each.
pub fn partition(records: Vec<KeyValue>, nreduce: usize) -> Vec<Vec<KeyValue>> {
    let mut buckets = vec![Vec::new(); nreduce];
    for kv in records {
        let b = bucket_of(&kv.key, nreduce);
        buckets[b].push(kv);
    }
    buckets
}

fn write_atomic<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> io::Result<()>,
{
    AtomicFile::new(path, AllowOverwrite)
        .write(|file| {
            let mut w = BufWriter::new(&*file);
            f(&mut w)?;
            w.flush()
        })
        .map_err(|e| match e {
            atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::io(path, e),
        })
}

pub fn write_intermediate(path: &Path, records: &[KeyValue]) -> Result<()> {
    write_atomic(path, |w| {
        for kv in records {
            serde_json::to_writer(&mut *w, kv)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    })
}

/// Read one intermediate file. A missing file is an empty bucket.
pub fn read_intermediate(path: &Path) -> Result<Vec<KeyValue>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.is_empty() {
            continue;
        }
        let kv = serde_json::from_str(&line).map_err(|source| Error::Decode {
            path: path.to_owned(),
            source,
        })?;
        records.push(kv);
    }
    Ok(records)
}

pub fn write_output(path: &Path, lines: &[(String, String)]) -> Result<()> {
    write_atomic(path, |w| {
        for (k, v) in lines {
            writeln!(w, "{} {}", k, v)?;
        }
        Ok(())
    })
}

/// Sort records by key and gather the values of each key, in input order.
pub fn group_sorted(mut records: Vec<KeyValue>) -> Vec<(String, Vec<String>)> {
    records.sort_by(|a, b| a.key.cmp(&b.key));
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for kv in records {
        match groups.last_mut() {
            Some((k, vs)) if *k == kv.key => vs.push(kv.value),
            _ => groups.push((kv.key, vec![kv.value])),
        }
    }
    groups
}
