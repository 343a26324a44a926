//! Map/reduce function pairs that can be plugged into a worker.

pub mod wc;
