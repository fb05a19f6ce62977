//! Benchmark support for txfile.

pub mod utils;
