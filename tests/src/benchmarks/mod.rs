//! # Kadmesh Benchmarks
//!
//! Hot paths of the membership layer, driven from `benches/`.

pub mod routing_table;
