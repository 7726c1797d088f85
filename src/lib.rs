pub mod algorithm;
pub mod common;
pub mod config;
pub mod generator;
pub mod graph;
pub mod map;
pub mod pipeline;
pub mod solver;
pub mod stat;
