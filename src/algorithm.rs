mod bfs;

pub use bfs::DistanceOracle;
