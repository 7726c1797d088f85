use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub(crate) searches: usize,
    pub(crate) expanded_nodes: usize,
    pub(crate) truncated_searches: usize,
    pub(crate) bfs_runs: usize,
    pub(crate) time_us: u128,
}

impl Stats {
    pub fn print(&self) {
        info!(
            "Searches {:?} Time(microseconds) {:?} Expanded nodes {:?} Truncated searches {:?} BFS runs {:?}",
            self.searches, self.time_us, self.expanded_nodes, self.truncated_searches, self.bfs_runs
        );
    }

    pub fn expanded_nodes(&self) -> usize {
        self.expanded_nodes
    }

    pub fn searches(&self) -> usize {
        self.searches
    }
}
