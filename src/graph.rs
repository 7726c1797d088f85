use crate::algorithm::DistanceOracle;
use crate::common::{Cell, Vertex, VertexKind};
use crate::map::{GridModel, MAX_VERTICES};

use anyhow::{anyhow, ensure};
use tracing::{debug, warn};

/// Complete graph over the vertices of interest of a grid.
///
/// Vertex 0 is always the agent start, followed by the coins and then the
/// buttons in ascending cell order. `None` weights are unreachable pairs and
/// are never traversed.
#[derive(Debug, Clone)]
pub struct ObjectGraph {
    vertices: Vec<Vertex>,
    weights: Vec<Vec<Option<usize>>>,
}

impl ObjectGraph {
    pub fn build(grid: &GridModel, oracle: &mut DistanceOracle) -> Self {
        let mut vertices = vec![Vertex {
            cell: grid.agent_start,
            kind: VertexKind::Start,
        }];
        vertices.extend(grid.coins.iter().map(|(&cell, &value)| Vertex {
            cell,
            kind: VertexKind::Coin { value },
        }));
        vertices.extend(grid.buttons.iter().map(|(&cell, &delay)| Vertex {
            cell,
            kind: VertexKind::Button { delay },
        }));

        let n = vertices.len();
        let mut weights = vec![vec![None; n]; n];
        for u in 0..n {
            weights[u][u] = Some(0);
            for v in (u + 1)..n {
                let distance = oracle.distance(vertices[u].cell, vertices[v].cell);
                weights[u][v] = distance;
                weights[v][u] = distance;
            }
        }

        let graph = ObjectGraph { vertices, weights };
        if graph.len() > 1 && graph.neighbors(0).next().is_none() {
            warn!("agent at {} cannot reach any object", grid.agent_start);
        }
        debug!(
            "object graph: {} vertices, {} bfs runs",
            graph.len(),
            oracle.bfs_runs()
        );
        graph
    }

    /// Builds a graph from explicit weights; `vertices[0]` must be the start.
    pub fn from_weights(
        vertices: Vec<Vertex>,
        weights: Vec<Vec<Option<usize>>>,
    ) -> anyhow::Result<Self> {
        let n = vertices.len();
        ensure!(n > 0, "graph needs a start vertex");
        ensure!(n <= MAX_VERTICES, "graph has {n} vertices, at most {MAX_VERTICES} supported");
        ensure!(
            vertices[0].kind == VertexKind::Start,
            "first vertex must be the start"
        );
        ensure!(
            vertices[1..].iter().all(|v| v.kind != VertexKind::Start),
            "graph has more than one start vertex"
        );
        ensure!(
            weights.len() == n && weights.iter().all(|row| row.len() == n),
            "weight matrix must be {n}x{n}"
        );
        for u in 0..n {
            if weights[u][u] != Some(0) {
                return Err(anyhow!("weight({u}, {u}) must be zero"));
            }
            for v in (u + 1)..n {
                if weights[u][v] != weights[v][u] {
                    return Err(anyhow!("weight({u}, {v}) differs from weight({v}, {u})"));
                }
            }
        }

        Ok(ObjectGraph { vertices, weights })
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, index: usize) -> &Vertex {
        &self.vertices[index]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn cell(&self, index: usize) -> Cell {
        self.vertices[index].cell
    }

    pub fn weight(&self, u: usize, v: usize) -> Option<usize> {
        self.weights[u][v]
    }

    /// Other vertices reachable from `u`, with their weights.
    pub fn neighbors(&self, u: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.weights[u]
            .iter()
            .enumerate()
            .filter(move |(v, _)| *v != u)
            .filter_map(|(v, weight)| weight.map(|w| (v, w)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(row: usize, col: usize) -> Vertex {
        Vertex {
            cell: Cell::new(row, col),
            kind: VertexKind::Coin { value: 1 },
        }
    }

    #[test]
    fn test_build_from_grid() {
        let grid = GridModel::from_tokens(&[
            vec!["A", ".", "C2"],
            vec!["#", "#", "."],
            vec!["SD4", "#", "C"],
        ])
        .unwrap();
        let mut oracle = DistanceOracle::new(&grid);
        let graph = ObjectGraph::build(&grid, &mut oracle);

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.vertex(0).kind, VertexKind::Start);
        assert_eq!(graph.vertex(1).kind, VertexKind::Coin { value: 2 });
        assert_eq!(graph.vertex(2).cell, Cell::new(2, 2));
        assert_eq!(graph.vertex(3).kind, VertexKind::Button { delay: 4 });

        assert_eq!(graph.weight(0, 1), Some(2));
        assert_eq!(graph.weight(0, 2), Some(4));
        assert_eq!(graph.weight(1, 2), Some(2));
        assert_eq!(graph.weight(0, 3), None);
        assert_eq!(graph.weight(3, 0), None);
        assert_eq!(graph.weight(2, 2), Some(0));
        assert_eq!(graph.neighbors(3).count(), 0);
        // One bfs per vertex except the last, whose pairs are all cached.
        assert_eq!(oracle.bfs_runs(), 3);
    }

    #[test]
    fn test_isolated_start_still_builds() {
        let grid = GridModel::from_tokens(&[vec!["A", "#", "C"]]).unwrap();
        let mut oracle = DistanceOracle::new(&grid);
        let graph = ObjectGraph::build(&grid, &mut oracle);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.neighbors(0).count(), 0);
    }

    #[test]
    fn test_from_weights_validation() {
        let start = Vertex {
            cell: Cell::new(0, 0),
            kind: VertexKind::Start,
        };

        let ok = ObjectGraph::from_weights(
            vec![start, coin(0, 1)],
            vec![vec![Some(0), Some(1)], vec![Some(1), Some(0)]],
        );
        assert!(ok.is_ok());

        let asymmetric = ObjectGraph::from_weights(
            vec![start, coin(0, 1)],
            vec![vec![Some(0), Some(1)], vec![None, Some(0)]],
        );
        assert!(asymmetric.is_err());

        let no_start = ObjectGraph::from_weights(vec![coin(0, 1)], vec![vec![Some(0)]]);
        assert!(no_start.is_err());
    }
}
