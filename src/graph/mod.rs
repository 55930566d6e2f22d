//! Graph algorithms on the fork-join engine and the graph shapes they take.
//!
//! Floyd–Warshall works on a dense `Matrix<f64>` of distances where
//! `f64::INFINITY` means "no edge". Dijkstra takes adjacency lists. Prim takes
//! a dense symmetric [WeightMatrix] where [NO_EDGE] marks a missing edge.

pub mod dijkstra;
pub mod floyd;
pub mod prim;

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::kernels::Matrix;

pub use dijkstra::{dijkstra_parallel, dijkstra_sequential, DijkstraSlot};
pub use floyd::{floyd_parallel, floyd_sequential};
pub use prim::{prim_parallel, prim_sequential, PrimSlot, SpanningTree, TreeEdge};

/// Distance of a vertex no path reaches.
pub const UNREACHABLE: u64 = u64::MAX;

/// Weight matrix entry for "no edge".
pub const NO_EDGE: u64 = 0;

/// Dense integer edge weights, `NO_EDGE` where there is no edge.
pub type WeightMatrix = Matrix<u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub to: usize,
    pub weight: u64,
}

/// Outgoing edges per vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdjacencyList {
    adj: Vec<Vec<Edge>>,
}

impl AdjacencyList {
    pub fn new(vertices: usize) -> Self {
        Self {
            adj: vec![Vec::new(); vertices],
        }
    }

    pub fn vertices(&self) -> usize {
        self.adj.len()
    }

    pub fn edges(&self, vertex: usize) -> &[Edge] {
        &self.adj[vertex]
    }

    pub fn add_directed(&mut self, from: usize, to: usize, weight: u64) -> Result<()> {
        let vertices = self.vertices();
        for vertex in [from, to] {
            if vertex >= vertices {
                return Err(EngineError::VertexOutOfRange { vertex, vertices });
            }
        }
        self.adj[from].push(Edge { to, weight });
        Ok(())
    }

    pub fn add_undirected(&mut self, a: usize, b: usize, weight: u64) -> Result<()> {
        self.add_directed(a, b, weight)?;
        self.add_directed(b, a, weight)
    }
}

pub(crate) fn check_vertex(vertex: usize, vertices: usize) -> Result<()> {
    if vertex < vertices {
        Ok(())
    } else {
        Err(EngineError::VertexOutOfRange { vertex, vertices })
    }
}

pub(crate) fn check_square<T>(matrix: &Matrix<T>, op: &'static str) -> Result<usize> {
    if matrix.is_square() {
        Ok(matrix.rows())
    } else {
        Err(EngineError::dimension(
            op,
            "square matrix",
            format!("{}x{}", matrix.rows(), matrix.cols()),
        ))
    }
}
