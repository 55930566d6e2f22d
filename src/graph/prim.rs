//! Prim minimum spanning tree over a dense weight matrix.
//!
//! One vertex joins the tree per round: the first round picks the root, each
//! later round the outside vertex with the cheapest edge into the tree. A
//! disconnected graph stops early and yields a spanning tree of the root's
//! component only.

use serde::Serialize;

use crate::error::Result;
use crate::graph::{check_square, check_vertex, WeightMatrix, NO_EDGE, UNREACHABLE};
use crate::parallel::{Extremum, GreedySelection, IterationController, Range, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrimSlot {
    /// Cheapest known edge weight into the tree.
    pub key: u64,
    pub parent: Option<usize>,
    pub in_tree: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeEdge {
    pub from: usize,
    pub to: usize,
    pub weight: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpanningTree {
    pub edges: Vec<TreeEdge>,
    pub total_weight: u64,
}

impl SpanningTree {
    /// Whether the tree reaches all `vertices` vertices.
    pub fn spans(&self, vertices: usize) -> bool {
        self.edges.len() + 1 == vertices.max(1)
    }

    fn from_slots(graph: &WeightMatrix, slots: &[PrimSlot]) -> Self {
        let edges: Vec<TreeEdge> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.in_tree)
            .filter_map(|(to, slot)| {
                slot.parent.map(|from| TreeEdge {
                    from,
                    to,
                    weight: graph.get(from, to),
                })
            })
            .collect();
        let total_weight = edges.iter().fold(0u64, |acc, e| acc.saturating_add(e.weight));
        Self { edges, total_weight }
    }
}

struct Prim<'a> {
    graph: &'a WeightMatrix,
}

impl GreedySelection for Prim<'_> {
    type Slot = PrimSlot;
    type Key = u64;

    fn candidate(&self, slot: &PrimSlot) -> Option<u64> {
        (!slot.in_tree && slot.key != UNREACHABLE).then_some(slot.key)
    }

    fn finalize(&self, slots: &mut [PrimSlot], index: usize) {
        slots[index].in_tree = true;
    }

    fn relax_range(&self, chosen: Extremum<u64>, range: Range, slots: &mut [PrimSlot]) {
        let row = self.graph.row(chosen.index);
        for (slot, v) in slots.iter_mut().zip(range.indices()) {
            let weight = row[v];
            if weight != NO_EDGE && !slot.in_tree && weight < slot.key {
                slot.key = weight;
                slot.parent = Some(chosen.index);
            }
        }
    }
}

fn initial_slots(vertices: usize, root: usize) -> Vec<PrimSlot> {
    let mut slots = vec![
        PrimSlot {
            key: UNREACHABLE,
            parent: None,
            in_tree: false,
        };
        vertices
    ];
    slots[root].key = 0;
    slots
}

/// Grow a minimum spanning tree from `root` on one thread.
pub fn prim_sequential(graph: &WeightMatrix, root: usize) -> Result<SpanningTree> {
    let n = check_square(graph, "prim")?;
    if n == 0 {
        return Ok(SpanningTree::default());
    }
    check_vertex(root, n)?;
    let mut slots = initial_slots(n, root);
    for _ in 0..n {
        let mut next: Option<usize> = None;
        for (v, slot) in slots.iter().enumerate() {
            if !slot.in_tree && slot.key != UNREACHABLE && next.map_or(true, |u| slot.key < slots[u].key) {
                next = Some(v);
            }
        }
        let Some(u) = next else { break };
        slots[u].in_tree = true;
        for v in 0..n {
            let weight = graph.get(u, v);
            let slot = &mut slots[v];
            if weight != NO_EDGE && !slot.in_tree && weight < slot.key {
                slot.key = weight;
                slot.parent = Some(u);
            }
        }
    }
    Ok(SpanningTree::from_slots(graph, &slots))
}

/// Parallel [prim_sequential]: one reduction and one relax phase per round.
pub fn prim_parallel(pool: &WorkerPool, graph: &WeightMatrix, root: usize) -> Result<SpanningTree> {
    let n = check_square(graph, "prim")?;
    if n == 0 {
        return Ok(SpanningTree::default());
    }
    check_vertex(root, n)?;
    let mut slots = initial_slots(n, root);
    let mut controller = IterationController::new(pool);
    let outcome = controller.run_greedy(&Prim { graph }, &mut slots, n)?;
    tracing::debug!(rounds = outcome.rounds, stopped_early = outcome.stopped_early, "prim done");
    Ok(SpanningTree::from_slots(graph, &slots))
}
