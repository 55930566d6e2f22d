//! Dijkstra single-source shortest paths over adjacency lists.
//!
//! Each round selects the closest unvisited vertex with a reduction phase and
//! relaxes its outgoing edges in a second phase. A worker only touches the
//! distance slots of its own vertex range, so it applies just the edges whose
//! target falls in that range.

use serde::Serialize;

use crate::error::Result;
use crate::graph::{check_vertex, AdjacencyList, UNREACHABLE};
use crate::parallel::{Extremum, GreedySelection, IterationController, Range, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DijkstraSlot {
    pub dist: u64,
    pub visited: bool,
}

struct Dijkstra<'a> {
    graph: &'a AdjacencyList,
}

impl GreedySelection for Dijkstra<'_> {
    type Slot = DijkstraSlot;
    type Key = u64;

    fn candidate(&self, slot: &DijkstraSlot) -> Option<u64> {
        (!slot.visited && slot.dist != UNREACHABLE).then_some(slot.dist)
    }

    fn finalize(&self, slots: &mut [DijkstraSlot], index: usize) {
        slots[index].visited = true;
    }

    fn relax_range(&self, chosen: Extremum<u64>, range: Range, slots: &mut [DijkstraSlot]) {
        for edge in self.graph.edges(chosen.index) {
            if !range.contains(edge.to) {
                continue;
            }
            let slot = &mut slots[edge.to - range.start];
            let through = chosen.value.saturating_add(edge.weight);
            if !slot.visited && through < slot.dist {
                slot.dist = through;
            }
        }
    }
}

fn initial_slots(vertices: usize, source: usize) -> Vec<DijkstraSlot> {
    let mut slots = vec![
        DijkstraSlot {
            dist: UNREACHABLE,
            visited: false,
        };
        vertices
    ];
    slots[source].dist = 0;
    slots
}

/// Distances from `source` to every vertex, [UNREACHABLE] where no path exists.
pub fn dijkstra_sequential(graph: &AdjacencyList, source: usize) -> Result<Vec<u64>> {
    let n = graph.vertices();
    if n == 0 {
        return Ok(Vec::new());
    }
    check_vertex(source, n)?;
    let mut slots = initial_slots(n, source);
    for _ in 0..n - 1 {
        let mut next: Option<usize> = None;
        for (v, slot) in slots.iter().enumerate() {
            if !slot.visited && slot.dist != UNREACHABLE && next.map_or(true, |u| slot.dist < slots[u].dist) {
                next = Some(v);
            }
        }
        let Some(u) = next else { break };
        slots[u].visited = true;
        let base = slots[u].dist;
        for edge in graph.edges(u) {
            let through = base.saturating_add(edge.weight);
            let target = &mut slots[edge.to];
            if !target.visited && through < target.dist {
                target.dist = through;
            }
        }
    }
    Ok(slots.into_iter().map(|s| s.dist).collect())
}

/// Parallel [dijkstra_sequential]: one reduction and one relax phase per round.
pub fn dijkstra_parallel(pool: &WorkerPool, graph: &AdjacencyList, source: usize) -> Result<Vec<u64>> {
    let n = graph.vertices();
    if n == 0 {
        return Ok(Vec::new());
    }
    check_vertex(source, n)?;
    let mut slots = initial_slots(n, source);
    let mut controller = IterationController::new(pool);
    let outcome = controller.run_greedy(&Dijkstra { graph }, &mut slots, n - 1)?;
    tracing::debug!(rounds = outcome.rounds, stopped_early = outcome.stopped_early, "dijkstra done");
    Ok(slots.into_iter().map(|s| s.dist).collect())
}
