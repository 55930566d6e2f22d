use std::num::NonZeroUsize;

use forkjoin::generate::{adjacency_list, connected_weight_matrix, distance_graph, Rng};
use forkjoin::graph::{
    dijkstra_parallel, dijkstra_sequential, floyd_parallel, floyd_sequential, prim_parallel, prim_sequential,
    AdjacencyList, WeightMatrix, NO_EDGE, UNREACHABLE,
};
use forkjoin::kernels::Matrix;
use forkjoin::parallel::{Backend, WorkerPool};
use forkjoin::EngineError;

fn pool(workers: usize, backend: Backend) -> WorkerPool {
    WorkerPool::new(NonZeroUsize::new(workers).unwrap(), backend).unwrap()
}

/// Shortest distances from `source` by relaxing every edge `n - 1` times.
fn bellman_ford(g: &Matrix<f64>, source: usize) -> Vec<f64> {
    let n = g.rows();
    let mut dist = vec![f64::INFINITY; n];
    dist[source] = 0.0;
    for _ in 1..n {
        for u in 0..n {
            for v in 0..n {
                let through = dist[u] + g.get(u, v);
                if through < dist[v] {
                    dist[v] = through;
                }
            }
        }
    }
    dist
}

fn bellman_ford_list(g: &AdjacencyList, source: usize) -> Vec<u64> {
    let n = g.vertices();
    let mut dist = vec![UNREACHABLE; n];
    dist[source] = 0;
    for _ in 1..n {
        for u in 0..n {
            if dist[u] == UNREACHABLE {
                continue;
            }
            for e in g.edges(u) {
                dist[e.to] = dist[e.to].min(dist[u] + e.weight);
            }
        }
    }
    dist
}

/// Kruskal over the dense weight matrix, for comparing tree weights.
fn kruskal_weight(g: &WeightMatrix) -> u64 {
    let n = g.rows();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            if g.get(i, j) != NO_EDGE {
                edges.push((g.get(i, j), i, j));
            }
        }
    }
    edges.sort_unstable();
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }
    let mut total = 0;
    for (w, a, b) in edges {
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        if ra != rb {
            parent[ra] = rb;
            total += w;
        }
    }
    total
}

#[test]
fn floyd_matches_single_source_brute_force() {
    let inf = f64::INFINITY;
    let g = Matrix::from_rows(vec![
        vec![0.0, 3.0, 8.0, inf, 4.0],
        vec![inf, 0.0, inf, 1.0, 7.0],
        vec![inf, 4.0, 0.0, inf, inf],
        vec![2.0, inf, 5.0, 0.0, inf],
        vec![inf, inf, inf, 6.0, 0.0],
    ])
    .unwrap();
    let expected = floyd_sequential(&g).unwrap();
    for source in 0..5 {
        assert_eq!(expected.row(source), bellman_ford(&g, source).as_slice(), "source {source}");
    }
    for workers in [1, 2, 5, 9] {
        for backend in [Backend::Threads, Backend::Rayon] {
            assert_eq!(floyd_parallel(&pool(workers, backend), &g).unwrap(), expected);
        }
    }
}

#[test]
fn floyd_parallel_is_bit_exact_on_generated_graphs() {
    let mut rng = Rng::new(31);
    for density in [0.1, 0.5, 0.9] {
        let g = distance_graph(40, density, &mut rng);
        let expected = floyd_sequential(&g).unwrap();
        for workers in [3, 40, 64] {
            assert_eq!(floyd_parallel(&pool(workers, Backend::Threads), &g).unwrap(), expected);
        }
    }
}

#[test]
fn dijkstra_agrees_with_brute_force() {
    let mut rng = Rng::new(77);
    for density in [0.05, 0.3, 0.8] {
        let g = adjacency_list(60, density, 50, &mut rng).unwrap();
        for source in [0, 17, 59] {
            let expected = bellman_ford_list(&g, source);
            assert_eq!(dijkstra_sequential(&g, source).unwrap(), expected);
            for workers in [1, 4, 60, 100] {
                assert_eq!(
                    dijkstra_parallel(&pool(workers, Backend::Rayon), &g, source).unwrap(),
                    expected,
                    "density={density} source={source} workers={workers}"
                );
            }
        }
    }
}

#[test]
fn dijkstra_rejects_bad_source() {
    let g = AdjacencyList::new(3);
    assert!(matches!(
        dijkstra_parallel(&pool(2, Backend::Threads), &g, 3),
        Err(EngineError::VertexOutOfRange { vertex: 3, vertices: 3 })
    ));
}

#[test]
fn prim_total_matches_kruskal() {
    let mut rng = Rng::new(5);
    for n in [2, 9, 50] {
        let g = connected_weight_matrix(n, 20, &mut rng);
        let expected = kruskal_weight(&g);
        let sequential = prim_sequential(&g, 0).unwrap();
        assert_eq!(sequential.total_weight, expected);
        assert!(sequential.spans(n));
        for workers in [1, 3, n, n + 7] {
            for backend in [Backend::Threads, Backend::Rayon] {
                let tree = prim_parallel(&pool(workers, backend), &g, 0).unwrap();
                assert_eq!(tree, sequential, "n={n} workers={workers}");
            }
        }
    }
}

#[test]
fn prim_root_does_not_change_the_weight() {
    let g = connected_weight_matrix(25, 9, &mut Rng::new(13));
    let from_zero = prim_parallel(&pool(4, Backend::Threads), &g, 0).unwrap();
    let from_last = prim_parallel(&pool(4, Backend::Threads), &g, 24).unwrap();
    assert_eq!(from_zero.total_weight, from_last.total_weight);
}
