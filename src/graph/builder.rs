
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashMap;

use crate::data_types::kmer::{self, Kmer};
use crate::data_types::kmer_node::KmerNode;
use crate::graph::path_graph::{KmerPathGraph, NodeId};
use crate::util::intervals::overlaps_closed;

/// A fully-aggregated pile of evidence for one (k-mer, window) pair
struct AggregatedKmer {
    kmer: Kmer,
    start: i64,
    end: i64,
    weight: u32,
    reference: bool,
}

impl KmerNode for AggregatedKmer {
    fn kmer(&self) -> Kmer {
        self.kmer
    }

    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn is_reference(&self) -> bool {
        self.reference
    }
}

/// Builds the initial path graph for one assembly window: evidence with an identical
/// (k-mer, window) pair piles into one single-k-mer node, and edges are wired wherever
/// the de Bruijn adjacency predicate holds and the successor's first-k-mer window
/// overlaps the predecessor's shifted terminal window.
/// # Arguments
/// * `k` - the k-mer size
/// * `evidence` - positional k-mer support from read ingestion
pub fn build_graph<N: KmerNode>(k: usize, evidence: &[N]) -> KmerPathGraph {
    let mut graph = KmerPathGraph::new(k);

    // aggregate in first-seen order so node creation is deterministic
    let mut aggregated: IndexMap<(Kmer, i64, i64), (u32, bool)> = IndexMap::new();
    for node in evidence {
        let entry = aggregated.entry((node.kmer(), node.start(), node.end())).or_insert((0, false));
        entry.0 += node.weight();
        entry.1 |= node.is_reference();
    }

    let mut by_prefix: FxHashMap<u64, Vec<NodeId>> = FxHashMap::default();
    for (&(km, start, end), &(weight, reference)) in aggregated.iter() {
        let id = graph.add_node(&AggregatedKmer {
            kmer: km,
            start,
            end,
            weight,
            reference,
        });
        by_prefix.entry(kmer::prefix(km)).or_default().push(id);
    }

    for a in graph.node_ids() {
        let (last, shifted_start, shifted_end) = {
            let node = graph.node(a);
            (node.last_kmer(), node.last_start() + 1, node.last_end() + 1)
        };
        if let Some(candidates) = by_prefix.get(&kmer::suffix(k, last)) {
            for &b in candidates {
                let (first_start, first_end) = {
                    let node = graph.node(b);
                    (node.first_start(), node.first_end())
                };
                if overlaps_closed(shifted_start, shifted_end, first_start, first_end) {
                    graph.add_edge(a, b);
                }
            }
        }
    }

    debug!(
        "built graph: {} evidence k-mers -> {} nodes, {} edges",
        evidence.len(),
        graph.live_node_count(),
        graph.live_edge_count()
    );
    graph
}

/// Absorbs every sole-successor/sole-predecessor chain with exactly contiguous windows
/// into a single path node. Returns the number of nodes absorbed.
pub fn compact_linear_paths(graph: &mut KmerPathGraph) -> usize {
    let mut absorbed = 0;
    for id in graph.node_ids() {
        if !graph.is_valid(id) {
            // already absorbed into a later node this pass
            continue;
        }
        loop {
            let pred = {
                let node = graph.node(id);
                if node.prev.len() != 1 {
                    break;
                }
                node.prev[0]
            };
            if pred == id {
                break;
            }
            let mergeable = {
                let node = graph.node(id);
                let p = graph.node(pred);
                p.next.len() == 1
                    && node.first_start() == p.last_start() + 1
                    && node.first_end() == p.last_end() + 1
            };
            if !mergeable {
                break;
            }
            graph.prepend(id, pred);
            absorbed += 1;
        }
    }
    debug!("path compaction absorbed {absorbed} nodes");
    absorbed
}

/// Recombines equal-content nodes sitting in immediately adjacent disjoint windows,
/// undoing splits that existed for positional bookkeeping only. Returns the number of
/// nodes coalesced away.
pub fn coalesce_adjacent_nodes(graph: &mut KmerPathGraph) -> usize {
    let mut by_content: Vec<(Vec<Kmer>, i64, NodeId)> = graph
        .node_ids()
        .into_iter()
        .map(|id| {
            let node = graph.node(id);
            (node.kmers().to_vec(), node.first_start(), id)
        })
        .collect();
    by_content.sort();

    let mut coalesced = 0;
    for (earlier, later) in by_content.iter().tuple_windows() {
        if earlier.0 == later.0
            && graph.is_valid(earlier.2)
            && graph.is_valid(later.2)
            && graph.can_coalesce_before_adjacent(later.2, earlier.2)
        {
            graph.coalesce_before_adjacent(later.2, earlier.2);
            coalesced += 1;
        }
    }
    debug!("coalesced {coalesced} window-adjacent nodes");
    coalesced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::kmer::encode_kmer;
    use crate::data_types::kmer_node::EvidenceKmer;

    const K: usize = 3;

    fn exact_evidence(seq: &[u8], start: i64, copies: usize) -> Vec<EvidenceKmer> {
        let mut evidence = Vec::new();
        for _ in 0..copies {
            for i in 0..=seq.len() - K {
                let km = encode_kmer(&seq[i..i + K], K).unwrap();
                evidence.push(EvidenceKmer::new(km, start + i as i64, start + i as i64, 1, false).unwrap());
            }
        }
        evidence
    }

    #[test]
    fn test_build_graph_aggregates_duplicates() {
        let evidence = exact_evidence(b"ACGTA", 100, 3);
        let graph = build_graph(K, &evidence);
        assert_eq!(graph.live_node_count(), 3);
        assert_eq!(graph.live_edge_count(), 2);
        for id in graph.node_ids() {
            assert_eq!(graph.node(id).total_weight(), 3);
        }
    }

    #[test]
    fn test_build_graph_respects_windows() {
        // identical k-mer chains at far-apart positions must not be cross-wired
        let mut evidence = exact_evidence(b"ACGTA", 100, 1);
        evidence.extend(exact_evidence(b"ACGTA", 500, 1));
        let graph = build_graph(K, &evidence);
        assert_eq!(graph.live_node_count(), 6);
        assert_eq!(graph.live_edge_count(), 4);
    }

    #[test]
    fn test_compact_linear_chain() {
        let evidence = exact_evidence(b"ACGTACGT", 100, 2);
        let mut graph = build_graph(K, &evidence);
        let before = graph.live_node_count();
        let absorbed = compact_linear_paths(&mut graph);
        assert_eq!(absorbed, before - 1);
        assert_eq!(graph.live_node_count(), 1);

        let ids = graph.node_ids();
        let node = graph.node(ids[0]);
        assert_eq!(node.length(), 6);
        assert_eq!(node.weights(), &[2, 2, 2, 2, 2, 2]);
        assert_eq!((node.first_start(), node.first_end()), (100, 100));
        graph.sanity_check(ids[0]);
    }

    #[test]
    fn test_compact_stops_at_branches() {
        // two reads diverge after a shared prefix; the shared run must stay separate
        // from both branch tails
        let mut evidence = exact_evidence(b"ACGTA", 100, 1);
        evidence.extend(exact_evidence(b"ACGTC", 100, 1));
        let mut graph = build_graph(K, &evidence);
        compact_linear_paths(&mut graph);

        // shared ACG+CGT run, then GTA and GTC tails
        assert_eq!(graph.live_node_count(), 3);
        let mut lengths: Vec<usize> = graph.node_ids().iter().map(|&id| graph.node(id).length()).collect();
        lengths.sort();
        assert_eq!(lengths, vec![1, 1, 2]);
    }

    #[test]
    fn test_coalesce_recombines_window_splits() {
        let km = encode_kmer(b"ACG", K).unwrap();
        let evidence = vec![
            EvidenceKmer::new(km, 10, 10, 3, false).unwrap(),
            EvidenceKmer::new(km, 11, 11, 3, false).unwrap(),
            EvidenceKmer::new(km, 12, 12, 3, false).unwrap(),
        ];
        let mut graph = build_graph(K, &evidence);
        assert_eq!(graph.live_node_count(), 3);

        let coalesced = coalesce_adjacent_nodes(&mut graph);
        assert_eq!(coalesced, 2);
        let ids = graph.node_ids();
        assert_eq!(ids.len(), 1);
        let node = graph.node(ids[0]);
        assert_eq!((node.first_start(), node.first_end()), (10, 12));
        assert_eq!(node.total_weight(), 3);
    }

    #[test]
    fn test_coalesce_skips_unequal_weights() {
        let km = encode_kmer(b"ACG", K).unwrap();
        let evidence = vec![
            EvidenceKmer::new(km, 10, 10, 3, false).unwrap(),
            EvidenceKmer::new(km, 11, 11, 5, false).unwrap(),
        ];
        let mut graph = build_graph(K, &evidence);
        assert_eq!(coalesce_adjacent_nodes(&mut graph), 0);
        assert_eq!(graph.live_node_count(), 2);
    }
}
