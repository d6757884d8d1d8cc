
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::graph::path_graph::{KmerPathGraph, NodeId};
use crate::util::intervals::overlaps_closed;

/// A position-sliced, read-only view of a path node: a maximal sub-range of the node's
/// ambiguity window (first-k-mer coordinates) over which the set of active successors or
/// predecessors does not change.
///
/// Subnodes are computed on demand by [`KmerPathGraph::as_subnodes_by_next`] and
/// [`KmerPathGraph::as_subnodes_by_prev`]; they are never stored in the graph and become
/// stale as soon as the underlying node's version changes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KmerPathSubnode {
    node: NodeId,
    start: i64,
    end: i64,
}

impl KmerPathSubnode {
    pub(crate) fn new(node: NodeId, start: i64, end: i64) -> Self {
        KmerPathSubnode { node, start, end }
    }

    /// The path node this view slices
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// First-k-mer start position of the slice
    pub fn start(&self) -> i64 {
        self.start
    }

    /// First-k-mer end position of the slice
    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn width(&self) -> i64 {
        self.end - self.start + 1
    }
}

impl KmerPathGraph {
    /// Partitions the node's window into maximal contiguous sub-ranges over which the set
    /// of active successors does not change. A successor is active at position `p` when
    /// its first-k-mer window contains `p + length`. A node with no successors yields one
    /// subnode spanning its full window.
    pub fn as_subnodes_by_next(&mut self, id: NodeId) -> Vec<KmerPathSubnode> {
        self.ensure_edges_sorted(id);
        let node = self.node(id);
        let (window_start, window_end) = (node.first_start(), node.first_end());
        let length = node.length() as i64;
        // per successor: the positions of this node at which it is reachable
        let bounds: Vec<(i64, i64)> = node
            .next
            .iter()
            .map(|&n| {
                let adj = self.node(n);
                (adj.first_start() - length, adj.first_end() - length)
            })
            .collect();
        sweep_subnodes(id, window_start, window_end, &bounds)
    }

    /// Partitions the node's window into maximal contiguous sub-ranges over which the set
    /// of active predecessors does not change. A predecessor is active at position `p`
    /// when its shifted terminal window contains `p`.
    pub fn as_subnodes_by_prev(&mut self, id: NodeId) -> Vec<KmerPathSubnode> {
        self.ensure_edges_sorted(id);
        let node = self.node(id);
        let (window_start, window_end) = (node.first_start(), node.first_end());
        let bounds: Vec<(i64, i64)> = node
            .prev
            .iter()
            .map(|&p| {
                let adj = self.node(p);
                (adj.last_start() + 1, adj.last_end() + 1)
            })
            .collect();
        sweep_subnodes(id, window_start, window_end, &bounds)
    }

    /// Resolves the constant successor set of a subnode produced by
    /// [`Self::as_subnodes_by_next`].
    pub fn subnode_successors(&mut self, subnode: &KmerPathSubnode) -> Vec<NodeId> {
        let id = subnode.node();
        let length = self.node(id).length() as i64;
        let (lo, hi) = (subnode.start() + length, subnode.end() + length);
        self.next(id)
            .to_vec()
            .into_iter()
            .filter(|&n| {
                let adj = self.node(n);
                overlaps_closed(lo, hi, adj.first_start(), adj.first_end())
            })
            .collect()
    }

    /// Resolves the constant predecessor set of a subnode produced by
    /// [`Self::as_subnodes_by_prev`].
    pub fn subnode_predecessors(&mut self, subnode: &KmerPathSubnode) -> Vec<NodeId> {
        let id = subnode.node();
        let (lo, hi) = (subnode.start(), subnode.end());
        self.prev(id)
            .to_vec()
            .into_iter()
            .filter(|&p| {
                let adj = self.node(p);
                overlaps_closed(adj.last_start() + 1, adj.last_end() + 1, lo, hi)
            })
            .collect()
    }
}

/// Left-to-right sweep over `[window_start, window_end]` given each neighbor's activation
/// interval, sorted by activation start. A min-heap of activation ends tracks the
/// currently active set; a sub-range closes at the nearest admission or expiry boundary.
fn sweep_subnodes(
    id: NodeId,
    window_start: i64,
    window_end: i64,
    bounds: &[(i64, i64)],
) -> Vec<KmerPathSubnode> {
    let mut subnodes = Vec::with_capacity(bounds.len() + 1);
    if bounds.is_empty() {
        subnodes.push(KmerPathSubnode::new(id, window_start, window_end));
        return subnodes;
    }
    debug_assert!(bounds.windows(2).all(|w| w[0].0 <= w[1].0));

    let mut active: BinaryHeap<Reverse<i64>> = BinaryHeap::new();
    let mut offset = 0;
    let mut position = window_start;
    while position <= window_end {
        while offset < bounds.len() && bounds[offset].0 <= position {
            active.push(Reverse(bounds[offset].1));
            offset += 1;
        }
        while active.peek().is_some_and(|&Reverse(e)| e < position) {
            active.pop();
        }

        let mut end = window_end;
        if offset < bounds.len() {
            end = end.min(bounds[offset].0 - 1);
        }
        if let Some(&Reverse(e)) = active.peek() {
            end = end.min(e);
        }
        subnodes.push(KmerPathSubnode::new(id, position, end));
        position = end + 1;
    }
    subnodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::kmer::encode_kmer;
    use crate::data_types::kmer_node::EvidenceKmer;

    const K: usize = 3;

    fn ev(kmer: u64, start: i64, end: i64, weight: u32) -> EvidenceKmer {
        EvidenceKmer::new(kmer, start, end, weight, false).unwrap()
    }

    /// Builds a 3-k-mer path node over `ACGTA` with first-k-mer window `[start, end]`.
    fn three_kmer_node(graph: &mut KmerPathGraph, start: i64, end: i64) -> NodeId {
        let seq = b"ACGTA";
        let kmers: Vec<u64> = (0..3).map(|i| encode_kmer(&seq[i..i + K], K).unwrap()).collect();
        let id = graph.add_node(&ev(kmers[0], start, end, 2));
        graph.append(id, &ev(kmers[1], start + 1, end + 1, 2));
        graph.append(id, &ev(kmers[2], start + 2, end + 2, 2));
        id
    }

    #[test]
    fn test_no_edges_single_subnode() {
        let mut graph = KmerPathGraph::new(K);
        let id = three_kmer_node(&mut graph, 100, 109);
        let subnodes = graph.as_subnodes_by_next(id);
        assert_eq!(subnodes, vec![KmerPathSubnode::new(id, 100, 109)]);
        let subnodes = graph.as_subnodes_by_prev(id);
        assert_eq!(subnodes, vec![KmerPathSubnode::new(id, 100, 109)]);
    }

    #[test]
    fn test_half_window_successors_partition() {
        // one successor reachable over the first half of the window, another over the
        // second half: the decomposition is exactly two subnodes matching the halves
        let mut graph = KmerPathGraph::new(K);
        let id = three_kmer_node(&mut graph, 100, 109);
        let succ_kmer = encode_kmer(b"TAC", K).unwrap();
        // active positions are first-kmer windows shifted by length 3
        let first_half = graph.add_node(&ev(succ_kmer, 103, 107, 1));
        let second_half = graph.add_node(&ev(succ_kmer, 108, 112, 1));
        graph.add_edge(id, first_half);
        graph.add_edge(id, second_half);

        let subnodes = graph.as_subnodes_by_next(id);
        assert_eq!(
            subnodes,
            vec![KmerPathSubnode::new(id, 100, 104), KmerPathSubnode::new(id, 105, 109)]
        );
        assert_eq!(graph.subnode_successors(&subnodes[0]), &[first_half]);
        assert_eq!(graph.subnode_successors(&subnodes[1]), &[second_half]);
    }

    #[test]
    fn test_overlapping_successor_windows() {
        let mut graph = KmerPathGraph::new(K);
        let id = three_kmer_node(&mut graph, 100, 109);
        let succ_kmer = encode_kmer(b"TAC", K).unwrap();
        let wide = graph.add_node(&ev(succ_kmer, 103, 112, 1));
        let narrow = graph.add_node(&ev(succ_kmer, 106, 108, 1));
        graph.add_edge(id, wide);
        graph.add_edge(id, narrow);

        // wide alone on [100,102] and [106,109], both on [103,105]
        let subnodes = graph.as_subnodes_by_next(id);
        assert_eq!(
            subnodes,
            vec![
                KmerPathSubnode::new(id, 100, 102),
                KmerPathSubnode::new(id, 103, 105),
                KmerPathSubnode::new(id, 106, 109),
            ]
        );
        assert_eq!(graph.subnode_successors(&subnodes[0]), &[wide]);
        assert_eq!(graph.subnode_successors(&subnodes[1]), &[wide, narrow]);
        assert_eq!(graph.subnode_successors(&subnodes[2]), &[wide]);
    }

    #[test]
    fn test_successor_gap_yields_empty_middle_set() {
        let mut graph = KmerPathGraph::new(K);
        let id = three_kmer_node(&mut graph, 100, 109);
        let succ_kmer = encode_kmer(b"TAC", K).unwrap();
        let early = graph.add_node(&ev(succ_kmer, 103, 104, 1));
        let late = graph.add_node(&ev(succ_kmer, 110, 112, 1));
        graph.add_edge(id, early);
        graph.add_edge(id, late);

        let subnodes = graph.as_subnodes_by_next(id);
        assert_eq!(
            subnodes,
            vec![
                KmerPathSubnode::new(id, 100, 101),
                KmerPathSubnode::new(id, 102, 106),
                KmerPathSubnode::new(id, 107, 109),
            ]
        );
        assert!(graph.subnode_successors(&subnodes[1]).is_empty());
    }

    #[test]
    fn test_subnodes_by_prev_multi_kmer_predecessor() {
        // a 3-k-mer predecessor is active from its shifted *terminal* window, not from
        // its first-k-mer window
        let mut graph = KmerPathGraph::new(K);
        let pred = three_kmer_node(&mut graph, 100, 104);
        // terminal window [102,106]; active for successor positions [103,107]
        let succ_kmer = encode_kmer(b"TAC", K).unwrap();
        let id = graph.add_node(&ev(succ_kmer, 103, 112, 3));
        graph.add_edge(pred, id);

        let subnodes = graph.as_subnodes_by_prev(id);
        assert_eq!(
            subnodes,
            vec![KmerPathSubnode::new(id, 103, 107), KmerPathSubnode::new(id, 108, 112)]
        );
        assert_eq!(graph.subnode_predecessors(&subnodes[0]), &[pred]);
        assert!(graph.subnode_predecessors(&subnodes[1]).is_empty());
    }

    #[test]
    fn test_subnode_widths_cover_window() {
        let mut graph = KmerPathGraph::new(K);
        let id = three_kmer_node(&mut graph, 50, 90);
        let succ_kmer = encode_kmer(b"TAC", K).unwrap();
        for (s, e) in [(55, 60), (58, 70), (80, 95)] {
            let succ = graph.add_node(&ev(succ_kmer, s, e, 1));
            graph.add_edge(id, succ);
        }

        let subnodes = graph.as_subnodes_by_next(id);
        let covered: i64 = subnodes.iter().map(|s| s.width()).sum();
        assert_eq!(covered, graph.node(id).width());
        for pair in subnodes.windows(2) {
            assert_eq!(pair[0].end() + 1, pair[1].start());
        }
    }
}
