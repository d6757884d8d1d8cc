
use derive_builder::Builder;
use log::{debug, trace};
use priority_queue::PriorityQueue;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::data_types::kmer::{self, KmerError, MAX_K};
use crate::data_types::kmer_node::{EvidenceKmer, KmerNode};
use crate::graph::builder::{build_graph, coalesce_adjacent_nodes, compact_linear_paths};
use crate::graph::path_graph::{KmerPathGraph, NodeId};

/// Controls how a window graph is assembled into contigs
#[derive(Builder, Clone, Copy, Debug)]
#[builder(default)]
pub struct AssemblerConfig {
    /// the k-mer size used for graph construction
    k: usize,
    /// contigs with fewer k-mers than this are not reported
    min_contig_kmers: usize,
    /// assembly stops after reporting this many contigs
    max_contigs: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        // reasonable defaults for unit tests; the binary overrides these from user input
        Self {
            k: 21,
            min_contig_kmers: 2,
            max_contigs: usize::MAX,
        }
    }
}

/// One assembled contig plus its supporting evidence accounting
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contig {
    sequence: Vec<u8>,
    kmer_count: usize,
    total_weight: u32,
    /// First-k-mer window of the leftmost path node in the contig
    start: i64,
    end: i64,
    reference: bool,
}

impl Contig {
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn kmer_count(&self) -> usize {
        self.kmer_count
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }
}

/// Greedy best-weight contig assembler for a single window.
///
/// Seeds at the heaviest remaining node, extends along maximum-weight neighbors in both
/// directions, reports the contig, then retracts the consumed support through the graph
/// so the next seed sees only unexplained evidence.
#[derive(Debug)]
pub struct Assembler {
    config: AssemblerConfig,
}

impl Assembler {
    /// Creates an assembler after validating the configuration.
    /// # Errors
    /// * if the configured k is outside the packable range
    pub fn new(config: AssemblerConfig) -> Result<Self, KmerError> {
        if config.k == 0 || config.k > MAX_K {
            return Err(KmerError::UnsupportedK { k: config.k });
        }
        Ok(Assembler { config })
    }

    /// Assembles one window of evidence into contigs.
    /// # Arguments
    /// * `evidence` - positional k-mer support for the window
    pub fn assemble<N: KmerNode>(&self, evidence: &[N]) -> Vec<Contig> {
        let mut graph = self.build_window_graph(evidence);
        self.assemble_graph(&mut graph)
    }

    /// Builds and simplifies the graph for one window of evidence.
    pub fn build_window_graph<N: KmerNode>(&self, evidence: &[N]) -> KmerPathGraph {
        let mut graph = build_graph(self.config.k, evidence);
        compact_linear_paths(&mut graph);
        coalesce_adjacent_nodes(&mut graph);
        debug!(
            "simplified graph: {} nodes, {} edges",
            graph.live_node_count(),
            graph.live_edge_count()
        );
        graph
    }

    /// Assembles contigs out of an already-simplified window graph, consuming its
    /// supporting weight as contigs are reported.
    pub fn assemble_graph(&self, graph: &mut KmerPathGraph) -> Vec<Contig> {
        // seeds keyed by total weight; handles invalidated by traversal or retraction
        // are detected on pop and skipped
        let mut seeds: PriorityQueue<NodeId, u32> = graph
            .node_ids()
            .into_iter()
            .map(|id| (id, graph.node(id).total_weight()))
            .collect();

        let mut contigs = Vec::new();
        while let Some((seed, _weight)) = seeds.pop() {
            if contigs.len() >= self.config.max_contigs {
                break;
            }
            if !graph.is_valid(seed) {
                continue;
            }

            let path = best_weight_path(graph, seed);
            let kmer_count: usize = path.iter().map(|&id| graph.node(id).length()).sum();
            if kmer_count < self.config.min_contig_kmers {
                trace!("discarding {kmer_count}-kmer seed path below reporting threshold");
                continue;
            }

            contigs.push(self.emit_contig(graph, &path));
            for &id in path.iter() {
                retract_node_support(graph, id);
            }
        }

        debug!("assembled {} contigs", contigs.len());
        contigs
    }

    /// Reconstructs the base sequence of a node path: the first k-mer in full, then one
    /// base per subsequent k-mer.
    fn emit_contig(&self, graph: &KmerPathGraph, path: &[NodeId]) -> Contig {
        let first = graph.node(path[0]);
        let mut sequence = kmer::decode_kmer(first.first_kmer(), self.config.k);
        let mut kmer_count = 0;
        let mut total_weight = 0;
        let mut reference = false;
        for (i, &id) in path.iter().enumerate() {
            let node = graph.node(id);
            let skip_first = usize::from(i == 0);
            for &km in node.kmers().iter().skip(skip_first) {
                sequence.push(kmer::last_base(km));
            }
            kmer_count += node.length();
            total_weight += node.total_weight();
            reference |= node.is_reference();
        }
        Contig {
            sequence,
            kmer_count,
            total_weight,
            start: first.first_start(),
            end: first.first_end(),
            reference,
        }
    }
}

/// Extends from the seed in both directions, always stepping to the heaviest unvisited
/// neighbor, and returns the node path in left-to-right order.
fn best_weight_path(graph: &mut KmerPathGraph, seed: NodeId) -> Vec<NodeId> {
    let mut path: VecDeque<NodeId> = VecDeque::from([seed]);
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    visited.insert(seed);

    let mut current = seed;
    loop {
        let step = graph
            .next(current)
            .to_vec()
            .into_iter()
            .filter(|n| !visited.contains(n))
            .max_by_key(|&n| graph.node(n).total_weight());
        match step {
            Some(n) => {
                visited.insert(n);
                path.push_back(n);
                current = n;
            }
            None => break,
        }
    }

    current = seed;
    loop {
        let step = graph
            .prev(current)
            .to_vec()
            .into_iter()
            .filter(|p| !visited.contains(p))
            .max_by_key(|&p| graph.node(p).total_weight());
        match step {
            Some(p) => {
                visited.insert(p);
                path.push_front(p);
                current = p;
            }
            None => break,
        }
    }

    path.into()
}

/// Retracts the full weight of every k-mer of the node over its whole window; the node
/// is fully consumed, so no fragments survive.
fn retract_node_support(graph: &mut KmerPathGraph, id: NodeId) {
    let removal: Vec<Option<Vec<EvidenceKmer>>> = {
        let node = graph.node(id);
        (0..node.length())
            .map(|offset| {
                let ev = EvidenceKmer::new(
                    node.kmer_of(offset),
                    node.start_of(offset),
                    node.end_of(offset),
                    node.weight_of(offset),
                    node.is_reference(),
                )
                .expect("valid by node invariants");
                Some(vec![ev])
            })
            .collect()
    };
    let survivors = graph.remove_weight(id, removal);
    debug_assert!(survivors.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::kmer::encode_kmer;

    const K: usize = 5;

    fn exact_evidence(seq: &[u8], start: i64, copies: u32) -> Vec<EvidenceKmer> {
        (0..=seq.len() - K)
            .map(|i| {
                let km = encode_kmer(&seq[i..i + K], K).unwrap();
                EvidenceKmer::new(km, start + i as i64, start + i as i64, copies, false).unwrap()
            })
            .collect()
    }

    fn test_config(min_contig_kmers: usize) -> AssemblerConfig {
        AssemblerConfigBuilder::default()
            .k(K)
            .min_contig_kmers(min_contig_kmers)
            .build()
            .unwrap()
    }

    #[test]
    fn test_assemble_single_contig() {
        let seq = b"ACGTACGGATTACAGGACAT";
        let evidence = exact_evidence(seq, 1000, 3);
        let assembler = Assembler::new(test_config(2)).unwrap();

        let contigs = assembler.assemble(&evidence);
        assert_eq!(contigs.len(), 1);
        let contig = &contigs[0];
        assert_eq!(contig.sequence(), seq);
        assert_eq!(contig.kmer_count(), seq.len() - K + 1);
        assert_eq!(contig.total_weight(), 3 * contig.kmer_count() as u32);
        assert_eq!(contig.start(), 1000);
        assert!(!contig.is_reference());
    }

    #[test]
    fn test_assemble_heaviest_branch_first() {
        // shared prefix, then a heavy and a light allele; the heavy one is reported first
        // and the light tail still comes out as its own contig
        let heavy = b"ACGTACGGATTAC";
        let light = b"ACGTACGTATTAC";
        let mut evidence = exact_evidence(heavy, 1000, 5);
        evidence.extend(exact_evidence(light, 1000, 2));
        let assembler = Assembler::new(test_config(2)).unwrap();

        let contigs = assembler.assemble(&evidence);
        assert!(contigs.len() >= 2);
        assert_eq!(contigs[0].sequence(), heavy);
        // the shared prefix was consumed with the heavy contig, so the light allele
        // surfaces as a shorter tail
        assert!(contigs[1].kmer_count() < contigs[0].kmer_count());
    }

    #[test]
    fn test_min_contig_threshold_filters_short_paths() {
        let seq = b"ACGTACG";
        let evidence = exact_evidence(seq, 0, 1);
        let assembler = Assembler::new(test_config(10)).unwrap();
        assert!(assembler.assemble(&evidence).is_empty());
    }

    #[test]
    fn test_invalid_k_rejected() {
        let config = AssemblerConfigBuilder::default().k(40).build().unwrap();
        assert_eq!(Assembler::new(config).unwrap_err(), KmerError::UnsupportedK { k: 40 });
    }

    #[test]
    fn test_assembly_consumes_all_support() {
        let seq = b"ACGTACGGATTACAGGACAT";
        let evidence = exact_evidence(seq, 0, 2);
        let assembler = Assembler::new(test_config(1)).unwrap();

        let contigs = assembler.assemble(&evidence);
        let reported: u32 = contigs.iter().map(|c| c.total_weight()).sum();
        let supplied: u32 = evidence.iter().map(|e| e.weight()).sum();
        assert_eq!(reported, supplied);
    }
}
