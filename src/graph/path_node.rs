
use crate::data_types::kmer::Kmer;
use crate::data_types::kmer_node::KmerNode;

/// A maximal run of consecutive, de-Bruijn-adjacent k-mers that all share one positional
/// ambiguity window. The stored closed window `[start, end]` is the window of the *first*
/// k-mer in the run; every later k-mer's window is implied by its offset, so the terminal
/// k-mer may start anywhere in `[start + length - 1, end + length - 1]`.
///
/// Nodes live inside a [`KmerPathGraph`](crate::graph::path_graph::KmerPathGraph) arena and
/// are only ever mutated through it; this type exposes the read-only view.
#[derive(Clone, Debug)]
pub struct KmerPathNode {
    /// The primary path k-mers, insertion order = path order
    pub(crate) kmers: Vec<Kmer>,
    /// Per-k-mer evidence support, parallel to `kmers`
    pub(crate) weights: Vec<u32>,
    /// Cached sum of `weights`
    pub(crate) total_weight: u32,
    /// First possible start position of the first k-mer
    pub(crate) start: i64,
    /// Last possible start position of the first k-mer
    pub(crate) end: i64,
    /// True if any constituent k-mer is supported by the reference sequence
    pub(crate) reference: bool,
    /// Bumped on every structural change to the node's own content; edge changes do not bump it
    pub(crate) version: u32,
    /// Alternate k-mers merged into this path without taking a primary slot; unordered
    pub(crate) collapsed_kmers: Vec<Kmer>,
    /// In-path offsets of the collapsed k-mers, parallel to `collapsed_kmers`
    pub(crate) collapsed_offsets: Vec<usize>,
    /// Successor node handles; sorted by first-k-mer start position when `edges_sorted`
    pub(crate) next: Vec<super::path_graph::NodeId>,
    /// Predecessor node handles; sorted by terminal start position when `edges_sorted`
    pub(crate) prev: Vec<super::path_graph::NodeId>,
    /// False once a bulk edge mutation may have perturbed the list order; re-sorted lazily
    pub(crate) edges_sorted: bool,
}

impl KmerPathNode {
    pub(crate) fn single<N: KmerNode>(node: &N) -> Self {
        KmerPathNode {
            kmers: vec![node.kmer()],
            weights: vec![node.weight()],
            total_weight: node.weight(),
            start: node.start(),
            end: node.end(),
            reference: node.is_reference(),
            version: 0,
            collapsed_kmers: Vec::new(),
            collapsed_offsets: Vec::new(),
            next: Vec::new(),
            prev: Vec::new(),
            edges_sorted: true,
        }
    }

    /// Number of k-mers in the primary path
    pub fn length(&self) -> usize {
        self.kmers.len()
    }

    /// Number of positions in the closed ambiguity window
    pub fn width(&self) -> i64 {
        self.end - self.start + 1
    }

    /// First possible start position of the k-mer at `offset`
    pub fn start_of(&self, offset: usize) -> i64 {
        self.start + offset as i64
    }

    /// Last possible start position of the k-mer at `offset`
    pub fn end_of(&self, offset: usize) -> i64 {
        self.end + offset as i64
    }

    /// First possible start position of the first k-mer
    pub fn first_start(&self) -> i64 {
        self.start
    }

    /// Last possible start position of the first k-mer
    pub fn first_end(&self) -> i64 {
        self.end
    }

    /// First possible start position of the terminal k-mer
    pub fn last_start(&self) -> i64 {
        self.start_of(self.length() - 1)
    }

    /// Last possible start position of the terminal k-mer
    pub fn last_end(&self) -> i64 {
        self.end_of(self.length() - 1)
    }

    pub fn first_kmer(&self) -> Kmer {
        self.kmers[0]
    }

    pub fn last_kmer(&self) -> Kmer {
        self.kmers[self.length() - 1]
    }

    pub fn kmer_of(&self, offset: usize) -> Kmer {
        self.kmers[offset]
    }

    pub fn weight_of(&self, offset: usize) -> u32 {
        self.weights[offset]
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    /// Structural version identifier, bumped whenever the node's own content changes
    /// (k-mer/weight arrays, window, split/merge). Edge changes alone do not bump it.
    /// External callers use this to cheaply invalidate derived caches.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn kmers(&self) -> &[Kmer] {
        &self.kmers
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    /// K-mers that have been collapsed into this path; unordered
    pub fn collapsed_kmers(&self) -> &[Kmer] {
        &self.collapsed_kmers
    }

    /// In-path offsets of the collapsed k-mers, parallel to `collapsed_kmers()`
    pub fn collapsed_offsets(&self) -> &[usize] {
        &self.collapsed_offsets
    }
}

impl KmerNode for KmerPathNode {
    fn kmer(&self) -> Kmer {
        self.last_kmer()
    }

    fn start(&self) -> i64 {
        self.last_start()
    }

    fn end(&self) -> i64 {
        self.last_end()
    }

    fn weight(&self) -> u32 {
        self.total_weight
    }

    fn is_reference(&self) -> bool {
        self.reference
    }
}

/// Content equality: path k-mers, weights, window, and reference flag.
/// Edges, collapsed records, and the version counter are deliberately excluded so that a
/// node reconstructed by inverse structural operations compares equal to the original.
impl PartialEq for KmerPathNode {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.reference == other.reference
            && self.kmers == other.kmers
            && self.weights == other.weights
    }
}

impl Eq for KmerPathNode {}
