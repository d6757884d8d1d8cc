
use crate::data_types::kmer::Kmer;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum EvidenceError {
    #[error("evidence interval start ({start}) must be <= end ({end})")]
    EmptyInterval { start: i64, end: i64 },
    #[error("evidence weight must be > 0")]
    ZeroWeight,
}

/// Read-only contract for positional k-mer support: a terminal k-mer, the closed window
/// of genomic positions its terminal k-mer may start at, an evidence weight, and whether
/// any of the support comes from the reference sequence.
///
/// This is the boundary between evidence ingestion and the graph: everything the graph
/// consumes arrives through this capability.
pub trait KmerNode {
    /// The terminal (and for single k-mer evidence, only) k-mer
    fn kmer(&self) -> Kmer;
    /// First possible start position of the terminal k-mer
    fn start(&self) -> i64;
    /// Last possible start position of the terminal k-mer
    fn end(&self) -> i64;
    /// Aggregate evidence support
    fn weight(&self) -> u32;
    /// True if any supporting evidence is the reference sequence itself
    fn is_reference(&self) -> bool;

    /// Number of positions in the closed support window
    fn width(&self) -> i64 {
        self.end() - self.start() + 1
    }
}

/// A single k-mer of positional evidence produced by read ingestion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EvidenceKmer {
    kmer: Kmer,
    start: i64,
    end: i64,
    weight: u32,
    reference: bool,
}

impl EvidenceKmer {
    /// Creates a new evidence k-mer.
    /// # Arguments
    /// * `kmer` - the packed k-mer
    /// * `start` - first possible start position (closed)
    /// * `end` - last possible start position (closed)
    /// * `weight` - evidence support, must be positive
    /// * `reference` - true if the support comes from the reference sequence
    /// # Errors
    /// * if the interval is empty or the weight is zero
    pub fn new(kmer: Kmer, start: i64, end: i64, weight: u32, reference: bool) -> Result<Self, EvidenceError> {
        if start > end {
            return Err(EvidenceError::EmptyInterval { start, end });
        }
        if weight == 0 {
            return Err(EvidenceError::ZeroWeight);
        }

        Ok(EvidenceKmer {
            kmer,
            start,
            end,
            weight,
            reference,
        })
    }
}

impl KmerNode for EvidenceKmer {
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
