
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data_types::kmer::{decode_base, encode_base, next_kmer, Kmer};
use crate::data_types::kmer_node::EvidenceKmer;

/// Parameters for one simulated assembly window
#[derive(Clone, Copy, Debug)]
pub struct SimulationSettings {
    /// the k-mer size evidence is generated at
    pub k: usize,
    /// number of reference bases in the window
    pub window_size: usize,
    /// length of each sampled read
    pub read_length: usize,
    /// mean read depth over the window
    pub coverage: u32,
    /// positional ambiguity applied to read k-mers, in bases each side
    pub jitter: i64,
    /// per-base substitution error probability applied to reads
    pub error_rate: f64,
}

/// One simulated window: its reference sequence and the positional k-mer evidence an
/// ingestion front-end would have produced for it.
pub struct SimulatedWindow {
    pub reference: Vec<u8>,
    pub evidence: Vec<EvidenceKmer>,
}

/// Generates a deterministic synthetic window: a random reference, exact reference
/// k-mer support, and jittered read k-mer support with substitution errors.
/// # Arguments
/// * `settings` - the simulation parameters
/// * `seed` - the base RNG seed
/// * `window_index` - index of the window, mixed into the seed and the coordinates
pub fn simulate_window(settings: &SimulationSettings, seed: u64, window_index: u64) -> SimulatedWindow {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(window_index.wrapping_mul(0x9e3779b97f4a7c15)));
    let offset = (window_index as i64) * (settings.window_size as i64);

    let reference: Vec<u8> = (0..settings.window_size)
        .map(|_| decode_base(rng.gen_range(0..4)))
        .collect();

    let mut evidence = Vec::new();
    kmerize(&reference, settings.k, |i, km| {
        let position = offset + i as i64;
        evidence.push(EvidenceKmer::new(km, position, position, 1, true).expect("reference k-mer is valid"));
    });

    let read_count = (settings.coverage as usize * settings.window_size) / settings.read_length;
    for _ in 0..read_count {
        let read_start = rng.gen_range(0..=settings.window_size - settings.read_length);
        let mut read = reference[read_start..read_start + settings.read_length].to_vec();
        for base in read.iter_mut() {
            if rng.gen_bool(settings.error_rate) {
                *base = decode_base(rng.gen_range(0..4));
            }
        }
        kmerize(&read, settings.k, |i, km| {
            let position = offset + (read_start + i) as i64;
            evidence.push(
                EvidenceKmer::new(km, position - settings.jitter, position + settings.jitter, 1, false)
                    .expect("read k-mer is valid"),
            );
        });
    }

    SimulatedWindow { reference, evidence }
}

/// Rolls a packed k-mer across the sequence, invoking the callback with each k-mer and
/// the offset of its first base.
fn kmerize<F: FnMut(usize, Kmer)>(seq: &[u8], k: usize, mut callback: F) {
    if seq.len() < k {
        return;
    }
    let mut current: Kmer = 0;
    for (i, &base) in seq.iter().enumerate() {
        let bits = encode_base(base).expect("simulated bases are ACGT");
        current = next_kmer(k, current, bits);
        if i + 1 >= k {
            callback(i + 1 - k, current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::kmer::{encode_kmer, is_successor};
    use crate::data_types::kmer_node::KmerNode;

    fn test_settings() -> SimulationSettings {
        SimulationSettings {
            k: 11,
            window_size: 500,
            read_length: 100,
            coverage: 10,
            jitter: 2,
            error_rate: 0.01,
        }
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let settings = test_settings();
        let first = simulate_window(&settings, 42, 3);
        let second = simulate_window(&settings, 42, 3);
        assert_eq!(first.reference, second.reference);
        assert_eq!(first.evidence, second.evidence);

        let other_seed = simulate_window(&settings, 43, 3);
        assert_ne!(first.reference, other_seed.reference);
    }

    #[test]
    fn test_reference_evidence_matches_sequence() {
        let settings = test_settings();
        let window = simulate_window(&settings, 7, 0);
        let reference_evidence: Vec<&EvidenceKmer> =
            window.evidence.iter().filter(|e| e.is_reference()).collect();
        assert_eq!(reference_evidence.len(), settings.window_size - settings.k + 1);

        for (i, ev) in reference_evidence.iter().enumerate() {
            let expected = encode_kmer(&window.reference[i..i + settings.k], settings.k).unwrap();
            assert_eq!(ev.kmer(), expected);
            assert_eq!(ev.start(), i as i64);
            assert_eq!(ev.end(), i as i64);
        }
        for pair in reference_evidence.windows(2) {
            assert!(is_successor(settings.k, pair[0].kmer(), pair[1].kmer()));
        }
    }

    #[test]
    fn test_read_evidence_carries_jitter() {
        let settings = test_settings();
        let window = simulate_window(&settings, 7, 2);
        let read_evidence: Vec<&EvidenceKmer> =
            window.evidence.iter().filter(|e| !e.is_reference()).collect();
        assert!(!read_evidence.is_empty());
        for ev in read_evidence {
            assert_eq!(ev.end() - ev.start(), 2 * settings.jitter);
        }
    }

    #[test]
    fn test_window_offset_shifts_coordinates() {
        let settings = test_settings();
        let window = simulate_window(&settings, 7, 4);
        let first_reference = window.evidence.iter().find(|e| e.is_reference()).unwrap();
        assert_eq!(first_reference.start(), 4 * settings.window_size as i64);
    }
}
