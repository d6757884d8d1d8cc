
/// Packed k-mer representation: 2 bits per base, first base in the highest-order bits.
pub type Kmer = u64;

/// The largest k we can pack into 64 bits
pub const MAX_K: usize = 32;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum KmerError {
    #[error("k must be in [1, {MAX_K}], got {k}")]
    UnsupportedK { k: usize },
    #[error("sequence contains a non-ACGT base: {base:#04x}")]
    InvalidBase { base: u8 },
    #[error("sequence length {length} does not match k={k}")]
    LengthMismatch { length: usize, k: usize },
}

/// Encodes a single base to its 2-bit value.
/// # Arguments
/// * `base` - an ASCII nucleotide, either case
/// # Errors
/// * if the base is not one of ACGT
pub fn encode_base(base: u8) -> Result<u64, KmerError> {
    match base {
        b'A' | b'a' => Ok(0),
        b'C' | b'c' => Ok(1),
        b'G' | b'g' => Ok(2),
        b'T' | b't' => Ok(3),
        _ => Err(KmerError::InvalidBase { base }),
    }
}

/// Decodes a 2-bit value back to its upper-case ASCII base.
pub fn decode_base(bits: u64) -> u8 {
    match bits & 0x3 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// Encodes a k-long sequence into a packed k-mer.
/// # Arguments
/// * `seq` - the sequence, must be exactly k bases
/// * `k` - the k-mer size
/// # Errors
/// * if k is out of range, the length does not match, or a base is invalid
pub fn encode_kmer(seq: &[u8], k: usize) -> Result<Kmer, KmerError> {
    if k == 0 || k > MAX_K {
        return Err(KmerError::UnsupportedK { k });
    }
    if seq.len() != k {
        return Err(KmerError::LengthMismatch { length: seq.len(), k });
    }

    let mut packed: u64 = 0;
    for &base in seq {
        packed = (packed << 2) | encode_base(base)?;
    }
    Ok(packed)
}

/// Decodes a packed k-mer back into its base sequence.
/// # Arguments
/// * `kmer` - the packed k-mer
/// * `k` - the k-mer size
pub fn decode_kmer(kmer: Kmer, k: usize) -> Vec<u8> {
    (0..k)
        .map(|i| decode_base(kmer >> (2 * (k - 1 - i))))
        .collect()
}

/// Returns the final base of a packed k-mer as upper-case ASCII.
pub fn last_base(kmer: Kmer) -> u8 {
    decode_base(kmer)
}

/// Bit mask covering the low `2 * bases` bits.
fn base_mask(bases: usize) -> u64 {
    if bases >= MAX_K {
        u64::MAX
    } else {
        (1u64 << (2 * bases)) - 1
    }
}

/// Returns true if `to` can directly follow `from` in a de Bruijn walk, i.e. the
/// (k-1)-suffix of `from` equals the (k-1)-prefix of `to`.
/// # Arguments
/// * `k` - the k-mer size
/// * `from` - the earlier k-mer
/// * `to` - the later k-mer
pub fn is_successor(k: usize, from: Kmer, to: Kmer) -> bool {
    (to >> 2) == (from & base_mask(k - 1))
}

/// Builds the k-mer produced by shifting `from` left one base and appending `base_bits`.
/// # Arguments
/// * `k` - the k-mer size
/// * `from` - the current k-mer
/// * `base_bits` - the 2-bit encoding of the appended base
pub fn next_kmer(k: usize, from: Kmer, base_bits: u64) -> Kmer {
    ((from << 2) | (base_bits & 0x3)) & base_mask(k)
}

/// Returns the (k-1)-prefix of a k-mer, used to index nodes by their incoming adjacency.
pub fn prefix(kmer: Kmer) -> u64 {
    kmer >> 2
}

/// Returns the (k-1)-suffix of a k-mer, used to look up candidate successors.
/// # Arguments
/// * `k` - the k-mer size
/// * `kmer` - the packed k-mer
pub fn suffix(k: usize, kmer: Kmer) -> u64 {
    kmer & base_mask(k - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let seq = b"ACGTACGTACGT";
        let k = seq.len();
        let packed = encode_kmer(seq, k).unwrap();
        assert_eq!(decode_kmer(packed, k), seq.to_vec());

        // lower case encodes to the same k-mer
        assert_eq!(encode_kmer(b"acgt", 4).unwrap(), encode_kmer(b"ACGT", 4).unwrap());
    }

    #[test]
    fn test_encode_errors() {
        assert_eq!(encode_kmer(b"ACGT", 0), Err(KmerError::UnsupportedK { k: 0 }));
        assert_eq!(
            encode_kmer(b"ACG", 4),
            Err(KmerError::LengthMismatch { length: 3, k: 4 })
        );
        assert_eq!(encode_kmer(b"ACNT", 4), Err(KmerError::InvalidBase { base: b'N' }));
    }

    #[test]
    fn test_is_successor() {
        let k = 4;
        let acgt = encode_kmer(b"ACGT", k).unwrap();
        let cgta = encode_kmer(b"CGTA", k).unwrap();
        let cgtc = encode_kmer(b"CGTC", k).unwrap();
        let acga = encode_kmer(b"ACGA", k).unwrap();

        assert!(is_successor(k, acgt, cgta));
        assert!(is_successor(k, acgt, cgtc));
        assert!(!is_successor(k, acgt, acga));
        assert!(!is_successor(k, cgta, acgt));
    }

    #[test]
    fn test_next_kmer_walk() {
        let k = 3;
        let mut current = encode_kmer(b"ACG", k).unwrap();
        for &base in b"TTACA" {
            let next = next_kmer(k, current, encode_base(base).unwrap());
            assert!(is_successor(k, current, next));
            assert_eq!(last_base(next), base);
            current = next;
        }
    }

    #[test]
    fn test_max_k_mask() {
        // full-width k-mers must not shift bits off the end of the mask
        let seq = [b'T'; 32];
        let packed = encode_kmer(&seq, 32).unwrap();
        assert_eq!(packed, u64::MAX);
        assert_eq!(decode_kmer(packed, 32), seq.to_vec());
        assert!(is_successor(32, packed, packed));
    }
}
