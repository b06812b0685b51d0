//! Nucleotide alphabet helpers: one-hot encoding and reverse complement.

/// Alphabet order used for one-hot encoding.
pub const BASES: [u8; 4] = [b'A', b'G', b'C', b'T'];

/// One-hot encode a nucleotide window over the `AGCT` alphabet.
///
/// Ambiguous bases (`N` and friends) encode as an all-zero row, which is how
/// downstream models are expected to treat unknown sequence.
pub fn encode_one_hot(sequence: &[u8]) -> Vec<[f32; 4]> {
    sequence
        .iter()
        .map(|&base| {
            let mut row = [0.0f32; 4];
            if let Some(i) = BASES.iter().position(|&b| b == base.to_ascii_uppercase()) {
                row[i] = 1.0;
            }
            row
        })
        .collect()
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'a' => b't',
        b't' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        other => other,
    }
}

/// Reverse complement of a nucleotide sequence. Non-ACGT symbols pass
/// through unchanged.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|&b| complement(b)).collect()
}
