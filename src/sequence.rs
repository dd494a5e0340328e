//! Nucleotide sequences
//!
//! A [`Sequence`] is an immutable buffer over the IUPAC nucleotide alphabet
//! (upper or lower case), plus the gap/mask symbols `.`, `-`, `?` and `*`.
//! The alphabet is checked once on construction so that reverse-complementing
//! never fails afterwards.

use crate::error::{AsmGraphError, Result};
use std::fmt;

/// Complement of a single symbol, or `None` if it is outside the alphabet
pub fn complement(base: u8) -> Option<u8> {
    let c = match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'a' => b't',
        b't' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        b'R' => b'Y',
        b'Y' => b'R',
        b'r' => b'y',
        b'y' => b'r',
        b'S' => b'S',
        b'W' => b'W',
        b's' => b's',
        b'w' => b'w',
        b'K' => b'M',
        b'M' => b'K',
        b'k' => b'm',
        b'm' => b'k',
        b'B' => b'V',
        b'V' => b'B',
        b'b' => b'v',
        b'v' => b'b',
        b'D' => b'H',
        b'H' => b'D',
        b'd' => b'h',
        b'h' => b'd',
        b'N' => b'N',
        b'n' => b'n',
        b'.' | b'-' | b'?' | b'*' => base,
        _ => return None,
    };
    Some(c)
}

/// Reverse-complement raw bytes, rejecting symbols outside the alphabet
pub fn reverse_complement_bytes(bases: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bases.len());
    for (position, &base) in bases.iter().enumerate().rev() {
        let c = complement(base).ok_or(AsmGraphError::InvalidSequence {
            symbol: base as char,
            position,
        })?;
        out.push(c);
    }
    Ok(out)
}

/// An immutable nucleotide sequence
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Sequence {
    bases: Vec<u8>,
}

impl Sequence {
    /// Build a sequence, validating every symbol
    pub fn new(bases: impl Into<Vec<u8>>) -> Result<Self> {
        let bases = bases.into();
        if let Some(position) = bases.iter().position(|&b| complement(b).is_none()) {
            return Err(AsmGraphError::InvalidSequence {
                symbol: bases[position] as char,
                position,
            });
        }
        Ok(Self { bases })
    }

    /// An empty sequence
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bases
    }

    /// Half-open slice `[start, end)`
    pub fn subsequence(&self, start: usize, end: usize) -> Result<Sequence> {
        if start > end || end > self.bases.len() {
            return Err(AsmGraphError::OutOfBounds {
                start,
                end,
                length: self.bases.len(),
            });
        }
        Ok(Self {
            bases: self.bases[start..end].to_vec(),
        })
    }

    /// The opposite strand, read 5' to 3'
    pub fn reverse_complement(&self) -> Sequence {
        // Every symbol was validated on construction.
        let bases = self
            .bases
            .iter()
            .rev()
            .map(|&b| complement(b).unwrap_or(b))
            .collect();
        Self { bases }
    }

    /// The last `n` bases (the whole sequence if shorter)
    pub fn suffix(&self, n: usize) -> &[u8] {
        &self.bases[self.bases.len().saturating_sub(n)..]
    }

    /// The first `n` bases (the whole sequence if shorter)
    pub fn prefix(&self, n: usize) -> &[u8] {
        &self.bases[..n.min(self.bases.len())]
    }

    /// Append `other` skipping its first `overlap` bases
    pub fn concat_with_overlap(&self, other: &Sequence, overlap: usize) -> Sequence {
        let mut bases = self.bases.clone();
        bases.extend_from_slice(&other.bases[overlap.min(other.bases.len())..]);
        Self { bases }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bases))
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence({})", self)
    }
}

impl std::str::FromStr for Sequence {
    type Err = AsmGraphError;

    fn from_str(s: &str) -> Result<Self> {
        Sequence::new(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        let seq: Sequence = "ACGTRYKMBVDHN".parse().unwrap();
        assert_eq!(seq.reverse_complement().to_string(), "NDHBVKMRYACGT");
    }

    #[test]
    fn test_reverse_complement_is_involution() {
        let seq: Sequence = "acgtNNswRY.-?*ACCG".parse().unwrap();
        assert_eq!(seq.reverse_complement().reverse_complement(), seq);
    }

    #[test]
    fn test_invalid_symbol() {
        let err = Sequence::new("ACGZ").unwrap_err();
        match err {
            AsmGraphError::InvalidSequence { symbol, position } => {
                assert_eq!(symbol, 'Z');
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(reverse_complement_bytes(b"AC!").is_err());
    }

    #[test]
    fn test_subsequence() {
        let seq: Sequence = "ACGTACGT".parse().unwrap();
        assert_eq!(seq.subsequence(2, 5).unwrap().to_string(), "GTA");
        assert_eq!(seq.subsequence(8, 8).unwrap().len(), 0);
        assert!(seq.subsequence(3, 9).is_err());
        assert!(seq.subsequence(5, 4).is_err());
    }

    #[test]
    fn test_concat_with_overlap() {
        let a: Sequence = "AACCG".parse().unwrap();
        let b: Sequence = "CCGTT".parse().unwrap();
        assert_eq!(a.concat_with_overlap(&b, 3).to_string(), "AACCGTT");
        assert_eq!(a.suffix(3), b.prefix(3));
    }
}
