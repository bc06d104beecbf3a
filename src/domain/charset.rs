// ============================================================
// Layer 3 — Charset
// ============================================================
// Maps transcription characters to class indices for CTC.
//
//   index 0       → blank (never produced by encode)
//   index 1..=N   → the N characters of the alphabet, in order
//
// Characters outside the alphabet are dropped during encoding.
// With `lowercase` set, text is lowercased first, which is the
// usual setup for case-insensitive ICDAR15 word recognition.

use anyhow::{bail, ensure, Result};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Charset {
    alphabet:  Vec<char>,
    index:     HashMap<char, u32>,
    lowercase: bool,
}

impl Charset {
    /// Class index reserved for the CTC blank symbol.
    pub const BLANK: u32 = 0;

    pub fn new(alphabet: &str, lowercase: bool) -> Result<Self> {
        let chars: Vec<char> = alphabet.chars().collect();
        ensure!(!chars.is_empty(), "Dataset.charset must not be empty");

        let mut index = HashMap::with_capacity(chars.len());
        for (i, &c) in chars.iter().enumerate() {
            if index.insert(c, i as u32 + 1).is_some() {
                bail!("Dataset.charset contains '{}' more than once", c);
            }
        }

        Ok(Self { alphabet: chars, index, lowercase })
    }

    /// Output classes of the model: every character plus the blank.
    pub fn num_classes(&self) -> usize {
        self.alphabet.len() + 1
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        let lookup = |c: char| self.index.get(&c).copied();
        if self.lowercase {
            text.chars().flat_map(char::to_lowercase).filter_map(lookup).collect()
        } else {
            text.chars().filter_map(lookup).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_start_after_blank() {
        let cs = Charset::new("abc", false).unwrap();
        assert_eq!(cs.encode("cab"), vec![3, 1, 2]);
        assert_eq!(cs.num_classes(), 4);
    }

    #[test]
    fn test_unknown_characters_are_dropped() {
        let cs = Charset::new("0123456789", false).unwrap();
        assert_eq!(cs.encode("a1-2b"), vec![2, 3]);
    }

    #[test]
    fn test_lowercase_folds_before_lookup() {
        let cs = Charset::new("abcdefghijklmnopqrstuvwxyz", true).unwrap();
        assert_eq!(cs.encode("AbC"), vec![1, 2, 3]);

        let strict = Charset::new("abcdefghijklmnopqrstuvwxyz", false).unwrap();
        assert_eq!(strict.encode("AbC"), vec![2]);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(Charset::new("", true).is_err());
        assert!(Charset::new("abca", true).is_err());
    }
}
