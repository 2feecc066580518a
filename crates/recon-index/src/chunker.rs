//! Word-window chunking with fixed overlap.

use crate::error::{IndexError, Result};

/// Chunk sizes are measured in whitespace-separated words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            overlap: 60,
        }
    }
}

impl ChunkerConfig {
    /// # Errors
    ///
    /// Returns `IndexError::Config` if `chunk_size` is zero or `overlap >= chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IndexError::Config("chunk_size must be greater than 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(IndexError::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Validated chunker. Construction is the only place the config can fail.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// # Errors
    ///
    /// Returns `IndexError::Config` for an invalid configuration.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Split `text` into overlapping word windows, each joined with single spaces.
    #[must_use]
    pub fn chunks<'a>(&self, text: &'a str) -> WordWindows<'a> {
        WordWindows {
            words: text.split_whitespace().collect(),
            start: 0,
            size: self.config.chunk_size,
            step: self
                .config
                .chunk_size
                .saturating_sub(self.config.overlap)
                .max(1),
            done: false,
        }
    }
}

/// Iterator over chunk texts. Consumed once.
#[derive(Debug)]
pub struct WordWindows<'a> {
    words: Vec<&'a str>,
    start: usize,
    size: usize,
    step: usize,
    done: bool,
}

impl Iterator for WordWindows<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done || self.start >= self.words.len() {
            return None;
        }
        let end = (self.start + self.size).min(self.words.len());
        let chunk = self.words[self.start..end].join(" ");
        if end == self.words.len() {
            self.done = true;
        } else {
            self.start += self.step;
        }
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn chunker(chunk_size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size,
            overlap,
        })
        .unwrap()
    }

    #[test]
    fn short_text_is_single_normalized_chunk() {
        let chunks: Vec<_> = chunker(400, 60).chunks("  fn main()\n\t{  }  ").collect();
        assert_eq!(chunks, ["fn main() { }"]);
    }

    #[test]
    fn exact_size_is_single_chunk() {
        let chunks: Vec<_> = chunker(5, 2).chunks(&numbered(5)).collect();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn thousand_words_make_three_chunks() {
        let text = numbered(1000);
        let chunks: Vec<_> = chunker(400, 60).chunks(&text).collect();
        assert_eq!(chunks.len(), 3);

        let words: Vec<Vec<&str>> = chunks
            .iter()
            .map(|c| c.split(' ').collect())
            .collect();
        assert_eq!(words[0].first(), Some(&"w0"));
        assert_eq!(words[0].last(), Some(&"w399"));
        assert_eq!(words[1].first(), Some(&"w340"));
        assert_eq!(words[1].last(), Some(&"w739"));
        assert_eq!(words[2].first(), Some(&"w680"));
        assert_eq!(words[2].last(), Some(&"w999"));
        assert!(words.iter().all(|w| w.len() <= 400));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(chunker(10, 2).chunks("   \n").count(), 0);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = Chunker::new(ChunkerConfig {
            chunk_size: 10,
            overlap: 10,
        })
        .unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }

    #[test]
    fn rejects_zero_size() {
        assert!(
            ChunkerConfig {
                chunk_size: 0,
                overlap: 0
            }
            .validate()
            .is_err()
        );
    }

    proptest! {
        #[test]
        fn windows_cover_input_with_exact_overlap(
            n in 1usize..1500,
            size in 1usize..64,
            overlap_seed in 0usize..64,
        ) {
            let overlap = overlap_seed % size;
            let text = numbered(n);
            let original: Vec<&str> = text.split(' ').collect();
            let chunks: Vec<String> = chunker(size, overlap).chunks(&text).collect();

            prop_assert!(!chunks.is_empty());
            let mut rebuilt: Vec<String> = Vec::with_capacity(n);
            for (i, chunk) in chunks.iter().enumerate() {
                let words: Vec<&str> = chunk.split(' ').collect();
                prop_assert!(words.len() <= size);
                if i == 0 {
                    rebuilt.extend(words.iter().map(|w| (*w).to_owned()));
                } else {
                    let prev: Vec<&str> = chunks[i - 1].split(' ').collect();
                    prop_assert_eq!(&prev[prev.len() - overlap..], &words[..overlap]);
                    rebuilt.extend(words[overlap..].iter().map(|w| (*w).to_owned()));
                }
            }
            prop_assert_eq!(rebuilt, original);
        }
    }
}
