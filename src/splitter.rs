//! Recursive character splitting of pages into overlapping chunks.
//!
//! Text is cut on the coarsest separator present (paragraph, line, word),
//! small pieces are merged back into windows of at most `chunk_size`
//! characters, and each new window re-uses up to `chunk_overlap` characters
//! from the tail of the previous one. Pieces that are still too long are
//! split again with the next separator, down to single characters.
use std::collections::VecDeque;

use thiserror::Error;

use crate::loader::Page;

/// Separators tried in order; the empty separator splits per character.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SplitterError {
    #[error("chunk_size must be positive")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// A piece of a page's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// 1-based number of the page this chunk came from.
    pub page: u32,
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits every page, keeping page order and recording each chunk's page.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.split_text(&page.text)
                    .into_iter()
                    .map(move |text| Chunk {
                        text,
                        page: page.number,
                    })
            })
            .collect()
    }

    /// Splits a single text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            return vec![trimmed.to_string()];
        }
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(idx) = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
        else {
            return self.merge(&[text], "");
        };
        let separator = separators[idx];
        let finer = &separators[idx + 1..];

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            // A piece of exactly chunk_size still fits in one chunk
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            chunks.extend(self.split_recursive(piece, finer));
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    /// Greedily packs pieces (each at most `chunk_size`) into windows joined
    /// by `separator`, carrying an overlap tail from one window to the next.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        // Character length of the window joined with `separator`
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window, separator) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap
                    || (total > 0 && total + len + sep_len > self.chunk_size)
                {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(first) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }

        if let Some(chunk) = join_window(&window, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn join_window(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_bad_settings() {
        assert_eq!(
            TextSplitter::new(0, 0).unwrap_err(),
            SplitterError::ZeroChunkSize
        );
        assert_eq!(
            TextSplitter::new(100, 100).unwrap_err(),
            SplitterError::OverlapTooLarge {
                size: 100,
                overlap: 100
            }
        );
        assert!(TextSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_page_is_one_chunk() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let pages = vec![Page::new(1, "The sky is blue. Grass is green.")];
        let chunks = splitter.split_pages(&pages);
        assert_eq!(
            chunks,
            vec![Chunk {
                text: "The sky is blue. Grass is green.".to_string(),
                page: 1
            }]
        );
    }

    #[test]
    fn test_empty_and_whitespace_pages() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n   \n\n   ").is_empty());
    }

    #[test]
    fn test_word_windows_overlap() {
        let splitter = TextSplitter::new(20, 10).unwrap();
        let chunks = splitter.split_text("alpha beta gamma delta epsilon zeta eta theta");
        assert_eq!(
            chunks,
            vec![
                "alpha beta gamma",
                "beta gamma delta",
                "delta epsilon zeta",
                "zeta eta theta",
            ]
        );
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = TextSplitter::new(40, 0).unwrap();
        let text = "First paragraph is here.\n\nSecond paragraph follows.\n\nThird one.";
        let chunks = splitter.split_text(text);
        assert_eq!(
            chunks,
            vec![
                "First paragraph is here.",
                "Second paragraph follows.\n\nThird one.",
            ]
        );
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let word = "x".repeat(35);
        let chunks = splitter.split_text(&word);
        assert!(chunks.len() >= 4);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 10, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_no_chunk_exceeds_size() {
        let text = "Sentence number one. ".repeat(40)
            + "\n\n"
            + &"これは日本語のテストです。".repeat(30)
            + "\n"
            + &"averyveryverylongwordwithoutanybreaks".repeat(5);
        for (size, overlap) in [(1, 0), (7, 3), (50, 0), (50, 49), (120, 30), (1000, 200)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            for chunk in splitter.split_text(&text) {
                assert!(
                    char_len(&chunk) <= size,
                    "size={size} overlap={overlap} chunk={chunk:?}"
                );
                assert!(!chunk.trim().is_empty());
            }
        }
    }

    #[test]
    fn test_every_non_empty_page_yields_a_chunk() {
        let splitter = TextSplitter::new(30, 5).unwrap();
        let pages = vec![
            Page::new(1, "Short."),
            Page::new(2, ""),
            Page::new(3, "A much longer page that will need several windows to fit."),
            Page::new(4, "  \n "),
            Page::new(5, "Another one."),
        ];
        let chunks = splitter.split_pages(&pages);
        let non_empty = pages.iter().filter(|p| p.has_text()).count();
        assert!(chunks.len() >= non_empty);

        for page in pages.iter().filter(|p| p.has_text()) {
            assert!(chunks.iter().any(|c| c.page == page.number));
        }
        // Page order is preserved
        let page_numbers: Vec<u32> = chunks.iter().map(|c| c.page).collect();
        let mut sorted = page_numbers.clone();
        sorted.sort();
        assert_eq!(page_numbers, sorted);
    }

    fn size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
        (1usize..200).prop_flat_map(|size| (Just(size), 0..size))
    }

    proptest! {
        #[test]
        fn prop_chunks_never_exceed_size(
            (size, overlap) in size_and_overlap(),
            text in "[a-zé。 \\n.]{0,600}",
        ) {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            for chunk in splitter.split_text(&text) {
                prop_assert!(
                    char_len(&chunk) <= size,
                    "size={} overlap={} chunk={:?}", size, overlap, chunk
                );
                prop_assert!(!chunk.trim().is_empty());
            }
        }

        #[test]
        fn prop_every_non_empty_page_yields_a_chunk(
            (size, overlap) in size_and_overlap(),
            texts in proptest::collection::vec("[a-z \\n]{0,120}", 0..8),
        ) {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let pages: Vec<Page> = texts
                .iter()
                .enumerate()
                .map(|(i, text)| Page::new(i as u32 + 1, text.clone()))
                .collect();
            let chunks = splitter.split_pages(&pages);
            for page in pages.iter().filter(|p| p.has_text()) {
                prop_assert!(chunks.iter().any(|c| c.page == page.number));
            }
        }
    }
}
