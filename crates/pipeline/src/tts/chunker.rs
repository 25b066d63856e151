//! Sentence-level chunking for TTS
//!
//! Splits text into sentence-aligned chunks no longer than a configured
//! length, so each chunk can be converted by the vendor independently.

use medassist_core::TextChunk;

/// Default maximum characters per chunk
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 300;

/// Greedy sentence chunker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceChunker {
    max_chunk_length: usize,
}

impl SentenceChunker {
    pub fn new(max_chunk_length: usize) -> Self {
        Self { max_chunk_length }
    }

    pub fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    /// Split `text` into ordered chunks
    ///
    /// Fragments between `.`, `!` and `?` are trimmed, empty ones dropped,
    /// and each gets a terminal period. Fragments are packed greedily,
    /// joined by a single space. A fragment joins the current chunk when the
    /// chunk length plus the fragment length stays within `max_chunk_length`;
    /// the joining space is not counted, so a packed chunk may end up one
    /// character over the limit. A single fragment longer than the limit
    /// becomes its own oversized chunk. Input without any fragment comes
    /// back verbatim as one chunk.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks: Vec<String> = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for fragment in text.split(is_sentence_end) {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }

            let sentence = format!("{fragment}.");
            let sentence_len = sentence.chars().count();

            if buffer.is_empty() {
                buffer = sentence;
                buffer_len = sentence_len;
            } else if buffer_len + sentence_len <= self.max_chunk_length {
                buffer.push(' ');
                buffer.push_str(&sentence);
                buffer_len += 1 + sentence_len;
            } else {
                chunks.push(std::mem::replace(&mut buffer, sentence));
                buffer_len = sentence_len;
            }
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        if chunks.is_empty() {
            return vec![TextChunk::new(0, text)];
        }

        chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| TextChunk::new(index, text))
            .collect()
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_LENGTH)
    }
}

/// Check if a character ends a sentence
fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = SentenceChunker::default().split("See your doctor. Take rest. Drink fluids.");
        assert_eq!(texts(&chunks), vec!["See your doctor. Take rest. Drink fluids."]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_punctuation_normalized_to_period() {
        let chunks = SentenceChunker::default().split("Are you dizzy? Call now!  Rest");
        assert_eq!(texts(&chunks), vec!["Are you dizzy. Call now. Rest."]);
    }

    #[test]
    fn test_three_150_char_sentences_pack_into_two_chunks() {
        // 149 letters plus the period: 150 characters per sentence
        let sentence = |c: char| format!("{}.", c.to_string().repeat(149));
        assert_eq!(sentence('a').chars().count(), 150);
        let input = format!("{} {} {}", sentence('a'), sentence('b'), sentence('c'));

        let chunks = SentenceChunker::new(300).split(&input);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("{} {}", sentence('a'), sentence('b')));
        assert_eq!(chunks[1].text, sentence('c'));
        // 300 characters of sentence content plus the joining space
        assert_eq!(chunks[0].len(), 301);
    }

    #[test]
    fn test_joining_space_not_counted() {
        // "aaaa." and "bbbb." are 5 characters each
        let chunks = SentenceChunker::new(10).split("aaaa. bbbb.");
        assert_eq!(texts(&chunks), vec!["aaaa. bbbb."]);

        let chunks = SentenceChunker::new(9).split("aaaa. bbbb.");
        assert_eq!(texts(&chunks), vec!["aaaa.", "bbbb."]);
    }

    #[test]
    fn test_packed_chunks_exceed_limit_by_at_most_one() {
        let input = "Rest well today. Drink water often. Eat light meals. Sleep early tonight. Call if worse.";
        for limit in 20..60 {
            for chunk in SentenceChunker::new(limit).split(input) {
                assert!(chunk.len() <= limit + 1, "limit {limit}: {:?}", chunk.text);
            }
        }
    }

    #[test]
    fn test_oversized_sentence_kept_whole() {
        let long = "x".repeat(50);
        let input = format!("Hi. {long}. Bye.");

        let chunks = SentenceChunker::new(20).split(&input);

        assert_eq!(texts(&chunks), vec!["Hi.", &format!("{long}.")[..], "Bye."]);
        assert!(chunks[1].len() > 20);
    }

    #[test]
    fn test_empty_input_falls_back_to_verbatim() {
        let chunks = SentenceChunker::default().split("");
        assert_eq!(chunks, vec![TextChunk::new(0, "")]);

        let chunks = SentenceChunker::default().split(" ?! ");
        assert_eq!(chunks, vec![TextChunk::new(0, " ?! ")]);
    }

    #[test]
    fn test_indices_contiguous() {
        let input = "One. Two. Three. Four. Five. Six.";
        let chunks = SentenceChunker::new(10).split(input);

        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, expected);
        }
        assert!(chunks.len() > 1);
    }

    #[test]
    fn test_reconstructs_sentences_in_order() {
        let input = "Fever is common. Is it high? Check twice! Then rest. Hydrate well.";
        let chunks = SentenceChunker::new(25).split(input);

        let rebuilt: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.text.split('.'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        assert_eq!(
            rebuilt,
            vec!["Fever is common", "Is it high", "Check twice", "Then rest", "Hydrate well"]
        );
    }

    #[test]
    fn test_non_empty_input_yields_chunks() {
        for input in ["a", "...", "No punctuation here", "Ünïcödé sentence. Another"] {
            assert!(!SentenceChunker::default().split(input).is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let chunker = SentenceChunker::new(40);
        let input = "Take one tablet. Repeat after six hours. Stop if rash appears.";
        assert_eq!(chunker.split(input), chunker.split(input));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 5 chars, 9 bytes each side
        let chunks = SentenceChunker::new(10).split("éééé. ëëëë.");
        assert_eq!(chunks.len(), 1);
    }
}
