// src/notify/chunk.rs
//! Split a report into segments that fit a transport's message limit.
//!
//! Lengths are counted in UTF-16 code units, the unit Telegram's 4096 limit
//! is defined in. Emoji outside the BMP count as two. Cuts always fall on a
//! `char` boundary.

/// One deliverable segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryChunk {
    pub text: String,
    /// A single `\n` followed this segment in the original and was dropped.
    pub stripped_newline: bool,
}

impl DeliveryChunk {
    /// Only line breaks or spaces; chat APIs reject these as empty.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Message length in UTF-16 code units.
pub fn text_len(s: &str) -> usize {
    s.encode_utf16().count()
}

// Byte offset where the first `max_len` units end, or None if `s` fits.
// Always at least one char, so a wide char with a tiny limit still advances.
fn window_end(s: &str, max_len: usize) -> Option<usize> {
    let mut units = 0;
    for (i, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > max_len {
            if i > 0 {
                return Some(i);
            }
            let end = ch.len_utf8();
            return (end < s.len()).then_some(end);
        }
    }
    None
}

/// Split `text` into chunks of at most `max_len` UTF-16 units.
///
/// Each chunk is the longest prefix that ends at a line break within the
/// limit; if the window holds no usable line break the text is cut at
/// `max_len`. One leading newline is stripped from the remainder (and
/// recorded on the chunk). A `max_len` of 0 is treated as 1.
pub fn split_report(text: &str, max_len: usize) -> Vec<DeliveryChunk> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    loop {
        let Some(window_end) = window_end(rest, max_len) else {
            chunks.push(DeliveryChunk {
                text: rest.to_string(),
                stripped_newline: false,
            });
            break;
        };

        let window = &rest[..window_end];
        let cut = match window.rfind('\n') {
            Some(pos) if pos > 0 => pos,
            _ => window_end,
        };

        let (head, tail) = rest.split_at(cut);
        let (tail, stripped) = match tail.strip_prefix('\n') {
            Some(t) => (t, true),
            None => (tail, false),
        };
        chunks.push(DeliveryChunk {
            text: head.to_string(),
            stripped_newline: stripped,
        });
        rest = tail;
    }

    chunks
}

/// Inverse of `split_report`.
pub fn reassemble(chunks: &[DeliveryChunk]) -> String {
    let mut out = String::new();
    for c in chunks {
        out.push_str(&c.text);
        if c.stripped_newline {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn texts(chunks: &[DeliveryChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn short_text_is_single_chunk() {
        let c = split_report("hello", 4096);
        assert_eq!(texts(&c), vec!["hello"]);
        assert!(!c[0].stripped_newline);
    }

    #[test]
    fn exact_limit_is_single_chunk() {
        let c = split_report("abcde", 5);
        assert_eq!(texts(&c), vec!["abcde"]);
    }

    #[test]
    fn empty_text_is_one_empty_chunk() {
        assert_eq!(texts(&split_report("", 10)), vec![""]);
    }

    #[test]
    fn splits_on_last_newline_in_window() {
        let c = split_report("aaa\nbbb\nccc", 9);
        assert_eq!(texts(&c), vec!["aaa\nbbb", "ccc"]);
        assert!(c[0].stripped_newline);
    }

    #[test]
    fn hard_cut_without_newline() {
        let c = split_report("abcdefghij", 4);
        assert_eq!(texts(&c), vec!["abcd", "efgh", "ij"]);
        assert!(c.iter().all(|c| !c.stripped_newline));
    }

    #[test]
    fn only_one_leading_newline_is_stripped() {
        let c = split_report("abc\n\ndef", 4);
        assert_eq!(texts(&c), vec!["abc", "\ndef"]);
        assert_eq!(reassemble(&c), "abc\n\ndef");
    }

    #[test]
    fn hard_cut_before_newline_is_recorded() {
        let c = split_report("abcd\nef", 4);
        assert_eq!(texts(&c), vec!["abcd", "ef"]);
        assert!(c[0].stripped_newline);
        assert_eq!(reassemble(&c), "abcd\nef");
    }

    #[test]
    fn multibyte_text_is_never_cut_mid_char() {
        let s = "📊🥇🥈".repeat(10);
        let c = split_report(&s, 7);
        assert!(c.iter().all(|c| text_len(&c.text) <= 7));
        assert_eq!(c[0].text, "📊🥇🥈");
        assert_eq!(reassemble(&c), s);
    }

    #[test]
    fn astral_emoji_count_as_two_units() {
        assert_eq!(text_len("📰 a"), 4);
        // 4096 emoji are 8192 units: two full chunks
        let s = "🕒".repeat(4096);
        let c = split_report(&s, 4096);
        assert_eq!(c.len(), 2);
        assert!(c.iter().all(|c| text_len(&c.text) == 4096));
        assert_eq!(reassemble(&c), s);
    }

    #[test]
    fn wide_char_with_tiny_limit_still_advances() {
        let c = split_report("📊📊", 1);
        assert_eq!(texts(&c), vec!["📊", "📊"]);
    }

    #[test]
    fn newline_runs_leave_a_blank_chunk_that_is_flagged() {
        let c = split_report("abc\n\n\n\ndef", 4);
        assert_eq!(texts(&c), vec!["abc", "\n\n", "def"]);
        assert!(c[1].is_blank());
        assert!(!c[0].is_blank() && !c[2].is_blank());
        assert_eq!(reassemble(&c), "abc\n\n\n\ndef");
    }

    #[test]
    fn telegram_sized_report() {
        let line = "x".repeat(99);
        let report = vec![line; 100].join("\n"); // 9999 chars
        let c = split_report(&report, 4096);
        assert_eq!(c.len(), 3);
        assert!(c.iter().all(|c| text_len(&c.text) <= 4096));
        assert!(c.iter().all(|c| !c.text.starts_with('\n')));
        assert_eq!(reassemble(&c), report);
    }

    #[test]
    fn random_texts_round_trip_within_limit() {
        let mut rng = rand::rng();
        let alphabet: Vec<char> = "ab \n\n📰é".chars().collect();
        for _ in 0..300 {
            let len = rng.random_range(0..400);
            let s: String = (0..len)
                .map(|_| alphabet[rng.random_range(0..alphabet.len())])
                .collect();
            let max = rng.random_range(2..60);
            let c = split_report(&s, max);
            assert!(
                c.iter().all(|c| text_len(&c.text) <= max),
                "chunk over {max} for {s:?}"
            );
            assert_eq!(reassemble(&c), s, "round trip failed for max={max}");
        }
    }
}
