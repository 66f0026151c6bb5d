//! Heuristic summary and document statistics.
//!
//! The heuristic summary is the first few sentences of the document. It
//! needs no network, so a summary request always returns something even
//! when the generation service is down.

/// Characters that end a sentence when followed by a space.
const SENTENCE_TERMINATORS: [char; 5] = ['.', '!', '?', '\u{3002}', '\u{061F}'];

/// Split `text` into sentences after `.`, `!`, `?`, `。` or `؟` followed by
/// one or more spaces. The terminator stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }
        let end = idx + c.len_utf8();
        let mut next_start = end;
        while let Some(&(i, ' ')) = chars.peek() {
            next_start = i + 1;
            chars.next();
        }
        if next_start > end {
            sentences.push(&text[start..end]);
            start = next_start;
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// The first `max_sentences` sentences of `text`, joined by one space.
pub fn simple_summary(text: &str, max_sentences: usize) -> String {
    split_sentences(text)
        .into_iter()
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two!  Three? Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
    }

    #[test]
    fn test_terminator_without_space_does_not_split() {
        assert_eq!(split_sentences("Version 1.2 is out."), vec!["Version 1.2 is out."]);
    }

    #[test]
    fn test_newline_after_terminator_does_not_split() {
        assert_eq!(split_sentences("Title.\nBody. End"), vec!["Title.\nBody.", "End"]);
    }

    #[test]
    fn test_cjk_and_arabic_terminators() {
        assert_eq!(split_sentences("第一。 第二"), vec!["第一。", "第二"]);
        assert_eq!(split_sentences("ماذا؟ نعم"), vec!["ماذا؟", "نعم"]);
    }

    #[test]
    fn test_simple_summary_first_three() {
        let text = "A one. B two. C three. D four. E five.";
        assert_eq!(simple_summary(text, 3), "A one. B two. C three.");
    }

    #[test]
    fn test_simple_summary_short_text() {
        assert_eq!(simple_summary("Only one", 3), "Only one");
        assert_eq!(simple_summary("", 3), "");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  one two\nthree\t four "), 4);
        assert_eq!(word_count(""), 0);
    }
}
