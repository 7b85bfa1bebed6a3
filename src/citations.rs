//! Inline citation tag removal for the displayed answer.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

const OPEN_TAG: &str = "<citation";
const CLOSE_TAG: &str = "</citation>";

static CITATION_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<citation\b[^>]*>.*?</citation>").expect("citation pattern is valid")
});

/// Remove every `<citation ...>...</citation>` span from `text`.
///
/// Surrounding text, whitespace included, is left untouched. Clean text is
/// returned borrowed.
///
/// # Example
/// ```
/// use ragchat::citations::strip_citations;
///
/// assert_eq!(strip_citations("A <citation>X</citation> B"), "A  B");
/// assert_eq!(strip_citations("A  B"), "A  B");
/// ```
pub fn strip_citations(text: &str) -> Cow<'_, str> {
    CITATION_SPAN.replace_all(text, "")
}

/// Longest prefix of a still growing `text` that later deltas cannot turn
/// into part of a citation span.
///
/// Cuts at the first `<citation` that is not closed yet, or at a trailing
/// fragment such as `<cit`. Stripping the settled prefix of a partial answer
/// always yields a prefix of the stripped complete answer.
pub fn settled_prefix(text: &str) -> &str {
    let mut end = text.len();
    let mut from = 0;
    while let Some(found) = text[from..].find(OPEN_TAG) {
        let start = from + found;
        match text[start..].find(CLOSE_TAG) {
            Some(close) => from = start + close + CLOSE_TAG.len(),
            None => {
                end = start;
                break;
            }
        }
    }

    if let Some(lt) = text[..end].rfind('<') {
        if OPEN_TAG.starts_with(&text[lt..end]) {
            end = lt;
        }
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_exactly_the_tagged_span() {
        assert_eq!(strip_citations("A <citation>X</citation> B"), "A  B");
    }

    #[test]
    fn test_idempotent_on_clean_text() {
        let clean = "No tags here, just <b>markup</b>.";
        assert!(matches!(strip_citations(clean), Cow::Borrowed(_)));
        let once = strip_citations("x<citation>1</citation>y").into_owned();
        assert_eq!(strip_citations(&once), once);
    }

    #[test]
    fn test_multiple_and_multiline_spans() {
        let text = "a<citation id=\"1\">one\ntwo</citation>b<citation>3</citation>c";
        assert_eq!(strip_citations(text), "abc");
    }

    #[test]
    fn test_non_greedy() {
        let text = "<citation>1</citation> keep <citation>2</citation>";
        assert_eq!(strip_citations(text), " keep ");
    }

    #[test]
    fn test_unclosed_tag_is_left_alone() {
        let text = "partial <citation>still streaming";
        assert_eq!(strip_citations(text), text);
    }

    #[test]
    fn test_settled_prefix_holds_back_open_span() {
        assert_eq!(settled_prefix("A <citation>X"), "A ");
        assert_eq!(settled_prefix("A <citation id=\"1"), "A ");
        assert_eq!(settled_prefix("A <citation>X</citation> B"), "A <citation>X</citation> B");
    }

    #[test]
    fn test_settled_prefix_holds_back_tag_fragment() {
        assert_eq!(settled_prefix("A <"), "A ");
        assert_eq!(settled_prefix("A <cita"), "A ");
        assert_eq!(settled_prefix("x < y"), "x < y");
        assert_eq!(settled_prefix("a <b>bold</b>"), "a <b>bold</b>");
    }

    #[test]
    fn test_settled_prefix_strips_to_prefix_of_final() {
        let full = "Yes <citation>doc.pdf</citation>, see <citation>b</citation>.";
        let stripped = strip_citations(full).into_owned();
        for end in (0..=full.len()).filter(|i| full.is_char_boundary(*i)) {
            let partial = strip_citations(settled_prefix(&full[..end])).into_owned();
            assert!(stripped.starts_with(&partial), "{:?} vs {:?}", partial, stripped);
        }
    }
}
