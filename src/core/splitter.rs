//! Sentence segmentation for document translation
//!
//! Boundaries come from Unicode sentence segmentation (UAX #29). A boundary
//! that directly follows a common German or English abbreviation is dropped,
//! so "Dr. Müller" or "z.B. Äpfel" stay inside one sentence. The same goes
//! for German ordinal dates such as "am 3. Oktober".

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// Abbreviations that end in a period without ending the sentence
static ABBREVIATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:^|[\s(\["'])(?:z\.\s?b|d\.\s?h|u\.\s?a|o\.\s?ä|bzw|ca|dr|prof|hr|fr|nr|str|vgl|evtl|ggf|inkl|mr|mrs|ms|st|jr|sr|vs|e\.g|i\.e)\.$"#,
    )
    .expect("abbreviation pattern is valid")
});

/// Day number written as an ordinal, e.g. `3.`
static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)\d{1,2}\.$").expect("ordinal pattern is valid"));

static MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:Januar|Jänner|Februar|März|April|Mai|Juni|Juli|August|September|Oktober|November|Dezember)\b",
    )
    .expect("month pattern is valid")
});

/// One sentence of the input document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// 1-based position in the document
    pub position: usize,
    /// Sentence text without surrounding whitespace
    pub text: String,
    /// Byte range in the input, including trailing whitespace
    pub span: Range<usize>,
}

/// Split `text` into ordered, non-empty sentences.
///
/// The spans of the returned sentences cover the input without gaps, so
/// concatenating `&text[s.span]` rebuilds `text`. Blank input yields nothing.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut spans: Vec<Range<usize>> = Vec::new();

    for (start, piece) in text.split_sentence_bound_indices() {
        let end = start + piece.len();
        match spans.last_mut() {
            Some(last) if should_merge(text, last, piece) => last.end = end,
            _ => spans.push(start..end),
        }
    }

    spans
        .into_iter()
        .filter(|span| !text[span.clone()].trim().is_empty())
        .enumerate()
        .map(|(i, span)| Sentence {
            position: i + 1,
            text: text[span.clone()].trim().to_string(),
            span,
        })
        .collect()
}

fn should_merge(text: &str, previous: &Range<usize>, piece: &str) -> bool {
    let previous = text[previous.clone()].trim();
    previous.is_empty()
        || piece.trim().is_empty()
        || ABBREVIATION.is_match(previous)
        || (ORDINAL.is_match(previous) && MONTH.is_match(piece))
}
