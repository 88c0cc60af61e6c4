use std::sync::LazyLock;

use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
}

pub(super) static INTERNATIONAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\+\d{1,4}[\s\-().]{0,2}\d{1,4}[\s\-().]{0,2}\d{1,4}[\s\-().]{0,2}\d{1,4}[\s\-().]{0,2}\d{0,4}",
        r"\(\d{3}\)[\s\-]?\d{3}[\s\-]?\d{4}",
        r"\d{3,4}[\s\-]?\d{3,4}[\s\-]?\d{4,5}",
        r"\d{10,15}",
    ])
});

pub(super) static MALAYSIA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\+?60[\s\-]?\(?\d{1,3}\)?[\s\-]?\d{3,4}[\s\-]?\d{3,4}",
        r"0\d{1,2}[\s\-]?\d{3,4}[\s\-]?\d{3,4}",
        r"1\d{8,9}",
    ])
});

/// Run `patterns` in order; a later match that overlaps an accepted span is
/// dropped. Results are returned in text order.
pub(super) fn extract<'a>(patterns: &[Regex], text: &'a str) -> Vec<&'a str> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for pattern in patterns {
        for m in pattern.find_iter(text) {
            if spans
                .iter()
                .any(|&(start, end)| m.start() < end && start < m.end())
            {
                continue;
            }
            spans.push((m.start(), m.end()));
        }
    }
    spans.sort_unstable();
    spans
        .into_iter()
        .map(|(start, end)| text[start..end].trim())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_overlap_discarded() {
        let found = extract(&INTERNATIONAL_PATTERNS, "call +86 138 0013 8000 now");
        assert_eq!(found, vec!["+86 138 0013 8000"]);
    }

    #[test]
    fn test_text_order() {
        let found = extract(
            &INTERNATIONAL_PATTERNS,
            "13800138000 then +44 7911 123456",
        );
        assert_eq!(found, vec!["13800138000", "+44 7911 123456"]);
    }

    #[test]
    fn test_malaysia_forms() {
        let found = extract(
            &MALAYSIA_PATTERNS,
            "+60 12-345 6789, 03-1234 5678 and 123456789",
        );
        assert_eq!(found, vec!["+60 12-345 6789", "03-1234 5678", "123456789"]);
    }
}
