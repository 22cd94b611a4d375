use crate::types::{CharSpan, SkippedSpan};

/// Skipped spans accumulated since the last merge or dismiss.
///
/// No span is ever a subset of another: a new span already covered by an
/// existing one is dropped, and existing spans covered by a new one are
/// removed before it is appended. Partially overlapping spans stay as
/// separate entries.
///
/// `version` increases on every mutation so that timers scheduled against an
/// older state can recognise themselves as outdated.
#[derive(Debug, Clone, Default)]
pub struct GapSet {
    spans: Vec<SkippedSpan>,
    version: u64,
}

impl GapSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the set changed.
    pub fn add(&mut self, span: SkippedSpan) -> bool {
        if span.chars.is_empty() {
            return false;
        }

        if self.spans.iter().any(|s| s.chars.contains(&span.chars)) {
            tracing::trace!(
                start = span.chars.start,
                end = span.chars.end,
                "gap_already_covered"
            );
            return false;
        }

        self.spans.retain(|s| !span.chars.contains(&s.chars));
        self.spans.push(span);
        self.version += 1;
        true
    }

    pub fn clear(&mut self) {
        if !self.spans.is_empty() {
            self.spans.clear();
            self.version += 1;
        }
    }

    pub fn spans(&self) -> &[SkippedSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn char_spans(&self) -> Vec<CharSpan> {
        self.spans.iter().map(|s| s.chars).collect()
    }

    /// Number of distinct characters covered by the set. Overlapping spans
    /// are counted once.
    pub fn total_chars(&self) -> usize {
        union(self.char_spans()).iter().map(CharSpan::len).sum()
    }

    /// End of the span that reaches furthest into the script.
    pub fn last_end(&self) -> Option<usize> {
        self.spans.iter().map(|s| s.chars.end).max()
    }

    /// Display text of the first `limit` spans, joined by a single space.
    pub fn joined_text(&self, limit: usize) -> String {
        self.spans
            .iter()
            .take(limit)
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Merge overlapping or touching ranges into a sorted, disjoint list.
pub fn union(mut spans: Vec<CharSpan>) -> Vec<CharSpan> {
    spans.retain(|s| !s.is_empty());
    spans.sort_by_key(|s| (s.start, s.end));

    let mut merged: Vec<CharSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WordSpan;

    fn span(start: usize, end: usize) -> SkippedSpan {
        SkippedSpan {
            words: WordSpan { start, end },
            chars: CharSpan::new(start, end),
            text: format!("{start}-{end}"),
        }
    }

    fn ranges(gaps: &GapSet) -> Vec<(usize, usize)> {
        gaps.spans()
            .iter()
            .map(|s| (s.chars.start, s.chars.end))
            .collect()
    }

    #[test]
    fn superset_absorbs_existing_subset() {
        let mut gaps = GapSet::new();
        assert!(gaps.add(span(2, 4)));
        assert!(gaps.add(span(1, 5)));
        assert_eq!(ranges(&gaps), [(1, 5)]);
    }

    #[test]
    fn subset_of_existing_is_dropped() {
        let mut gaps = GapSet::new();
        assert!(gaps.add(span(1, 5)));
        let version = gaps.version();

        assert!(!gaps.add(span(2, 4)));
        assert!(!gaps.add(span(1, 5)));
        assert_eq!(ranges(&gaps), [(1, 5)]);
        assert_eq!(gaps.version(), version);
    }

    #[test]
    fn partial_overlap_keeps_both() {
        let mut gaps = GapSet::new();
        gaps.add(span(0, 6));
        gaps.add(span(4, 10));
        assert_eq!(ranges(&gaps), [(0, 6), (4, 10)]);
        assert_eq!(gaps.total_chars(), 10);
    }

    #[test]
    fn total_and_last_end() {
        let mut gaps = GapSet::new();
        assert_eq!(gaps.total_chars(), 0);
        assert_eq!(gaps.last_end(), None);

        gaps.add(span(20, 23));
        gaps.add(span(0, 4));
        assert_eq!(gaps.total_chars(), 7);
        assert_eq!(gaps.last_end(), Some(23));
    }

    #[test]
    fn joined_text_respects_limit() {
        let mut gaps = GapSet::new();
        for i in 0..7 {
            gaps.add(span(i * 10, i * 10 + 2));
        }
        assert_eq!(gaps.joined_text(2), "0-2 10-12");
        assert_eq!(gaps.joined_text(5).split(' ').count(), 5);
    }

    #[test]
    fn clear_bumps_version_only_when_non_empty() {
        let mut gaps = GapSet::new();
        gaps.clear();
        assert_eq!(gaps.version(), 0);

        gaps.add(span(0, 3));
        gaps.clear();
        assert!(gaps.is_empty());
        assert_eq!(gaps.version(), 2);
    }

    #[test]
    fn union_merges_touching_ranges() {
        let merged = union(vec![
            CharSpan::new(5, 8),
            CharSpan::new(0, 2),
            CharSpan::new(2, 3),
            CharSpan::new(7, 9),
        ]);
        assert_eq!(merged, [CharSpan::new(0, 3), CharSpan::new(5, 9)]);
    }
}
