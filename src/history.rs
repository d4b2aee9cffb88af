use crate::{
    protocol::RollResult,
    theme::Theme,
};
use itertools::Itertools;
use std::{
    collections::VecDeque,
    fmt,
};

pub const HISTORY_CAPACITY: usize = 20;

/// Display-only projection of a roll result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HistoryEntry {
    pub headline: String,
    pub time_of_day: Option<String>,
    pub theme: Option<Theme>,
    pub is_gm_roll: bool,
    pub is_hidden: bool,
    /// Live result (as opposed to a replayed snapshot entry).
    pub fresh: bool,
}

impl HistoryEntry {
    pub fn from_result(result: &RollResult, fresh: bool) -> Self {
        let span = result_span(result);
        let headline = match result.roll_type.as_deref().filter(|l| !l.is_empty()) {
            Some(label) => format!("{}'s {}: {}", result.character, label, span),
            None => format!("{} rolled {} on {}", result.character, span, result.dice_type),
        };
        Self {
            headline,
            time_of_day: result
                .timestamp
                .map(|ts| ts.format("%H:%M:%S").to_string()),
            theme: result.theme,
            is_gm_roll: result.is_gm_roll,
            is_hidden: result.is_hidden,
            fresh,
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.headline)?;
        if let Some(time) = &self.time_of_day {
            write!(f, "  {time}")?;
        }
        Ok(())
    }
}

/// The value part of a history line.
pub fn result_span(result: &RollResult) -> String {
    if result.percentile().is_some() {
        return result.result.to_string();
    }
    let values = result.individual_results();
    if values.len() > 1 {
        let joined = values.iter().join(", ");
        return match result.total {
            Some(total) => format!("{total} ({joined})"),
            None => joined,
        };
    }
    result.result.to_string()
}

/// Capped, newest-first list of past results.
#[derive(Debug)]
pub struct HistoryView {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryView {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// `prepend = false` replaces the view with a full snapshot (given oldest
    /// first); `prepend = true` adds each result at the head.
    pub fn render(&mut self, results: &[RollResult], prepend: bool, gm_active: bool) {
        if !prepend {
            self.entries.clear();
        }
        for result in results {
            self.push(result, prepend, gm_active);
        }
    }

    /// Adds one live result at the head. Returns `false` if it was filtered.
    pub fn prepend(&mut self, result: &RollResult, gm_active: bool) -> bool {
        self.push(result, true, gm_active)
    }

    fn push(&mut self, result: &RollResult, fresh: bool, gm_active: bool) -> bool {
        if result.is_hidden && !gm_active {
            return false;
        }
        self.entries.push_front(HistoryEntry::from_result(result, fresh));
        self.entries.truncate(self.capacity);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn head(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use serde_json::json;

    fn result(value: serde_json::Value) -> RollResult {
        serde_json::from_value(value).unwrap()
    }

    fn numbered(n: u32) -> RollResult {
        result(json!({"dice_type": "d20", "result": n, "character": format!("P{n}")}))
    }

    #[test]
    fn headline__labelled_roll() {
        let entry = HistoryEntry::from_result(
            &result(json!({
                "dice_type": "d20", "result": 17, "character": "Aria", "roll_type": "Attack Roll"
            })),
            true,
        );
        assert_eq!(entry.headline, "Aria's Attack Roll: 17");
    }

    #[test]
    fn headline__unlabelled_roll_names_the_die() {
        let entry = HistoryEntry::from_result(
            &result(json!({"dice_type": "d8", "result": 5, "character": "Bram"})),
            true,
        );
        assert_eq!(entry.headline, "Bram rolled 5 on d8");
    }

    #[test]
    fn headline__multi_die_with_total() {
        let entry = HistoryEntry::from_result(
            &result(json!({
                "dice_type": "d6", "result": 7, "total": 7, "character": "Cy",
                "dice_results": [{"result": 3}, {"result": 4}]
            })),
            true,
        );
        assert_eq!(entry.headline, "Cy rolled 7 (3, 4) on d6");
    }

    #[test]
    fn headline__multi_die_without_total_lists_values() {
        let span = result_span(&result(json!({
            "dice_type": "d10", "result": 2, "dice_results": [{"result": 2}, {"result": 9}]
        })));
        assert_eq!(span, "2, 9");
    }

    #[test]
    fn headline__percentile_uses_server_result() {
        let span = result_span(&result(json!({
            "dice_type": "d100", "result": 100, "tens_die": 0, "ones_die": 0
        })));
        assert_eq!(span, "100");
    }

    #[test]
    fn from_result__formats_time_of_day() {
        let entry = HistoryEntry::from_result(
            &result(json!({
                "dice_type": "d4", "result": 2, "timestamp": "2024-05-01T09:05:03"
            })),
            false,
        );
        assert_eq!(entry.time_of_day.as_deref(), Some("09:05:03"));
        assert_eq!(entry.to_string(), "Anonymous rolled 2 on d4  09:05:03");
    }

    #[test]
    fn prepend__caps_at_twenty_and_evicts_oldest() {
        // given
        let mut view = HistoryView::new();
        for n in 1..=20 {
            view.prepend(&numbered(n), false);
        }
        assert_eq!(view.len(), 20);

        // when
        view.prepend(&numbered(21), false);

        // then
        assert_eq!(view.len(), 20);
        assert_eq!(view.head().unwrap().headline, "P21 rolled 21 on d20");
        let last = view.entries().last().unwrap();
        assert_eq!(last.headline, "P2 rolled 2 on d20");
    }

    #[test]
    fn render__snapshot_puts_newest_first() {
        let mut view = HistoryView::new();
        view.prepend(&numbered(99), false);

        view.render(&[numbered(1), numbered(2), numbered(3)], false, false);

        let heads: Vec<_> = view.entries().map(|e| e.headline.clone()).collect();
        assert_eq!(
            heads,
            vec!["P3 rolled 3 on d20", "P2 rolled 2 on d20", "P1 rolled 1 on d20"]
        );
        assert!(view.entries().all(|e| !e.fresh));
    }

    #[test]
    fn render__snapshot_larger_than_capacity_keeps_newest() {
        let mut view = HistoryView::new();
        let snapshot: Vec<_> = (1..=25).map(numbered).collect();
        view.render(&snapshot, false, false);
        assert_eq!(view.len(), 20);
        assert_eq!(view.head().unwrap().headline, "P25 rolled 25 on d20");
    }

    #[test]
    fn prepend__hidden_roll_requires_gm() {
        let hidden = result(json!({
            "dice_type": "d20", "result": 1, "character": "Game Master",
            "is_gm_roll": true, "is_hidden": true
        }));
        let mut view = HistoryView::new();

        assert!(!view.prepend(&hidden, false));
        assert!(view.is_empty());

        assert!(view.prepend(&hidden, true));
        assert!(view.head().unwrap().is_hidden);
    }
}
