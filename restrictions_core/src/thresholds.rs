//! Population-gated rule selection.

use crate::config::{AreaRule, Restriction};

/// Open population interval `(more_than, less_than)`.
///
/// A `less_than` of zero leaves the interval unbounded above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PopulationBounds {
    pub more_than: i32,
    pub less_than: i32,
}

impl PopulationBounds {
    pub const fn new(more_than: i32, less_than: i32) -> Self {
        Self {
            more_than,
            less_than,
        }
    }

    pub fn contains(&self, count: usize) -> bool {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        count > i64::from(self.more_than)
            && (self.less_than == 0 || count < i64::from(self.less_than))
    }
}

/// Rules active for a given player count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation<'a> {
    /// Text of the last matching message rule. `None` when nothing matched or
    /// the last match carries no text.
    pub message: Option<&'a str>,
    pub areas: Vec<(&'a str, &'a AreaRule)>,
}

impl Evaluation<'_> {
    /// Selected message, ignoring empty text.
    pub fn broadcast_text(&self) -> Option<&str> {
        self.message.filter(|text| !text.is_empty())
    }
}

/// Select the message and areas active for `player_count`.
///
/// Messages overwrite one another in declaration order, so the last match
/// wins. Every matching area is kept.
pub fn evaluate(player_count: usize, restriction: &Restriction) -> Evaluation<'_> {
    let mut message = None;
    for rule in restriction.messages.values() {
        if rule.bounds.contains(player_count) {
            message = Some(rule.message.as_deref());
        }
    }

    let areas = restriction
        .areas
        .iter()
        .filter(|(_, area)| area.bounds.contains(player_count))
        .collect();

    Evaluation {
        message: message.flatten(),
        areas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MessageRule, RuleSet};

    fn area(more_than: i32, less_than: i32) -> AreaRule {
        AreaRule {
            bounds: PopulationBounds::new(more_than, less_than),
            ..AreaRule::default()
        }
    }

    fn message(more_than: i32, less_than: i32, text: Option<&str>) -> MessageRule {
        MessageRule {
            bounds: PopulationBounds::new(more_than, less_than),
            message: text.map(str::to_string),
        }
    }

    fn active_area_keys(count: usize, restriction: &Restriction) -> Vec<&str> {
        evaluate(count, restriction)
            .areas
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    #[test]
    fn bounds_are_open_with_zero_as_unbounded() {
        let bounded = PopulationBounds::new(0, 10);
        assert!(!bounded.contains(0));
        assert!(bounded.contains(1));
        assert!(bounded.contains(9));
        assert!(!bounded.contains(10));

        let open = PopulationBounds::new(10, 0);
        assert!(!open.contains(10));
        assert!(open.contains(11));
        assert!(open.contains(usize::MAX));
    }

    #[test]
    fn negative_lower_bound_admits_empty_server() {
        assert!(PopulationBounds::new(-1, 0).contains(0));
    }

    #[test]
    fn areas_split_at_shared_boundary() {
        let restriction = Restriction {
            areas: RuleSet::from_iter([("A", area(0, 10)), ("B", area(10, 0))]),
            ..Restriction::default()
        };

        assert_eq!(active_area_keys(5, &restriction), vec!["A"]);
        assert_eq!(active_area_keys(15, &restriction), vec!["B"]);
        assert!(active_area_keys(10, &restriction).is_empty());
    }

    #[test]
    fn overlapping_areas_are_all_active_in_order() {
        let restriction = Restriction {
            areas: RuleSet::from_iter([
                ("wide", area(0, 0)),
                ("narrow", area(2, 6)),
                ("late", area(1, 0)),
            ]),
            ..Restriction::default()
        };
        assert_eq!(active_area_keys(4, &restriction), vec!["wide", "narrow", "late"]);
        assert_eq!(active_area_keys(1, &restriction), vec!["wide"]);
    }

    #[test]
    fn last_matching_message_wins() {
        let restriction = Restriction {
            messages: RuleSet::from_iter([
                ("narrow", message(2, 6, Some("narrow"))),
                ("wide", message(0, 0, Some("wide"))),
                ("high", message(20, 0, Some("high"))),
            ]),
            ..Restriction::default()
        };

        assert_eq!(evaluate(4, &restriction).message, Some("wide"));
        assert_eq!(evaluate(25, &restriction).message, Some("high"));
        assert_eq!(evaluate(0, &restriction).message, None);
    }

    #[test]
    fn last_match_without_text_suppresses_earlier_match() {
        let restriction = Restriction {
            messages: RuleSet::from_iter([
                ("first", message(0, 0, Some("hello"))),
                ("second", message(0, 0, None)),
            ]),
            ..Restriction::default()
        };
        let evaluation = evaluate(3, &restriction);
        assert_eq!(evaluation.message, None);
        assert_eq!(evaluation.broadcast_text(), None);
    }

    #[test]
    fn empty_text_is_not_broadcast() {
        let restriction = Restriction {
            messages: RuleSet::from_iter([("only", message(0, 0, Some("")))]),
            ..Restriction::default()
        };
        let evaluation = evaluate(3, &restriction);
        assert_eq!(evaluation.message, Some(""));
        assert_eq!(evaluation.broadcast_text(), None);
    }

    #[test]
    fn candidates_match_interval_for_every_count() {
        let rules = [(0, 5), (3, 0), (4, 8), (-1, 2), (7, 7)];
        let restriction = Restriction {
            messages: rules
                .iter()
                .enumerate()
                .map(|(i, &(lo, hi))| {
                    let key = format!("m{i}");
                    let rule = message(lo, hi, Some(key.as_str()));
                    (key, rule)
                })
                .collect(),
            ..Restriction::default()
        };

        for count in 0..12i64 {
            let mut expected = None;
            for (i, (lo, hi)) in rules.iter().enumerate() {
                if count > i64::from(*lo) && (*hi == 0 || count < i64::from(*hi)) {
                    expected = Some(format!("m{i}"));
                }
            }
            let count = count as usize;
            assert_eq!(
                evaluate(count, &restriction).message.map(str::to_string),
                expected,
                "count {count}"
            );
        }
    }
}
