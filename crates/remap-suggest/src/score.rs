//! Name-similarity field matching.
//!
//! Uses Jaro-Winkler similarity over normalized field names with a
//! greedy one-to-one assignment by descending score. Matched pairs
//! become assign rules; source fields left over become ignore rules,
//! documenting that they were seen and deliberately not mapped.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rapidfuzz::distance::jaro_winkler;
use remap_model::{Rule, RuleKind};

/// A collaborator that proposes a starting rule set for a pair of
/// field-name lists. Implementations may be local heuristics or proxies
/// for an external service.
pub trait RuleSuggester {
    fn request_rules(
        &self,
        source_fields: &[String],
        destination_fields: &[String],
    ) -> Vec<Rule>;
}

/// One scored source/destination pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub source_field: String,
    pub destination_field: String,
    /// Similarity in `0.0..=1.0`.
    pub score: f64,
}

/// Local suggester backed by fuzzy name matching.
#[derive(Debug, Clone)]
pub struct NameSimilaritySuggester {
    confidence_threshold: f64,
}

impl Default for NameSimilaritySuggester {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
        }
    }
}

impl NameSimilaritySuggester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum similarity a pair must reach to be proposed.
    #[must_use]
    pub fn with_threshold(mut self, confidence_threshold: f64) -> Self {
        self.confidence_threshold = confidence_threshold.clamp(0.0, 1.0);
        self
    }

    /// Best one-to-one pairings at or above the threshold, highest
    /// score first. Each field appears in at most one pair.
    pub fn matches(
        &self,
        source_fields: &[String],
        destination_fields: &[String],
    ) -> Vec<FieldMatch> {
        let mut candidates: Vec<FieldMatch> = Vec::new();

        for source in source_fields {
            for destination in destination_fields {
                let score = similarity(source, destination);
                if score >= self.confidence_threshold {
                    candidates.push(FieldMatch {
                        source_field: source.clone(),
                        destination_field: destination.clone(),
                        score,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let mut assigned_sources: BTreeSet<String> = BTreeSet::new();
        let mut assigned_destinations: BTreeSet<String> = BTreeSet::new();
        let mut matches = Vec::new();

        for candidate in candidates {
            if assigned_sources.contains(&candidate.source_field)
                || assigned_destinations.contains(&candidate.destination_field)
            {
                continue;
            }
            assigned_sources.insert(candidate.source_field.clone());
            assigned_destinations.insert(candidate.destination_field.clone());
            matches.push(candidate);
        }

        matches
    }
}

impl RuleSuggester for NameSimilaritySuggester {
    fn request_rules(
        &self,
        source_fields: &[String],
        destination_fields: &[String],
    ) -> Vec<Rule> {
        let matches = self.matches(source_fields, destination_fields);
        let matched: BTreeSet<&str> = matches.iter().map(|m| m.source_field.as_str()).collect();

        let mut rules: Vec<Rule> = matches
            .iter()
            .map(|m| {
                Rule::from(RuleKind::Assign {
                    source_field: m.source_field.clone(),
                    destination_field: m.destination_field.clone(),
                })
            })
            .collect();

        for source in source_fields {
            if !matched.contains(source.as_str()) {
                rules.push(Rule::from(RuleKind::Ignore {
                    source_field: source.clone(),
                }));
            }
        }

        rules
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler::similarity(normalize(a).chars(), normalize(b).chars())
}

/// Lowercase, trim, and collapse `_`, `-`, and `.` separators into
/// single spaces, so `billing_zip` and `Billing Zip` compare equal.
fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['_', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_names_pair_one_to_one() {
        let suggester = NameSimilaritySuggester::new();
        let matches = suggester.matches(
            &fields(&["name", "age", "location"]),
            &fields(&["age", "location", "name"]),
        );

        assert_eq!(matches.len(), 3);
        for m in &matches {
            assert_eq!(m.source_field, m.destination_field);
            assert!(m.score > 0.99);
        }
    }

    #[test]
    fn separators_do_not_block_a_match() {
        let suggester = NameSimilaritySuggester::new();
        let matches = suggester.matches(&fields(&["first_name"]), &fields(&["first name"]));

        assert_eq!(matches.len(), 1);
        assert!(matches[0].score > 0.99);
    }

    #[test]
    fn threshold_drops_weak_pairs() {
        let suggester = NameSimilaritySuggester::new().with_threshold(0.9);
        let matches = suggester.matches(&fields(&["zzzz"]), &fields(&["name"]));
        assert!(matches.is_empty());
    }

    #[test]
    fn each_field_is_assigned_at_most_once() {
        let suggester = NameSimilaritySuggester::new().with_threshold(0.5);
        let matches = suggester.matches(
            &fields(&["address1", "address2"]),
            &fields(&["address"]),
        );

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].destination_field, "address");
    }

    #[test]
    fn unmatched_sources_become_ignore_rules() {
        let suggester = NameSimilaritySuggester::new();
        let rules = suggester.request_rules(
            &fields(&["name", "internal_id"]),
            &fields(&["name"]),
        );

        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].kind,
            RuleKind::Assign {
                source_field: "name".into(),
                destination_field: "name".into(),
            }
        );
        assert_eq!(
            rules[1].kind,
            RuleKind::Ignore {
                source_field: "internal_id".into(),
            }
        );
    }
}
