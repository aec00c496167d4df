//! Nest-rule inference from flat field names.
//!
//! Repeated-column families like `address1`/`address2` or
//! `math.score.1`/`math.score.2` are discovered by splitting each field
//! name into parts (by case convention, delimiters, and digit runs) and
//! pairing names that agree in all but one part. The varying part
//! becomes the control key, and each surviving family becomes a nest
//! rule whose pattern captures exactly that part.

use indexmap::IndexMap;

use remap_model::{NestSubfield, Rule, RuleKind};

/// Naming convention of a single field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Lower,
    Upper,
    Camel,
    Pascal,
    Delimited,
}

fn detect_case(s: &str) -> Case {
    let lower = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let upper = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit();

    if s.chars().all(lower) {
        Case::Lower
    } else if s.chars().all(upper) {
        Case::Upper
    } else if s.chars().all(|c| c.is_ascii_alphanumeric()) {
        if s.starts_with(|c: char| c.is_ascii_uppercase()) {
            Case::Pascal
        } else {
            Case::Camel
        }
    } else {
        Case::Delimited
    }
}

fn is_delimiter(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| matches!(c, '-' | '_' | ' ' | '.'))
}

/// A field name broken into comparable parts. Digit runs are always
/// their own part, so `address1` and `address2` differ in exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SplitName {
    original: String,
    case: Case,
    parts: Vec<String>,
}

fn split_name(name: &str) -> SplitName {
    let case = detect_case(name);
    let coarse: Vec<String> = match case {
        Case::Lower | Case::Upper => split_digit_runs(name),
        Case::Camel | Case::Pascal => split_camel(name),
        Case::Delimited => split_delimited(name),
    };

    let parts = coarse
        .iter()
        .flat_map(|part| split_edge_number(part))
        .collect();

    SplitName {
        original: name.to_string(),
        case,
        parts,
    }
}

/// Split into alternating digit and non-digit runs.
fn split_digit_runs(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_digit = false;

    for c in s.chars() {
        if !current.is_empty() && c.is_ascii_digit() != current_digit {
            parts.push(std::mem::take(&mut current));
        }
        current_digit = c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split before every uppercase letter.
fn split_camel(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for c in s.chars() {
        if c.is_ascii_uppercase() && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split on `-`, `_`, space, and `.`, keeping each delimiter as its
/// own part.
fn split_delimited(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for c in s.chars() {
        if matches!(c, '-' | '_' | ' ' | '.') {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            parts.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split a leading or trailing digit run off a mixed part, so the
/// `Score1` piece of `mathScore1` compares as `Score` + `1`.
fn split_edge_number(part: &str) -> Vec<String> {
    let digits_at_start = part.chars().take_while(|c| c.is_ascii_digit()).count();
    let digits_at_end = part
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    let len = part.chars().count();

    if digits_at_start > 0 && digits_at_start < len && digits_at_end == 0 {
        let split = part.char_indices().nth(digits_at_start).map(|(i, _)| i);
        if let Some(i) = split {
            return vec![part[..i].to_string(), part[i..].to_string()];
        }
    }
    if digits_at_end > 0 && digits_at_end < len && digits_at_start == 0 {
        let split = part.char_indices().nth(len - digits_at_end).map(|(i, _)| i);
        if let Some(i) = split {
            return vec![part[..i].to_string(), part[i..].to_string()];
        }
    }
    vec![part.to_string()]
}

/// Join parts back into a name, trimming edge delimiters and
/// collapsing runs of them.
fn rejoin(parts: &[String]) -> String {
    let mut slice = parts;
    while slice.first().is_some_and(|p| is_delimiter(p)) {
        slice = &slice[1..];
    }
    while slice.last().is_some_and(|p| is_delimiter(p)) {
        slice = &slice[..slice.len() - 1];
    }

    let mut out = String::new();
    let mut previous_was_delimiter = false;
    for part in slice {
        let delimiter = is_delimiter(part);
        if delimiter && previous_was_delimiter {
            continue;
        }
        out.push_str(part);
        previous_was_delimiter = delimiter;
    }
    out
}

/// Index of the single differing part, if the two names agree
/// everywhere else. Names with one part, different casing, or a
/// different part count never match.
fn almost_match_at(a: &SplitName, b: &SplitName) -> Option<usize> {
    if a.case != b.case || a.parts.len() != b.parts.len() {
        return None;
    }
    if a.parts.len() == 1 {
        return None;
    }

    let mut mismatch = None;
    for (i, (pa, pb)) in a.parts.iter().zip(&b.parts).enumerate() {
        if pa != pb {
            if mismatch.is_some() {
                return None;
            }
            mismatch = Some(i);
        }
    }
    mismatch
}

/// One member of a repeated-column family.
#[derive(Debug, Clone)]
struct GroupedField {
    /// Index into the original field-name list.
    index: usize,
    split: SplitName,
    /// The varying part of the name for this member.
    control: String,
    control_index: usize,
}

/// Families keyed by the name pattern with the varying part replaced
/// by `*` (e.g. `address*`). Insertion-ordered for stable output.
type Groups = IndexMap<String, Vec<GroupedField>>;

fn find_groups(field_names: &[String]) -> Groups {
    let split: Vec<SplitName> = field_names.iter().map(|n| split_name(n)).collect();
    let mut groups: Groups = IndexMap::new();

    for i in 0..split.len() {
        for j in (i + 1)..split.len() {
            let Some(mismatch) = almost_match_at(&split[i], &split[j]) else {
                continue;
            };

            let mut key_parts = split[i].parts.clone();
            key_parts[mismatch] = "*".to_string();
            let key = rejoin(&key_parts);

            let group = groups.entry(key).or_default();
            for index in [i, j] {
                if group.iter().any(|g| g.index == index) {
                    continue;
                }
                group.push(GroupedField {
                    index,
                    control: split[index].parts[mismatch].clone(),
                    control_index: mismatch,
                    split: split[index].clone(),
                });
            }
        }
    }

    groups
}

fn is_numeric(control: &str) -> bool {
    control.parse::<f64>().is_ok()
}

/// Reduce to at most one family per field: all-numeric controls first,
/// then larger families; non-numeric families are dropped entirely.
fn distill_groups(groups: Groups) -> Groups {
    let mut keys: Vec<&String> = groups.keys().collect();
    keys.sort_by_key(|key| {
        let group = &groups[*key];
        let numeric = group.iter().filter(|g| is_numeric(&g.control)).count();
        (std::cmp::Reverse(numeric), std::cmp::Reverse(group.len()))
    });

    let mut chosen: Vec<String> = Vec::new();
    let mut seen_indexes = std::collections::BTreeSet::new();

    for key in keys {
        let group = &groups[key];
        if !group.iter().all(|g| is_numeric(&g.control)) {
            continue;
        }
        if group.iter().any(|g| seen_indexes.contains(&g.index)) {
            continue;
        }
        seen_indexes.extend(group.iter().map(|g| g.index));
        chosen.push(key.clone());
    }

    let mut groups = groups;
    let mut result = Groups::new();
    for key in chosen {
        if let Some(group) = groups.swap_remove(&key) {
            result.insert(key, group);
        }
    }
    result
}

/// Propose one nest rule per detected repeated-column family.
///
/// Each rule's pattern is the family name with the varying part
/// replaced by a single capture group; literal parts are escaped so
/// delimiters like `.` match themselves.
pub fn nesting_rules(field_names: &[String]) -> Vec<Rule> {
    let groups = distill_groups(find_groups(field_names));
    let mut rules = Vec::new();

    for group in groups.values() {
        // Any member works as the template; they differ only in the
        // control part.
        let field = &group[0];

        let mut pattern = String::from("^");
        for (i, part) in field.split.parts.iter().enumerate() {
            if i == field.control_index {
                pattern.push_str("([0-9]+)");
            } else {
                pattern.push_str(&regex::escape(part));
            }
        }
        pattern.push('$');

        let mut name_parts = field.split.parts.clone();
        name_parts.remove(field.control_index);
        let destination = rejoin(&name_parts);

        rules.push(Rule::from(RuleKind::Nest {
            subfields: vec![NestSubfield {
                source_regex: pattern,
                destination_subfield: destination.clone(),
            }],
            destination_field: destination,
        }));
    }

    rules
}
