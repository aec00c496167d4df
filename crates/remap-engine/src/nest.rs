//! The nest grouper.
//!
//! Turns repeated flat columns (`address1`, `address2`, ...) into an
//! ordered sequence of subrecords. Each subfield spec carries a
//! single-capture-group pattern; the capture is the control key that
//! groups matches from different specs into one subrecord.

use indexmap::IndexMap;
use regex::Regex;
use remap_model::{NestSubfield, Record, Value};

use crate::error::ConfigError;

/// The subrecord entry holding the control key.
pub const CONTROL_KEY: &str = "__control";

/// Compiled nest subfield specs.
#[derive(Debug, Clone)]
pub struct NestGrouper {
    specs: Vec<CompiledSubfield>,
}

#[derive(Debug, Clone)]
struct CompiledSubfield {
    regex: Regex,
    subfield: String,
}

impl NestGrouper {
    /// Compile the subfield specs. Each `sourceRegex` must contain
    /// exactly one capture group; patterns are anchored so a field
    /// name must match in full.
    pub fn compile(subfields: &[NestSubfield]) -> Result<Self, ConfigError> {
        let mut specs = Vec::with_capacity(subfields.len());

        for subfield in subfields {
            let anchored = format!(r"\A(?:{})\z", subfield.source_regex);
            let regex = Regex::new(&anchored).map_err(|source| ConfigError::InvalidRegex {
                pattern: subfield.source_regex.clone(),
                source,
            })?;

            let groups = regex.captures_len() - 1;
            if groups != 1 {
                return Err(ConfigError::CaptureGroupCount {
                    pattern: subfield.source_regex.clone(),
                    found: groups,
                });
            }

            specs.push(CompiledSubfield {
                regex,
                subfield: subfield.destination_subfield.clone(),
            });
        }

        Ok(Self { specs })
    }

    /// Group matching source fields into ordered subrecords.
    ///
    /// Field names are scanned in the record's natural order; subrecords
    /// come out ordered by each control key's first appearance, with
    /// ties between specs on the same field broken by declaration order.
    /// Values are string-coerced unless null. A spec with no match for
    /// a control key simply leaves its subfield out of that subrecord.
    pub fn group(&self, source: &Record) -> Vec<Record> {
        let mut groups: IndexMap<String, Record> = IndexMap::new();

        for (name, value) in source.iter() {
            for spec in &self.specs {
                let Some(captures) = spec.regex.captures(name) else {
                    continue;
                };
                let control = captures
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or_default()
                    .to_string();

                let subrecord = groups.entry(control.clone()).or_insert_with(|| {
                    let mut subrecord = Record::new();
                    subrecord.set(CONTROL_KEY, control.clone());
                    subrecord
                });

                let stored = if value.is_null() {
                    Value::Null
                } else {
                    Value::String(value.coerce_string())
                };
                subrecord.set(spec.subfield.clone(), stored);
            }
        }

        groups.into_values().collect()
    }
}
