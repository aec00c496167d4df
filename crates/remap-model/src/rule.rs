//! Declarative mapping-rule definitions.
//!
//! A mapping program is an ordered list of [`Rule`]s. Each rule carries
//! an optional name, description, and filter expression alongside its
//! type-specific parameters. The wire format is a tagged JSON object
//! (`"type"` discriminator, camelCase fields), so programs written for
//! the hosted mapping API deserialize directly.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One declarative transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Optional human-readable rule name, echoed in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional filter expression. The engine hands this string to the
    /// caller-supplied evaluator; it never interprets the syntax itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(flatten)]
    pub kind: RuleKind,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            name: None,
            description: None,
            filter: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

impl From<RuleKind> for Rule {
    fn from(kind: RuleKind) -> Self {
        Self::new(kind)
    }
}

/// The closed set of rule variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleKind {
    /// Copy one field's value verbatim.
    #[serde(rename_all = "camelCase")]
    Assign {
        source_field: String,
        destination_field: String,
    },

    /// No-op that documents an intentionally unmapped source field.
    #[serde(rename_all = "camelCase")]
    Ignore { source_field: String },

    /// Write a fixed literal.
    #[serde(rename_all = "camelCase")]
    Constant {
        destination_field: String,
        value: Value,
    },

    /// Apply a named string transform ("uppercase" or "lowercase").
    #[serde(rename_all = "camelCase")]
    Transform {
        source_field: String,
        destination_field: String,
        transform: String,
    },

    /// Extract capture groups into one destination field per group.
    #[serde(rename_all = "camelCase")]
    RegexExtract {
        source_field: String,
        regex: String,
        destination_fields: Vec<String>,
    },

    /// Substitute field values into a `{i}` positional template.
    #[serde(rename_all = "camelCase")]
    Interpolate {
        source_fields: Vec<String>,
        destination_field: String,
        output: String,
    },

    /// Evaluate an arithmetic equation over field values.
    #[serde(rename_all = "camelCase")]
    Arithmetic {
        equation: String,
        source_fields: Vec<String>,
        destination_field: String,
    },

    /// Remove a destination field if present.
    #[serde(rename_all = "camelCase")]
    Delete { destination_field: String },

    /// Apply a nested rule list to the same record pair.
    Subprogram { rules: Vec<Rule> },

    /// First non-null field value in listed order.
    #[serde(rename_all = "camelCase")]
    Coalesce {
        source_fields: Vec<String>,
        destination_field: String,
        #[serde(default)]
        default_value: Value,
    },

    /// Join string-coerced values with a separator (default ",").
    #[serde(rename_all = "camelCase")]
    Concatenate {
        source_fields: Vec<String>,
        destination_field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
    },

    /// Collect field values into an ordered sequence.
    #[serde(rename_all = "camelCase")]
    Array {
        source_fields: Vec<String>,
        destination_field: String,
    },

    /// Group repeated flat columns into ordered subrecords.
    #[serde(rename_all = "camelCase")]
    Nest {
        subfields: Vec<NestSubfield>,
        destination_field: String,
    },

    /// Ordered substring find/replace applied to a destination field.
    #[serde(rename_all = "camelCase")]
    FindReplace {
        destination_field: String,
        values: Vec<FindReplacePair>,
    },
}

/// One subfield of a nest rule: a single-capture-group pattern matched
/// against source field names, and the subrecord key the matched value
/// lands under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestSubfield {
    pub source_regex: String,
    pub destination_subfield: String,
}

/// One find/replace pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindReplacePair {
    pub find: String,
    pub replace: String,
}
