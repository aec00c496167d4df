//! Source/destination field routing.
//!
//! By convention a field reference starting with `destination!` reads
//! from (or writes to) the destination record and one starting with
//! `source!` refers to the source record. Everything else resolves to
//! the referring parameter's natural side. Field names that literally
//! begin with one of the prefixes cannot be escaped; that is a known
//! limitation of the convention.

const DESTINATION_PREFIX: &str = "destination!";
const SOURCE_PREFIX: &str = "source!";

/// Which record a field reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

/// A routed field reference: the side plus the bare key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef<'a> {
    pub side: Side,
    pub key: &'a str,
}

impl<'a> FieldRef<'a> {
    /// Resolve a field reference. `default` is the natural side of the
    /// parameter the name came from: `Side::Source` for source-field
    /// parameters, `Side::Destination` for destination-field parameters.
    pub fn parse(name: &'a str, default: Side) -> Self {
        if let Some(key) = name.strip_prefix(DESTINATION_PREFIX) {
            Self {
                side: Side::Destination,
                key,
            }
        } else if let Some(key) = name.strip_prefix(SOURCE_PREFIX) {
            Self {
                side: Side::Source,
                key,
            }
        } else {
            Self { side: default, key: name }
        }
    }

    /// True if this reference was routed away from its natural side.
    pub fn is_redirected(&self, default: Side) -> bool {
        self.side != default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_takes_default_side() {
        let field = FieldRef::parse("name", Side::Source);
        assert_eq!(field.side, Side::Source);
        assert_eq!(field.key, "name");

        let field = FieldRef::parse("name", Side::Destination);
        assert_eq!(field.side, Side::Destination);
    }

    #[test]
    fn destination_prefix_overrides_default() {
        let field = FieldRef::parse("destination!nickname", Side::Source);
        assert_eq!(field.side, Side::Destination);
        assert_eq!(field.key, "nickname");
    }

    #[test]
    fn source_prefix_overrides_default() {
        let field = FieldRef::parse("source!name", Side::Destination);
        assert_eq!(field.side, Side::Source);
        assert_eq!(field.key, "name");
        assert!(field.is_redirected(Side::Destination));
    }

    #[test]
    fn prefix_strips_only_once() {
        let field = FieldRef::parse("destination!destination!x", Side::Source);
        assert_eq!(field.key, "destination!x");
    }
}
