//! Attribute metadata for the exchange format.
//!
//! Every extra attribute (`@...`) and network field (`#...`) carries an
//! explicit declaration: owning entity kind, value type, default and the
//! human-readable label printed into the declaration block on export. The
//! label is fixed once at ingestion instead of being re-derived from the
//! column name at every use site.

use std::fmt;

/// Entity kind an attribute is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Link,
    Node,
    TransitLine,
    TransitSegment,
}

impl OwnerKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "LINK" => Some(Self::Link),
            "NODE" => Some(Self::Node),
            "TRANSIT_LINE" => Some(Self::TransitLine),
            "TRANSIT_SEGMENT" => Some(Self::TransitSegment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "LINK",
            Self::Node => "NODE",
            Self::TransitLine => "TRANSIT_LINE",
            Self::TransitSegment => "TRANSIT_SEGMENT",
        }
    }
}

/// Value type of a network field (extra attributes are always REAL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Real,
    Integer32,
    Text,
}

impl ValueKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "REAL" => Some(Self::Real),
            "INTEGER32" => Some(Self::Integer32),
            "STRING" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "REAL",
            Self::Integer32 => "INTEGER32",
            Self::Text => "STRING",
        }
    }
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Real(f64),
    Int(i32),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Int(v) => Some(f64::from(*v)),
            Self::Text(_) => None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Real(_) => ValueKind::Real,
            Self::Int(_) => ValueKind::Integer32,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// Parse a table token as the given value kind.
    pub fn parse_as(kind: ValueKind, token: &str) -> Option<Self> {
        match kind {
            ValueKind::Real => token.parse::<f64>().ok().map(Self::Real),
            ValueKind::Integer32 => token.parse::<i32>().ok().map(Self::Int),
            ValueKind::Text => Some(Self::Text(token.trim_matches('\'').to_string())),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(v) => write!(f, "{}", crate::export::format::fmt_g(*v)),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Declaration of one extra attribute or network field.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    /// Wire name including the `@` / `#` prefix.
    pub name: String,
    pub owner: OwnerKind,
    pub kind: ValueKind,
    pub default: AttrValue,
    /// Human-readable description printed into the declaration block.
    pub label: String,
}

impl AttributeDef {
    /// Extra attribute (`@` prefixed, always REAL) with a label derived
    /// from the naming convention.
    pub fn extra(name: &str, owner: OwnerKind) -> Self {
        Self {
            name: name.to_string(),
            owner,
            kind: ValueKind::Real,
            default: AttrValue::Real(0.0),
            label: derive_label(name),
        }
    }

    /// Network field (`#` prefixed) of an explicit value kind.
    pub fn netfield(name: &str, owner: OwnerKind, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            owner,
            kind,
            default: AttrValue::Real(0.0),
            label: name.trim_start_matches('#').to_string(),
        }
    }
}

/// Attributes whose declaration carries an empty description.
const UNLABELED: &[&str] = &[
    "@hinta_aht",
    "@hinta_pt",
    "@hinta_iht",
    "@hw_aht",
    "@hw_pt",
    "@hw_iht",
    "@korkeus",
    "@hsl",
];

const TIME_OF_DAY_SUFFIXES: &[&str] = &["_aht", "_vrk", "_pt", "_iht"];

/// Export-label convention: time-of-day suffixes map to human labels,
/// `@`/`#` prefixes are stripped. Names that match no convention pass
/// through unchanged (permissive default).
pub fn derive_label(name: &str) -> String {
    if UNLABELED.contains(&name) {
        return String::new();
    }
    let mut stripped = name.to_string();
    for suffix in TIME_OF_DAY_SUFFIXES {
        if name.contains(suffix) {
            if ["aux_transit", "cost", "time"]
                .iter()
                .any(|sub| name.contains(sub))
            {
                stripped = name.replace(suffix, "");
            } else {
                stripped = name.replace(suffix, " volume");
            }
            break;
        }
    }
    stripped
        .trim_start_matches('@')
        .trim_start_matches('#')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_suffix_becomes_label() {
        assert_eq!(derive_label("@car_work_vrk"), "car_work volume");
        assert_eq!(derive_label("@truck_aht"), "truck volume");
    }

    #[test]
    fn cost_and_time_suffixes_are_stripped() {
        assert_eq!(derive_label("@cost_work_iht"), "cost_work");
        assert_eq!(derive_label("@time_pt"), "time");
        assert_eq!(derive_label("@aux_transit_aht"), "aux_transit");
    }

    #[test]
    fn unknown_names_fall_through() {
        assert_eq!(derive_label("@pyoratieluokka"), "pyoratieluokka");
        assert_eq!(derive_label("#linkkityyppi"), "linkkityyppi");
    }

    #[test]
    fn price_attributes_have_empty_labels() {
        assert_eq!(derive_label("@hinta_aht"), "");
        assert_eq!(derive_label("@hw_pt"), "");
    }

    #[test]
    fn owner_kind_round_trip() {
        for kind in [
            OwnerKind::Link,
            OwnerKind::Node,
            OwnerKind::TransitLine,
            OwnerKind::TransitSegment,
        ] {
            assert_eq!(OwnerKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(OwnerKind::parse("SEGMENT"), None);
    }
}
