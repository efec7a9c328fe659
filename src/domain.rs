use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnnotateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlateId(i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellId(i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapAnnotationId(i64);

macro_rules! id_impls {
    ($name:ident) => {
        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_impls!(PlateId);
id_impls!(WellId);
id_impls!(MapAnnotationId);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlateName(String);

impl PlateName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlateName {
    type Err = AnnotateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AnnotateError::InvalidPlateName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Zero-based well coordinates. The CSV carries 1-based row/column values,
/// so construction goes through [`WellPosition::from_one_based`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellPosition {
    pub row: u32,
    pub column: u32,
}

impl WellPosition {
    pub fn from_one_based(row: i64, column: i64) -> Result<Self, AnnotateError> {
        if row < 1 || column < 1 {
            return Err(AnnotateError::InvalidPosition(format!(
                "row and column are 1-based, got row={row}, column={column}"
            )));
        }
        Ok(Self {
            row: (row - 1) as u32,
            column: (column - 1) as u32,
        })
    }
}

impl fmt::Display for WellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Ordered key-value pairs for a map annotation. OMERO map annotations are
/// ordered lists of string pairs, not maps, so insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePayload(Vec<(String, String)>);

impl KeyValuePayload {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for KeyValuePayload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_plate_name_trims() {
        let name: PlateName = " PlateA ".parse().unwrap();
        assert_eq!(name.as_str(), "PlateA");
    }

    #[test]
    fn parse_plate_name_empty() {
        let err = "   ".parse::<PlateName>().unwrap_err();
        assert_matches!(err, AnnotateError::InvalidPlateName(_));
    }

    #[test]
    fn position_one_based_conversion() {
        let pos = WellPosition::from_one_based(3, 5).unwrap();
        assert_eq!(pos.row, 2);
        assert_eq!(pos.column, 4);
    }

    #[test]
    fn position_rejects_zero() {
        let err = WellPosition::from_one_based(0, 1).unwrap_err();
        assert_matches!(err, AnnotateError::InvalidPosition(_));
    }

    #[test]
    fn payload_keeps_order() {
        let mut payload = KeyValuePayload::new();
        payload.push("individual", "X");
        payload.push("concentration", "0.5");
        payload.push("compound", "Y");
        let keys: Vec<_> = payload.pairs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["individual", "concentration", "compound"]);
    }
}
