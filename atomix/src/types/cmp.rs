//! Range comparison operators.
//!
//! A range bound is a key plus one of four operators. Each operator has a
//! direction (which side of the key it accepts) and an inclusivity.

use std::cmp::Ordering;

/// Comparison operator for one side of a range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

/// The side of a bound an operator accepts.
///
/// Used as the start operator, it is also the direction of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `>` and `>=`: keys after the bound, scanned forward.
    Ascending,
    /// `<` and `<=`: keys before the bound, scanned backward.
    Descending,
}

impl CmpOp {
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Gt | Self::Ge => Direction::Ascending,
            Self::Lt | Self::Le => Direction::Descending,
        }
    }

    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(self, Self::Ge | Self::Le)
    }

    #[must_use]
    pub const fn is_ascending(self) -> bool {
        matches!(self.direction(), Direction::Ascending)
    }

    /// Whether a partial key bound under this operator must sort after every
    /// continuation of its prefix.
    ///
    /// `>` skips the whole prefix and `<=` includes it, so both need the
    /// maximum continuation. `>=` and `<` are exact with the bare prefix.
    #[must_use]
    pub const fn pads_to_max(self) -> bool {
        matches!(self, Self::Gt | Self::Le)
    }

    /// Check whether `key <op> reference` holds under byte ordering.
    #[must_use]
    pub fn matches(self, key: &[u8], reference: &[u8]) -> bool {
        let ord = key.cmp(reference);
        match self {
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
        }
    }
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        };
        f.write_str(s)
    }
}

/// Compact numeric codes: the sign is the direction, magnitude 3 is
/// inclusive and 2 is exclusive.
impl TryFrom<i8> for CmpOp {
    type Error = CmpOpError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            3 => Ok(Self::Ge),
            2 => Ok(Self::Gt),
            -2 => Ok(Self::Lt),
            -3 => Ok(Self::Le),
            _ => Err(CmpOpError(code)),
        }
    }
}

impl From<CmpOp> for i8 {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Ge => 3,
            CmpOp::Gt => 2,
            CmpOp::Lt => -2,
            CmpOp::Le => -3,
        }
    }
}

/// An unrecognized numeric comparison code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmpOpError(pub i8);

impl std::fmt::Display for CmpOpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized comparison operator code: {}", self.0)
    }
}

impl std::error::Error for CmpOpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_and_inclusivity() {
        assert_eq!(CmpOp::Gt.direction(), Direction::Ascending);
        assert_eq!(CmpOp::Ge.direction(), Direction::Ascending);
        assert_eq!(CmpOp::Lt.direction(), Direction::Descending);
        assert_eq!(CmpOp::Le.direction(), Direction::Descending);

        assert!(CmpOp::Ge.is_inclusive());
        assert!(CmpOp::Le.is_inclusive());
        assert!(!CmpOp::Gt.is_inclusive());
        assert!(!CmpOp::Lt.is_inclusive());
    }

    #[test]
    fn test_matches() {
        assert!(CmpOp::Ge.matches(b"b", b"b"));
        assert!(CmpOp::Ge.matches(b"c", b"b"));
        assert!(!CmpOp::Ge.matches(b"a", b"b"));

        assert!(!CmpOp::Gt.matches(b"b", b"b"));
        assert!(CmpOp::Gt.matches(b"ba", b"b"));

        assert!(CmpOp::Le.matches(b"b", b"b"));
        assert!(!CmpOp::Le.matches(b"ba", b"b"));

        assert!(!CmpOp::Lt.matches(b"b", b"b"));
        assert!(CmpOp::Lt.matches(b"a", b"b"));
    }

    #[test]
    fn test_padding_policy() {
        assert!(CmpOp::Gt.pads_to_max());
        assert!(CmpOp::Le.pads_to_max());
        assert!(!CmpOp::Ge.pads_to_max());
        assert!(!CmpOp::Lt.pads_to_max());
    }

    #[test]
    fn test_numeric_codes() {
        for op in [CmpOp::Gt, CmpOp::Ge, CmpOp::Lt, CmpOp::Le] {
            assert_eq!(CmpOp::try_from(i8::from(op)), Ok(op));
        }
        assert_eq!(CmpOp::try_from(0), Err(CmpOpError(0)));
        assert_eq!(CmpOp::try_from(1), Err(CmpOpError(1)));
        assert_eq!(
            CmpOpError(9).to_string(),
            "unrecognized comparison operator code: 9"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CmpOp::Ge.to_string(), ">=");
        assert_eq!(CmpOp::Lt.to_string(), "<");
    }
}
