//! Upstream stat values.
//!
//! Counters and lastmodified timestamps arrive as integers, but the
//! upstream contract only promises numbers. Integers stay exact; anything
//! else is carried as a float and serialized back unchanged.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A single numeric stat value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
}

impl StatValue {
    pub fn as_f64(self) -> f64 {
        match self {
            StatValue::Int(v) => v as f64,
            StatValue::Float(v) => v,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    pub fn is_negative(self) -> bool {
        self.as_f64() < 0.0
    }

    /// The larger of two values. Integer pairs compare exactly.
    pub fn max(self, other: StatValue) -> StatValue {
        let ordering = match (self, other) {
            (StatValue::Int(a), StatValue::Int(b)) => a.cmp(&b),
            (a, b) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
        };
        if ordering == Ordering::Less {
            other
        } else {
            self
        }
    }
}

impl Default for StatValue {
    fn default() -> Self {
        StatValue::Int(0)
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Int(v) => write!(f, "{}", v),
            StatValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Int(v)
    }
}

impl From<i32> for StatValue {
    fn from(v: i32) -> Self {
        StatValue::Int(v.into())
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl PartialEq<i64> for StatValue {
    fn eq(&self, other: &i64) -> bool {
        match *self {
            StatValue::Int(v) => v == *other,
            StatValue::Float(v) => v == *other as f64,
        }
    }
}

impl PartialEq<i32> for StatValue {
    fn eq(&self, other: &i32) -> bool {
        *self == i64::from(*other)
    }
}

/// Integer sums saturate at the `i64` bounds.
impl Add for StatValue {
    type Output = StatValue;

    fn add(self, rhs: StatValue) -> StatValue {
        match (self, rhs) {
            (StatValue::Int(a), StatValue::Int(b)) => StatValue::Int(a.saturating_add(b)),
            (a, b) => StatValue::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl AddAssign for StatValue {
    fn add_assign(&mut self, rhs: StatValue) {
        *self = *self + rhs;
    }
}

/// Integer differences saturate at the `i64` bounds.
impl Sub for StatValue {
    type Output = StatValue;

    fn sub(self, rhs: StatValue) -> StatValue {
        match (self, rhs) {
            (StatValue::Int(a), StatValue::Int(b)) => StatValue::Int(a.saturating_sub(b)),
            (a, b) => StatValue::Float(a.as_f64() - b.as_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_integers_exact() {
        let v: StatValue = serde_json::from_str("1703980800").unwrap();
        assert_eq!(v, StatValue::Int(1_703_980_800));

        let v: StatValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(v, StatValue::Float(12.5));
    }

    #[test]
    fn test_serialize_round_trips_shape() {
        assert_eq!(serde_json::to_string(&StatValue::Int(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&StatValue::Float(12.5)).unwrap(), "12.5");
    }

    #[test]
    fn test_integer_arithmetic_saturates() {
        assert_eq!(StatValue::Int(i64::MAX) - StatValue::Int(-1), i64::MAX);
        assert_eq!(StatValue::Int(i64::MIN) - StatValue::Int(1), i64::MIN);
        assert_eq!(StatValue::Int(i64::MAX) + StatValue::Int(1), i64::MAX);
    }

    #[test]
    fn test_mixed_arithmetic_is_float() {
        assert_eq!(StatValue::Int(3) + StatValue::Float(0.5), StatValue::Float(3.5));
        assert_eq!(StatValue::Float(2.5) - StatValue::Int(1), StatValue::Float(1.5));
    }

    #[test]
    fn test_max() {
        assert_eq!(StatValue::Int(5).max(StatValue::Int(9)), 9);
        assert_eq!(StatValue::Int(5).max(StatValue::Float(4.5)), 5);
        assert_eq!(StatValue::Float(1.5).max(StatValue::Int(2)), 2);
    }

    #[test]
    fn test_compare_with_integers() {
        assert_eq!(StatValue::Float(3.0), 3);
        assert!(StatValue::Int(0).is_zero());
        assert!(StatValue::Int(-2).is_negative());
        assert!(!StatValue::Float(0.5).is_zero());
    }
}
