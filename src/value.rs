//! Value - The payload carried by every port
//!
//! Everything that flows between elements is a `Value`: an ordered vector of
//! `f64`. A scalar is a vector of length one.
//!
//! Addition broadcasts a length-one operand over the other operand, which is
//! what grouped synaptic aggregation relies on when scalar and vector
//! contributions meet.
//!
//! # Example
//! ```
//! use streamnet::Value;
//!
//! let a = Value::from(vec![1.0, 2.0]);
//! let b = Value::scalar(0.5);
//! let sum = a.try_add(&b).unwrap();
//! assert_eq!(sum.as_slice(), &[1.5, 2.5]);
//!
//! let bad = a.try_add(&Value::zeros(3));
//! assert!(bad.is_err());
//! ```

use crate::error::{Result, StreamNetError};
use serde::{Deserialize, Serialize};
use std::ops::Neg;

/// Ordered vector of activities flowing through a port
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(Vec<f64>);

impl Value {
    /// Wrap a vector of activities
    pub fn new(data: Vec<f64>) -> Self {
        Self(data)
    }

    /// Single-entry value
    pub fn scalar(x: f64) -> Self {
        Self(vec![x])
    }

    /// All-zero value of length `n`
    pub fn zeros(n: usize) -> Self {
        Self(vec![0.0; n])
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the value holds no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shape as reported in `ShapeMismatch` errors
    pub fn shape(&self) -> Vec<usize> {
        vec![self.0.len()]
    }

    /// Borrow the entries
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The single entry of a scalar value, `None` for any other length
    pub fn as_scalar(&self) -> Option<f64> {
        match self.0.as_slice() {
            [x] => Some(*x),
            _ => None,
        }
    }

    /// Element-wise sum, broadcasting a length-one operand
    ///
    /// # Errors
    /// `ShapeMismatch` when both operands have different lengths and neither
    /// is a scalar.
    pub fn try_add(&self, other: &Value) -> Result<Value> {
        let data = match (self.len(), other.len()) {
            (a, b) if a == b => self.0.iter().zip(&other.0).map(|(x, y)| x + y).collect(),
            (1, _) => other.0.iter().map(|y| self.0[0] + y).collect(),
            (_, 1) => self.0.iter().map(|x| x + other.0[0]).collect(),
            _ => {
                return Err(StreamNetError::ShapeMismatch {
                    expected: self.shape(),
                    actual: other.shape(),
                })
            }
        };
        Ok(Value(data))
    }

    /// Sum a sequence of values; `None` when the sequence is empty
    pub fn sum<'a, I>(values: I) -> Result<Option<Value>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut acc: Option<Value> = None;
        for v in values {
            acc = Some(match acc {
                None => v.clone(),
                Some(a) => a.try_add(v)?,
            });
        }
        Ok(acc)
    }

    /// Multiply every entry by `k`
    pub fn scale(&self, k: f64) -> Value {
        Value(self.0.iter().map(|x| x * k).collect())
    }
}

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        Value(self.0.into_iter().map(|x| -x).collect())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::scalar(x)
    }
}

impl From<Vec<f64>> for Value {
    fn from(data: Vec<f64>) -> Self {
        Self(data)
    }
}

impl From<&[f64]> for Value {
    fn from(data: &[f64]) -> Self {
        Self(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_add_same_length() {
        let a = Value::from(vec![1.0, 2.0, 3.0]);
        let b = Value::from(vec![0.5, 0.5, 0.5]);
        assert_eq!(a.try_add(&b).unwrap().as_slice(), &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_try_add_broadcasts_scalar() {
        let a = Value::scalar(1.0);
        let b = Value::from(vec![1.0, 2.0]);
        assert_eq!(a.try_add(&b).unwrap().as_slice(), &[2.0, 3.0]);
        assert_eq!(b.try_add(&a).unwrap().as_slice(), &[2.0, 3.0]);
    }

    #[test]
    fn test_try_add_shape_mismatch() {
        let a = Value::zeros(2);
        let b = Value::zeros(3);
        match a.try_add(&b) {
            Err(StreamNetError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![2]);
                assert_eq!(actual, vec![3]);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_sum_empty_is_none() {
        let empty: Vec<Value> = Vec::new();
        assert!(Value::sum(&empty).unwrap().is_none());
    }

    #[test]
    fn test_sum_cancelling_is_zero_not_none() {
        let values = vec![Value::scalar(1.0), Value::scalar(-1.0)];
        let total = Value::sum(&values).unwrap();
        assert_eq!(total, Some(Value::scalar(0.0)));
    }

    #[test]
    fn test_as_scalar() {
        assert_eq!(Value::scalar(0.6).as_scalar(), Some(0.6));
        assert_eq!(Value::zeros(2).as_scalar(), None);
    }

    #[test]
    fn test_neg_and_scale() {
        let v = Value::from(vec![1.0, -2.0]);
        assert_eq!((-v.clone()).as_slice(), &[-1.0, 2.0]);
        assert_eq!(v.scale(2.0).as_slice(), &[2.0, -4.0]);
    }

    #[test]
    fn test_serde_transparent() {
        let v = Value::from(vec![0.25, 0.5]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[0.25,0.5]");
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
