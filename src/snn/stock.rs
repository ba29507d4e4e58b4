//! Stock collaborators
//!
//! Minimal neuron and synapse implementations with no dynamics and no
//! learning rule. Useful for wiring tests, loader factories, and as the
//! identity stages of larger networks.

use super::traits::{Neuron, Synapse, SynType, SynapticDrive};
use crate::error::{Result, StreamNetError};
use crate::Value;

/// Identity-like layer: outputs the sum of its synaptic input
#[derive(Clone, Debug, PartialEq)]
pub struct PassThrough {
    size: usize,
    grouped: bool,
    out: Value,
}

impl PassThrough {
    /// Scalar layer
    pub fn new() -> Self {
        Self::with_size(1)
    }

    /// Layer of `size` units; the initial output is a zero vector
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            grouped: false,
            out: Value::zeros(size),
        }
    }

    /// Receive excitatory and inhibitory sums instead of positional input
    pub fn grouped(mut self) -> Self {
        self.grouped = true;
        self
    }

    /// Output of the last tick
    pub fn out(&self) -> &Value {
        &self.out
    }
}

impl Default for PassThrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Neuron for PassThrough {
    fn call(&mut self, drive: SynapticDrive<'_>) -> Result<Value> {
        let total = match drive {
            SynapticDrive::Positional(inputs) => Value::sum(inputs)?,
            SynapticDrive::Grouped { excitatory, inhibitory } => {
                Value::sum(excitatory.iter().chain(inhibitory.iter()))?
            }
        };
        self.out = total.unwrap_or_else(|| Value::zeros(self.size));
        Ok(self.out.clone())
    }

    fn reset(&mut self) {
        self.out = Value::zeros(self.size);
    }

    fn group_synapses(&self) -> bool {
        self.grouped
    }

    fn initial_output(&self) -> Value {
        Value::zeros(self.size)
    }
}

/// Fixed-weight synapse: `out = sign * W @ x`
///
/// `W` has one row per postsynaptic unit and one column per presynaptic
/// unit. Inhibitory synapses negate their output.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticSynapse {
    weights: Vec<Vec<f64>>,
    syn_type: SynType,
}

impl StaticSynapse {
    /// Synapse with weight matrix `weights` (rows = postsynaptic units)
    pub fn new(weights: Vec<Vec<f64>>) -> Self {
        Self {
            weights,
            syn_type: SynType::Untyped,
        }
    }

    /// 1x1 synapse
    pub fn scalar(weight: f64) -> Self {
        Self::new(vec![vec![weight]])
    }

    /// Diagonal synapse connecting unit `i` to unit `i` with `weights[i]`
    pub fn one_to_one(weights: &[f64]) -> Self {
        let n = weights.len();
        let rows = (0..n)
            .map(|i| {
                let mut row = vec![0.0; n];
                row[i] = weights[i];
                row
            })
            .collect();
        Self::new(rows)
    }

    /// Set the synapse classification
    pub fn with_type(mut self, syn_type: SynType) -> Self {
        self.syn_type = syn_type;
        self
    }

    /// Weight matrix
    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Postsynaptic units
    pub fn n_post(&self) -> usize {
        self.weights.len()
    }

    /// Presynaptic units
    pub fn n_pre(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }
}

impl Synapse for StaticSynapse {
    fn call(&mut self, pre: &[Value]) -> Result<Value> {
        let [x] = pre else {
            return Err(StreamNetError::Element(format!(
                "static synapse takes one presynaptic input, got {}",
                pre.len()
            )));
        };
        if x.len() != self.n_pre() {
            return Err(StreamNetError::ShapeMismatch {
                expected: vec![self.n_pre()],
                actual: x.shape(),
            });
        }
        let sign = self.syn_type.sign();
        let out = self
            .weights
            .iter()
            .map(|row| sign * row.iter().zip(x.as_slice()).map(|(w, x)| w * x).sum::<f64>())
            .collect::<Vec<_>>();
        Ok(Value::from(out))
    }

    fn syn_type(&self) -> SynType {
        self.syn_type
    }

    fn initial_output(&self) -> Value {
        Value::zeros(self.n_post())
    }
}
