//! Core Traits - Capability contract for neurons and synapses
//!
//! ## Neuron Trait
//!
//! A layer of neurons. Receives the outputs of every synapse that feeds it,
//! either positionally or grouped by synapse type.
//!
//! ## Synapse Trait
//!
//! Connects one or more presynaptic sources to one postsynaptic layer.
//! Learning happens in `update`, after the layer has produced its output.

use crate::error::Result;
use crate::Value;
use serde::{Deserialize, Serialize};

/// Synapse classification used by grouped aggregation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynType {
    /// Contributes to the excitatory aggregate
    Excitatory,
    /// Contributes to the inhibitory aggregate
    Inhibitory,
    /// No classification (cannot feed a grouping neuron)
    #[default]
    Untyped,
}

impl SynType {
    /// Sign applied to a synapse's weighted input
    pub fn sign(self) -> f64 {
        match self {
            Self::Inhibitory => -1.0,
            Self::Excitatory | Self::Untyped => 1.0,
        }
    }
}

/// What a layer receives from its synapses on one tick
#[derive(Clone, Debug, PartialEq)]
pub enum SynapticDrive<'a> {
    /// One value per synapse, in `add_synapse` order
    Positional(&'a [Value]),
    /// Sums per synapse type; `None` means no synapse of that type exists
    Grouped {
        excitatory: Option<Value>,
        inhibitory: Option<Value>,
    },
}

/// Unified trait for neuron layers
pub trait Neuron: Send {
    /// Advance the layer one tick
    fn call(&mut self, drive: SynapticDrive<'_>) -> Result<Value>;

    /// Reset membrane state
    fn reset(&mut self) {}

    /// Receive synaptic input as excitatory/inhibitory sums
    fn group_synapses(&self) -> bool {
        false
    }

    /// Output before the first tick and after reset
    fn initial_output(&self) -> Value {
        Value::scalar(0.0)
    }
}

/// Unified trait for synapses
pub trait Synapse: Send {
    /// Weighted input from the presynaptic sources, in declaration order
    fn call(&mut self, pre: &[Value]) -> Result<Value>;

    /// Reset traces and transforms
    fn reset(&mut self) {}

    /// Learning update with the postsynaptic layer's output of this tick
    fn update(&mut self, _post: &Value, _learn: bool) -> Result<()> {
        Ok(())
    }

    /// Classification for grouped aggregation
    fn syn_type(&self) -> SynType {
        SynType::Untyped
    }

    /// Output before the first tick and after reset
    fn initial_output(&self) -> Value {
        Value::scalar(0.0)
    }
}
