//! Engine adapters for layers and synapses

use super::traits::{Neuron, Synapse, SynType, SynapticDrive};
use crate::engine::{Element, Emission};
use crate::error::Result;
use crate::Value;
use std::any::Any;

/// Aggregate a grouped synapse slot contributes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Group {
    Excitatory,
    Inhibitory,
}

impl Group {
    /// `None` for untyped synapses
    pub(crate) fn of(syn_type: SynType) -> Option<Self> {
        match syn_type {
            SynType::Excitatory => Some(Self::Excitatory),
            SynType::Inhibitory => Some(Self::Inhibitory),
            SynType::Untyped => None,
        }
    }
}

/// Layer element: one input slot per feeding synapse
pub(crate) struct LayerNode {
    neuron: Box<dyn Neuron>,
    /// Group of each input slot; `None` when the neuron takes positional input
    groups: Option<Vec<Group>>,
}

impl LayerNode {
    pub(crate) fn new(neuron: Box<dyn Neuron>) -> Self {
        let groups = neuron.group_synapses().then(Vec::new);
        Self { neuron, groups }
    }

    pub(crate) fn groups_synapses(&self) -> bool {
        self.groups.is_some()
    }

    /// Record the group of the next input slot
    pub(crate) fn push_group(&mut self, group: Group) {
        if let Some(groups) = &mut self.groups {
            groups.push(group);
        }
    }
}

impl Element for LayerNode {
    fn call(&mut self, inputs: &[Value]) -> Result<Emission> {
        let drive = match &self.groups {
            None => SynapticDrive::Positional(inputs),
            Some(groups) => {
                let mut excitatory = Vec::new();
                let mut inhibitory = Vec::new();
                for (value, group) in inputs.iter().zip(groups) {
                    match group {
                        Group::Excitatory => excitatory.push(value),
                        Group::Inhibitory => inhibitory.push(value),
                    }
                }
                SynapticDrive::Grouped {
                    excitatory: Value::sum(excitatory)?,
                    inhibitory: Value::sum(inhibitory)?,
                }
            }
        };
        Ok(self.neuron.call(drive)?.into())
    }

    fn reset(&mut self) {
        self.neuron.reset();
    }

    fn initial_output(&self, _port: usize) -> Value {
        self.neuron.initial_output()
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

/// Synapse element: presynaptic sources in, weighted input out
pub(crate) struct SynapseNode {
    synapse: Box<dyn Synapse>,
}

impl SynapseNode {
    pub(crate) fn new(synapse: Box<dyn Synapse>) -> Self {
        Self { synapse }
    }
}

impl Element for SynapseNode {
    fn call(&mut self, inputs: &[Value]) -> Result<Emission> {
        Ok(self.synapse.call(inputs)?.into())
    }

    fn reset(&mut self) {
        self.synapse.reset();
    }

    fn update(&mut self, post: &Value, learn: bool) -> Result<()> {
        self.synapse.update(post, learn)
    }

    fn initial_output(&self, _port: usize) -> Value {
        self.synapse.initial_output()
    }
}
