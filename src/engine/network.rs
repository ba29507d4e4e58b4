//! StreamNet - The generic dataflow engine
//!
//! A network wraps a registry of named elements. Construction calls are
//! validated eagerly; the first `step` freezes the topology and from then on
//! every tick reads element outputs from the previous tick's cache, so the
//! evaluation order inside a tick never changes the result.

use super::registry::{
    Binding, ElementId, InputId, PortRef, Read, Registry, Source, Stage, Topology,
};
use super::element::ElementSlot;
use super::traits::{Element, Lifecycle};
use crate::error::{Result, StreamNetError};
use crate::Value;
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamNetConfig {
    /// Freeze the topology on the first `step` instead of requiring an
    /// explicit `freeze()`
    pub auto_freeze: bool,
}

impl Default for StreamNetConfig {
    fn default() -> Self {
        Self { auto_freeze: true }
    }
}

impl StreamNetConfig {
    /// Config that requires an explicit `freeze()` before the first tick
    pub fn manual_freeze() -> Self {
        Self { auto_freeze: false }
    }
}

/// Discrete-time signal-flow network
#[derive(Debug)]
pub struct StreamNet {
    registry: Registry,
    /// Frozen topology (None while constructing)
    topology: Option<Topology>,
    config: StreamNetConfig,
    /// Outputs assembled by the last completed tick
    out: Vec<Value>,
    /// Completed ticks since construction or the last reset
    tick: u64,
}

impl Default for StreamNet {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamNet {
    /// Create an empty network
    pub fn new() -> Self {
        Self::with_config(StreamNetConfig::default())
    }

    /// Create an empty network with explicit configuration
    pub fn with_config(config: StreamNetConfig) -> Self {
        Self {
            registry: Registry::new(),
            topology: None,
            config,
            out: Vec::new(),
            tick: 0,
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Declare an external input; its position is the declaration order
    pub fn add_input(&mut self, name: &str) -> Result<InputId> {
        self.registry.declare_input(name)
    }

    /// Add an element with `n_in` unbound input slots and `n_out` outputs
    pub fn add_element<E>(&mut self, name: &str, element: E, n_in: usize, n_out: usize) -> Result<ElementId>
    where
        E: Element + 'static,
    {
        self.add_boxed_element(name, Box::new(element), n_in, n_out)
    }

    /// Add an already boxed element
    pub fn add_boxed_element(
        &mut self,
        name: &str,
        element: Box<dyn Element>,
        n_in: usize,
        n_out: usize,
    ) -> Result<ElementId> {
        self.registry.add_element(name, element, n_in, n_out, 0)
    }

    pub(crate) fn add_staged_element(
        &mut self,
        name: &str,
        element: Box<dyn Element>,
        n_out: usize,
        stage: Stage,
    ) -> Result<ElementId> {
        self.registry.add_element(name, element, 0, n_out, stage)
    }

    /// Bind input `slot` of `element` to `source`
    pub fn connect(&mut self, element: &str, slot: usize, source: impl Into<Source>) -> Result<()> {
        self.registry.connect(element, slot, &source.into())
    }

    /// Append one input slot to `element`, bound to `source`; returns the slot
    pub fn add_el_input(&mut self, element: &str, source: impl Into<Source>) -> Result<usize> {
        self.registry.append_input(element, &source.into(), Read::Delayed)
    }

    /// Append a slot that reads this tick's value of an earlier-stage element
    pub(crate) fn add_fresh_input(&mut self, element: &str, source: impl Into<Source>) -> Result<usize> {
        self.registry.append_input(element, &source.into(), Read::Fresh)
    }

    /// Declare a network output; call order defines the output order
    pub fn add_output(&mut self, source: impl Into<Source>) -> Result<usize> {
        self.registry.declare_output(&source.into())
    }

    /// Route the output of `target` to `element` on every learning update
    pub fn set_learning_target(&mut self, element: &str, target: &str) -> Result<()> {
        self.registry.set_learning_target(element, target)
    }

    /// Downcast a registered element to its concrete type.
    ///
    /// Only available while constructing; only elements that expose
    /// `as_any_mut` can be reached.
    pub(crate) fn element_mut<T: 'static>(&mut self, name: &str) -> Result<&mut T> {
        if self.is_frozen() {
            return Err(StreamNetError::Frozen);
        }
        let id = self.registry.element_id(name)?;
        self.registry.elements[id.index()]
            .object
            .as_any_mut()
            .and_then(|any| any.downcast_mut::<T>())
            .ok_or_else(|| StreamNetError::UnknownName(name.to_string()))
    }

    /// Freeze the topology. Freezing a frozen network is a no-op.
    pub fn freeze(&mut self) -> Result<()> {
        if self.topology.is_none() {
            self.topology = Some(self.registry.freeze()?);
        }
        Ok(())
    }

    /// True once the network has left the construction phase
    pub fn is_frozen(&self) -> bool {
        self.topology.is_some()
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advance the network one tick.
    ///
    /// `inputs` holds one value per declared input, in declaration order.
    /// Returns the declared outputs in declaration order.
    pub fn step(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let expected = self.registry.input_names().len();
        if inputs.len() != expected {
            return Err(StreamNetError::InputCount {
                expected,
                actual: inputs.len(),
            });
        }
        if self.topology.is_none() {
            if !self.config.auto_freeze {
                return Err(StreamNetError::NotFrozen);
            }
            self.freeze()?;
        }
        let topology = self.topology.as_ref().ok_or(StreamNetError::NotFrozen)?;
        let elements = &mut self.registry.elements;

        // New generation; stays invisible to delayed reads until the swap
        let mut fresh: Vec<Option<Vec<Value>>> = vec![None; elements.len()];

        for stage in topology.schedule.iter() {
            // All reads of a stage happen before any of its writes
            let gathered = {
                let snapshot: &[ElementSlot] = elements;
                stage
                    .iter()
                    .map(|id| gather(&topology.wiring[id.index()], inputs, snapshot, &fresh))
                    .collect::<Result<Vec<_>>>()?
            };
            for (id, args) in stage.iter().zip(gathered) {
                fresh[id.index()] = Some(elements[id.index()].invoke(&args)?);
            }
        }

        for (slot, out) in elements.iter_mut().zip(fresh) {
            if let Some(out) = out {
                slot.out = out;
            }
        }

        let elements: &[ElementSlot] = elements;
        self.out = topology
            .outputs
            .iter()
            .map(|port| read_port(port, inputs, elements))
            .collect();
        self.tick += 1;
        log::trace!("Tick {} complete", self.tick);
        Ok(self.out.clone())
    }

    /// Invoke a lifecycle operation on every element in registration order
    pub fn broadcast(&mut self, op: Lifecycle) -> Result<()> {
        match op {
            Lifecycle::Reset => {
                self.reset();
                Ok(())
            }
            Lifecycle::Update { learn } => {
                let Some(topology) = &self.topology else {
                    return Ok(());
                };
                let elements = &mut self.registry.elements;
                for &(element, target) in topology.learning.iter() {
                    let post = elements[target.index()].out[0].clone();
                    elements[element.index()].object.update(&post, learn)?;
                }
                Ok(())
            }
        }
    }

    /// Reset every element and restore every output cache
    pub fn reset(&mut self) {
        for slot in &mut self.registry.elements {
            slot.object.reset();
            slot.restore_initial();
        }
        self.out.clear();
        self.tick = 0;
        log::debug!("Reset {} elements", self.registry.elements.len());
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Outputs of the last completed tick (empty before the first tick)
    pub fn outputs(&self) -> &[Value] {
        &self.out
    }

    /// Cached outputs of an element
    pub fn element_output(&self, name: &str) -> Result<&[Value]> {
        let id = self.registry.element_id(name)?;
        Ok(&self.registry.elements[id.index()].out)
    }

    /// Look up an element by name
    pub fn element_id(&self, name: &str) -> Result<ElementId> {
        self.registry.element_id(name)
    }

    /// Look up an input by name
    pub fn input_id(&self, name: &str) -> Result<InputId> {
        self.registry.input_id(name)
    }

    /// True if `name` is a declared input
    pub fn is_input(&self, name: &str) -> bool {
        self.registry.is_input(name)
    }

    /// True if `name` is used by an input or an element
    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Input names in declaration order
    pub fn input_names(&self) -> &[String] {
        self.registry.input_names()
    }

    /// Element names in registration order
    pub fn element_names(&self) -> Vec<&str> {
        self.registry.elements.iter().map(|e| e.name.as_str()).collect()
    }

    /// Name of an element
    pub fn element_name(&self, id: ElementId) -> &str {
        self.registry.element_name(id)
    }

    /// Current number of input slots of an element
    pub fn input_arity(&self, name: &str) -> Result<usize> {
        Ok(self.registry.input_arity(self.registry.element_id(name)?))
    }

    /// Number of declared inputs
    pub fn input_count(&self) -> usize {
        self.registry.input_names().len()
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        self.registry.elements.len()
    }

    /// Number of declared outputs
    pub fn output_count(&self) -> usize {
        self.registry.output_count()
    }

    /// Completed ticks since construction or the last reset
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Engine configuration
    pub fn config(&self) -> &StreamNetConfig {
        &self.config
    }
}

fn read_port(port: &PortRef, inputs: &[Value], elements: &[ElementSlot]) -> Value {
    match *port {
        PortRef::Input(id) => inputs[id.index()].clone(),
        PortRef::Output { element, port } => elements[element.index()].out[port].clone(),
    }
}

fn gather(
    bindings: &[Binding],
    inputs: &[Value],
    elements: &[ElementSlot],
    fresh: &[Option<Vec<Value>>],
) -> Result<Vec<Value>> {
    bindings
        .iter()
        .map(|binding| match (binding.read, binding.source) {
            (Read::Fresh, PortRef::Output { element, port }) => fresh[element.index()]
                .as_ref()
                .map(|out| out[port].clone())
                .ok_or_else(|| {
                    StreamNetError::SameTickRead(elements[element.index()].name.clone())
                }),
            (_, source) => Ok(read_port(&source, inputs, elements)),
        })
        .collect()
}
