//! Topology Registry - Names, port references, and wiring validation
//!
//! The registry owns every element and every name during the construction
//! phase. Each structural call is validated eagerly so a bad reference fails
//! at the line that created it rather than on the first tick.
//!
//! `freeze()` turns the growable per-element slot lists into a fixed
//! `Topology` addressed by index only; after that the registry rejects any
//! further structural change.

use super::element::ElementSlot;
use super::traits::Element;
use crate::error::{Result, StreamNetError};
use std::collections::HashMap;

/// Arena index of an element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    /// Position in registration order
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena index of an external input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId(usize);

impl InputId {
    /// Position in declaration order (the position in `step` inputs)
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Resolved reference to a value produced during a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortRef {
    /// External input supplied to `step`
    Input(InputId),
    /// Output `port` of an element
    Output { element: ElementId, port: usize },
}

/// Name-keyed reference used while wiring
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// An external input, or output 0 of an element
    Name(String),
    /// Output `port` of an element
    Port(String, usize),
}

impl Source {
    /// Name of the referenced input or element
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Port(name, _) => name,
        }
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Source {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<(&str, usize)> for Source {
    fn from((name, port): (&str, usize)) -> Self {
        Self::Port(name.to_string(), port)
    }
}

/// When an element source is read relative to the current tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Read {
    /// Cache as it stood before this tick began
    Delayed,
    /// This tick's value; the source must sit in a strictly earlier stage
    Fresh,
}

/// One bound input slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Binding {
    pub(crate) source: PortRef,
    pub(crate) read: Read,
}

/// Evaluation group; fresh reads only flow from lower to higher stages
pub(crate) type Stage = u32;

#[derive(Clone, Copy, Debug)]
enum Entry {
    Input(InputId),
    Element(ElementId),
}

/// Frozen, index-addressed topology used on the tick path
#[derive(Debug)]
pub(crate) struct Topology {
    /// Input bindings per element, indexed by `ElementId`
    pub(crate) wiring: Box<[Box<[Binding]>]>,
    /// Element ids grouped by ascending stage
    pub(crate) schedule: Box<[Box<[ElementId]>]>,
    /// Declared outputs in declaration order
    pub(crate) outputs: Box<[PortRef]>,
    /// (element, learning target) pairs in registration order
    pub(crate) learning: Box<[(ElementId, ElementId)]>,
}

/// The construction-phase registry
#[derive(Debug, Default)]
pub(crate) struct Registry {
    names: HashMap<String, Entry>,
    inputs: Vec<String>,
    pub(crate) elements: Vec<ElementSlot>,
    slots: Vec<Vec<Option<Binding>>>,
    stages: Vec<Stage>,
    targets: Vec<Option<ElementId>>,
    outputs: Vec<PortRef>,
    frozen: bool,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_open(&self) -> Result<()> {
        if self.frozen {
            return Err(StreamNetError::Frozen);
        }
        Ok(())
    }

    fn ensure_unused(&self, name: &str) -> Result<()> {
        if self.names.contains_key(name) {
            return Err(StreamNetError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn declare_input(&mut self, name: &str) -> Result<InputId> {
        self.ensure_open()?;
        self.ensure_unused(name)?;
        let id = InputId(self.inputs.len());
        self.inputs.push(name.to_string());
        self.names.insert(name.to_string(), Entry::Input(id));
        log::debug!("Declared input {} at position {}", name, id.0);
        Ok(id)
    }

    pub(crate) fn add_element(
        &mut self,
        name: &str,
        object: Box<dyn Element>,
        n_in: usize,
        n_out: usize,
        stage: Stage,
    ) -> Result<ElementId> {
        self.ensure_open()?;
        self.ensure_unused(name)?;
        if n_out == 0 {
            return Err(StreamNetError::InvalidArity(format!(
                "element {} must declare at least one output",
                name
            )));
        }
        let id = ElementId(self.elements.len());
        self.elements.push(ElementSlot::new(name.to_string(), object, n_out));
        self.slots.push(vec![None; n_in]);
        self.stages.push(stage);
        self.targets.push(None);
        self.names.insert(name.to_string(), Entry::Element(id));
        log::debug!(
            "Added element {} ({} in, {} out, stage {})",
            name,
            n_in,
            n_out,
            stage
        );
        Ok(id)
    }

    pub(crate) fn element_id(&self, name: &str) -> Result<ElementId> {
        match self.names.get(name) {
            Some(Entry::Element(id)) => Ok(*id),
            _ => Err(StreamNetError::UnknownName(name.to_string())),
        }
    }

    pub(crate) fn input_id(&self, name: &str) -> Result<InputId> {
        match self.names.get(name) {
            Some(Entry::Input(id)) => Ok(*id),
            _ => Err(StreamNetError::UnknownName(name.to_string())),
        }
    }

    pub(crate) fn is_input(&self, name: &str) -> bool {
        matches!(self.names.get(name), Some(Entry::Input(_)))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub(crate) fn input_names(&self) -> &[String] {
        &self.inputs
    }

    pub(crate) fn element_name(&self, id: ElementId) -> &str {
        &self.elements[id.0].name
    }

    pub(crate) fn input_arity(&self, id: ElementId) -> usize {
        self.slots[id.0].len()
    }

    pub(crate) fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Resolve a name-keyed source, checking the output index
    pub(crate) fn resolve(&self, source: &Source) -> Result<PortRef> {
        let entry = self
            .names
            .get(source.name())
            .ok_or_else(|| StreamNetError::UnknownName(source.name().to_string()))?;
        match (entry, source) {
            (Entry::Input(id), Source::Name(_)) => Ok(PortRef::Input(*id)),
            (Entry::Input(_), Source::Port(name, _)) => {
                Err(StreamNetError::UnknownName(format!("{} (input has no output ports)", name)))
            }
            (Entry::Element(id), Source::Name(_)) => self.element_port(*id, 0),
            (Entry::Element(id), Source::Port(_, port)) => self.element_port(*id, *port),
        }
    }

    fn element_port(&self, element: ElementId, port: usize) -> Result<PortRef> {
        let slot = &self.elements[element.0];
        if port >= slot.n_out {
            return Err(StreamNetError::OutputIndexOutOfRange {
                element: slot.name.clone(),
                index: port,
                arity: slot.n_out,
            });
        }
        Ok(PortRef::Output { element, port })
    }

    fn binding(&self, consumer: ElementId, source: &Source, read: Read) -> Result<Binding> {
        let port = self.resolve(source)?;
        if read == Read::Fresh {
            match port {
                PortRef::Output { element, .. }
                    if self.stages[element.0] < self.stages[consumer.0] => {}
                _ => {
                    return Err(StreamNetError::SameTickRead(format!(
                        "{} read by {} must come from an earlier stage",
                        source.name(),
                        self.element_name(consumer)
                    )))
                }
            }
        }
        Ok(Binding { source: port, read })
    }

    /// Bind an existing input slot (fan-in of one per slot)
    pub(crate) fn connect(&mut self, element: &str, slot: usize, source: &Source) -> Result<()> {
        self.ensure_open()?;
        let id = self.element_id(element)?;
        let arity = self.slots[id.0].len();
        if slot >= arity {
            return Err(StreamNetError::InputSlotOutOfRange {
                element: element.to_string(),
                slot,
                arity,
            });
        }
        if self.slots[id.0][slot].is_some() {
            return Err(StreamNetError::SlotAlreadyBound {
                element: element.to_string(),
                slot,
            });
        }
        let binding = self.binding(id, source, Read::Delayed)?;
        self.slots[id.0][slot] = Some(binding);
        Ok(())
    }

    /// Grow the element by one input slot bound to `source`; returns the slot
    pub(crate) fn append_input(&mut self, element: &str, source: &Source, read: Read) -> Result<usize> {
        self.ensure_open()?;
        let id = self.element_id(element)?;
        let binding = self.binding(id, source, read)?;
        let slots = &mut self.slots[id.0];
        slots.push(Some(binding));
        Ok(slots.len() - 1)
    }

    pub(crate) fn declare_output(&mut self, source: &Source) -> Result<usize> {
        self.ensure_open()?;
        let port = self.resolve(source)?;
        self.outputs.push(port);
        Ok(self.outputs.len() - 1)
    }

    pub(crate) fn set_learning_target(&mut self, element: &str, target: &str) -> Result<()> {
        self.ensure_open()?;
        let id = self.element_id(element)?;
        let target = self.element_id(target)?;
        self.targets[id.0] = Some(target);
        Ok(())
    }

    /// Validate that every slot is bound and build the frozen topology
    pub(crate) fn freeze(&mut self) -> Result<Topology> {
        self.ensure_open()?;

        let mut wiring = Vec::with_capacity(self.slots.len());
        for (i, slots) in self.slots.iter().enumerate() {
            let bound = slots
                .iter()
                .enumerate()
                .map(|(slot, binding)| {
                    binding.ok_or_else(|| StreamNetError::UnboundSlot {
                        element: self.elements[i].name.clone(),
                        slot,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            wiring.push(bound.into_boxed_slice());
        }

        let mut stages: Vec<Stage> = self.stages.clone();
        stages.sort_unstable();
        stages.dedup();
        let schedule = stages
            .iter()
            .map(|stage| {
                (0..self.elements.len())
                    .filter(|&i| self.stages[i] == *stage)
                    .map(ElementId)
                    .collect::<Vec<_>>()
                    .into_boxed_slice()
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let learning = self
            .targets
            .iter()
            .enumerate()
            .filter_map(|(i, target)| target.map(|t| (ElementId(i), t)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        self.frozen = true;
        log::debug!(
            "Froze topology: {} inputs, {} elements, {} outputs, {} stages",
            self.inputs.len(),
            self.elements.len(),
            self.outputs.len(),
            schedule.len()
        );

        Ok(Topology {
            wiring: wiring.into_boxed_slice(),
            schedule,
            outputs: self.outputs.clone().into_boxed_slice(),
            learning,
        })
    }
}
