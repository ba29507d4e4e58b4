//! Core Traits - Capability contract for engine elements
//!
//! ## Element Trait
//!
//! The only interface the engine uses to talk to a collaborator.
//! `call` is mandatory; `reset` and `update` default to no-ops so that
//! stateless or non-learning elements implement nothing but `call`.
//!
//! The engine never inspects what happens inside `call`.

use crate::error::Result;
use crate::Value;
use std::any::Any;

/// What a collaborator returns from one invocation
#[derive(Clone, Debug, PartialEq)]
pub enum Emission {
    /// Single output (the common case)
    One(Value),
    /// Ordered outputs, one per declared output port
    Many(Vec<Value>),
}

impl Emission {
    /// Number of output values carried
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    /// True for an empty `Many`
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Value> for Emission {
    fn from(value: Value) -> Self {
        Self::One(value)
    }
}

impl From<Vec<Value>> for Emission {
    fn from(values: Vec<Value>) -> Self {
        Self::Many(values)
    }
}

/// Lifecycle operation broadcast to every element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Zero all element-owned state and restore every output cache
    Reset,
    /// Post-tick learning update; `learn` gates weight changes
    Update { learn: bool },
}

/// Unified trait for everything wired into a network
pub trait Element: Send {
    /// Advance the element one tick with its positional inputs
    fn call(&mut self, inputs: &[Value]) -> Result<Emission>;

    /// Reset element-owned state
    fn reset(&mut self) {}

    /// Learning update with the output of the element's learning target
    fn update(&mut self, _post: &Value, _learn: bool) -> Result<()> {
        Ok(())
    }

    /// Cached value of output `port` before the first tick and after reset
    fn initial_output(&self, _port: usize) -> Value {
        Value::scalar(0.0)
    }

    /// Concrete-type access for builders that extend an element after
    /// registration (see `StreamNet::element_mut`)
    #[doc(hidden)]
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

impl<F> Element for F
where
    F: FnMut(&[Value]) -> Result<Emission> + Send,
{
    fn call(&mut self, inputs: &[Value]) -> Result<Emission> {
        self(inputs)
    }
}
