//! Element adapter - wraps one collaborator for engine wiring
//!
//! Normalizes whatever the collaborator emits into exactly `n_out` values and
//! owns the output cache the scheduler reads from.

use super::traits::{Element, Emission};
use crate::error::{Result, StreamNetError};
use crate::Value;

/// One registered element: collaborator plus its output cache
pub(crate) struct ElementSlot {
    /// Unique name (diagnostics only, never used on the tick path)
    pub(crate) name: String,
    /// Owned collaborator
    pub(crate) object: Box<dyn Element>,
    /// Declared output arity (>= 1)
    pub(crate) n_out: usize,
    /// Last tick's outputs, one per declared output
    pub(crate) out: Vec<Value>,
}

impl ElementSlot {
    pub(crate) fn new(name: String, object: Box<dyn Element>, n_out: usize) -> Self {
        let out = (0..n_out).map(|port| object.initial_output(port)).collect();
        Self {
            name,
            object,
            n_out,
            out,
        }
    }

    /// Invoke the collaborator and normalize the result to `n_out` values.
    ///
    /// Does not touch the cache; the scheduler decides when the result
    /// becomes visible.
    pub(crate) fn invoke(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        let emission = self.object.call(inputs)?;
        match (self.n_out, emission) {
            (1, Emission::One(value)) => Ok(vec![value]),
            (n, Emission::Many(values)) if values.len() == n => Ok(values),
            (n, emission) => Err(StreamNetError::OutputArity {
                element: self.name.clone(),
                expected: n,
                actual: emission.len(),
            }),
        }
    }

    /// Restore the cache to the collaborator's initial outputs
    pub(crate) fn restore_initial(&mut self) {
        for (port, out) in self.out.iter_mut().enumerate() {
            *out = self.object.initial_output(port);
        }
    }
}

impl std::fmt::Debug for ElementSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementSlot")
            .field("name", &self.name)
            .field("n_out", &self.n_out)
            .field("out", &self.out)
            .finish()
    }
}
