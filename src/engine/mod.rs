//! # Engine - Generic dataflow execution
//!
//! Named elements wired through single-valued ports, evaluated once per tick.
//!
//! ## Phases
//!
//! 1. **Construction**: inputs, elements, connections and outputs are
//!    registered and validated eagerly.
//! 2. **Simulation**: after `freeze()` (or the first `step`) the topology is
//!    fixed and indexed; ticks and lifecycle broadcasts only.
//!
//! ## Tick semantics
//!
//! Every element reads the outputs other elements produced on the previous
//! tick. Results are double-buffered and swapped in only after every element
//! has run, so feedback loops need no special handling and iteration order
//! never matters.
//!
//! ## Example
//!
//! ```
//! use streamnet::engine::{Element, Emission, StreamNet};
//! use streamnet::{Result, Value};
//!
//! struct Accumulate;
//!
//! impl Element for Accumulate {
//!     fn call(&mut self, inputs: &[Value]) -> Result<Emission> {
//!         Ok(inputs[0].try_add(&inputs[1])?.into())
//!     }
//! }
//!
//! let mut net = StreamNet::new();
//! net.add_input("x")?;
//! net.add_element("acc", Accumulate, 2, 1)?;
//! net.connect("acc", 0, "x")?;
//! net.connect("acc", 1, "acc")?;
//! net.add_output("acc")?;
//!
//! assert_eq!(net.step(&[Value::scalar(1.0)])?, vec![Value::scalar(1.0)]);
//! assert_eq!(net.step(&[Value::scalar(1.0)])?, vec![Value::scalar(2.0)]);
//! # Ok::<(), streamnet::StreamNetError>(())
//! ```

// Capability contract
mod traits;
pub use traits::{Element, Emission, Lifecycle};

// Element adapter (output normalization + cache)
mod element;

// Names, port references, freeze
mod registry;
pub use registry::{ElementId, InputId, PortRef, Source};
pub(crate) use registry::Stage;

// Scheduler and broadcast
mod network;
pub use network::{StreamNet, StreamNetConfig};
