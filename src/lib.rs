//! # StreamNet - Discrete-time signal-flow networks
//!
//! Named stateful elements wired through single-valued ports and evaluated
//! synchronously, one tick at a time. Every element sees the values its
//! sources produced on the previous tick, so feedback loops of any shape
//! are well defined.
//!
//! ## Core Components
//!
//! - **Engine** (`engine`): registry, freeze, tick scheduler and lifecycle
//!   broadcast over arbitrary `Element` collaborators
//! - **SNN** (`snn`): layers and synapses on top of the engine, with
//!   excitatory/inhibitory grouping and a per-tick learning broadcast
//! - **Loader** (`loader`): declarative JSON graph documents
//! - **Validation** (`validate`): batch checking of graph documents, used by
//!   the `streamnet-validate` binary
//!
//! ## Example
//!
//! ```
//! use streamnet::snn::{PassThrough, SpikingNet, StaticSynapse};
//! use streamnet::Value;
//!
//! let mut net = SpikingNet::new();
//! net.add_input("x")?;
//! net.add_layer("l1", PassThrough::new())?;
//! net.add_synapse("l1", StaticSynapse::scalar(0.5), &["x"])?;
//! net.add_output("l1")?;
//!
//! assert_eq!(net.tick(&[Value::scalar(2.0)])?, vec![Value::scalar(1.0)]);
//! # Ok::<(), streamnet::StreamNetError>(())
//! ```

// Error types
mod error;
pub use error::{Result, StreamNetError};

// Payload
mod value;
pub use value::Value;

// Dataflow engine
pub mod engine;
pub use engine::{Element, Emission, Lifecycle, StreamNet, StreamNetConfig};

// Spiking networks
pub mod snn;
pub use snn::{Neuron, SpikingNet, SpikingNetConfig, SynType, Synapse};

// Declarative graphs
pub mod loader;
pub use loader::{load_string, read_json, GraphDocument, StreamGraph};

// Batch validation
pub mod validate;
