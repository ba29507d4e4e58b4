//! # SNN - Layered spiking networks on the dataflow engine
//!
//! Layers of neurons connected by synapses, built on top of `StreamNet`.
//!
//! ## Tick order
//!
//! 1. **Synapses** read their presynaptic inputs and layers as of the
//!    previous tick (inputs are always current).
//! 2. **Layers** read the synapse outputs of this tick, either positionally
//!    or summed into excitatory and inhibitory groups.
//! 3. **Learning**: every synapse receives the new output of the layer it
//!    feeds, together with the learning flag.
//!
//! ## Design Principles
//!
//! 1. **Construction is validated eagerly**: unknown names, synapses into
//!    non-layers and untyped synapses into grouping layers fail at
//!    `add_synapse` and register nothing.
//! 2. **Collaborators are traits**: `Neuron` and `Synapse` carry the
//!    dynamics; the network only routes values.
//! 3. **Reset replays**: after `reset` the same input sequence produces the
//!    same outputs, unless learning changed the weights.
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
//! net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"])?;
//! net.add_output("l1")?;
//!
//! let out = net.step(&[Value::scalar(0.6)], true)?;
//! assert_eq!(out, vec![Value::scalar(0.6)]);
//! # Ok::<(), streamnet::StreamNetError>(())
//! ```

// Neuron / synapse capability contract
mod traits;
pub use traits::{Neuron, SynType, Synapse, SynapticDrive};

// Engine adapters
mod node;

// Stock collaborators
mod stock;
pub use stock::{PassThrough, StaticSynapse};

// Network builder
mod network;
pub use network::{SpikingNet, SpikingNetConfig, SynapseInfo, TickPhase};
