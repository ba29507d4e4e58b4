//! Error types for streamnet

use thiserror::Error;

/// Streamnet error type
#[derive(Debug, Error)]
pub enum StreamNetError {
    /// Name already taken by an input or an element
    #[error("Name {0} already defined")]
    DuplicateName(String),

    /// Reference to an element or input that does not exist
    #[error("Element or input {0} not found")]
    UnknownName(String),

    /// Output index past the declared output arity of an element
    #[error("Element {element} has {arity} outputs, index {index} is out of range")]
    OutputIndexOutOfRange {
        element: String,
        index: usize,
        arity: usize,
    },

    /// Input slot past the declared input arity of an element
    #[error("Element {element} has {arity} input slots, slot {slot} is out of range")]
    InputSlotOutOfRange {
        element: String,
        slot: usize,
        arity: usize,
    },

    /// Input slot already bound to a source (fan-in is one per slot)
    #[error("Input slot {slot} of element {element} is already bound")]
    SlotAlreadyBound { element: String, slot: usize },

    /// Input slot still unbound when the network is frozen
    #[error("Input slot {slot} of element {element} has no source")]
    UnboundSlot { element: String, slot: usize },

    /// Declared arity is not usable (zero outputs, synapse without sources)
    #[error("Invalid arity: {0}")]
    InvalidArity(String),

    /// Same-tick read that does not cross from an earlier stage
    #[error("Same-tick read not allowed: {0}")]
    SameTickRead(String),

    /// Synapse target is not a layer
    #[error("{0} is not a layer")]
    NotALayer(String),

    /// Untyped synapse feeding a neuron that groups its synapses
    #[error("Synapse {synapse} feeding layer {layer} must be excitatory or inhibitory")]
    UntypedSynapse { synapse: String, layer: String },

    /// Structural mutation after the network started receiving ticks
    #[error("Network frozen: topology can no longer change")]
    Frozen,

    /// Tick requested before the topology was frozen
    #[error("Network not frozen: call freeze() before stepping")]
    NotFrozen,

    /// Reset requested while a tick has not finished its learning broadcast
    #[error("Tick in progress: learning broadcast did not complete")]
    TickInProgress,

    /// Wrong number of external input values
    #[error("Wrong number of inputs: expected {expected}, got {actual}")]
    InputCount { expected: usize, actual: usize },

    /// Collaborator returned a different number of outputs than declared
    #[error("Element {element} declared {expected} outputs, returned {actual}")]
    OutputArity {
        element: String,
        expected: usize,
        actual: usize,
    },

    /// Shape mismatch
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Error raised by a collaborator
    #[error("Element error: {0}")]
    Element(String),

    /// Declarative graph document rejected
    #[error("Load error: {0}")]
    Load(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StreamNetError>;
