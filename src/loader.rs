//! Graph Loader - Declarative JSON network descriptions
//!
//! A graph document lists the element table, the number of external input and
//! output pins, and the connections between them:
//!
//! ```json
//! {
//!   "ports": [1, 1],
//!   "elements": [ {"name": "acc", "ports": [2, 1]} ],
//!   "connections": [
//!     ["inp1", 1, "acc", 1],
//!     ["acc", 1, "acc", 2],
//!     ["acc", 1, "outp1", 1]
//!   ]
//! }
//! ```
//!
//! External pins use the reserved names `inp1..inpN` and `outp1..outpM`.
//! Pin numbers in documents are 1-based. Out-of-range pins and pin counts
//! above [`MAX_PINS`] are `Load` errors; a document that does not decode
//! (missing fields, non-integer pins, negative counts) is a `Json` error.
//!
//! # Usage
//!
//! ```ignore
//! use streamnet::loader::read_json;
//!
//! let graph = read_json("graphs/accumulate.json")?;
//! let mut net = graph.instantiate(|name, n_in, n_out| build_element(name, n_in, n_out))?;
//! ```

use crate::engine::{Element, Source, StreamNet};
use crate::error::{Result, StreamNetError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

// =============================================================================
// Document
// =============================================================================

/// Raw graph document as stored on disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// `[n_inputs, n_outputs]`
    pub ports: [usize; 2],
    pub elements: Vec<ElementDecl>,
    pub connections: Vec<Connection>,
}

/// One row of the element table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDecl {
    pub name: String,
    /// `[n_in, n_out]`
    pub ports: [usize; 2],
}

/// `[from_name, from_pin, to_name, to_pin]`, pins 1-based
///
/// Pins are signed so that `0` and negative numbers are reported as rule
/// violations naming the connection; non-integer pins fail JSON decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection(pub String, pub i64, pub String, pub i64);

/// A named pin, 1-based
pub type Pin = (String, usize);

/// Largest pin count a document may declare, for external ports and for
/// either side of an element
pub const MAX_PINS: usize = 1 << 16;

// =============================================================================
// Validated graph
// =============================================================================

/// Graph that passed every structural check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamGraph {
    elements: Vec<ElementDecl>,
    inport_names: Vec<String>,
    outport_names: Vec<String>,
    indegrees: BTreeMap<Pin, BTreeSet<Pin>>,
    outdegrees: BTreeMap<Pin, BTreeSet<Pin>>,
}

fn load_err(msg: String) -> StreamNetError {
    StreamNetError::Load(msg)
}

/// `pin` as an index into `1..=count`
fn pin_number(pin: i64, count: usize) -> Option<usize> {
    usize::try_from(pin).ok().filter(|p| (1..=count).contains(p))
}

fn check_pin_count(what: &str, count: usize) -> Result<()> {
    if count > MAX_PINS {
        return Err(load_err(format!(
            "{} declares {} pins, limit is {}",
            what, count, MAX_PINS
        )));
    }
    Ok(())
}

/// Check a document and build its pin maps. Any violation aborts the load.
pub fn parse_json(doc: &GraphDocument) -> Result<StreamGraph> {
    let [n_in, n_out] = doc.ports;
    check_pin_count("graph input", n_in)?;
    check_pin_count("graph output", n_out)?;
    let inport_names: Vec<String> = (1..=n_in).map(|i| format!("inp{}", i)).collect();
    let outport_names: Vec<String> = (1..=n_out).map(|i| format!("outp{}", i)).collect();
    let inports: HashSet<&str> = inport_names.iter().map(String::as_str).collect();
    let outports: HashSet<&str> = outport_names.iter().map(String::as_str).collect();

    let mut elements: BTreeMap<&str, [usize; 2]> = BTreeMap::new();
    for el in &doc.elements {
        if inports.contains(el.name.as_str()) || outports.contains(el.name.as_str()) {
            return Err(load_err(format!("element name {} not allowed", el.name)));
        }
        let [el_in, el_out] = el.ports;
        check_pin_count(&format!("element {} input", el.name), el_in)?;
        check_pin_count(&format!("element {} output", el.name), el_out)?;
        if elements.insert(el.name.as_str(), el.ports).is_some() {
            return Err(load_err(format!("duplicate element name {}", el.name)));
        }
    }

    // Only connected pins get an entry
    let mut indegrees: BTreeMap<Pin, BTreeSet<Pin>> = BTreeMap::new();
    let mut outdegrees: BTreeMap<Pin, BTreeSet<Pin>> = BTreeMap::new();

    for Connection(from, from_pin, to, to_pin) in &doc.connections {
        // Source side
        let from_key = if let Some([_, el_out]) = elements.get(from.as_str()) {
            let pin = pin_number(*from_pin, *el_out).ok_or_else(|| {
                load_err(format!(
                    "{} is not a valid out pin number for element {}",
                    from_pin, from
                ))
            })?;
            (from.clone(), pin)
        } else if inports.contains(from.as_str()) {
            let pin = pin_number(*from_pin, 1).ok_or_else(|| {
                load_err(format!("{} is not a valid pin number for port {}", from_pin, from))
            })?;
            (from.clone(), pin)
        } else if outports.contains(from.as_str()) {
            return Err(load_err(format!(
                "invalid directed edge: output port {} cannot be a source",
                from
            )));
        } else {
            return Err(load_err(format!("element or port {} not found", from)));
        };

        // Sink side
        let to_key = if let Some([el_in, _]) = elements.get(to.as_str()) {
            let pin = pin_number(*to_pin, *el_in).ok_or_else(|| {
                load_err(format!(
                    "{} is not a valid in pin number for element {}",
                    to_pin, to
                ))
            })?;
            (to.clone(), pin)
        } else if outports.contains(to.as_str()) {
            let pin = pin_number(*to_pin, 1).ok_or_else(|| {
                load_err(format!("{} is not a valid pin number for port {}", to_pin, to))
            })?;
            (to.clone(), pin)
        } else if inports.contains(to.as_str()) {
            return Err(load_err(format!(
                "invalid directed edge: input port {} cannot be a sink",
                to
            )));
        } else {
            return Err(load_err(format!("element or port {} not found", to)));
        };

        let sources = indegrees.entry(to_key.clone()).or_default();
        sources.insert(from_key.clone());
        if sources.len() > 1 {
            return Err(if outports.contains(to.as_str()) {
                load_err(format!("output port {} cannot have an indegree greater than one", to))
            } else {
                load_err(format!(
                    "in pin {} of element {} has an indegree greater than one",
                    to_pin, to
                ))
            });
        }
        outdegrees.entry(from_key).or_default().insert(to_key);
    }

    log::debug!(
        "Parsed graph: {} inputs, {} outputs, {} elements, {} connections",
        n_in,
        n_out,
        doc.elements.len(),
        doc.connections.len()
    );

    Ok(StreamGraph {
        elements: doc.elements.clone(),
        inport_names,
        outport_names,
        indegrees,
        outdegrees,
    })
}

/// Parse and check a graph from a JSON string
pub fn load_string(source: &str) -> Result<StreamGraph> {
    let doc: GraphDocument = serde_json::from_str(source)?;
    parse_json(&doc)
}

/// Read, parse and check a graph file
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<StreamGraph> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    log::debug!("Loading graph from {}", path.display());
    load_string(&source)
}

impl StreamGraph {
    /// Element table in document order
    pub fn elements(&self) -> &[ElementDecl] {
        &self.elements
    }

    /// `inp1..inpN`
    pub fn inport_names(&self) -> &[String] {
        &self.inport_names
    }

    /// `outp1..outpM`
    pub fn outport_names(&self) -> &[String] {
        &self.outport_names
    }

    /// Sources feeding each connected sink pin (element inputs and output ports)
    pub fn indegrees(&self) -> &BTreeMap<Pin, BTreeSet<Pin>> {
        &self.indegrees
    }

    /// Sinks fed by each connected source pin (element outputs and input ports)
    pub fn outdegrees(&self) -> &BTreeMap<Pin, BTreeSet<Pin>> {
        &self.outdegrees
    }

    /// The single source feeding a sink pin, if any
    pub fn source_of(&self, name: &str, pin: usize) -> Option<&Pin> {
        self.indegrees
            .get(&(name.to_string(), pin))
            .and_then(|sources| sources.iter().next())
    }

    /// Build a frozen network from this graph.
    ///
    /// `factory` receives each element's name and declared `(n_in, n_out)`
    /// and returns its collaborator.
    ///
    /// # Errors
    /// `Load` if an output port has no source; `UnboundSlot` if an element
    /// input pin is left unconnected; any factory error unchanged.
    pub fn instantiate<F>(&self, mut factory: F) -> Result<StreamNet>
    where
        F: FnMut(&str, usize, usize) -> Result<Box<dyn Element>>,
    {
        let mut net = StreamNet::new();
        for name in &self.inport_names {
            net.add_input(name)?;
        }
        for el in &self.elements {
            let [n_in, n_out] = el.ports;
            let object = factory(&el.name, n_in, n_out)?;
            net.add_boxed_element(&el.name, object, n_in, n_out)?;
        }

        for el in &self.elements {
            for pin in 1..=el.ports[0] {
                if let Some(source) = self.source_of(&el.name, pin) {
                    net.connect(&el.name, pin - 1, self.engine_source(source))?;
                }
            }
        }

        for name in &self.outport_names {
            let source = self
                .source_of(name, 1)
                .ok_or_else(|| load_err(format!("output port {} has no source", name)))?;
            net.add_output(self.engine_source(source))?;
        }

        net.freeze()?;
        Ok(net)
    }

    fn engine_source(&self, (name, pin): &Pin) -> Source {
        if self.inport_names.iter().any(|n| n == name) {
            Source::Name(name.clone())
        } else {
            Source::Port(name.clone(), pin - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Emission;
    use crate::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ACCUMULATE: &str = r#"{
        "ports": [1, 1],
        "elements": [{"name": "acc", "ports": [2, 1]}],
        "connections": [
            ["inp1", 1, "acc", 1],
            ["acc", 1, "acc", 2],
            ["acc", 1, "outp1", 1]
        ]
    }"#;

    fn sum_factory(_name: &str, _n_in: usize, _n_out: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(|inputs: &[Value]| -> Result<Emission> {
            Ok(Value::sum(inputs)?.unwrap_or_else(|| Value::scalar(0.0)).into())
        }))
    }

    fn load_err_message(source: &str) -> String {
        match load_string(source) {
            Err(StreamNetError::Load(msg)) => msg,
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_string_and_instantiate() {
        let graph = load_string(ACCUMULATE).unwrap();
        assert_eq!(graph.inport_names(), ["inp1"]);
        assert_eq!(graph.outport_names(), ["outp1"]);
        assert_eq!(graph.source_of("acc", 2), Some(&("acc".to_string(), 1)));
        assert_eq!(graph.outdegrees()[&("acc".to_string(), 1)].len(), 2);

        let mut net = graph.instantiate(sum_factory).unwrap();
        assert!(net.is_frozen());
        let outs: Vec<f64> = (0..3)
            .map(|_| net.step(&[Value::scalar(1.0)]).unwrap()[0].as_scalar().unwrap())
            .collect();
        assert_eq!(outs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_passthrough_graph() {
        let graph = load_string(
            r#"{"ports": [2, 2], "elements": [],
                "connections": [["inp2", 1, "outp1", 1], ["inp1", 1, "outp2", 1]]}"#,
        )
        .unwrap();
        let mut net = graph.instantiate(sum_factory).unwrap();
        let out = net.step(&[Value::scalar(1.0), Value::scalar(2.0)]).unwrap();
        assert_eq!(out, vec![Value::scalar(2.0), Value::scalar(1.0)]);
    }

    #[test]
    fn test_output_port_indegree_two_rejected() {
        let msg = load_err_message(
            r#"{"ports": [2, 1], "elements": [],
                "connections": [["inp1", 1, "outp1", 1], ["inp2", 1, "outp1", 1]]}"#,
        );
        assert!(msg.contains("outp1"), "{}", msg);
    }

    #[test]
    fn test_element_pin_indegree_two_rejected() {
        let msg = load_err_message(
            r#"{"ports": [2, 0], "elements": [{"name": "a", "ports": [1, 1]}],
                "connections": [["inp1", 1, "a", 1], ["inp2", 1, "a", 1]]}"#,
        );
        assert!(msg.contains("in pin 1 of element a"), "{}", msg);
    }

    #[test]
    fn test_repeated_connection_counts_once() {
        let graph = load_string(
            r#"{"ports": [1, 1], "elements": [],
                "connections": [["inp1", 1, "outp1", 1], ["inp1", 1, "outp1", 1]]}"#,
        )
        .unwrap();
        assert_eq!(graph.indegrees()[&("outp1".to_string(), 1)].len(), 1);
    }

    #[test]
    fn test_reserved_name_rejected() {
        let msg = load_err_message(
            r#"{"ports": [1, 1], "elements": [{"name": "inp1", "ports": [1, 1]}],
                "connections": []}"#,
        );
        assert!(msg.contains("inp1"), "{}", msg);

        // Names beyond the declared pin count are free
        assert!(load_string(
            r#"{"ports": [1, 1], "elements": [{"name": "outp2", "ports": [0, 1]}],
                "connections": []}"#
        )
        .is_ok());
    }

    #[test]
    fn test_duplicate_element_rejected() {
        let msg = load_err_message(
            r#"{"ports": [0, 0], "elements": [{"name": "a", "ports": [0, 1]},
                {"name": "a", "ports": [0, 1]}], "connections": []}"#,
        );
        assert!(msg.contains("duplicate"), "{}", msg);
    }

    #[test]
    fn test_bad_pins_rejected() {
        let cases = [
            (r#"["a", 2, "outp1", 1]"#, "out pin"),
            (r#"["a", 0, "outp1", 1]"#, "out pin"),
            (r#"["a", -1, "outp1", 1]"#, "-1 is not a valid out pin"),
            (r#"["inp1", -1, "a", 1]"#, "port inp1"),
            (r#"["inp1", 1, "a", -2]"#, "in pin"),
            (r#"["inp1", 2, "a", 1]"#, "port inp1"),
            (r#"["inp1", 1, "a", 3]"#, "in pin"),
            (r#"["a", 1, "outp1", 2]"#, "port outp1"),
            (r#"["outp1", 1, "a", 1]"#, "cannot be a source"),
            (r#"["a", 1, "inp1", 1]"#, "cannot be a sink"),
            (r#"["ghost", 1, "a", 1]"#, "ghost not found"),
            (r#"["a", 1, "ghost", 1]"#, "ghost not found"),
        ];
        for (conn, needle) in cases {
            let source = format!(
                r#"{{"ports": [1, 1], "elements": [{{"name": "a", "ports": [2, 1]}}],
                    "connections": [{}]}}"#,
                conn
            );
            let msg = load_err_message(&source);
            assert!(msg.contains(needle), "{} -> {}", conn, msg);
        }
    }

    #[test]
    fn test_oversized_pin_counts_rejected() {
        let source = format!(
            r#"{{"ports": [{}, 0], "elements": [], "connections": []}}"#,
            usize::MAX
        );
        let msg = load_err_message(&source);
        assert!(msg.contains("graph input"), "{}", msg);

        let msg = load_err_message(
            r#"{"ports": [0, 0], "elements": [{"name": "wide", "ports": [3000000, 1]}],
                "connections": []}"#,
        );
        assert!(msg.contains("element wide input"), "{}", msg);

        let at_limit = format!(
            r#"{{"ports": [1, 0], "elements": [{{"name": "a", "ports": [{}, 1]}}],
                "connections": [["inp1", 1, "a", {}]]}}"#,
            MAX_PINS, MAX_PINS
        );
        let graph = load_string(&at_limit).unwrap();
        assert_eq!(graph.indegrees().len(), 1);
        assert_eq!(graph.source_of("a", 1), None);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(load_string("{"), Err(StreamNetError::Json(_))));
        assert!(matches!(
            load_string(r#"{"ports": [1, 1]}"#),
            Err(StreamNetError::Json(_))
        ));
        assert!(matches!(
            load_string(
                r#"{"ports": [1, 1], "elements": [], "connections": [["inp1", 1.5, "outp1", 1]]}"#
            ),
            Err(StreamNetError::Json(_))
        ));
    }

    #[test]
    fn test_unconnected_output_port() {
        let graph = load_string(r#"{"ports": [1, 1], "elements": [], "connections": []}"#).unwrap();
        assert!(matches!(
            graph.instantiate(sum_factory),
            Err(StreamNetError::Load(_))
        ));
    }

    #[test]
    fn test_unconnected_element_pin() {
        let graph = load_string(
            r#"{"ports": [1, 1], "elements": [{"name": "a", "ports": [2, 1]}],
                "connections": [["inp1", 1, "a", 1], ["a", 1, "outp1", 1]]}"#,
        )
        .unwrap();
        assert!(matches!(
            graph.instantiate(sum_factory),
            Err(StreamNetError::UnboundSlot { .. })
        ));
    }

    #[test]
    fn test_factory_error_propagates() {
        let graph = load_string(ACCUMULATE).unwrap();
        let result = graph.instantiate(|name, _, _| {
            Err(StreamNetError::Element(format!("no collaborator for {}", name)))
        });
        assert!(matches!(result, Err(StreamNetError::Element(_))));
    }

    #[test]
    fn test_read_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ACCUMULATE.as_bytes()).unwrap();
        let graph = read_json(file.path()).unwrap();
        assert_eq!(graph.elements().len(), 1);
        assert_eq!(graph.elements()[0].ports, [2, 1]);
    }

    #[test]
    fn test_read_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_json(dir.path().join("missing.json")),
            Err(StreamNetError::Io(_))
        ));
    }
}
