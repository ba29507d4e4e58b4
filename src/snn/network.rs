//! SpikingNet - Layers, synapses, and the learning broadcast
//!
//! A specialization of `StreamNet` where layers are neuron elements and
//! synapses are elements wired between layers and inputs. Every tick runs the
//! engine step and then hands each synapse the fresh output of the layer it
//! feeds, together with the learning flag.
//!
//! Synapses are evaluated in the stage before layers: a synapse reads its
//! presynaptic layers as they were on the previous tick, and the layer it
//! feeds sees the synapse output of the current tick.

use super::node::{Group, LayerNode, SynapseNode};
use super::traits::{Neuron, Synapse};
use crate::engine::{Lifecycle, Stage, StreamNet, StreamNetConfig};
use crate::error::{Result, StreamNetError};
use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const SYNAPSE_STAGE: Stage = 0;
const LAYER_STAGE: Stage = 1;

/// Spiking network configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikingNetConfig {
    /// Learning flag used by `tick`
    pub learn: bool,
    /// Freeze the topology on the first tick
    pub auto_freeze: bool,
}

impl Default for SpikingNetConfig {
    fn default() -> Self {
        Self {
            learn: true,
            auto_freeze: true,
        }
    }
}

impl SpikingNetConfig {
    /// Config for inference-only runs (`tick` never learns)
    pub fn frozen_weights() -> Self {
        Self {
            learn: false,
            ..Default::default()
        }
    }
}

/// Where a network sits between ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickPhase {
    /// Ready for `step` or `reset`
    Idle,
    /// Engine step done, learning broadcast pending
    Updated,
}

/// Synapse bookkeeping
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynapseInfo {
    /// Generated element name
    pub name: String,
    /// Postsynaptic layer
    pub post: String,
    /// Presynaptic inputs or layers, in call order
    pub pre: Vec<String>,
}

/// Network of layers connected by synapses
#[derive(Debug)]
pub struct SpikingNet {
    net: StreamNet,
    config: SpikingNetConfig,
    layers: Vec<String>,
    layer_set: HashSet<String>,
    synapses: Vec<SynapseInfo>,
    phase: TickPhase,
}

impl Default for SpikingNet {
    fn default() -> Self {
        Self::new()
    }
}

impl SpikingNet {
    /// Create an empty network
    pub fn new() -> Self {
        Self::with_config(SpikingNetConfig::default())
    }

    /// Create an empty network with explicit configuration
    pub fn with_config(config: SpikingNetConfig) -> Self {
        let engine = StreamNetConfig {
            auto_freeze: config.auto_freeze,
        };
        Self {
            net: StreamNet::with_config(engine),
            config,
            layers: Vec::new(),
            layer_set: HashSet::new(),
            synapses: Vec::new(),
            phase: TickPhase::Idle,
        }
    }

    /// Add an external input
    pub fn add_input(&mut self, name: &str) -> Result<()> {
        self.net.add_input(name).map(|_| ())
    }

    /// Add a layer of neurons
    pub fn add_layer<N>(&mut self, name: &str, neuron: N) -> Result<()>
    where
        N: Neuron + 'static,
    {
        self.add_boxed_layer(name, Box::new(neuron))
    }

    /// Add an already boxed layer
    pub fn add_boxed_layer(&mut self, name: &str, neuron: Box<dyn Neuron>) -> Result<()> {
        let node = LayerNode::new(neuron);
        self.net
            .add_staged_element(name, Box::new(node), 1, LAYER_STAGE)?;
        self.layers.push(name.to_string());
        self.layer_set.insert(name.to_string());
        Ok(())
    }

    /// Add a synapse from one or more presynaptic inputs or layers to `post`.
    ///
    /// More than one presynaptic source covers modulated synapses, which
    /// receive the sources positionally in the order given.
    /// Returns the generated synapse name.
    pub fn add_synapse<S>(&mut self, post: &str, synapse: S, pre: &[&str]) -> Result<String>
    where
        S: Synapse + 'static,
    {
        self.add_boxed_synapse(post, Box::new(synapse), pre)
    }

    /// Add an already boxed synapse
    pub fn add_boxed_synapse(
        &mut self,
        post: &str,
        synapse: Box<dyn Synapse>,
        pre: &[&str],
    ) -> Result<String> {
        if self.net.is_frozen() {
            return Err(StreamNetError::Frozen);
        }
        self.ensure_layer(post)?;
        if pre.is_empty() {
            return Err(StreamNetError::InvalidArity(format!(
                "synapse into {} needs at least one presynaptic source",
                post
            )));
        }
        for name in pre {
            if !self.net.is_input(name) {
                self.ensure_layer(name)?;
            }
        }

        let name = self.next_synapse_name(post);
        let grouped = self.net.element_mut::<LayerNode>(post)?.groups_synapses();
        let group = if grouped {
            Some(Group::of(synapse.syn_type()).ok_or_else(|| {
                StreamNetError::UntypedSynapse {
                    synapse: name.clone(),
                    layer: post.to_string(),
                }
            })?)
        } else {
            None
        };

        self.net
            .add_staged_element(&name, Box::new(SynapseNode::new(synapse)), 1, SYNAPSE_STAGE)?;
        for source in pre {
            self.net.add_el_input(&name, *source)?;
        }
        self.net.add_fresh_input(post, name.as_str())?;
        if let Some(group) = group {
            self.net.element_mut::<LayerNode>(post)?.push_group(group);
        }
        self.net.set_learning_target(&name, post)?;

        log::debug!("Added synapse {} from {:?} to {}", name, pre, post);
        self.synapses.push(SynapseInfo {
            name: name.clone(),
            post: post.to_string(),
            pre: pre.iter().map(|s| s.to_string()).collect(),
        });
        Ok(name)
    }

    /// Declare a layer or input as a network output
    pub fn add_output(&mut self, name: &str) -> Result<()> {
        self.net.add_output(name).map(|_| ())
    }

    /// Declare output `index` of an element as a network output
    pub fn add_output_port(&mut self, name: &str, index: usize) -> Result<()> {
        self.net.add_output((name, index)).map(|_| ())
    }

    /// Freeze the topology ahead of the first tick
    pub fn freeze(&mut self) -> Result<()> {
        self.net.freeze()
    }

    /// Advance one tick, then broadcast the learning update.
    ///
    /// `inputs` holds one value per declared input in declaration order.
    pub fn step(&mut self, inputs: &[Value], learn: bool) -> Result<Vec<Value>> {
        if self.phase == TickPhase::Updated {
            return Err(StreamNetError::TickInProgress);
        }
        let out = self.net.step(inputs)?;
        self.phase = TickPhase::Updated;
        self.update(learn)?;
        Ok(out)
    }

    /// `step` with the configured learning flag
    pub fn tick(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        self.step(inputs, self.config.learn)
    }

    /// Broadcast the learning update: every synapse receives the current
    /// output of the layer it feeds
    pub fn update(&mut self, learn: bool) -> Result<()> {
        self.net.broadcast(Lifecycle::Update { learn })?;
        self.phase = TickPhase::Idle;
        Ok(())
    }

    /// Reset every layer and synapse.
    ///
    /// # Errors
    /// `TickInProgress` if the last tick's learning broadcast failed; finish
    /// it with `update` first.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase == TickPhase::Updated {
            return Err(StreamNetError::TickInProgress);
        }
        self.net.reset();
        Ok(())
    }

    /// Outputs of the last completed tick
    pub fn outputs(&self) -> &[Value] {
        self.net.outputs()
    }

    /// Current output of a layer
    pub fn layer_output(&self, name: &str) -> Result<&Value> {
        self.ensure_layer(name)?;
        let out = self.net.element_output(name)?;
        out.first()
            .ok_or_else(|| StreamNetError::UnknownName(name.to_string()))
    }

    /// Layer names in registration order
    pub fn layer_names(&self) -> &[String] {
        &self.layers
    }

    /// Synapses in registration order
    pub fn synapses(&self) -> &[SynapseInfo] {
        &self.synapses
    }

    /// Names of the synapses feeding `post`
    pub fn synapses_of(&self, post: &str) -> Vec<&str> {
        self.synapses
            .iter()
            .filter(|s| s.post == post)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Current tick phase
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Underlying engine
    pub fn network(&self) -> &StreamNet {
        &self.net
    }

    /// Configuration
    pub fn config(&self) -> &SpikingNetConfig {
        &self.config
    }

    fn ensure_layer(&self, name: &str) -> Result<()> {
        if self.layer_set.contains(name) {
            Ok(())
        } else if self.net.contains(name) {
            Err(StreamNetError::NotALayer(name.to_string()))
        } else {
            Err(StreamNetError::UnknownName(name.to_string()))
        }
    }

    fn next_synapse_name(&self, post: &str) -> String {
        let mut n = 1usize;
        loop {
            let name = format!("{}_syn_{}", post, n);
            if !self.net.contains(&name) {
                return name;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snn::{PassThrough, StaticSynapse, SynType, SynapticDrive};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::{Arc, Mutex};

    fn s(x: f64) -> Value {
        Value::scalar(x)
    }

    /// Records every learning update it receives
    struct Spy {
        weight: f64,
        log: Arc<Mutex<Vec<(Value, bool)>>>,
        fail_on_learn: bool,
    }

    impl Spy {
        fn new(weight: f64, log: &Arc<Mutex<Vec<(Value, bool)>>>) -> Self {
            Self {
                weight,
                log: Arc::clone(log),
                fail_on_learn: false,
            }
        }
    }

    impl Synapse for Spy {
        fn call(&mut self, pre: &[Value]) -> Result<Value> {
            Ok(pre[0].scale(self.weight))
        }

        fn update(&mut self, post: &Value, learn: bool) -> Result<()> {
            if learn && self.fail_on_learn {
                return Err(StreamNetError::Element("learning diverged".into()));
            }
            self.log.lock().unwrap().push((post.clone(), learn));
            Ok(())
        }
    }

    /// Hebbian-ish toy: weight grows by pre * post when learning
    struct Hebb {
        weight: f64,
        last_pre: f64,
    }

    impl Synapse for Hebb {
        fn call(&mut self, pre: &[Value]) -> Result<Value> {
            self.last_pre = pre[0].as_scalar().unwrap_or(0.0);
            Ok(pre[0].scale(self.weight))
        }

        fn reset(&mut self) {
            self.last_pre = 0.0;
        }

        fn update(&mut self, post: &Value, learn: bool) -> Result<()> {
            if learn {
                self.weight += 0.1 * self.last_pre * post.as_scalar().unwrap_or(0.0);
            }
            Ok(())
        }
    }

    /// Captures the grouped drive it was called with
    struct GroupProbe {
        seen: Arc<Mutex<Vec<(Option<Value>, Option<Value>)>>>,
    }

    impl Neuron for GroupProbe {
        fn call(&mut self, drive: SynapticDrive<'_>) -> Result<Value> {
            if let SynapticDrive::Grouped { excitatory, inhibitory } = drive {
                self.seen.lock().unwrap().push((excitatory, inhibitory));
            }
            Ok(s(0.0))
        }

        fn group_synapses(&self) -> bool {
            true
        }
    }

    fn identity_net() -> SpikingNet {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]).unwrap();
        net.add_output("l1").unwrap();
        net
    }

    #[test]
    fn test_identity_network_end_to_end() {
        let mut net = identity_net();
        for _ in 0..5 {
            assert_eq!(net.step(&[s(0.6)], true).unwrap(), vec![s(0.6)]);
        }
        net.reset().unwrap();
        assert_eq!(net.step(&[s(0.6)], true).unwrap(), vec![s(0.6)]);
        assert_eq!(net.layer_output("l1").unwrap(), &s(0.6));
    }

    #[test]
    fn test_synapse_naming() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_layer("l1_syn_1", PassThrough::new()).unwrap();
        let a = net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]).unwrap();
        let b = net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]).unwrap();
        assert_eq!(a, "l1_syn_2");
        assert_eq!(b, "l1_syn_3");
        assert_eq!(net.synapses_of("l1"), vec!["l1_syn_2", "l1_syn_3"]);
        assert_eq!(net.network().input_arity("l1").unwrap(), 2);
    }

    #[test]
    fn test_add_synapse_validation() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();

        assert!(matches!(
            net.add_synapse("x", StaticSynapse::scalar(1.0), &["l1"]),
            Err(StreamNetError::NotALayer(_))
        ));
        assert!(matches!(
            net.add_synapse("nope", StaticSynapse::scalar(1.0), &["x"]),
            Err(StreamNetError::UnknownName(_))
        ));
        assert!(matches!(
            net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x", "missing"]),
            Err(StreamNetError::UnknownName(_))
        ));
        assert!(matches!(
            net.add_synapse("l1", StaticSynapse::scalar(1.0), &[]),
            Err(StreamNetError::InvalidArity(_))
        ));

        let syn = net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]).unwrap();
        assert!(matches!(
            net.add_synapse("l1", StaticSynapse::scalar(1.0), &[syn.as_str()]),
            Err(StreamNetError::NotALayer(_))
        ));
        // Failed calls registered nothing
        assert_eq!(net.network().element_count(), 2);
        assert_eq!(net.synapses().len(), 1);
    }

    #[test]
    fn test_grouped_aggregation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", GroupProbe { seen: Arc::clone(&seen) }).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(1.0).with_type(SynType::Excitatory), &["x"])
            .unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(0.5).with_type(SynType::Inhibitory), &["x"])
            .unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(2.0).with_type(SynType::Excitatory), &["x"])
            .unwrap();

        net.step(&[s(1.0)], false).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (Some(s(3.0)), Some(s(-0.5))));
    }

    #[test]
    fn test_grouped_missing_inhibitory_is_none() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", GroupProbe { seen: Arc::clone(&seen) }).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(1.0).with_type(SynType::Excitatory), &["x"])
            .unwrap();

        net.step(&[s(0.4)], false).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (Some(s(0.4)), None));
    }

    #[test]
    fn test_untyped_synapse_rejected_by_grouping_layer() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new().grouped()).unwrap();
        match net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]) {
            Err(StreamNetError::UntypedSynapse { synapse, layer }) => {
                assert_eq!(synapse, "l1_syn_1");
                assert_eq!(layer, "l1");
            }
            other => panic!("expected untyped synapse error, got {:?}", other),
        }
        assert_eq!(net.network().element_count(), 1);
        assert_eq!(net.network().input_arity("l1").unwrap(), 0);
    }

    #[test]
    fn test_recurrent_synapse_sees_previous_tick() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(0.5), &["l1"]).unwrap();
        net.add_output("l1").unwrap();

        let out: Vec<f64> = (0..3)
            .map(|_| net.step(&[s(1.0)], false).unwrap()[0].as_scalar().unwrap())
            .collect();
        assert_eq!(out, vec![1.0, 1.5, 1.75]);
    }

    #[test]
    fn test_chain_delays_one_tick_per_layer_hop() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_layer("l2", PassThrough::new()).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]).unwrap();
        net.add_synapse("l2", StaticSynapse::scalar(1.0), &["l1"]).unwrap();
        net.add_output("l1").unwrap();
        net.add_output("l2").unwrap();

        assert_eq!(net.step(&[s(1.0)], false).unwrap(), vec![s(1.0), s(0.0)]);
        assert_eq!(net.step(&[s(2.0)], false).unwrap(), vec![s(2.0), s(1.0)]);
    }

    #[test]
    fn test_learning_broadcast_gets_fresh_post_output() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", Spy::new(2.0, &log), &["x"]).unwrap();

        net.step(&[s(0.5)], true).unwrap();
        net.step(&[s(1.0)], false).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![(s(1.0), true), (s(2.0), false)]);
    }

    #[test]
    fn test_modulated_synapse_receives_sources_in_order() {
        struct Gate;

        impl Synapse for Gate {
            fn call(&mut self, pre: &[Value]) -> Result<Value> {
                assert_eq!(pre.len(), 2);
                pre[0].try_add(&pre[1].scale(10.0))
            }
        }

        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_input("m").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", Gate, &["x", "m"]).unwrap();
        net.add_output("l1").unwrap();
        assert_eq!(net.step(&[s(1.0), s(0.5)], false).unwrap(), vec![s(6.0)]);
    }

    #[test]
    fn test_learn_flag_changes_weights_and_reset_keeps_them() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", Hebb { weight: 1.0, last_pre: 0.0 }, &["x"]).unwrap();
        net.add_output("l1").unwrap();

        assert_eq!(net.step(&[s(1.0)], false).unwrap(), vec![s(1.0)]);
        assert_eq!(net.step(&[s(1.0)], false).unwrap(), vec![s(1.0)]);
        net.step(&[s(1.0)], true).unwrap();
        let out = net.step(&[s(1.0)], false).unwrap()[0].as_scalar().unwrap();
        assert!((out - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_failed_update_blocks_reset_until_finished() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut spy = Spy::new(1.0, &log);
        spy.fail_on_learn = true;

        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", spy, &["x"]).unwrap();

        assert!(matches!(net.step(&[s(1.0)], true), Err(StreamNetError::Element(_))));
        assert_eq!(net.phase(), TickPhase::Updated);
        assert!(matches!(net.reset(), Err(StreamNetError::TickInProgress)));
        assert!(matches!(net.step(&[s(1.0)], false), Err(StreamNetError::TickInProgress)));

        net.update(false).unwrap();
        assert_eq!(net.phase(), TickPhase::Idle);
        net.reset().unwrap();
        assert!(net.step(&[s(1.0)], false).is_ok());
    }

    #[test]
    fn test_add_output_port() {
        let mut net = SpikingNet::new();
        net.add_input("x").unwrap();
        net.add_layer("l1", PassThrough::new()).unwrap();
        net.add_synapse("l1", StaticSynapse::scalar(2.0), &["x"]).unwrap();

        net.add_output_port("l1", 0).unwrap();
        assert!(matches!(
            net.add_output_port("l1", 1),
            Err(StreamNetError::OutputIndexOutOfRange { index: 1, arity: 1, .. })
        ));
        assert!(matches!(
            net.add_output_port("x", 0),
            Err(StreamNetError::UnknownName(_))
        ));
        assert_eq!(net.network().output_count(), 1);
        assert_eq!(net.step(&[s(0.5)], false).unwrap(), vec![s(1.0)]);
    }

    #[test]
    fn test_frozen_after_first_tick() {
        let mut net = identity_net();
        net.tick(&[s(0.1)]).unwrap();
        assert!(matches!(
            net.add_layer("l2", PassThrough::new()),
            Err(StreamNetError::Frozen)
        ));
        assert!(matches!(
            net.add_synapse("l1", StaticSynapse::scalar(1.0), &["x"]),
            Err(StreamNetError::Frozen)
        ));
        assert!(matches!(net.add_input("y"), Err(StreamNetError::Frozen)));
    }

    #[test]
    fn test_wrong_input_count() {
        let mut net = identity_net();
        assert!(matches!(
            net.step(&[s(1.0), s(2.0)], true),
            Err(StreamNetError::InputCount { expected: 1, actual: 2 })
        ));
        assert_eq!(net.phase(), TickPhase::Idle);
    }

    #[test]
    fn test_random_sequence_replays_after_reset() {
        fn build() -> SpikingNet {
            let mut net = SpikingNet::with_config(SpikingNetConfig::frozen_weights());
            net.add_input("x").unwrap();
            net.add_layer("a", PassThrough::with_size(2)).unwrap();
            net.add_layer("b", PassThrough::with_size(2)).unwrap();
            net.add_synapse("a", StaticSynapse::one_to_one(&[1.0, 0.5]), &["x"]).unwrap();
            net.add_synapse("a", StaticSynapse::new(vec![vec![0.0, 0.3], vec![0.3, 0.0]]), &["b"])
                .unwrap();
            net.add_synapse("b", StaticSynapse::one_to_one(&[0.9, 0.9]), &["a"]).unwrap();
            net.add_output("a").unwrap();
            net.add_output("b").unwrap();
            net
        }

        let mut rng = StdRng::seed_from_u64(7);
        let inputs: Vec<Value> = (0..20)
            .map(|_| Value::from(vec![rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)]))
            .collect();

        let mut fresh = build();
        let expected: Vec<_> = inputs.iter().map(|x| fresh.tick(&[x.clone()]).unwrap()).collect();

        let mut reused = build();
        for x in inputs.iter().rev() {
            reused.tick(&[x.clone()]).unwrap();
        }
        reused.reset().unwrap();
        let replay: Vec<_> = inputs.iter().map(|x| reused.tick(&[x.clone()]).unwrap()).collect();
        assert_eq!(replay, expected);
    }

    #[test]
    fn test_config_defaults() {
        let config = SpikingNetConfig::default();
        assert!(config.learn);
        assert!(config.auto_freeze);
        let parsed: SpikingNetConfig = serde_json::from_str(r#"{"learn": false}"#).unwrap();
        assert_eq!(parsed, SpikingNetConfig::frozen_weights());
    }
}
