//! The Non-Blocking All-Inclusive Controller / Observer.
//!
//! The NBAIC is a bipartite graph alternating between information states
//! (Y-nodes) and decisions (Z-nodes). A Y-node is keyed by the exact set of
//! plant states reached by the last observation (the seed); its label is the
//! seed's unobservable closure. A Z-node fixes a decision at its source
//! Y-node and carries the estimate, the closure of the seed under the events
//! the decision leaves silent: enabled unobservable events for a control
//! decision, everything not activated for an activation decision.
//!
//! After the forward construction the graph is pruned to its greatest fixed
//! point: Y-nodes must keep at least one decision, decisions must keep every
//! observable successor, and a decision whose estimate contains a plant
//! state with no live continuation is removed. The root surviving the prune
//! is the feasibility verdict reported by [`Nbaic::is_empty`].

mod liveness;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use fixedbitset::FixedBitSet;
use log::{debug, info, trace, warn};

use crate::fsm::{EventIndex, Fsm, StateIndex};
use crate::options::{Mode, MpoCondition};
use crate::property::IsProperty;

pub type YIndex = usize;
pub type ZIndex = usize;

#[derive(Debug, Clone)]
pub(crate) struct YNode {
    seed: Vec<StateIndex>,
    label: Vec<StateIndex>,
    decisions: Vec<ZIndex>,
}

#[derive(Debug, Clone)]
pub(crate) struct ZNode {
    source: YIndex,
    decision: Vec<EventIndex>,
    silent: FixedBitSet,
    estimate: Vec<StateIndex>,
    successors: Vec<(EventIndex, YIndex)>,
}

/// The bipartite Y/Z graph together with its aliveness marks.
#[derive(Debug, Clone)]
pub struct Nbaic {
    mode: Mode,
    y_nodes: Vec<YNode>,
    z_nodes: Vec<ZNode>,
    mapping: HashMap<Vec<StateIndex>, YIndex>,
    y_alive: FixedBitSet,
    z_alive: FixedBitSet,
}

pub(crate) const ROOT: YIndex = 0;

impl Nbaic {
    /// Builds the NBAIC by forward construction from the closure of the
    /// initial plant state and prunes it to the non-blocking greatest fixed
    /// point.
    pub fn build(fsm: &Fsm, isp: &IsProperty, mode: Mode) -> Self {
        let mut nbaic = Self {
            mode,
            y_nodes: Vec::new(),
            z_nodes: Vec::new(),
            mapping: HashMap::new(),
            y_alive: FixedBitSet::new(),
            z_alive: FixedBitSet::new(),
        };
        nbaic.construct(fsm, isp);
        info!(
            "Constructed NBAIC with {} Y-states and {} Z-states",
            nbaic.y_nodes.len(),
            nbaic.z_nodes.len()
        );
        nbaic.prune(fsm);
        if nbaic.is_empty() {
            info!("NBAIC is empty after pruning");
        } else {
            info!(
                "Pruned NBAIC has {} Y-states and {} Z-states",
                nbaic.y_alive.count_ones(..),
                nbaic.z_alive.count_ones(..)
            );
        }
        nbaic
    }

    fn construct(&mut self, fsm: &Fsm, isp: &IsProperty) {
        let (root, _) = self.add_y_node(fsm, vec![fsm.initial_state()]);
        debug_assert_eq!(root, ROOT);

        let mut queue = VecDeque::with_capacity(64);
        queue.push_back(root);
        while let Some(y) = queue.pop_front() {
            for decision in self.candidate_decisions(fsm, y) {
                self.try_add_decision(fsm, isp, y, decision, &mut queue);
            }
        }
    }

    /// Enumerates the candidate decisions at a Y-state in a stable order.
    ///
    /// For BSCOPNBMAX every feasible uncontrollable event is implicitly
    /// enabled, so the candidates are the subsets of the feasible
    /// controllable events on top of that base. For MPO the candidates are
    /// the subsets of the observable alphabet.
    fn candidate_decisions(&self, fsm: &Fsm, y: YIndex) -> Vec<Vec<EventIndex>> {
        let mut free = Vec::new();
        let mut base = Vec::new();
        match self.mode {
            Mode::Bscopnbmax => {
                let mut feasible = FixedBitSet::with_capacity(fsm.num_events());
                for &x in &self.y_nodes[y].label {
                    for &(event, _) in fsm.transitions_from(x) {
                        feasible.insert(event);
                    }
                }
                for event in feasible.ones() {
                    if fsm.event(event).is_controllable() {
                        free.push(event);
                    } else {
                        base.push(event);
                    }
                }
            }
            Mode::Mpo => {
                free.extend((0..fsm.num_events()).filter(|&e| fsm.event(e).is_observable()));
            }
        }

        let mut candidates = Vec::with_capacity(1 << free.len());
        for mask in 0u64..(1u64 << free.len()) {
            let mut decision = base.clone();
            for (bit, &event) in free.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    decision.push(event);
                }
            }
            decision.sort_unstable();
            candidates.push(decision);
        }
        candidates
    }

    /// Checks a candidate decision for admissibility and, if it passes,
    /// attaches the Z-node and its observable successors.
    fn try_add_decision(
        &mut self,
        fsm: &Fsm,
        isp: &IsProperty,
        y: YIndex,
        decision: Vec<EventIndex>,
        queue: &mut VecDeque<YIndex>,
    ) {
        let silent = self.silent_events(fsm, &decision);
        let estimate = fsm.unobservable_reach(&self.y_nodes[y].seed, &silent);
        if !isp.holds(&estimate) {
            trace!("decision {:?} at Y{} violates the property", decision, y);
            return;
        }

        let mut transitions = Vec::new();
        for &event in &decision {
            if !fsm.event(event).is_observable() {
                continue;
            }
            let mut targets: Vec<StateIndex> = estimate
                .iter()
                .filter_map(|&x| fsm.step(x, event))
                .collect();
            targets.sort_unstable();
            targets.dedup();
            if targets.is_empty() {
                continue;
            }
            let label = fsm.static_reach(&targets);
            if !isp.holds(&label) {
                trace!(
                    "decision {:?} at Y{} leads to a violating successor on {}",
                    decision,
                    y,
                    fsm.event(event).name()
                );
                return;
            }
            transitions.push((event, targets));
        }

        let z = self.z_nodes.len();
        let mut successors = Vec::with_capacity(transitions.len());
        for (event, targets) in transitions {
            let (target_y, new) = self.add_y_node(fsm, targets);
            successors.push((event, target_y));
            if new {
                queue.push_back(target_y);
            }
        }
        self.z_nodes.push(ZNode {
            source: y,
            decision,
            silent,
            estimate,
            successors,
        });
        self.z_alive.grow(z + 1);
        self.z_alive.insert(z);
        self.y_nodes[y].decisions.push(z);
    }

    /// The events left silent by a decision.
    fn silent_events(&self, fsm: &Fsm, decision: &[EventIndex]) -> FixedBitSet {
        let mut silent = FixedBitSet::with_capacity(fsm.num_events());
        match self.mode {
            Mode::Bscopnbmax => {
                for &event in decision {
                    if !fsm.event(event).is_observable() {
                        silent.insert(event);
                    }
                }
            }
            Mode::Mpo => {
                silent.insert_range(..);
                for &event in decision {
                    silent.remove(event);
                }
            }
        }
        silent
    }

    fn add_y_node(&mut self, fsm: &Fsm, seed: Vec<StateIndex>) -> (YIndex, bool) {
        match self.mapping.entry(seed) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let index = self.y_nodes.len();
                let seed = entry.key().clone();
                let label = fsm.static_reach(&seed);
                self.y_nodes.push(YNode {
                    seed,
                    label,
                    decisions: Vec::new(),
                });
                self.y_alive.grow(index + 1);
                self.y_alive.insert(index);
                entry.insert(index);
                (index, true)
            }
        }
    }

    /// Prunes to the non-blocking greatest fixed point: repeatedly removes
    /// decisions whose estimate contains a plant state with no live
    /// continuation, Y-states left without decisions, and decisions with a
    /// removed source or successor, until nothing changes.
    pub(crate) fn prune(&mut self, fsm: &Fsm) {
        loop {
            let live = liveness::live_pairs(self, fsm);
            let mut changed = false;
            for z in 0..self.z_nodes.len() {
                if !self.z_alive.contains(z) {
                    continue;
                }
                let dead_pair = (0..self.z_nodes[z].estimate.len()).any(|i| !live[z].contains(i));
                if dead_pair {
                    debug!("removing blocking decision Z{}", z);
                    self.z_alive.remove(z);
                    changed = true;
                }
            }
            changed |= self.prune_structural();
            if !changed {
                break;
            }
        }
    }

    /// The two structural rules: Y-states need a surviving decision,
    /// decisions need a surviving source and surviving successors.
    fn prune_structural(&mut self) -> bool {
        let mut changed = false;
        loop {
            let mut step = false;
            for y in 0..self.y_nodes.len() {
                if self.y_alive.contains(y) && self.alive_decisions(y).next().is_none() {
                    debug!("removing undecided Y-state Y{}", y);
                    self.y_alive.remove(y);
                    step = true;
                }
            }
            for z in 0..self.z_nodes.len() {
                if !self.z_alive.contains(z) {
                    continue;
                }
                let node = &self.z_nodes[z];
                if !self.y_alive.contains(node.source)
                    || node.successors.iter().any(|&(_, y)| !self.y_alive.contains(y))
                {
                    debug!("removing orphaned decision Z{}", z);
                    self.z_alive.remove(z);
                    step = true;
                }
            }
            if !step {
                break;
            }
            changed = true;
        }
        changed
    }

    /// Whether the root was removed by pruning: the negative result of a
    /// synthesis run.
    pub fn is_empty(&self) -> bool {
        !self.y_alive.contains(ROOT)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn num_y_nodes(&self) -> usize {
        self.y_nodes.len()
    }

    pub fn is_y_alive(&self, y: YIndex) -> bool {
        self.y_alive.contains(y)
    }

    pub fn is_z_alive(&self, z: ZIndex) -> bool {
        self.z_alive.contains(z)
    }

    pub fn y_seed(&self, y: YIndex) -> &[StateIndex] {
        &self.y_nodes[y].seed
    }

    pub fn y_label(&self, y: YIndex) -> &[StateIndex] {
        &self.y_nodes[y].label
    }

    pub fn z_source(&self, z: ZIndex) -> YIndex {
        self.z_nodes[z].source
    }

    pub fn z_decision(&self, z: ZIndex) -> &[EventIndex] {
        &self.z_nodes[z].decision
    }

    pub(crate) fn z_silent(&self, z: ZIndex) -> &FixedBitSet {
        &self.z_nodes[z].silent
    }

    pub fn z_estimate(&self, z: ZIndex) -> &[StateIndex] {
        &self.z_nodes[z].estimate
    }

    pub fn z_successors(&self, z: ZIndex) -> &[(EventIndex, YIndex)] {
        &self.z_nodes[z].successors
    }

    /// The σ-successor of a decision, if the event is observable, enabled
    /// and feasible.
    pub(crate) fn z_successor_on(&self, z: ZIndex, event: EventIndex) -> Option<YIndex> {
        self.z_nodes[z]
            .successors
            .iter()
            .find(|&&(e, _)| e == event)
            .map(|&(_, y)| y)
    }

    pub fn alive_decisions(&self, y: YIndex) -> impl Iterator<Item = ZIndex> + '_ {
        self.y_nodes[y]
            .decisions
            .iter()
            .copied()
            .filter(move |&z| self.z_alive.contains(z))
    }

    /// The committed decision of the unfolding at a Y-state: maximal
    /// cardinality, ties broken by the lexicographically least event
    /// sequence.
    pub(crate) fn maximal_decision(&self, y: YIndex) -> Option<ZIndex> {
        let mut best: Option<ZIndex> = None;
        for z in self.alive_decisions(y) {
            best = Some(match best {
                None => z,
                Some(current) => {
                    let zd = &self.z_nodes[z].decision;
                    let cd = &self.z_nodes[current].decision;
                    if zd.len() > cd.len() || (zd.len() == cd.len() && zd < cd) {
                        z
                    } else {
                        current
                    }
                }
            });
        }
        best
    }

    /// The surviving decisions at a Y-state ordered largest-first:
    /// cardinality descending, then lexicographically by event sequence.
    pub(crate) fn decisions_largest_first(&self, y: YIndex) -> Vec<ZIndex> {
        let mut decisions: Vec<ZIndex> = self.alive_decisions(y).collect();
        decisions.sort_by(|&a, &b| {
            let da = &self.z_nodes[a].decision;
            let db = &self.z_nodes[b].decision;
            db.len().cmp(&da.len()).then_with(|| da.cmp(db))
        });
        decisions
    }

    /// Whether the label of a Y-state contains a marked plant state.
    pub fn y_contains_marked(&self, fsm: &Fsm, y: YIndex) -> bool {
        self.y_nodes[y].label.iter().any(|&x| fsm.is_marked(x))
    }

    /// Extracts a minimal or maximal sensor activation policy from an NBAIC
    /// built in MPO mode: at every surviving Y-state, in insertion order,
    /// the best candidate whose committal keeps the pruned NBAIC non-empty
    /// replaces all of its siblings.
    pub fn reduce_mpo(&mut self, fsm: &Fsm, condition: MpoCondition) {
        info!("Reducing MPO with condition {}", condition);
        for y in 0..self.y_nodes.len() {
            if !self.y_alive.contains(y) {
                continue;
            }
            let mut candidates: Vec<ZIndex> = self.alive_decisions(y).collect();
            candidates.sort_by(|&a, &b| {
                let da = &self.z_nodes[a].decision;
                let db = &self.z_nodes[b].decision;
                let by_size = match condition {
                    MpoCondition::Min => da.len().cmp(&db.len()),
                    MpoCondition::Max => db.len().cmp(&da.len()),
                };
                by_size.then_with(|| da.cmp(db))
            });
            if candidates.len() <= 1 {
                continue;
            }
            let mut committed = false;
            for &choice in &candidates {
                let mut trial = self.clone();
                for &other in &candidates {
                    if other != choice {
                        trial.z_alive.remove(other);
                    }
                }
                trial.prune(fsm);
                if !trial.is_empty() {
                    debug!(
                        "committing activation decision {:?} at Y{}",
                        self.z_nodes[choice].decision, y
                    );
                    *self = trial;
                    committed = true;
                    break;
                }
            }
            if !committed {
                warn!("no single activation decision is feasible at Y{}", y);
            }
        }
    }
}
