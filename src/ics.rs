//! The information-consistent subsystem.
//!
//! The ICS is the synchronous product of the unfolding with the plant. Its
//! vertices pair a representative UBTS Y-node with one plant state of the
//! node's label; undecided repeat leaves are folded onto their ancestor
//! copy, which is what turns the finite tree into the looping closed-loop
//! automaton. The ICS is a view: it is rebuilt from scratch after every
//! augmentation of the unfolding.

use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use log::{debug, trace};

use crate::fsm::{EventIndex, Fsm, StateIndex};
use crate::nbaic::Nbaic;
use crate::unfold::{Ubts, UyIndex};

pub type PairIndex = usize;

/// The product of the unfolding with the plant, with its co-accessibility
/// marks.
#[derive(Debug)]
pub struct Ics {
    pairs: Vec<(UyIndex, StateIndex)>,
    transitions: Vec<Vec<(EventIndex, PairIndex)>>,
    coaccessible: FixedBitSet,
    initial: PairIndex,
}

impl Ics {
    /// Constructs the ICS for the current unfolding.
    pub fn new(ubts: &Ubts, nbaic: &Nbaic, fsm: &Fsm) -> Self {
        let mut pairs = Vec::new();
        let mut mapping = HashMap::new();
        for u in ubts.attached_nodes() {
            if ubts.canonical(u) != u {
                continue;
            }
            for &x in nbaic.y_label(ubts.nbaic_state(u)) {
                let index = pairs.len();
                pairs.push((u, x));
                mapping.insert((u, x), index);
            }
        }

        let mut transitions: Vec<Vec<(EventIndex, PairIndex)>> = vec![Vec::new(); pairs.len()];
        for (index, &(u, x)) in pairs.iter().enumerate() {
            for &uz in ubts.decisions(u) {
                let z = ubts.decision_state(uz);
                for &event in nbaic.z_decision(z) {
                    if nbaic.z_silent(z).contains(event) {
                        // silent step within the same information state
                        if let Some(target) = fsm.step(x, event) {
                            if let Some(&pair) = mapping.get(&(u, target)) {
                                transitions[index].push((event, pair));
                            }
                        }
                    } else if let Some(target) = fsm.step(x, event) {
                        // observed step into the event's child copy
                        let child = ubts
                            .children(uz)
                            .iter()
                            .find(|&&(e, _)| e == event)
                            .map(|&(_, child)| ubts.canonical(child));
                        if let Some(child) = child {
                            if let Some(&pair) = mapping.get(&(child, target)) {
                                transitions[index].push((event, pair));
                            }
                        }
                    }
                }
            }
        }

        let initial = mapping[&(ubts.root(), fsm.initial_state())];
        let coaccessible = mark_coaccessible(fsm, &pairs, &transitions);
        debug!(
            "ICS has {} states of which {} are co-accessible",
            pairs.len(),
            coaccessible.count_ones(..)
        );
        Self {
            pairs,
            transitions,
            coaccessible,
            initial,
        }
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn pair(&self, index: PairIndex) -> (UyIndex, StateIndex) {
        self.pairs[index]
    }

    pub fn transitions_from(&self, index: PairIndex) -> &[(EventIndex, PairIndex)] {
        &self.transitions[index]
    }

    pub fn initial(&self) -> PairIndex {
        self.initial
    }

    pub fn is_coaccessible(&self, index: PairIndex) -> bool {
        self.coaccessible.contains(index)
    }

    /// The shallowest UBTS Y-node none of whose plant companions is
    /// co-accessible, or `None` once every node has a live companion.
    pub fn get_entrance_state(&self, ubts: &Ubts) -> Option<UyIndex> {
        let mut nodes: Vec<UyIndex> = ubts
            .attached_nodes()
            .into_iter()
            .filter(|&u| ubts.canonical(u) == u)
            .collect();
        nodes.sort_by_key(|&u| (ubts.history(u).len(), u));
        for u in nodes {
            let all_dead = self
                .pairs
                .iter()
                .enumerate()
                .filter(|&(_, &(node, _))| node == u)
                .all(|(index, _)| !self.coaccessible.contains(index));
            if all_dead {
                trace!("entrance state at node {}", u);
                return Some(u);
            }
        }
        None
    }

    /// Emits the raw product automaton A_UxG: the pairs reachable from the
    /// initial pair, written as a standalone FSM. Where augmentation left
    /// several decisions enabling the same event, the first co-accessible
    /// target is kept so that the product stays deterministic.
    pub fn product(&self, fsm: &Fsm) -> Fsm {
        let mut product = Fsm::new();
        let mut visited = FixedBitSet::with_capacity(self.pairs.len());
        let mut queue = std::collections::VecDeque::new();
        let mut state_of = HashMap::new();

        let mut add_state = |product: &mut Fsm, index: PairIndex| {
            let (u, x) = self.pairs[index];
            product.add_state(
                &format!("<u{},{}>", u, fsm.state(x).name()),
                fsm.is_marked(x),
            )
        };

        visited.insert(self.initial);
        state_of.insert(self.initial, add_state(&mut product, self.initial));
        queue.push_back(self.initial);
        while let Some(index) = queue.pop_front() {
            // one edge per event, preferring a co-accessible target
            let mut chosen: Vec<(EventIndex, PairIndex)> = Vec::new();
            for &(event, target) in &self.transitions[index] {
                match chosen.iter_mut().find(|(e, _)| *e == event) {
                    None => chosen.push((event, target)),
                    Some(entry) => {
                        if !self.coaccessible.contains(entry.1)
                            && self.coaccessible.contains(target)
                        {
                            entry.1 = target;
                        }
                    }
                }
            }
            for (event, target) in chosen {
                if !visited.contains(target) {
                    visited.insert(target);
                    state_of.insert(target, add_state(&mut product, target));
                    queue.push_back(target);
                }
                let attributes = fsm.event(event);
                let product_event = product
                    .add_event(
                        attributes.name(),
                        attributes.is_observable(),
                        attributes.is_controllable(),
                    )
                    .expect("plant events are consistent");
                product
                    .add_transition(state_of[&index], product_event, state_of[&target])
                    .expect("product transitions are deterministic");
            }
        }
        product
    }
}

/// Reverse reachability from the marked pairs.
fn mark_coaccessible(
    fsm: &Fsm,
    pairs: &[(UyIndex, StateIndex)],
    transitions: &[Vec<(EventIndex, PairIndex)>],
) -> FixedBitSet {
    let mut predecessors: Vec<Vec<PairIndex>> = vec![Vec::new(); pairs.len()];
    for (index, outgoing) in transitions.iter().enumerate() {
        for &(_, target) in outgoing {
            predecessors[target].push(index);
        }
    }
    let mut coaccessible = FixedBitSet::with_capacity(pairs.len());
    let mut queue = std::collections::VecDeque::new();
    for (index, &(_, x)) in pairs.iter().enumerate() {
        if fsm.is_marked(x) {
            coaccessible.insert(index);
            queue.push_back(index);
        }
    }
    while let Some(index) = queue.pop_front() {
        for &predecessor in &predecessors[index] {
            if !coaccessible.contains(predecessor) {
                coaccessible.insert(predecessor);
                queue.push_back(predecessor);
            }
        }
    }
    coaccessible
}
