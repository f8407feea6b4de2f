//! Live decision strings.
//!
//! A live decision string is a witness Z₁, σ₁, Z₂, σ₂, …, Zₙ through the
//! NBAIC fabric from an entrance state to a marked state. The search runs a
//! breadth-first traversal over pairs of an NBAIC Y-state and one plant
//! state, trying decisions largest-first; a found witness is then widened so
//! that every decision is set-wise maximal among those preserving the
//! remaining continuation. Ties are broken by the lexicographic order of the
//! event sequences throughout.

use std::collections::{HashMap, HashSet, VecDeque};

use fixedbitset::FixedBitSet;
use log::debug;

use crate::fsm::{EventIndex, Fsm, StateIndex};
use crate::nbaic::{Nbaic, YIndex, ZIndex};
use crate::unfold::{Ubts, UyIndex};

type Pair = (YIndex, StateIndex);

/// A computed decision string, rooted at an entrance node of the unfolding.
#[derive(Debug)]
pub struct Lds {
    entrance: UyIndex,
    source: YIndex,
    decisions: Vec<ZIndex>,
    events: Vec<EventIndex>,
}

impl Lds {
    pub(crate) fn entrance(&self) -> UyIndex {
        self.entrance
    }

    pub(crate) fn source(&self) -> YIndex {
        self.source
    }

    pub(crate) fn decisions(&self) -> &[ZIndex] {
        &self.decisions
    }

    pub(crate) fn events(&self) -> &[EventIndex] {
        &self.events
    }

    /// Computes the maximal live decision string from an entrance node, or
    /// `None` if no continuation reaches a marked state.
    pub fn compute_maximal(
        nbaic: &Nbaic,
        fsm: &Fsm,
        ubts: &Ubts,
        entrance: UyIndex,
    ) -> Option<Lds> {
        let source = ubts.nbaic_state(entrance);

        let mut queue: VecDeque<Pair> = VecDeque::new();
        let mut visited: HashSet<Pair> = HashSet::new();
        let mut parent: HashMap<Pair, (Pair, ZIndex, EventIndex)> = HashMap::new();
        for &x in nbaic.y_label(source) {
            let pair = (source, x);
            visited.insert(pair);
            queue.push_back(pair);
        }

        let mut terminal: Option<(Pair, ZIndex)> = None;
        'search: while let Some(pair) = queue.pop_front() {
            let (y, x) = pair;
            let decisions = nbaic.decisions_largest_first(y);
            let closures: Vec<Vec<StateIndex>> = decisions
                .iter()
                .map(|&z| silent_closure(nbaic, fsm, y, z, x))
                .collect();

            for (&z, closure) in decisions.iter().zip(closures.iter()) {
                if closure.iter().any(|&c| fsm.is_marked(c)) {
                    terminal = Some((pair, z));
                    break 'search;
                }
            }
            for (&z, closure) in decisions.iter().zip(closures.iter()) {
                for &(event, successor) in nbaic.z_successors(z) {
                    for &c in closure {
                        let Some(target) = fsm.step(c, event) else {
                            continue;
                        };
                        if nbaic.y_label(successor).binary_search(&target).is_err() {
                            continue;
                        }
                        let next = (successor, target);
                        if visited.insert(next) {
                            parent.insert(next, (pair, z, event));
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        let (terminal_pair, final_decision) = terminal?;
        let mut lds = reconstruct(entrance, source, &parent, terminal_pair, final_decision);
        widen(nbaic, fsm, &parent, terminal_pair, &mut lds);
        debug!(
            "live decision string of length {} from Y{}",
            lds.decisions.len(),
            source
        );
        Some(lds)
    }
}

/// The silent closure of one plant state under a decision, confined to the
/// label of the Y-state.
fn silent_closure(
    nbaic: &Nbaic,
    fsm: &Fsm,
    y: YIndex,
    z: ZIndex,
    x: StateIndex,
) -> Vec<StateIndex> {
    let label = nbaic.y_label(y);
    let mut reach = FixedBitSet::with_capacity(fsm.num_states());
    let mut frontier = vec![x];
    reach.insert(x);
    while let Some(state) = frontier.pop() {
        for event in nbaic.z_silent(z).ones() {
            if let Some(target) = fsm.step(state, event) {
                if !reach.contains(target) && label.binary_search(&target).is_ok() {
                    reach.insert(target);
                    frontier.push(target);
                }
            }
        }
    }
    reach.ones().collect()
}

/// Rebuilds the alternating string from the breadth-first parent links.
fn reconstruct(
    entrance: UyIndex,
    source: YIndex,
    parent: &HashMap<Pair, (Pair, ZIndex, EventIndex)>,
    terminal: Pair,
    final_decision: ZIndex,
) -> Lds {
    let mut decisions = vec![final_decision];
    let mut events = Vec::new();
    let mut current = terminal;
    while let Some(&(previous, z, event)) = parent.get(&current) {
        decisions.push(z);
        events.push(event);
        current = previous;
    }
    decisions.reverse();
    events.reverse();
    Lds {
        entrance,
        source,
        decisions,
        events,
    }
}

/// Widens every decision of the string to the largest surviving superset
/// that preserves the remaining continuation verbatim.
fn widen(
    nbaic: &Nbaic,
    fsm: &Fsm,
    parent: &HashMap<Pair, (Pair, ZIndex, EventIndex)>,
    terminal: Pair,
    lds: &mut Lds,
) {
    // recover the pair path to know the plant copy at every position
    let mut pairs = vec![terminal];
    let mut current = terminal;
    while let Some(&(previous, _, _)) = parent.get(&current) {
        pairs.push(previous);
        current = previous;
    }
    pairs.reverse();
    debug_assert_eq!(pairs.len(), lds.decisions.len());

    for position in 0..lds.decisions.len() {
        let (y, x) = pairs[position];
        let committed = lds.decisions[position];
        let last = position + 1 == lds.decisions.len();
        for candidate in nbaic.decisions_largest_first(y) {
            if !strictly_contains(nbaic.z_decision(candidate), nbaic.z_decision(committed)) {
                continue;
            }
            let closure = silent_closure(nbaic, fsm, y, candidate, x);
            let preserves = if last {
                closure.iter().any(|&c| fsm.is_marked(c))
            } else {
                let event = lds.events[position];
                let (successor, target) = pairs[position + 1];
                nbaic.z_successor_on(candidate, event) == Some(successor)
                    && closure
                        .iter()
                        .any(|&c| fsm.step(c, event) == Some(target))
            };
            if preserves {
                lds.decisions[position] = candidate;
                break;
            }
        }
    }
}

fn strictly_contains(larger: &[EventIndex], smaller: &[EventIndex]) -> bool {
    larger.len() > smaller.len() && smaller.iter().all(|event| larger.contains(event))
}
