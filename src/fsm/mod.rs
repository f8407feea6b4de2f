//! Finite-state machine model of the plant.
//!
//! The plant is a deterministic automaton over an alphabet of events that
//! carry two independent attributes: *observable* and *controllable*. States
//! and events live in arenas and are referenced by index everywhere else.

pub mod parser;

use std::collections::HashMap;
use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::error::SynthesisError;

pub type StateIndex = usize;
pub type EventIndex = usize;

/// An event of the plant alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: String,
    observable: bool,
    controllable: bool,
}

impl Event {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_observable(&self) -> bool {
        self.observable
    }

    pub fn is_controllable(&self) -> bool {
        self.controllable
    }
}

/// A plant state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
    marked: bool,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

/// The plant automaton ⟨States, Events, δ, x0, Xm⟩.
///
/// δ is deterministic and partial; transitions are stored per source state in
/// declaration order so that every enumeration over the model is stable.
#[derive(Debug, Clone)]
pub struct Fsm {
    states: Vec<State>,
    events: Vec<Event>,
    transitions: Vec<Vec<(EventIndex, StateIndex)>>,
    state_mapping: HashMap<String, StateIndex>,
    event_mapping: HashMap<String, EventIndex>,
}

impl Fsm {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            events: Vec::new(),
            transitions: Vec::new(),
            state_mapping: HashMap::new(),
            event_mapping: HashMap::new(),
        }
    }

    /// Adds a state, reusing the existing index if the name is known.
    pub fn add_state(&mut self, name: &str, marked: bool) -> StateIndex {
        match self.state_mapping.get(name) {
            Some(&index) => {
                if marked {
                    self.states[index].marked = true;
                }
                index
            }
            None => {
                let index = self.states.len();
                self.states.push(State {
                    name: name.to_owned(),
                    marked,
                });
                self.transitions.push(Vec::new());
                self.state_mapping.insert(name.to_owned(), index);
                index
            }
        }
    }

    /// Adds an event, checking that repeated declarations agree on the
    /// observation and control attributes.
    pub fn add_event(
        &mut self,
        name: &str,
        observable: bool,
        controllable: bool,
    ) -> Result<EventIndex, SynthesisError> {
        match self.event_mapping.get(name) {
            Some(&index) => {
                let event = &self.events[index];
                if event.observable != observable || event.controllable != controllable {
                    return Err(SynthesisError::InconsistentModel(format!(
                        "event '{}' declared with conflicting attributes",
                        name
                    )));
                }
                Ok(index)
            }
            None => {
                let index = self.events.len();
                self.events.push(Event {
                    name: name.to_owned(),
                    observable,
                    controllable,
                });
                self.event_mapping.insert(name.to_owned(), index);
                Ok(index)
            }
        }
    }

    /// Adds the transition δ(source, event) = target.
    pub fn add_transition(
        &mut self,
        source: StateIndex,
        event: EventIndex,
        target: StateIndex,
    ) -> Result<(), SynthesisError> {
        if self.transitions[source].iter().any(|&(e, _)| e == event) {
            return Err(SynthesisError::InconsistentModel(format!(
                "state '{}' has two transitions on event '{}'",
                self.states[source].name, self.events[event].name
            )));
        }
        self.transitions[source].push((event, target));
        Ok(())
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    /// The unique initial state, implicit as the first declared state.
    pub fn initial_state(&self) -> StateIndex {
        0
    }

    pub fn state(&self, index: StateIndex) -> &State {
        &self.states[index]
    }

    pub fn event(&self, index: EventIndex) -> &Event {
        &self.events[index]
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn state_index(&self, name: &str) -> Option<StateIndex> {
        self.state_mapping.get(name).copied()
    }

    /// δ(x, σ), if defined.
    pub fn step(&self, state: StateIndex, event: EventIndex) -> Option<StateIndex> {
        self.transitions[state]
            .iter()
            .find(|&&(e, _)| e == event)
            .map(|&(_, target)| target)
    }

    pub fn transitions_from(&self, state: StateIndex) -> &[(EventIndex, StateIndex)] {
        &self.transitions[state]
    }

    pub fn is_marked(&self, state: StateIndex) -> bool {
        self.states[state].marked
    }

    pub fn has_marked_state(&self) -> bool {
        self.states.iter().any(|s| s.marked)
    }

    /// The statically unobservable part of the alphabet as an event set.
    pub fn unobservable_events(&self) -> FixedBitSet {
        let mut set = FixedBitSet::with_capacity(self.events.len());
        for (index, event) in self.events.iter().enumerate() {
            if !event.observable {
                set.insert(index);
            }
        }
        set
    }

    /// The unobservable closure UR(S) with respect to a set of silent
    /// events: the least superset of `seed` closed under δ(·, σ) for every
    /// σ in `silent`. Computed by frontier expansion; the result is sorted.
    pub fn unobservable_reach(&self, seed: &[StateIndex], silent: &FixedBitSet) -> Vec<StateIndex> {
        let mut reach = FixedBitSet::with_capacity(self.states.len());
        let mut frontier = VecDeque::with_capacity(seed.len());
        for &state in seed {
            if !reach.contains(state) {
                reach.insert(state);
                frontier.push_back(state);
            }
        }
        while let Some(state) = frontier.pop_front() {
            for &(event, target) in &self.transitions[state] {
                if silent.contains(event) && !reach.contains(target) {
                    reach.insert(target);
                    frontier.push_back(target);
                }
            }
        }
        reach.ones().collect()
    }

    /// UR(S) under the static observation mask.
    pub fn static_reach(&self, seed: &[StateIndex]) -> Vec<StateIndex> {
        self.unobservable_reach(seed, &self.unobservable_events())
    }
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_plant() -> Fsm {
        let mut fsm = Fsm::new();
        let x0 = fsm.add_state("x0", false);
        let x1 = fsm.add_state("x1", true);
        let sigma = fsm.add_event("sigma", false, true).unwrap();
        fsm.add_transition(x0, sigma, x1).unwrap();
        fsm
    }

    #[test]
    fn test_state_and_event_arenas() {
        let fsm = two_state_plant();
        assert_eq!(fsm.num_states(), 2);
        assert_eq!(fsm.num_events(), 1);
        assert_eq!(fsm.initial_state(), 0);
        assert!(fsm.is_marked(1));
        assert!(!fsm.is_marked(0));
        assert_eq!(fsm.state_index("x1"), Some(1));
        assert_eq!(fsm.step(0, 0), Some(1));
        assert_eq!(fsm.step(1, 0), None);
    }

    #[test]
    fn test_conflicting_event_attributes() {
        let mut fsm = Fsm::new();
        fsm.add_event("a", true, true).unwrap();
        assert!(fsm.add_event("a", false, true).is_err());
        assert!(fsm.add_event("a", true, true).is_ok());
    }

    #[test]
    fn test_duplicate_transition() {
        let mut fsm = Fsm::new();
        let x0 = fsm.add_state("x0", false);
        let x1 = fsm.add_state("x1", false);
        let a = fsm.add_event("a", true, true).unwrap();
        fsm.add_transition(x0, a, x1).unwrap();
        assert!(fsm.add_transition(x0, a, x0).is_err());
    }

    #[test]
    fn test_unobservable_reach() {
        let fsm = two_state_plant();
        assert_eq!(fsm.static_reach(&[0]), vec![0, 1]);
        assert_eq!(fsm.static_reach(&[1]), vec![1]);
        // with the event masked as observed, the closure is the seed itself
        let silent = FixedBitSet::with_capacity(1);
        assert_eq!(fsm.unobservable_reach(&[0], &silent), vec![0]);
    }

    #[test]
    fn test_reach_terminates_on_cycles() {
        let mut fsm = Fsm::new();
        let x0 = fsm.add_state("x0", false);
        let x1 = fsm.add_state("x1", false);
        let u = fsm.add_event("u", false, false).unwrap();
        let v = fsm.add_event("v", false, false).unwrap();
        fsm.add_transition(x0, u, x1).unwrap();
        fsm.add_transition(x1, v, x0).unwrap();
        assert_eq!(fsm.static_reach(&[0]), vec![0, 1]);
    }
}
