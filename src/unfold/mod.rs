//! The unfolded bipartite transition system.
//!
//! The UBTS unfolds the NBAIC into a tree: every Y-node carries the NBAIC
//! Y-state it copies plus the history of observed events that reached it, so
//! identical information states at different histories stay distinct and no
//! loops are formed. Expansion commits one decision per fresh leaf, the
//! maximal surviving decision of its NBAIC state; a leaf whose information
//! state already occurred on its branch is left undecided and is identified
//! with that ancestor when the tree is projected onto the plant. Augmenting
//! splices a live decision string below an entrance state; storage is
//! append-only and only decision links are ever edited.

pub mod lds;

use log::{debug, info};

use crate::error::SynthesisError;
use crate::fsm::EventIndex;
use crate::nbaic::{Nbaic, YIndex, ZIndex, ROOT};
use crate::unfold::lds::Lds;

pub type UyIndex = usize;
pub type UzIndex = usize;

#[derive(Debug)]
struct UbtsYNode {
    nbaic_y: YIndex,
    history: Vec<EventIndex>,
    parent: Option<UzIndex>,
    decisions: Vec<UzIndex>,
}

#[derive(Debug)]
struct UbtsZNode {
    nbaic_z: ZIndex,
    parent: UyIndex,
    children: Vec<(EventIndex, UyIndex)>,
}

/// The unfolding. Y-node 0 is the root copy of the NBAIC root.
#[derive(Debug)]
pub struct Ubts {
    y_nodes: Vec<UbtsYNode>,
    z_nodes: Vec<UbtsZNode>,
    entrances: Vec<UyIndex>,
}

impl Ubts {
    pub fn new(nbaic: &Nbaic) -> Self {
        debug_assert!(!nbaic.is_empty());
        Self {
            y_nodes: vec![UbtsYNode {
                nbaic_y: ROOT,
                history: Vec::new(),
                parent: None,
                decisions: Vec::new(),
            }],
            z_nodes: Vec::new(),
            entrances: Vec::new(),
        }
    }

    pub fn root(&self) -> UyIndex {
        0
    }

    pub fn num_y_nodes(&self) -> usize {
        self.y_nodes.len()
    }

    pub fn nbaic_state(&self, u: UyIndex) -> YIndex {
        self.y_nodes[u].nbaic_y
    }

    pub fn history(&self, u: UyIndex) -> &[EventIndex] {
        &self.y_nodes[u].history
    }

    pub fn decisions(&self, u: UyIndex) -> &[UzIndex] {
        &self.y_nodes[u].decisions
    }

    pub fn is_decided(&self, u: UyIndex) -> bool {
        !self.y_nodes[u].decisions.is_empty()
    }

    pub fn decision_state(&self, uz: UzIndex) -> ZIndex {
        self.z_nodes[uz].nbaic_z
    }

    pub fn children(&self, uz: UzIndex) -> &[(EventIndex, UyIndex)] {
        &self.z_nodes[uz].children
    }

    pub fn entrances(&self) -> &[UyIndex] {
        &self.entrances
    }

    pub(crate) fn mark_entrance(&mut self, u: UyIndex) {
        self.entrances.push(u);
    }

    /// The Y-nodes reachable from the root along committed decisions, in
    /// breadth-first order. Subtrees detached by augmentation stay in the
    /// arena but are no longer attached.
    pub fn attached_nodes(&self) -> Vec<UyIndex> {
        let mut nodes = vec![self.root()];
        let mut index = 0;
        while index < nodes.len() {
            for &uz in &self.y_nodes[nodes[index]].decisions {
                for &(_, child) in &self.z_nodes[uz].children {
                    nodes.push(child);
                }
            }
            index += 1;
        }
        nodes
    }

    /// Whether the information state of a node already occurs on the branch
    /// from the root to its parent.
    fn is_repeat(&self, u: UyIndex) -> bool {
        let state = self.y_nodes[u].nbaic_y;
        let mut current = u;
        while let Some(parent_z) = self.y_nodes[current].parent {
            current = self.z_nodes[parent_z].parent;
            if self.y_nodes[current].nbaic_y == state {
                return true;
            }
        }
        false
    }

    /// The node an undecided repeat leaf is identified with: its nearest
    /// ancestor carrying the same information state. Decided nodes are their
    /// own representative.
    pub fn canonical(&self, u: UyIndex) -> UyIndex {
        if self.is_decided(u) {
            return u;
        }
        let state = self.y_nodes[u].nbaic_y;
        let mut current = u;
        while let Some(parent_z) = self.y_nodes[current].parent {
            current = self.z_nodes[parent_z].parent;
            if self.y_nodes[current].nbaic_y == state {
                return current;
            }
        }
        u
    }

    /// Expands every fresh leaf: commits the maximal surviving decision and
    /// attaches its successor copies, leaving repeat leaves undecided. Runs
    /// until the frontier consists of repeat leaves only.
    pub fn expand(&mut self, nbaic: &Nbaic) {
        let mut u = 0;
        while u < self.y_nodes.len() {
            if !self.is_decided(u) && !self.is_repeat(u) {
                let decision = nbaic
                    .maximal_decision(self.y_nodes[u].nbaic_y)
                    .expect("surviving Y-state without decision");
                self.attach_decision(nbaic, u, decision);
            }
            u += 1;
        }
        debug!(
            "expanded UBTS to {} Y-nodes and {} Z-nodes",
            self.y_nodes.len(),
            self.z_nodes.len()
        );
    }

    /// Attaches a decision below a Y-node together with one fresh Y-child
    /// per observable successor.
    fn attach_decision(&mut self, nbaic: &Nbaic, u: UyIndex, z: ZIndex) -> UzIndex {
        let uz = self.z_nodes.len();
        let mut children = Vec::new();
        for &(event, successor) in nbaic.z_successors(z) {
            let child = self.y_nodes.len();
            let mut history = self.y_nodes[u].history.clone();
            history.push(event);
            self.y_nodes.push(UbtsYNode {
                nbaic_y: successor,
                history,
                parent: Some(uz),
                decisions: Vec::new(),
            });
            children.push((event, child));
        }
        self.z_nodes.push(UbtsZNode {
            nbaic_z: z,
            parent: u,
            children,
        });
        self.y_nodes[u].decisions.push(uz);
        uz
    }

    /// Splices a live decision string beneath its entrance node. A decision
    /// that strictly contains a previously committed one replaces it and the
    /// dominated subtree is detached; incomparable decisions attach
    /// alongside, so the enabled event set of a node never shrinks.
    pub fn augment(&mut self, nbaic: &Nbaic, lds: &Lds) -> Result<(), SynthesisError> {
        let entrance = lds.entrance();
        if self.y_nodes[entrance].nbaic_y != lds.source() {
            return Err(SynthesisError::InternalInvariantViolation(format!(
                "decision string head Y{} does not match entrance state of node {}",
                lds.source(),
                entrance
            )));
        }
        info!(
            "augmenting entrance node {} with a decision string of length {}",
            entrance,
            lds.decisions().len()
        );

        let mut current = entrance;
        for (position, &z) in lds.decisions().iter().enumerate() {
            let existing = self.y_nodes[current]
                .decisions
                .iter()
                .copied()
                .find(|&uz| self.z_nodes[uz].nbaic_z == z);
            let uz = match existing {
                Some(existing) => existing,
                None => {
                    self.remove_dominated(nbaic, current, z);
                    self.attach_decision(nbaic, current, z)
                }
            };
            if let Some(&event) = lds.events().get(position) {
                current = self
                    .z_nodes[uz]
                    .children
                    .iter()
                    .find(|&&(e, _)| e == event)
                    .map(|&(_, child)| child)
                    .ok_or_else(|| {
                        SynthesisError::InternalInvariantViolation(format!(
                            "decision string steps on an event without successor at node {}",
                            current
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Detaches committed decisions strictly contained in the incoming one.
    fn remove_dominated(&mut self, nbaic: &Nbaic, u: UyIndex, z: ZIndex) {
        let incoming = nbaic.z_decision(z);
        let dominated: Vec<UzIndex> = self.y_nodes[u]
            .decisions
            .iter()
            .copied()
            .filter(|&uz| {
                let committed = nbaic.z_decision(self.z_nodes[uz].nbaic_z);
                committed.len() < incoming.len()
                    && committed.iter().all(|event| incoming.contains(event))
            })
            .collect();
        for uz in dominated {
            debug!(
                "decision {:?} at node {} dominated by {:?}",
                nbaic.z_decision(self.z_nodes[uz].nbaic_z),
                u,
                incoming
            );
            self.y_nodes[u].decisions.retain(|&kept| kept != uz);
        }
    }
}
