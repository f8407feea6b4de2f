//! Pair-level liveness for the non-blocking prune.
//!
//! A pair couples a surviving decision with one plant state of its estimate.
//! A pair is live when the plant copy can complete to a marked state: it is
//! marked already, a silent step under the decision stays inside the
//! estimate and reaches a live pair, or an observed step hands the copy to a
//! successor Y-state where some surviving decision continues live. The least
//! fixed point is computed by iteration to stability; all enumerations
//! follow arena order.

use fixedbitset::FixedBitSet;

use super::{Nbaic, ZIndex};
use crate::fsm::{Fsm, StateIndex};

/// Computes one bit set per Z-node, indexed like its estimate.
pub(super) fn live_pairs(nbaic: &Nbaic, fsm: &Fsm) -> Vec<FixedBitSet> {
    let mut live: Vec<FixedBitSet> = nbaic
        .z_nodes
        .iter()
        .map(|z| FixedBitSet::with_capacity(z.estimate.len()))
        .collect();

    loop {
        let mut changed = false;
        for z in 0..nbaic.z_nodes.len() {
            if !nbaic.z_alive.contains(z) {
                continue;
            }
            let node = &nbaic.z_nodes[z];
            for (position, &x) in node.estimate.iter().enumerate() {
                if live[z].contains(position) {
                    continue;
                }
                if pair_is_live(nbaic, fsm, &live, z, x) {
                    live[z].insert(position);
                    changed = true;
                }
            }
        }
        if !changed {
            return live;
        }
    }
}

fn pair_is_live(
    nbaic: &Nbaic,
    fsm: &Fsm,
    live: &[FixedBitSet],
    z: ZIndex,
    x: StateIndex,
) -> bool {
    if fsm.is_marked(x) {
        return true;
    }
    let node = &nbaic.z_nodes[z];
    // silent step inside the estimate
    for event in node.silent.ones() {
        if let Some(target) = fsm.step(x, event) {
            if let Ok(position) = node.estimate.binary_search(&target) {
                if live[z].contains(position) {
                    return true;
                }
            }
        }
    }
    // observed step into a successor Y-state
    for &(event, successor) in &node.successors {
        if let Some(target) = fsm.step(x, event) {
            for next in nbaic.alive_decisions(successor) {
                if let Ok(position) = nbaic.z_nodes[next].estimate.binary_search(&target) {
                    if live[next].contains(position) {
                        return true;
                    }
                }
            }
        }
    }
    false
}
