//! Argus library crate for the synthesis of supervisors and sensor
//! activation policies for partially observed discrete-event systems.
//!
//! The entry points mirror the two synthesis problems: [`build_nbaic`]
//! constructs and prunes the bipartite controller/observer structure for
//! either mode, [`synthesize_supervisor`] runs the unfolding fixed point of
//! the BSCOPNBMAX flow, and [`reduce_mpo`] extracts an activation policy
//! from an NBAIC built in MPO mode.

pub mod error;
pub mod fsm;
pub mod ics;
pub mod nbaic;
pub mod options;
pub mod property;
pub mod unfold;
pub mod writer;

use std::fmt::{self, Display};

use log::{debug, info};

use error::SynthesisError;
use fsm::Fsm;
use ics::Ics;
use nbaic::Nbaic;
use options::{Mode, MpoCondition};
use property::IsProperty;
use unfold::lds::Lds;
use unfold::Ubts;

/// The feasibility status of a synthesis run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    /// A supervisor respectively activation policy exists.
    Feasible,
    /// The pruned NBAIC is empty: a valid negative result.
    Infeasible,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Feasible => "FEASIBLE",
                Self::Infeasible => "INFEASIBLE",
            }
        )
    }
}

/// Builds the NBAIC for a plant and property in the given mode and prunes
/// it to its non-blocking greatest fixed point.
pub fn build_nbaic(fsm: &Fsm, isp: &IsProperty, mode: Mode) -> Nbaic {
    Nbaic::build(fsm, isp, mode)
}

/// The result of the supervisor synthesis fixed point.
pub struct Synthesis {
    ubts: Ubts,
    ics: Ics,
    product: Fsm,
    num_unfolds: usize,
}

impl Synthesis {
    pub fn ubts(&self) -> &Ubts {
        &self.ubts
    }

    pub fn ics(&self) -> &Ics {
        &self.ics
    }

    /// The product automaton A_UxG.
    pub fn product(&self) -> &Fsm {
        &self.product
    }

    /// The number of iterations of the unfolding loop.
    pub fn num_unfolds(&self) -> usize {
        self.num_unfolds
    }
}

/// Synthesizes the non-blocking maximally permissive supervisor from a
/// non-empty NBAIC: unfolds it, then alternates entrance-state lookup, live
/// decision string computation, augmentation and re-expansion until every
/// node of the unfolding has a co-accessible plant companion.
///
/// # Errors
///
/// Returns [`SynthesisError::InternalInvariantViolation`] when called on an
/// empty NBAIC or when an entrance state admits no live decision string;
/// both indicate a bug in the construction, not a property of the input.
pub fn synthesize_supervisor(nbaic: &Nbaic, fsm: &Fsm) -> Result<Synthesis, SynthesisError> {
    if nbaic.is_empty() {
        return Err(SynthesisError::InternalInvariantViolation(
            "supervisor synthesis from an empty NBAIC".to_owned(),
        ));
    }

    let mut ubts = Ubts::new(nbaic);
    ubts.expand(nbaic);
    let mut ics = Ics::new(&ubts, nbaic, fsm);

    let mut num_unfolds = 0;
    while let Some(entrance) = ics.get_entrance_state(&ubts) {
        debug!("iteration {}: entrance state at node {}", num_unfolds, entrance);
        ubts.mark_entrance(entrance);
        let lds = Lds::compute_maximal(nbaic, fsm, &ubts, entrance).ok_or_else(|| {
            SynthesisError::InternalInvariantViolation(format!(
                "entrance node {} admits no live decision string",
                entrance
            ))
        })?;
        ubts.augment(nbaic, &lds)?;
        ubts.expand(nbaic);
        ics = Ics::new(&ubts, nbaic, fsm);
        num_unfolds += 1;
    }
    info!("unfolding fixed point reached after {} unfolds", num_unfolds);

    let product = ics.product(fsm);
    Ok(Synthesis {
        ubts,
        ics,
        product,
        num_unfolds,
    })
}

/// Reduces an NBAIC built in MPO mode to a deterministic activation policy
/// under the given condition.
pub fn reduce_mpo(mut nbaic: Nbaic, fsm: &Fsm, condition: MpoCondition) -> Nbaic {
    nbaic.reduce_mpo(fsm, condition);
    nbaic
}
