//! End-to-end synthesis scenarios exercising the NBAIC, UBTS/LDS and ICS
//! fixed points through the library façade.

use argus::fsm::parser::parse_fsm;
use argus::fsm::Fsm;
use argus::nbaic::Nbaic;
use argus::options::{Mode, MpoCondition};
use argus::property::IsProperty;
use argus::writer;
use argus::{build_nbaic, reduce_mpo, synthesize_supervisor, Synthesis};

fn plant(text: &str) -> Fsm {
    parse_fsm(text, "test.fsm").unwrap()
}

fn property(text: &str, fsm: &Fsm) -> IsProperty {
    IsProperty::parse(text, "test.isp", fsm).unwrap()
}

/// Builds the NBAIC in BSCOPNBMAX mode and runs the unfolding fixed point,
/// or returns `None` for the infeasible negative result.
fn synthesize(plant_text: &str, isp: &IsProperty) -> Option<(Fsm, Nbaic, Synthesis)> {
    let fsm = plant(plant_text);
    let nbaic = build_nbaic(&fsm, isp, Mode::Bscopnbmax);
    if nbaic.is_empty() {
        return None;
    }
    let synthesis = synthesize_supervisor(&nbaic, &fsm).unwrap();
    Some((fsm, nbaic, synthesis))
}

/// Every state of an automaton can reach a marked state.
fn all_coaccessible(fsm: &Fsm) -> bool {
    let n = fsm.num_states();
    let mut live = vec![false; n];
    for index in 0..n {
        live[index] = fsm.is_marked(index);
    }
    loop {
        let mut changed = false;
        for index in 0..n {
            if !live[index]
                && fsm
                    .transitions_from(index)
                    .iter()
                    .any(|&(_, target)| live[target])
            {
                live[index] = true;
                changed = true;
            }
        }
        if !changed {
            return live.into_iter().all(|alive| alive);
        }
    }
}

const SCENARIO_A: &str = "\
states x0 x1
marked x1
x0 sigma x1 o c
";

#[test]
fn scenario_single_controllable_event() {
    // (a): the supervisor enables sigma and the loop never unfolds
    let (_, nbaic, synthesis) = synthesize(SCENARIO_A, &IsProperty::Trivial).unwrap();
    assert!(!nbaic.is_empty());
    assert_eq!(synthesis.num_unfolds(), 0);
    let product = synthesis.product();
    assert_eq!(product.num_states(), 2);
    assert_eq!(product.state(0).name(), "<u0,x0>");
    assert!(product.state(1).is_marked());
    assert!(all_coaccessible(product));
}

#[test]
fn scenario_unobservable_event_folds_into_root() {
    // (b): sigma is unobservable, so the root label is the closure {x0, x1}
    let (fsm, nbaic, synthesis) = synthesize(
        "states x0 x1\nmarked x1\nx0 sigma x1 uo c\n",
        &IsProperty::Trivial,
    )
    .unwrap();
    assert_eq!(nbaic.y_label(0), &[0, 1]);
    assert_eq!(synthesis.num_unfolds(), 0);
    let product = synthesis.product();
    assert_eq!(product.num_states(), 2);
    assert_eq!(product.state(0).name(), "<u0,x0>");
    assert!(!product.state(0).is_marked());
    // the silent sigma step keeps the initial pair co-accessible
    assert!(all_coaccessible(product));
    assert_eq!(fsm.event(0).name(), "sigma");
}

#[test]
fn scenario_uncontrollable_event_into_forbidden_set() {
    // (c): b cannot be disabled and reaches the forbidden state, so no
    // supervisor exists
    let fsm = plant("states x0 x1 x2\nmarked x1\nx0 a x1 o c\nx0 b x2 o uc\n");
    let isp = property("safety\nx2\n", &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Bscopnbmax);
    assert!(nbaic.is_empty());
}

#[test]
fn scenario_controllable_variant_disables_into_forbidden_set() {
    // (c) with b controllable: the supervisor survives by disabling b
    let fsm = plant("states x0 x1 x2\nmarked x1\nx0 a x1 o c\nx0 b x2 o c\n");
    let isp = property("safety\nx2\n", &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Bscopnbmax);
    assert!(!nbaic.is_empty());
    let synthesis = synthesize_supervisor(&nbaic, &fsm).unwrap();
    let product = synthesis.product();
    // only the a-transition survives in the closed loop
    assert_eq!(product.num_states(), 2);
    assert_eq!(product.transitions_from(0).len(), 1);
    assert_eq!(product.event(0).name(), "a");
}

const SCENARIO_D: &str = "\
states x0 x1 x2
marked x1 x2
x0 a x1 o uc
x0 b x2 o uc
";

#[test]
fn scenario_mpo_min_observes_one_event() {
    // (d): distinguishing the successor classes requires observing a, and
    // observing a alone suffices; the minimal policy activates exactly it
    let fsm = plant(SCENARIO_D);
    let isp = property("disambiguation\nx0 x2\nx1\n", &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Mpo);
    assert!(!nbaic.is_empty());
    let reduced = reduce_mpo(nbaic, &fsm, MpoCondition::Min);
    assert!(!reduced.is_empty());
    let decisions: Vec<usize> = reduced.alive_decisions(0).collect();
    assert_eq!(decisions.len(), 1);
    let a = 0;
    assert_eq!(reduced.z_decision(decisions[0]), &[a]);
}

#[test]
fn scenario_mpo_max_respects_opacity() {
    // observing a would reveal the secret immediately; the maximal policy
    // activates b alone
    let fsm = plant(SCENARIO_D);
    let isp = property("opacity\nx1\n", &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Mpo);
    assert!(!nbaic.is_empty());
    let reduced = reduce_mpo(nbaic, &fsm, MpoCondition::Max);
    let decisions: Vec<usize> = reduced.alive_decisions(0).collect();
    assert_eq!(decisions.len(), 1);
    let b = 1;
    assert_eq!(reduced.z_decision(decisions[0]), &[b]);
}

/// Two independent copies of a plant whose committed decision cycles
/// silently forever: enabling the silent pair e1/e2 together with the
/// self-loop s beats the alternative that routes through t, so every plant
/// companion of the copied node starves until an unfold splices the
/// t-decision in. One copy sits behind f1, the other behind f2.
const SCENARIO_E: &str = "\
states R r0 c1 w1 w2 m r1 d1 v1 v2 n
marked m n
R f1 r0 o c
R f2 r1 o c
r0 e1 c1 uo c
c1 e2 r0 uo c
r0 s r0 o c
r0 t w1 o c
c1 t w2 o c
w1 g m o c
r1 e1 d1 uo c
d1 e2 r1 uo c
r1 s r1 o c
r1 t v1 o c
d1 t v2 o c
v1 g n o c
";

const SCENARIO_E_ISP: &str = "\
disambiguation
R r0 c1 w1 m r1 d1 v1 n
w2 v2
";

#[test]
fn scenario_two_unfolds() {
    // (e): each copy needs its own live decision string, so the outer loop
    // runs twice before the fixed point
    let fsm = plant(SCENARIO_E);
    let isp = property(SCENARIO_E_ISP, &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Bscopnbmax);
    assert!(!nbaic.is_empty());
    let synthesis = synthesize_supervisor(&nbaic, &fsm).unwrap();
    assert!(synthesis.num_unfolds() >= 2);
    assert!(all_coaccessible(synthesis.product()));
    // invariant: after the fixed point every representative node of the
    // unfolding keeps at least one co-accessible plant companion
    let ics = synthesis.ics();
    let ubts = synthesis.ubts();
    for u in ubts.attached_nodes() {
        if ubts.canonical(u) != u {
            continue;
        }
        let alive = (0..ics.num_pairs())
            .any(|index| ics.pair(index).0 == u && ics.is_coaccessible(index));
        assert!(alive, "node {} has no co-accessible companion", u);
    }
}

#[test]
fn scenario_infeasible_safety() {
    // (f): the forbidden set covers the whole reach of the initial state
    let fsm = plant(SCENARIO_A);
    let isp = property("safety\nx0 x1\n", &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Bscopnbmax);
    assert!(nbaic.is_empty());
    assert!(synthesize_supervisor(&nbaic, &fsm).is_err());
}

#[test]
fn full_observation_full_control_supervisor() {
    // with everything observable and controllable the supervisor is the
    // controllable full-observation one: it cuts the blocking branch
    let (_, _, synthesis) = synthesize(
        "states x0 x1 x2\nmarked x1\nx0 a x1 o c\nx1 b x2 o c\n",
        &IsProperty::Trivial,
    )
    .unwrap();
    let product = synthesis.product();
    assert_eq!(product.num_states(), 2);
    assert!(all_coaccessible(product));
}

#[test]
fn all_events_unobservable_single_y_state() {
    // boundary: with no observable event the NBAIC has a single Y-state
    let (_, nbaic, synthesis) = synthesize(
        "states x0 x1 x2\nmarked x2\nx0 u x1 uo c\nx1 v x2 uo c\n",
        &IsProperty::Trivial,
    )
    .unwrap();
    let alive: Vec<usize> = (0..nbaic.num_y_nodes())
        .filter(|&y| nbaic.is_y_alive(y))
        .collect();
    assert_eq!(alive, vec![0]);
    assert_eq!(nbaic.y_label(0), &[0, 1, 2]);
    assert_eq!(synthesis.num_unfolds(), 0);
}

#[test]
fn empty_marked_set_is_infeasible() {
    let fsm = plant("states x0 x1\nx0 sigma x1 o c\n");
    let nbaic = build_nbaic(&fsm, &IsProperty::Trivial, Mode::Bscopnbmax);
    assert!(nbaic.is_empty());
}

#[test]
fn cyclic_plant_loops_through_the_ancestor_copy() {
    // the repeat leaf folds onto its ancestor, so the product is a loop
    // rather than a halting tree
    let (_, _, synthesis) = synthesize(
        "states x0 x1\nmarked x1\nx0 a x1 o c\nx1 b x0 o c\n",
        &IsProperty::Trivial,
    )
    .unwrap();
    assert_eq!(synthesis.num_unfolds(), 0);
    let product = synthesis.product();
    assert_eq!(product.num_states(), 2);
    // both the a- and the looping b-transition survive
    let total: usize = (0..product.num_states())
        .map(|s| product.transitions_from(s).len())
        .sum();
    assert_eq!(total, 2);
    assert!(all_coaccessible(product));
}

#[test]
fn deterministic_outputs() {
    // two runs over identical inputs emit byte-identical artifacts
    let emit = || {
        let fsm = plant(SCENARIO_E);
        let isp = property(SCENARIO_E_ISP, &fsm);
        let nbaic = build_nbaic(&fsm, &isp, Mode::Bscopnbmax);
        let synthesis = synthesize_supervisor(&nbaic, &fsm).unwrap();
        let mut buffer = Vec::new();
        writer::write_nbaic(&nbaic, &fsm, &mut buffer).unwrap();
        writer::write_ubts(synthesis.ubts(), &nbaic, &fsm, true, &mut buffer).unwrap();
        writer::write_ics(synthesis.ics(), &fsm, &mut buffer).unwrap();
        writer::write_fsm(synthesis.product(), &mut buffer).unwrap();
        buffer
    };
    assert_eq!(emit(), emit());
}

#[test]
fn enabled_events_never_shrink_across_unfolds() {
    // monotonicity: the events enabled at the root before the fixed point
    // are still enabled afterwards
    let fsm = plant(SCENARIO_E);
    let isp = property(SCENARIO_E_ISP, &fsm);
    let nbaic = build_nbaic(&fsm, &isp, Mode::Bscopnbmax);
    let synthesis = synthesize_supervisor(&nbaic, &fsm).unwrap();
    let ubts = synthesis.ubts();
    // the committed maximal decision at the root is still among the root's
    // decisions, possibly joined by spliced alternatives
    let committed: Vec<usize> = ubts
        .decisions(ubts.root())
        .iter()
        .map(|&uz| ubts.decision_state(uz))
        .collect();
    assert!(!committed.is_empty());
    for u in ubts.attached_nodes() {
        if ubts.canonical(u) == u {
            assert!(!ubts.decisions(u).is_empty(), "undecided representative");
        }
    }
}
