//! Writers for the synthesis artifacts.
//!
//! Every writer emits onto a caller-supplied sink; the core performs no
//! filesystem access of its own. The bipartite structures are written in the
//! `.fsm` dialect with decision links as auxiliary unobservable events, so
//! every emitted file parses back with the plant parser.

use std::io::{self, Write};

use crate::fsm::Fsm;
use crate::ics::Ics;
use crate::nbaic::{Nbaic, YIndex, ZIndex};
use crate::unfold::{Ubts, UyIndex, UzIndex};

/// Writes a plant in the `.fsm` machine dialect.
pub fn write_fsm<W: Write>(fsm: &Fsm, mut writer: W) -> io::Result<()> {
    write!(writer, "states")?;
    for state in fsm.states() {
        write!(writer, " {}", state.name())?;
    }
    writeln!(writer)?;
    let marked: Vec<&str> = fsm
        .states()
        .filter(|s| s.is_marked())
        .map(|s| s.name())
        .collect();
    if !marked.is_empty() {
        writeln!(writer, "marked {}", marked.join(" "))?;
    }
    for index in 0..fsm.num_states() {
        for &(event, target) in fsm.transitions_from(index) {
            let event = fsm.event(event);
            writeln!(
                writer,
                "{} {} {} {} {}",
                fsm.state(index).name(),
                event.name(),
                fsm.state(target).name(),
                if event.is_observable() { "o" } else { "uo" },
                if event.is_controllable() { "c" } else { "uc" },
            )?;
        }
    }
    Ok(())
}

/// Writes a plant in the `.txt` pretty dialect.
pub fn write_txt<W: Write>(fsm: &Fsm, mut writer: W) -> io::Result<()> {
    for index in 0..fsm.num_states() {
        let state = fsm.state(index);
        if state.is_marked() {
            writeln!(writer, "state {} marked", state.name())?;
        } else {
            writeln!(writer, "state {}", state.name())?;
        }
        for &(event, target) in fsm.transitions_from(index) {
            let event = fsm.event(event);
            writeln!(
                writer,
                "  {} -> {} ({}, {})",
                event.name(),
                fsm.state(target).name(),
                if event.is_observable() { "o" } else { "uo" },
                if event.is_controllable() { "c" } else { "uc" },
            )?;
        }
    }
    Ok(())
}

fn y_name(nbaic: &Nbaic, fsm: &Fsm, y: YIndex) -> String {
    let label: Vec<&str> = nbaic
        .y_label(y)
        .iter()
        .map(|&x| fsm.state(x).name())
        .collect();
    format!("Y{}={{{}}}", y, label.join("."))
}

fn z_name(nbaic: &Nbaic, fsm: &Fsm, z: ZIndex) -> String {
    let decision: Vec<&str> = nbaic
        .z_decision(z)
        .iter()
        .map(|&e| fsm.event(e).name())
        .collect();
    format!("Z{}={{{}}}", z, decision.join("."))
}

/// Writes the surviving part of an NBAIC. Decision links appear as
/// auxiliary unobservable events `d<index>`.
pub fn write_nbaic<W: Write>(nbaic: &Nbaic, fsm: &Fsm, mut writer: W) -> io::Result<()> {
    if nbaic.is_empty() {
        writeln!(writer, "# empty")?;
        return Ok(());
    }
    write!(writer, "states")?;
    for y in 0..nbaic.num_y_nodes() {
        if nbaic.is_y_alive(y) {
            write!(writer, " {}", y_name(nbaic, fsm, y))?;
            for z in nbaic.alive_decisions(y) {
                write!(writer, " {}", z_name(nbaic, fsm, z))?;
            }
        }
    }
    writeln!(writer)?;
    let marked: Vec<String> = (0..nbaic.num_y_nodes())
        .filter(|&y| nbaic.is_y_alive(y) && nbaic.y_contains_marked(fsm, y))
        .map(|y| y_name(nbaic, fsm, y))
        .collect();
    if !marked.is_empty() {
        writeln!(writer, "marked {}", marked.join(" "))?;
    }
    for y in 0..nbaic.num_y_nodes() {
        if !nbaic.is_y_alive(y) {
            continue;
        }
        for z in nbaic.alive_decisions(y) {
            writeln!(
                writer,
                "{} d{} {} uo c",
                y_name(nbaic, fsm, y),
                z,
                z_name(nbaic, fsm, z)
            )?;
            for &(event, successor) in nbaic.z_successors(z) {
                let event = fsm.event(event);
                writeln!(
                    writer,
                    "{} {} {} {} {}",
                    z_name(nbaic, fsm, z),
                    event.name(),
                    y_name(nbaic, fsm, successor),
                    if event.is_observable() { "o" } else { "uo" },
                    if event.is_controllable() { "c" } else { "uc" },
                )?;
            }
        }
    }
    Ok(())
}

fn u_name(ubts: &Ubts, annotate: bool) -> impl Fn(UyIndex) -> String + '_ {
    move |u| {
        let entrance = annotate && ubts.entrances().contains(&u);
        format!(
            "U{}=Y{}{}",
            u,
            ubts.nbaic_state(u),
            if entrance { "!" } else { "" }
        )
    }
}

fn d_name(ubts: &Ubts, uz: UzIndex) -> String {
    format!("D{}=Z{}", uz, ubts.decision_state(uz))
}

/// Writes the unfolding; with `annotate_entrances` the nodes that were
/// entrance states of some iteration carry a `!` suffix (the EBTS form).
pub fn write_ubts<W: Write>(
    ubts: &Ubts,
    nbaic: &Nbaic,
    fsm: &Fsm,
    annotate_entrances: bool,
    mut writer: W,
) -> io::Result<()> {
    let name = u_name(ubts, annotate_entrances);
    let nodes = ubts.attached_nodes();
    write!(writer, "states")?;
    for &u in &nodes {
        write!(writer, " {}", name(u))?;
        for &uz in ubts.decisions(u) {
            write!(writer, " {}", d_name(ubts, uz))?;
        }
    }
    writeln!(writer)?;
    let marked: Vec<String> = nodes
        .iter()
        .copied()
        .filter(|&u| nbaic.y_contains_marked(fsm, ubts.nbaic_state(u)))
        .map(&name)
        .collect();
    if !marked.is_empty() {
        writeln!(writer, "marked {}", marked.join(" "))?;
    }
    for &u in &nodes {
        for &uz in ubts.decisions(u) {
            writeln!(writer, "{} d{} {} uo c", name(u), uz, d_name(ubts, uz))?;
            for &(event, child) in ubts.children(uz) {
                let event = fsm.event(event);
                writeln!(
                    writer,
                    "{} {} {} {} {}",
                    d_name(ubts, uz),
                    event.name(),
                    name(child),
                    if event.is_observable() { "o" } else { "uo" },
                    if event.is_controllable() { "c" } else { "uc" },
                )?;
            }
        }
    }
    Ok(())
}

/// Writes the full pair graph of an ICS.
pub fn write_ics<W: Write>(ics: &Ics, fsm: &Fsm, mut writer: W) -> io::Result<()> {
    let name = |index: usize| {
        let (u, x) = ics.pair(index);
        format!("<u{},{}>", u, fsm.state(x).name())
    };
    write!(writer, "states")?;
    for index in 0..ics.num_pairs() {
        write!(writer, " {}", name(index))?;
    }
    writeln!(writer)?;
    let marked: Vec<String> = (0..ics.num_pairs())
        .filter(|&index| fsm.is_marked(ics.pair(index).1))
        .map(name)
        .collect();
    if !marked.is_empty() {
        writeln!(writer, "marked {}", marked.join(" "))?;
    }
    for index in 0..ics.num_pairs() {
        for &(event, target) in ics.transitions_from(index) {
            let event = fsm.event(event);
            writeln!(
                writer,
                "{} {} {} {} {}",
                name(index),
                event.name(),
                name(target),
                if event.is_observable() { "o" } else { "uo" },
                if event.is_controllable() { "c" } else { "uc" },
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::parser::{parse_fsm, parse_txt};

    const PLANT: &str = "\
states x0 x1 x2
marked x1
x0 a x1 o c
x0 b x2 uo uc
";

    #[test]
    fn test_fsm_round_trip() {
        let fsm = parse_fsm(PLANT, "plant.fsm").unwrap();
        let mut buffer = Vec::new();
        write_fsm(&fsm, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, PLANT);
    }

    #[test]
    fn test_txt_round_trip() {
        let fsm = parse_fsm(PLANT, "plant.fsm").unwrap();
        let mut buffer = Vec::new();
        write_txt(&fsm, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let back = parse_txt(&text, "plant.txt").unwrap();
        let mut again = Vec::new();
        write_fsm(&back, &mut again).unwrap();
        assert_eq!(String::from_utf8(again).unwrap(), PLANT);
    }
}
