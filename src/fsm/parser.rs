//! Parsers for the two plant file dialects.
//!
//! The `.fsm` form is the machine dialect: a `states` line (first name is
//! the initial state), an optional `marked` line, then one transition per
//! line as `source event target o|uo c|uc`. The `.txt` form is the pretty
//! dialect produced by the converter: one `state` header per state with
//! indented `event -> target (flags)` rows. Comments start with `#`.

use std::collections::HashSet;

use crate::error::SynthesisError;
use crate::fsm::Fsm;

fn parse_flags(
    file: &str,
    line: usize,
    observable: &str,
    controllable: &str,
) -> Result<(bool, bool), SynthesisError> {
    let observable = match observable {
        "o" => true,
        "uo" => false,
        other => {
            return Err(SynthesisError::parse(
                file,
                line,
                format!("invalid observability flag '{}' [expected o or uo]", other),
            ))
        }
    };
    let controllable = match controllable {
        "c" => true,
        "uc" => false,
        other => {
            return Err(SynthesisError::parse(
                file,
                line,
                format!("invalid controllability flag '{}' [expected c or uc]", other),
            ))
        }
    };
    Ok((observable, controllable))
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(number, line)| {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            None
        } else {
            Some((number + 1, line))
        }
    })
}

/// Parses the `.fsm` machine dialect.
pub fn parse_fsm(text: &str, file: &str) -> Result<Fsm, SynthesisError> {
    let mut fsm = Fsm::new();
    let mut seen_states = false;

    for (number, line) in content_lines(text) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            "states" => {
                if seen_states {
                    return Err(SynthesisError::parse(file, number, "duplicate states line"));
                }
                if tokens.len() == 1 {
                    return Err(SynthesisError::parse(file, number, "empty states line"));
                }
                for name in &tokens[1..] {
                    fsm.add_state(name, false);
                }
                seen_states = true;
            }
            "marked" => {
                if !seen_states {
                    return Err(SynthesisError::parse(
                        file,
                        number,
                        "marked line before states line",
                    ));
                }
                for name in &tokens[1..] {
                    if fsm.state_index(name).is_none() {
                        return Err(SynthesisError::InconsistentModel(format!(
                            "marked state '{}' is not declared",
                            name
                        )));
                    }
                    fsm.add_state(name, true);
                }
            }
            _ => {
                if !seen_states {
                    return Err(SynthesisError::parse(
                        file,
                        number,
                        "transition before states line",
                    ));
                }
                if tokens.len() != 5 {
                    return Err(SynthesisError::parse(
                        file,
                        number,
                        "expected 'source event target o|uo c|uc'",
                    ));
                }
                let source = fsm.state_index(tokens[0]).ok_or_else(|| {
                    SynthesisError::InconsistentModel(format!(
                        "transition source '{}' is not declared",
                        tokens[0]
                    ))
                })?;
                let target = fsm.state_index(tokens[2]).ok_or_else(|| {
                    SynthesisError::InconsistentModel(format!(
                        "transition target '{}' is not declared",
                        tokens[2]
                    ))
                })?;
                let (observable, controllable) = parse_flags(file, number, tokens[3], tokens[4])?;
                let event = fsm.add_event(tokens[1], observable, controllable)?;
                fsm.add_transition(source, event, target)?;
            }
        }
    }

    if fsm.num_states() == 0 {
        return Err(SynthesisError::parse(file, 0, "no states declared"));
    }
    Ok(fsm)
}

/// Parses the `.txt` pretty dialect.
pub fn parse_txt(text: &str, file: &str) -> Result<Fsm, SynthesisError> {
    let mut fsm = Fsm::new();
    let mut declared: HashSet<String> = HashSet::new();
    let mut current = None;

    for (number, line) in content_lines(text) {
        let tokens: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        if tokens[0] == "state" {
            let (name, marked) = match tokens.len() {
                2 => (tokens[1], false),
                3 if tokens[2] == "marked" => (tokens[1], true),
                _ => {
                    return Err(SynthesisError::parse(
                        file,
                        number,
                        "expected 'state name' or 'state name marked'",
                    ))
                }
            };
            current = Some(fsm.add_state(name, marked));
            declared.insert(name.to_owned());
        } else {
            let source = current.ok_or_else(|| {
                SynthesisError::parse(file, number, "transition before first state header")
            })?;
            if tokens.len() != 5 || tokens[1] != "->" {
                return Err(SynthesisError::parse(
                    file,
                    number,
                    "expected 'event -> target (o|uo, c|uc)'",
                ));
            }
            let (observable, controllable) = parse_flags(file, number, tokens[3], tokens[4])?;
            let event = fsm.add_event(tokens[0], observable, controllable)?;
            let target = fsm.add_state(tokens[2], false);
            fsm.add_transition(source, event, target)?;
        }
    }

    if fsm.num_states() == 0 {
        return Err(SynthesisError::parse(file, 0, "no states declared"));
    }
    for state in fsm.states() {
        if !declared.contains(state.name()) {
            return Err(SynthesisError::InconsistentModel(format!(
                "state '{}' is referenced but never declared",
                state.name()
            )));
        }
    }
    Ok(fsm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthesisError;

    const SMALL_FSM: &str = "\
# two-state plant
states x0 x1
marked x1
x0 sigma x1 o c
";

    #[test]
    fn test_parse_fsm() {
        let fsm = parse_fsm(SMALL_FSM, "small.fsm").unwrap();
        assert_eq!(fsm.num_states(), 2);
        assert_eq!(fsm.num_events(), 1);
        assert!(fsm.is_marked(1));
        let sigma = 0;
        assert!(fsm.event(sigma).is_observable());
        assert!(fsm.event(sigma).is_controllable());
        assert_eq!(fsm.step(0, sigma), Some(1));
    }

    #[test]
    fn test_parse_txt() {
        let text = "\
state x0
  a -> x1 (o, c)
  b -> x2 (uo, uc)
state x1 marked
state x2
";
        let fsm = parse_txt(text, "small.txt").unwrap();
        assert_eq!(fsm.num_states(), 3);
        assert!(fsm.is_marked(1));
        assert!(!fsm.event(1).is_observable());
        assert!(!fsm.event(1).is_controllable());
    }

    #[test]
    fn test_undeclared_state_is_inconsistent() {
        let text = "\
states x0
x0 a x1 o c
";
        match parse_fsm(text, "bad.fsm") {
            Err(SynthesisError::InconsistentModel(_)) => {}
            other => panic!("expected InconsistentModel, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_conflicting_attributes_are_inconsistent() {
        let text = "\
states x0 x1 x2
x0 a x1 o c
x1 a x2 uo c
";
        assert!(matches!(
            parse_fsm(text, "bad.fsm"),
            Err(SynthesisError::InconsistentModel(_))
        ));
    }

    #[test]
    fn test_malformed_line_is_parse_error() {
        let text = "\
states x0 x1
x0 a x1 o
";
        assert!(matches!(
            parse_fsm(text, "bad.fsm"),
            Err(SynthesisError::InputParse { .. })
        ));
    }

    #[test]
    fn test_txt_undeclared_target() {
        let text = "\
state x0
  a -> x1 (o, c)
";
        assert!(matches!(
            parse_txt(text, "bad.txt"),
            Err(SynthesisError::InconsistentModel(_))
        ));
    }
}
