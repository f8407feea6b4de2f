//! Information-state properties.
//!
//! A property is a pure predicate over information states (sets of plant
//! states). New kinds are added by extending the sum and the `holds`
//! dispatcher.

use std::fmt;

use fixedbitset::FixedBitSet;

use crate::error::SynthesisError;
use crate::fsm::{Fsm, StateIndex};

/// The recognized information-state property kinds, parameterized by the
/// state sets from the property file. `Trivial` is the predicate that holds
/// everywhere and is used when no property is supplied.
#[derive(Debug, Clone)]
pub enum IsProperty {
    /// The information state must avoid the forbidden set entirely.
    Safety { forbidden: FixedBitSet },
    /// The observer must never conclude the plant is inside the secret set.
    Opacity { secret: FixedBitSet },
    /// The information state must fit inside one of the classes.
    Disambiguation { classes: Vec<FixedBitSet> },
    Trivial,
}

impl IsProperty {
    /// Evaluates the predicate on an information state given as a sorted
    /// slice of plant states.
    pub fn holds(&self, istate: &[StateIndex]) -> bool {
        match self {
            Self::Safety { forbidden } => istate.iter().all(|&x| !forbidden.contains(x)),
            Self::Opacity { secret } => !istate.iter().all(|&x| secret.contains(x)),
            Self::Disambiguation { classes } => classes
                .iter()
                .any(|class| istate.iter().all(|&x| class.contains(x))),
            Self::Trivial => true,
        }
    }

    /// Parses a property file: the first content line names the kind, each
    /// following line is one whitespace-separated state set.
    pub fn parse(text: &str, file: &str, fsm: &Fsm) -> Result<Self, SynthesisError> {
        let mut kind = None;
        let mut sets = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if kind.is_none() {
                kind = Some(line.to_owned());
                continue;
            }
            let mut set = FixedBitSet::with_capacity(fsm.num_states());
            for name in line.split_whitespace() {
                let index = fsm.state_index(name).ok_or_else(|| {
                    SynthesisError::InconsistentModel(format!(
                        "property references undeclared state '{}'",
                        name
                    ))
                })?;
                set.insert(index);
            }
            if set.count_ones(..) == 0 {
                return Err(SynthesisError::parse(file, number + 1, "empty state set"));
            }
            sets.push(set);
        }

        let kind = match kind {
            Some(kind) => kind,
            None => return Err(SynthesisError::parse(file, 0, "missing property kind")),
        };
        match kind.as_str() {
            "safety" => {
                if sets.len() != 1 {
                    return Err(SynthesisError::parse(
                        file,
                        0,
                        format!("safety expects one forbidden set, found {}", sets.len()),
                    ));
                }
                Ok(Self::Safety {
                    forbidden: sets.remove(0),
                })
            }
            "opacity" => {
                if sets.len() != 1 {
                    return Err(SynthesisError::parse(
                        file,
                        0,
                        format!("opacity expects one secret set, found {}", sets.len()),
                    ));
                }
                Ok(Self::Opacity {
                    secret: sets.remove(0),
                })
            }
            "disambiguation" => {
                if sets.is_empty() {
                    return Err(SynthesisError::parse(
                        file,
                        0,
                        "disambiguation expects at least one class",
                    ));
                }
                Ok(Self::Disambiguation { classes: sets })
            }
            other => Err(SynthesisError::PropertyUnsupported(other.to_owned())),
        }
    }
}

impl fmt::Display for IsProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Safety { .. } => "safety",
                Self::Opacity { .. } => "opacity",
                Self::Disambiguation { .. } => "disambiguation",
                Self::Trivial => "trivial",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::parser::parse_fsm;

    fn plant() -> Fsm {
        parse_fsm(
            "states x0 x1 x2\nx0 a x1 o c\nx0 b x2 o c\n",
            "plant.fsm",
        )
        .unwrap()
    }

    #[test]
    fn test_safety() {
        let fsm = plant();
        let isp = IsProperty::parse("safety\nx2\n", "p.isp", &fsm).unwrap();
        assert!(isp.holds(&[0, 1]));
        assert!(!isp.holds(&[0, 2]));
    }

    #[test]
    fn test_opacity() {
        let fsm = plant();
        let isp = IsProperty::parse("opacity\nx1 x2\n", "p.isp", &fsm).unwrap();
        // the observer cannot conclude the plant is inside the secret
        assert!(isp.holds(&[0, 1]));
        assert!(!isp.holds(&[1, 2]));
        assert!(!isp.holds(&[1]));
    }

    #[test]
    fn test_disambiguation() {
        let fsm = plant();
        let isp = IsProperty::parse("disambiguation\nx0 x1\nx2\n", "p.isp", &fsm).unwrap();
        assert!(isp.holds(&[0, 1]));
        assert!(isp.holds(&[2]));
        assert!(!isp.holds(&[1, 2]));
    }

    #[test]
    fn test_trivial_holds_everywhere() {
        assert!(IsProperty::Trivial.holds(&[0, 1, 2]));
        assert!(IsProperty::Trivial.holds(&[]));
    }

    #[test]
    fn test_unknown_kind() {
        let fsm = plant();
        assert!(matches!(
            IsProperty::parse("diagnosability\nx1\n", "p.isp", &fsm),
            Err(SynthesisError::PropertyUnsupported(_))
        ));
    }

    #[test]
    fn test_undeclared_state() {
        let fsm = plant();
        assert!(matches!(
            IsProperty::parse("safety\nx9\n", "p.isp", &fsm),
            Err(SynthesisError::InconsistentModel(_))
        ));
    }
}
