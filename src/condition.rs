use strum_macros::Display;

/// How form fields appear over the course of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Motion {
    /// every field is on screen from the start of the run
    #[strum(serialize = "all-at-once")]
    AllAtOnce,
    /// field groups are revealed once the prior group is satisfied
    #[strum(serialize = "grouped")]
    Grouped,
}

/// One cell of the 2x2x2 factorial: motion, inline validation, example hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub motion: Motion,
    /// 1 = validity markers update while typing, 0 = only after the field blurs
    pub validation: u8,
    /// 1 = placeholder example text is shown under each label
    pub hints: u8,
}

impl Condition {
    /// Three character code in bit order motion, validation, hints.
    /// Condition index i carries the code binary(i), so index 3 is "011".
    pub fn code(&self) -> String {
        let m = match self.motion {
            Motion::AllAtOnce => 0,
            Motion::Grouped => 1,
        };
        format!("{}{}{}", m, self.validation, self.hints)
    }
}

/// The 8 fixed experiment conditions, indexed so that `CONDITIONS[i].code()`
/// equals the 3-bit binary rendering of `i`.
pub const CONDITIONS: [Condition; 8] = [
    Condition {
        motion: Motion::AllAtOnce,
        validation: 0,
        hints: 0,
    },
    Condition {
        motion: Motion::AllAtOnce,
        validation: 0,
        hints: 1,
    },
    Condition {
        motion: Motion::AllAtOnce,
        validation: 1,
        hints: 0,
    },
    Condition {
        motion: Motion::AllAtOnce,
        validation: 1,
        hints: 1,
    },
    Condition {
        motion: Motion::Grouped,
        validation: 0,
        hints: 0,
    },
    Condition {
        motion: Motion::Grouped,
        validation: 0,
        hints: 1,
    },
    Condition {
        motion: Motion::Grouped,
        validation: 1,
        hints: 0,
    },
    Condition {
        motion: Motion::Grouped,
        validation: 1,
        hints: 1,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_eight_conditions() {
        assert_eq!(CONDITIONS.len(), 8);
    }

    #[test]
    fn test_codes_are_binary_of_index() {
        for (i, cond) in CONDITIONS.iter().enumerate() {
            assert_eq!(cond.code(), format!("{:03b}", i));
        }
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes: HashSet<String> = CONDITIONS.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), 8);
    }

    #[test]
    fn test_index_three_is_spec_example() {
        // all-at-once, validation on, hints on -> "011"
        let cond = CONDITIONS[3];
        assert_eq!(cond.motion, Motion::AllAtOnce);
        assert_eq!(cond.validation, 1);
        assert_eq!(cond.hints, 1);
        assert_eq!(cond.code(), "011");
    }

    #[test]
    fn test_motion_display() {
        assert_eq!(Motion::AllAtOnce.to_string(), "all-at-once");
        assert_eq!(Motion::Grouped.to_string(), "grouped");
    }

    #[test]
    fn test_factorial_is_complete() {
        let mut seen = HashSet::new();
        for cond in CONDITIONS {
            seen.insert((cond.motion == Motion::Grouped, cond.validation, cond.hints));
        }
        assert_eq!(seen.len(), 8);
        for motion in [false, true] {
            for validation in [0u8, 1] {
                for hints in [0u8, 1] {
                    assert!(seen.contains(&(motion, validation, hints)));
                }
            }
        }
    }
}
