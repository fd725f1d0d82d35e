//! Interaction gates: points in the timeline where playback suspends until
//! the user answers a multiple-choice prompt or types a passphrase.
//!
//! Gate failures are UX events, not errors: an unrecognized choice index takes
//! the default reaction, a mismatched passphrase clears the accumulator and
//! leaves the gate armed. Retries are unlimited by design — the narrative
//! waits for human pacing.

use tracing::warn;

use crate::sequencer::timeline::Timeline;

/// Multiple-choice prompt plus the reaction branch per option. Indices outside
/// `reactions` resolve through `default_reaction`.
#[derive(Debug, Clone)]
pub struct ChoiceSpec {
    pub question: String,
    pub options: Vec<String>,
    pub reactions: Vec<Timeline>,
    pub default_reaction: Timeline,
}

impl ChoiceSpec {
    /// The reaction branch for a selection. Never fails: out-of-range indices
    /// fall back to the default branch.
    pub fn reaction_for(&self, index: usize) -> &Timeline {
        match self.reactions.get(index) {
            Some(reaction) => reaction,
            None => {
                warn!(index, options = self.options.len(), "choice index out of range; taking default reaction");
                &self.default_reaction
            }
        }
    }
}

/// Typed passphrase prompt. `success` is spliced into the timeline on an exact
/// (case-normalized) match; `failure_cue` plays as a fire-and-forget visual on
/// a mismatch.
#[derive(Debug, Clone)]
pub struct TypedSpec {
    pub prompt: String,
    pub target: String,
    pub failure_cue: Timeline,
    pub success: Timeline,
}

#[derive(Debug, Clone)]
pub enum GateSpec {
    Choice(ChoiceSpec),
    Typed(TypedSpec),
}

impl GateSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            GateSpec::Choice(_) => "choice",
            GateSpec::Typed(_) => "typed",
        }
    }
}

/// Live state of a typed challenge: the spec plus the case-normalized
/// accumulator shown in the HUD.
#[derive(Debug, Clone)]
pub struct TypedGate {
    pub spec: TypedSpec,
    entered: String,
}

/// What a submitted accumulator did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Matched,
    Mismatch,
}

impl TypedGate {
    pub fn new(spec: TypedSpec) -> Self {
        Self {
            spec,
            entered: String::new(),
        }
    }

    pub fn entered(&self) -> &str {
        &self.entered
    }

    /// Accumulate one character, normalized to uppercase. Control characters
    /// and input beyond the target length are ignored.
    pub fn push_char(&mut self, c: char) -> bool {
        if c.is_control() {
            return false;
        }
        let limit = self.spec.target.chars().count();
        if self.entered.chars().count() >= limit {
            return false;
        }
        // Uppercasing can expand to several characters ('ß' becomes "SS");
        // keep only what fits within the target length.
        for up in c.to_uppercase() {
            if self.entered.chars().count() >= limit {
                break;
            }
            self.entered.push(up);
        }
        true
    }

    /// Remove the last accumulated character. No-op when empty.
    pub fn backspace(&mut self) -> bool {
        self.entered.pop().is_some()
    }

    /// Compare the accumulator against the target. A mismatch clears the
    /// accumulator so the user can retry; the gate itself stays armed.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.entered.eq_ignore_ascii_case(&self.spec.target) {
            SubmitOutcome::Matched
        } else {
            self.entered.clear();
            SubmitOutcome::Mismatch
        }
    }
}

/// The prompt currently suspending the sequencer. At most one exists at a
/// time; it is created when a gate action fires and dropped on resolution.
#[derive(Debug, Clone)]
pub enum ActiveGate {
    Choice(ChoiceSpec),
    Typed(TypedGate),
}

impl ActiveGate {
    pub fn from_spec(spec: GateSpec) -> Self {
        match spec {
            GateSpec::Choice(choice) => ActiveGate::Choice(choice),
            GateSpec::Typed(typed) => ActiveGate::Typed(TypedGate::new(typed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(target: &str) -> TypedGate {
        TypedGate::new(TypedSpec {
            prompt: "ENTER KEY".into(),
            target: target.into(),
            failure_cue: Timeline::default(),
            success: Timeline::default(),
        })
    }

    #[test]
    fn accumulator_never_exceeds_target_length() {
        let mut gate = typed("OVERRIDE");
        for c in "overrideXYZ".chars() {
            gate.push_char(c);
        }
        assert_eq!(gate.entered(), "OVERRIDE");
    }

    #[test]
    fn expanding_uppercase_respects_target_length() {
        // 'ß' uppercases to "SS"; the second S must not spill past the target.
        let mut gate = typed("PAS");
        gate.push_char('p');
        gate.push_char('a');
        gate.push_char('ß');
        assert_eq!(gate.entered(), "PAS");
        assert!(!gate.push_char('s'));
    }

    #[test]
    fn backspace_on_empty_is_a_noop() {
        let mut gate = typed("OVERRIDE");
        assert!(!gate.backspace());
        gate.push_char('o');
        assert!(gate.backspace());
        assert_eq!(gate.entered(), "");
    }

    #[test]
    fn mismatch_clears_and_match_is_case_insensitive() {
        let mut gate = typed("OVERRIDE");
        for c in "OVERRID".chars() {
            gate.push_char(c);
        }
        assert_eq!(gate.submit(), SubmitOutcome::Mismatch);
        assert_eq!(gate.entered(), "");
        for c in "override".chars() {
            gate.push_char(c);
        }
        assert_eq!(gate.submit(), SubmitOutcome::Matched);
    }

    #[test]
    fn out_of_range_choice_takes_default_reaction() {
        let spec = ChoiceSpec {
            question: "RESPOND".into(),
            options: vec!["A".into(), "B".into(), "C".into()],
            reactions: vec![Timeline::default(); 3],
            default_reaction: Timeline::default(),
        };
        // Index 5 on a 3-option list must resolve, not panic.
        let _ = spec.reaction_for(5);
    }
}
