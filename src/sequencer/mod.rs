//! Cinematic sequencer: plays a [`Timeline`] against the parameter and text
//! cells, suspending at interaction gates.
//!
//! Playback is cooperative and single threaded: the render loop calls
//! [`Sequencer::advance`] once per frame with the frame delta. Each action is
//! applied exactly once, in (offset, declaration) order. While a gate is
//! pending the master clock freezes — the render loop keeps drawing the
//! paused visual state — and resolution splices the chosen branch at the
//! paused position before resuming, so pausing changes timing but never
//! content.

pub mod easing;
pub mod params;
pub mod text;
pub mod timeline;

use tracing::{debug, warn};

use crate::gate::{ActiveGate, GateSpec, SubmitOutcome};
use easing::{ease, ease_rgb};
use params::ParamSet;
use text::TextBank;
use timeline::{Action, Effect, Timeline};

/// Keyboard-ish input forwarded into a pending typed challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateInput {
    Char(char),
    Backspace,
    Submit,
}

/// What a piece of gate input did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// No gate pending, or the input was swallowed (overlong, control char).
    Ignored,
    /// The accumulator changed; the HUD should redraw the prompt.
    Updated,
    /// Wrong passphrase: accumulator cleared, failure cue playing, gate armed.
    Mismatch,
    /// Passphrase matched: success branch spliced, playback resumed.
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayState {
    Playing,
    Suspended,
    Finished,
    Killed,
}

/// Captured starting value for an in-flight tween.
#[derive(Debug, Clone)]
enum TweenFrom {
    Scalar(f32),
    Color([f32; 3]),
    Text,
}

#[derive(Debug, Clone)]
struct ActiveTween {
    action: usize,
    from: TweenFrom,
}

/// A fire-and-forget tween running on the side clock while the main timeline
/// is suspended (mismatch flashes and similar cues).
#[derive(Debug, Clone)]
struct CueTween {
    action: Action,
    begin: f32,
    from: Option<TweenFrom>,
}

/// One line of the applied-action journal, in application order.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub at: f32,
    pub what: String,
}

pub struct Sequencer {
    actions: Vec<Action>,
    next: usize,
    active: Vec<ActiveTween>,
    cues: Vec<CueTween>,
    clock: f32,
    cue_clock: f32,
    state: PlayState,
    gate: Option<ActiveGate>,
    journal: Vec<JournalEntry>,
}

impl Sequencer {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            actions: timeline.into_actions(),
            next: 0,
            active: Vec::new(),
            cues: Vec::new(),
            clock: 0.0,
            cue_clock: 0.0,
            state: PlayState::Playing,
            gate: None,
            journal: Vec::new(),
        }
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// End of the last scheduled action. Splices extend this as they land.
    pub fn duration(&self) -> f32 {
        self.actions.iter().map(Action::end).fold(0.0, f32::max)
    }

    pub fn is_finished(&self) -> bool {
        self.state == PlayState::Finished
    }

    pub fn is_suspended(&self) -> bool {
        self.state == PlayState::Suspended
    }

    /// The prompt currently blocking playback, if any.
    pub fn pending_gate(&self) -> Option<&ActiveGate> {
        self.gate.as_ref()
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Advance playback by `dt` seconds. While suspended only the cue side
    /// clock moves; while killed or finished this is a no-op (cues are still
    /// drained after finish so trailing flashes complete).
    pub fn advance(&mut self, dt: f32, params: &mut ParamSet, text: &mut TextBank) {
        match self.state {
            PlayState::Killed => return,
            PlayState::Suspended => {
                self.cue_clock += dt;
                self.update_cues(params, text);
                return;
            }
            PlayState::Playing | PlayState::Finished => {}
        }

        self.cue_clock += dt;
        if self.state == PlayState::Playing {
            self.clock += dt;
            while self.next < self.actions.len() && self.actions[self.next].start <= self.clock {
                let idx = self.next;
                self.next += 1;
                if self.start_action(idx, params, text) {
                    // Gate fired: freeze exactly at its offset.
                    break;
                }
            }
        }

        self.update_tweens(params, text);
        self.update_cues(params, text);

        if self.state == PlayState::Playing
            && self.next >= self.actions.len()
            && self.active.is_empty()
        {
            debug!(clock = self.clock, "timeline complete");
            self.state = PlayState::Finished;
        }
    }

    /// Resolve a pending multiple-choice gate. The reaction branch for the
    /// selected index (default branch for anything out of range) is spliced at
    /// the paused position and playback resumes. Without a pending choice gate
    /// this is a guarded no-op.
    pub fn resolve_choice(&mut self, index: usize) -> bool {
        match self.gate.take() {
            Some(ActiveGate::Choice(spec)) => {
                let reaction = spec.reaction_for(index).clone();
                debug!(index, "choice gate resolved");
                self.splice(&reaction);
                self.state = PlayState::Playing;
                true
            }
            other => {
                warn!("resolve_choice with no pending choice gate");
                self.gate = other;
                false
            }
        }
    }

    /// Feed input into a pending typed challenge. Input aimed at a choice gate
    /// (or no gate at all) is swallowed; only the no-gate case is API misuse
    /// worth a warning.
    pub fn gate_input(&mut self, input: GateInput) -> GateSignal {
        let gate = match self.gate.as_mut() {
            Some(ActiveGate::Typed(gate)) => gate,
            Some(ActiveGate::Choice(_)) => return GateSignal::Ignored,
            None => {
                warn!("gate input with no pending gate");
                return GateSignal::Ignored;
            }
        };
        match input {
            GateInput::Char(c) => {
                if gate.push_char(c) {
                    GateSignal::Updated
                } else {
                    GateSignal::Ignored
                }
            }
            GateInput::Backspace => {
                if gate.backspace() {
                    GateSignal::Updated
                } else {
                    GateSignal::Ignored
                }
            }
            GateInput::Submit => match gate.submit() {
                SubmitOutcome::Matched => {
                    let success = gate.spec.success.clone();
                    debug!("typed gate matched; splicing success branch");
                    self.gate = None;
                    self.splice(&success);
                    self.state = PlayState::Playing;
                    GateSignal::Matched
                }
                SubmitOutcome::Mismatch => {
                    let cue = gate.spec.failure_cue.clone();
                    debug!("typed gate mismatch; playing failure cue");
                    self.play_cue(&cue);
                    GateSignal::Mismatch
                }
            },
        }
    }

    /// Play a branch as a fire-and-forget cue on the side clock. Runs even
    /// while the main timeline is suspended.
    pub fn play_cue(&mut self, branch: &Timeline) {
        for action in branch.actions() {
            match action.effect {
                Effect::Gate(_) | Effect::Wait => continue,
                _ => {}
            }
            self.cues.push(CueTween {
                action: action.clone(),
                begin: self.cue_clock + action.start,
                from: None,
            });
        }
    }

    /// Cancel all in-flight tweens and stop issuing actions. Idempotent; used
    /// by stage teardown.
    pub fn kill(&mut self) {
        if self.state == PlayState::Killed {
            return;
        }
        self.active.clear();
        self.cues.clear();
        self.gate = None;
        self.state = PlayState::Killed;
    }

    /// Splice a branch at the current playhead: branch actions run first, all
    /// not-yet-started actions shift back by the branch duration.
    fn splice(&mut self, branch: &Timeline) {
        let shift = branch.duration();
        for action in &mut self.actions[self.next..] {
            action.start += shift;
        }
        let mut inserted = branch.clone().into_actions();
        for action in &mut inserted {
            action.start += self.clock;
        }
        let at = self.next;
        self.actions.splice(at..at, inserted);
    }

    /// Start one action. Returns true when it was a gate (playback suspends).
    fn start_action(&mut self, idx: usize, params: &mut ParamSet, text: &mut TextBank) -> bool {
        let action = &self.actions[idx];
        self.journal.push(JournalEntry {
            at: action.start,
            what: action.describe(),
        });
        debug!(at = action.start, action = %action.describe(), "action start");

        match &action.effect {
            Effect::Param { key, from, to } => {
                let key = *key;
                let to = *to;
                if action.stepped || action.duration <= 0.0 {
                    params.set(key, to);
                } else {
                    let from = from.unwrap_or_else(|| params.get(key));
                    self.active.push(ActiveTween {
                        action: idx,
                        from: TweenFrom::Scalar(from),
                    });
                }
                false
            }
            Effect::Color { cell, from, to } => {
                let cell = *cell;
                let to = *to;
                if action.stepped || action.duration <= 0.0 {
                    params.set_color(cell, to);
                } else {
                    let from = from.unwrap_or_else(|| params.color(cell));
                    self.active.push(ActiveTween {
                        action: idx,
                        from: TweenFrom::Color(from),
                    });
                }
                false
            }
            Effect::Text {
                cell,
                content,
                color,
            } => {
                let cell = *cell;
                if let Some(color) = color {
                    text.set_color(cell, *color);
                }
                if action.stepped || action.duration <= 0.0 {
                    text.set(cell, content.clone());
                } else {
                    self.active.push(ActiveTween {
                        action: idx,
                        from: TweenFrom::Text,
                    });
                }
                false
            }
            Effect::Beat(name) => {
                debug!(beat = name, "narrative beat");
                false
            }
            Effect::Wait => false,
            Effect::Gate(spec) => {
                let spec: GateSpec = (**spec).clone();
                self.clock = action.start;
                self.gate = Some(ActiveGate::from_spec(spec));
                self.state = PlayState::Suspended;
                true
            }
        }
    }

    fn update_tweens(&mut self, params: &mut ParamSet, text: &mut TextBank) {
        let clock = self.clock;
        let actions = &self.actions;
        self.active.retain(|tween| {
            let action = &actions[tween.action];
            let t = ((clock - action.start) / action.duration).clamp(0.0, 1.0);
            apply_tween(action, &tween.from, t, params, text);
            t < 1.0
        });
    }

    fn update_cues(&mut self, params: &mut ParamSet, text: &mut TextBank) {
        let cue_clock = self.cue_clock;
        self.cues.retain_mut(|cue| {
            if cue_clock < cue.begin {
                return true;
            }
            if cue.from.is_none() {
                cue.from = Some(capture_from(&cue.action, params));
            }
            let Some(from) = cue.from.as_ref() else {
                return false;
            };
            if cue.action.stepped || cue.action.duration <= 0.0 {
                apply_tween(&cue.action, from, 1.0, params, text);
                return false;
            }
            let t = ((cue_clock - cue.begin) / cue.action.duration).clamp(0.0, 1.0);
            apply_tween(&cue.action, from, t, params, text);
            t < 1.0
        });
    }
}

fn capture_from(action: &Action, params: &ParamSet) -> TweenFrom {
    match &action.effect {
        Effect::Param { key, from, .. } => {
            TweenFrom::Scalar(from.unwrap_or_else(|| params.get(*key)))
        }
        Effect::Color { cell, from, .. } => {
            TweenFrom::Color(from.unwrap_or_else(|| params.color(*cell)))
        }
        _ => TweenFrom::Text,
    }
}

fn apply_tween(
    action: &Action,
    from: &TweenFrom,
    t: f32,
    params: &mut ParamSet,
    text: &mut TextBank,
) {
    match (&action.effect, from) {
        (Effect::Param { key, to, .. }, TweenFrom::Scalar(from)) => {
            params.set(*key, ease(*from, *to, t, action.easing));
        }
        (Effect::Color { cell, to, .. }, TweenFrom::Color(from)) => {
            params.set_color(*cell, ease_rgb(*from, *to, t, action.easing));
        }
        (Effect::Text { cell, content, .. }, TweenFrom::Text) => {
            text.reveal(*cell, content, action.easing.apply(t));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easing::Easing;
    use params::Param;
    use text::TextCell;
    use timeline::{Act, TimelineBuilder};

    fn run_for(seq: &mut Sequencer, seconds: f32, step: f32) -> (ParamSet, TextBank) {
        let mut params = ParamSet::default();
        let mut text = TextBank::new();
        let mut t = 0.0;
        while t < seconds {
            seq.advance(step, &mut params, &mut text);
            t += step;
        }
        (params, text)
    }

    #[test]
    fn tween_interpolates_and_lands_exactly() {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::param_from(Param::Corruption, 0.0, 2.0).over(1.0));
        let mut seq = Sequencer::new(b.build());
        let mut params = ParamSet::default();
        let mut text = TextBank::new();

        seq.advance(0.5, &mut params, &mut text);
        assert!((params.get(Param::Corruption) - 1.0).abs() < 1e-4);
        seq.advance(10.0, &mut params, &mut text);
        assert_eq!(params.get(Param::Corruption), 2.0);
        assert!(seq.is_finished());
    }

    #[test]
    fn stepped_action_applies_once_at_start() {
        let mut b = TimelineBuilder::new();
        b.at(1.0, Act::param(Param::Danger, 5.0).over(3.0).stepped());
        let mut seq = Sequencer::new(b.build());
        let mut params = ParamSet::default();
        let mut text = TextBank::new();

        seq.advance(0.5, &mut params, &mut text);
        assert_eq!(params.get(Param::Danger), 0.0);
        seq.advance(0.6, &mut params, &mut text);
        assert_eq!(params.get(Param::Danger), 5.0);
    }

    #[test]
    fn typewriter_reveals_over_duration() {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::text(TextCell::Log, "ABCD").over(1.0).ease(Easing::Linear));
        let mut seq = Sequencer::new(b.build());
        let mut params = ParamSet::default();
        let mut text = TextBank::new();

        seq.advance(0.5, &mut params, &mut text);
        assert_eq!(text.get(TextCell::Log).content, "AB");
        seq.advance(0.5, &mut params, &mut text);
        assert_eq!(text.get(TextCell::Log).content, "ABCD");
    }

    #[test]
    fn kill_is_idempotent_and_stops_playback() {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::param(Param::Opacity, 0.0).over(10.0));
        let mut seq = Sequencer::new(b.build());
        let (_, _) = run_for(&mut seq, 0.1, 0.05);
        seq.kill();
        seq.kill();
        let mut params = ParamSet::default();
        let mut text = TextBank::new();
        let before = params.get(Param::Opacity);
        seq.advance(5.0, &mut params, &mut text);
        assert_eq!(params.get(Param::Opacity), before);
        assert!(!seq.is_finished());
    }
}
