//! Timeline model: an ordered sequence of timed actions with labels for
//! relative scheduling.
//!
//! Offsets resolve monotonically at build time. Referencing a label that has
//! not been defined yet is a build error, so a finished [`Timeline`] is always
//! playable front to back. Actions that resolve to the same start offset keep
//! their declaration order (stable sort).

use anyhow::{Result, bail};

use crate::gate::GateSpec;
use crate::sequencer::easing::Easing;
use crate::sequencer::params::{ColorCell, Param};
use crate::sequencer::text::TextCell;

/// What an action does when it fires.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Tween a scalar parameter cell. `from: None` captures the current value
    /// when the action starts (a "to" tween).
    Param {
        key: Param,
        from: Option<f32>,
        to: f32,
    },
    /// Tween a palette color cell.
    Color {
        cell: ColorCell,
        from: Option<[f32; 3]>,
        to: [f32; 3],
    },
    /// Reveal text into a cell over the duration (typewriter), or set it at
    /// start when the action is stepped. An accompanying color is applied at
    /// start either way.
    Text {
        cell: TextCell,
        content: String,
        color: Option<[f32; 4]>,
    },
    /// Discrete narrative beat: journaled and logged, no cell mutation.
    Beat(&'static str),
    /// Suspend playback until the prompt is resolved.
    Gate(Box<GateSpec>),
    /// Occupies time only; exists so `then` offsets can anchor on a pause.
    Wait,
}

/// One scheduled action. `id` is the declaration index within its timeline and
/// doubles as the tie-break key for equal start offsets.
#[derive(Debug, Clone)]
pub struct Action {
    pub id: usize,
    pub start: f32,
    pub duration: f32,
    pub easing: Easing,
    pub stepped: bool,
    pub effect: Effect,
}

impl Action {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Short human-readable description for dry-run output and logs.
    pub fn describe(&self) -> String {
        match &self.effect {
            Effect::Param { key, to, .. } => format!("param {key:?} -> {to}"),
            Effect::Color { cell, .. } => format!("color {cell:?}"),
            Effect::Text { cell, content, .. } => {
                format!("text {cell:?} \"{content}\"")
            }
            Effect::Beat(name) => format!("beat {name}"),
            Effect::Gate(spec) => format!("gate {}", spec.kind()),
            Effect::Wait => "wait".to_string(),
        }
    }
}

/// A playable timeline: actions sorted by (start, declaration order).
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    actions: Vec<Action>,
}

impl Timeline {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Total span of the timeline: the latest action end.
    pub fn duration(&self) -> f32 {
        self.actions.iter().map(Action::end).fold(0.0, f32::max)
    }

    pub(crate) fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}

/// Draft of an action before the builder assigns its offset and id.
#[derive(Debug, Clone)]
pub struct Act {
    duration: f32,
    easing: Easing,
    stepped: bool,
    effect: Effect,
}

impl Act {
    fn new(effect: Effect) -> Self {
        Self {
            duration: 0.0,
            easing: Easing::default(),
            stepped: false,
            effect,
        }
    }

    /// Tween a parameter from its current value.
    pub fn param(key: Param, to: f32) -> Self {
        Self::new(Effect::Param {
            key,
            from: None,
            to,
        })
    }

    /// Tween a parameter from an explicit starting value.
    pub fn param_from(key: Param, from: f32, to: f32) -> Self {
        Self::new(Effect::Param {
            key,
            from: Some(from),
            to,
        })
    }

    pub fn color(cell: ColorCell, to: [f32; 3]) -> Self {
        Self::new(Effect::Color {
            cell,
            from: None,
            to,
        })
    }

    pub fn text(cell: TextCell, content: impl Into<String>) -> Self {
        Self::new(Effect::Text {
            cell,
            content: content.into(),
            color: None,
        })
    }

    pub fn text_colored(cell: TextCell, content: impl Into<String>, color: [f32; 4]) -> Self {
        Self::new(Effect::Text {
            cell,
            content: content.into(),
            color: Some(color),
        })
    }

    pub fn beat(name: &'static str) -> Self {
        Self::new(Effect::Beat(name))
    }

    pub fn gate(spec: GateSpec) -> Self {
        Self::new(Effect::Gate(Box::new(spec)))
    }

    pub fn wait(duration: f32) -> Self {
        Self::new(Effect::Wait).over(duration)
    }

    /// Interpolate over `duration` seconds instead of firing as a step.
    pub fn over(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Apply the final value at start; the duration still occupies time.
    pub fn stepped(mut self) -> Self {
        self.stepped = true;
        self
    }
}

/// Builds a [`Timeline`] while resolving offsets and labels incrementally.
#[derive(Debug)]
pub struct TimelineBuilder {
    actions: Vec<Action>,
    labels: Vec<(String, f32)>,
    prev_start: f32,
    prev_end: f32,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            labels: Vec::new(),
            prev_start: 0.0,
            prev_end: 0.0,
        }
    }

    fn push_at(&mut self, start: f32, act: Act) -> &mut Self {
        let start = start.max(0.0);
        let action = Action {
            id: self.actions.len(),
            start,
            duration: act.duration,
            easing: act.easing,
            stepped: act.stepped,
            effect: act.effect,
        };
        self.prev_start = action.start;
        self.prev_end = action.end();
        self.actions.push(action);
        self
    }

    /// Schedule at an absolute offset.
    pub fn at(&mut self, start: f32, act: Act) -> &mut Self {
        self.push_at(start, act)
    }

    /// Schedule `delay` seconds after the previous action ends.
    pub fn then(&mut self, delay: f32, act: Act) -> &mut Self {
        self.push_at(self.prev_end + delay, act)
    }

    /// Schedule `delta` seconds after the previous action starts.
    pub fn with(&mut self, delta: f32, act: Act) -> &mut Self {
        self.push_at(self.prev_start + delta, act)
    }

    /// Name the current cursor position (end of the previous action) so later
    /// actions can schedule relative to it.
    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        if self.labels.iter().any(|(n, _)| n == name) {
            bail!("duplicate timeline label {name:?}");
        }
        self.labels.push((name.to_string(), self.prev_end));
        Ok(self)
    }

    /// Schedule relative to a previously defined label. Labels must be defined
    /// before use; anything else would make offsets unresolvable front to back.
    pub fn after(&mut self, label: &str, delta: f32, act: Act) -> Result<&mut Self> {
        let Some(&(_, base)) = self.labels.iter().find(|(n, _)| n == label) else {
            bail!("timeline label {label:?} referenced before definition");
        };
        Ok(self.push_at(base + delta, act))
    }

    pub fn build(&mut self) -> Timeline {
        let mut actions = std::mem::take(&mut self.actions);
        // Stable sort keeps declaration order for equal offsets.
        actions.sort_by(|a, b| a.start.total_cmp(&b.start));
        Timeline { actions }
    }
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_resolve_relative_to_previous_action() {
        let mut b = TimelineBuilder::new();
        b.at(1.0, Act::param(Param::Opacity, 0.5).over(2.0))
            .then(0.5, Act::beat("after-end"))
            .with(0.25, Act::beat("after-start"));
        let tl = b.build();
        let starts: Vec<f32> = tl.actions().iter().map(|a| a.start).collect();
        assert_eq!(starts, vec![1.0, 3.5, 3.75]);
    }

    #[test]
    fn equal_offsets_keep_declaration_order() {
        let mut b = TimelineBuilder::new();
        b.at(2.0, Act::beat("first"))
            .at(1.0, Act::beat("early"))
            .at(2.0, Act::beat("second"));
        let tl = b.build();
        let ids: Vec<usize> = tl.actions().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn forward_label_reference_is_an_error() {
        let mut b = TimelineBuilder::new();
        let err = b.after("denial", 0.0, Act::beat("x")).unwrap_err();
        assert!(err.to_string().contains("denial"));
    }

    #[test]
    fn labels_anchor_later_actions() {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::wait(5.0));
        b.label("mark").unwrap();
        b.after("mark", 1.5, Act::beat("anchored")).unwrap();
        let tl = b.build();
        assert_eq!(tl.actions().last().unwrap().start, 6.5);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let mut b = TimelineBuilder::new();
        b.label("m").unwrap();
        assert!(b.label("m").is_err());
    }

    #[test]
    fn duration_is_latest_end() {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::param(Param::Opacity, 0.0).over(4.0))
            .at(1.0, Act::beat("short"));
        assert!((b.build().duration() - 4.0).abs() < 1e-6);
    }
}
