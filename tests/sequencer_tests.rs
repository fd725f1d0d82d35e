//! Playback-order and pause-equivalence behavior of the sequencer.

use noctra_landing::gate::{ChoiceSpec, GateSpec};
use noctra_landing::sequencer::Sequencer;
use noctra_landing::sequencer::easing::Easing;
use noctra_landing::sequencer::params::{Param, ParamSet};
use noctra_landing::sequencer::text::TextBank;
use noctra_landing::sequencer::timeline::{Act, Timeline, TimelineBuilder};

fn cells() -> (ParamSet, TextBank) {
    (ParamSet::new([0.0; 3], [1.0; 3]), TextBank::new())
}

#[test]
fn every_action_applies_exactly_once_in_schedule_order() {
    let mut b = TimelineBuilder::new();
    b.at(0.5, Act::param(Param::Pulse, 1.0))
        .at(0.2, Act::param(Param::Danger, 1.0))
        // Two actions at the same instant keep declaration order.
        .at(0.2, Act::param(Param::Corruption, 2.0))
        .at(1.0, Act::param(Param::Shake, 3.0));
    let timeline = b.build();
    let mut seq = Sequencer::new(timeline);
    let (mut params, mut text) = cells();

    // Deliberately irregular frame deltas.
    for dt in [0.07, 0.33, 0.011, 0.4, 0.25, 0.5] {
        seq.advance(dt, &mut params, &mut text);
    }
    assert!(seq.is_finished());

    let journal: Vec<&str> = seq.journal().iter().map(|e| e.what.as_str()).collect();
    assert_eq!(journal.len(), 4);
    assert!(journal[0].contains("Danger"));
    assert!(journal[1].contains("Corruption"));
    assert!(journal[2].contains("Pulse"));
    assert!(journal[3].contains("Shake"));

    let ats: Vec<f32> = seq.journal().iter().map(|e| e.at).collect();
    assert!(ats.windows(2).all(|w| w[0] <= w[1]));

    // Values landed exactly, not approximately.
    assert_eq!(params.get(Param::Pulse), 1.0);
    assert_eq!(params.get(Param::Corruption), 2.0);
}

#[test]
fn tweens_land_exactly_despite_irregular_deltas() {
    let mut b = TimelineBuilder::new();
    b.at(0.0, Act::param_from(Param::Opacity, 0.0, 1.0).over(1.0).ease(Easing::CubicOut));
    let mut seq = Sequencer::new(b.build());
    let (mut params, mut text) = cells();

    let mut elapsed = 0.0;
    for dt in [0.019, 0.4, 0.013, 0.7, 0.2] {
        seq.advance(dt, &mut params, &mut text);
        elapsed += dt;
        if elapsed < 1.0 {
            assert!(params.get(Param::Opacity) < 1.0);
        }
    }
    assert_eq!(params.get(Param::Opacity), 1.0);
}

fn gated_timeline() -> Timeline {
    let reaction = {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::param(Param::Danger, 0.5).over(0.5));
        b.build()
    };
    let mut b = TimelineBuilder::new();
    b.at(0.0, Act::param_from(Param::Opacity, 0.0, 1.0).over(0.5))
        .at(1.0, Act::gate(GateSpec::Choice(ChoiceSpec {
            question: "PROCEED?".into(),
            options: vec!["YES".into()],
            reactions: vec![reaction.clone()],
            default_reaction: reaction,
        })))
        .at(1.5, Act::param(Param::Shake, 2.0).over(0.5))
        .at(2.5, Act::param(Param::Collapse, 1.0));
    b.build()
}

/// A run that idles at the gate must produce the same applied actions and the
/// same final cell values as a run that resolves it instantly.
#[test]
fn gate_pause_is_equivalent_to_instant_resolution() {
    let drive = |idle_frames: usize| {
        let mut seq = Sequencer::new(gated_timeline());
        let (mut params, mut text) = cells();
        while seq.pending_gate().is_none() {
            seq.advance(0.2, &mut params, &mut text);
        }
        for _ in 0..idle_frames {
            seq.advance(0.2, &mut params, &mut text);
            assert!(seq.is_suspended());
        }
        assert!(seq.resolve_choice(0));
        while !seq.is_finished() {
            seq.advance(0.2, &mut params, &mut text);
        }
        let journal: Vec<String> = seq.journal().iter().map(|e| e.what.clone()).collect();
        (journal, params)
    };

    let (journal_idle, params_idle) = drive(40);
    let (journal_fast, params_fast) = drive(0);

    assert_eq!(journal_idle, journal_fast);
    for param in [Param::Opacity, Param::Danger, Param::Shake, Param::Collapse] {
        assert_eq!(params_idle.get(param), params_fast.get(param));
    }
}

/// The master clock freezes while a gate is pending.
#[test]
fn clock_freezes_while_suspended() {
    let mut seq = Sequencer::new(gated_timeline());
    let (mut params, mut text) = cells();
    while seq.pending_gate().is_none() {
        seq.advance(0.25, &mut params, &mut text);
    }
    let frozen = seq.clock();
    for _ in 0..20 {
        seq.advance(0.25, &mut params, &mut text);
    }
    assert_eq!(seq.clock(), frozen);
}

/// Actions scheduled after the gate shift by the spliced branch's duration.
#[test]
fn splice_shifts_later_actions() {
    let mut seq = Sequencer::new(gated_timeline());
    let (mut params, mut text) = cells();
    while seq.pending_gate().is_none() {
        seq.advance(0.25, &mut params, &mut text);
    }
    seq.resolve_choice(0);

    // The reaction lasts 0.5s, so shake (originally at 1.5) now fires at 2.0.
    while seq.clock() < 1.9 {
        seq.advance(0.05, &mut params, &mut text);
    }
    assert_eq!(params.get(Param::Shake), 0.0);
    while !seq.is_finished() {
        seq.advance(0.05, &mut params, &mut text);
    }
    assert_eq!(params.get(Param::Shake), 2.0);
    assert_eq!(params.get(Param::Danger), 0.5);
}
