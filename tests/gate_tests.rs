//! End-to-end gate behavior driven through the sequencer.

use noctra_landing::gate::{ActiveGate, ChoiceSpec, GateSpec, TypedSpec};
use noctra_landing::sequencer::params::{Param, ParamSet};
use noctra_landing::sequencer::text::TextBank;
use noctra_landing::sequencer::timeline::{Act, Timeline, TimelineBuilder};
use noctra_landing::sequencer::{GateInput, GateSignal, Sequencer};

fn cells() -> (ParamSet, TextBank) {
    (ParamSet::new([0.0; 3], [1.0; 3]), TextBank::new())
}

fn branch(param: Param, to: f32) -> Timeline {
    let mut b = TimelineBuilder::new();
    b.at(0.0, Act::param(param, to));
    b.build()
}

fn typed_timeline() -> Timeline {
    let mut b = TimelineBuilder::new();
    b.at(0.2, Act::gate(GateSpec::Typed(TypedSpec {
        prompt: "ENTER OVERRIDE KEY".into(),
        target: "OVERRIDE".into(),
        failure_cue: branch(Param::Danger, 1.0),
        success: branch(Param::Drive, 60.0),
    })));
    b.build()
}

fn drive_to_gate(seq: &mut Sequencer, params: &mut ParamSet, text: &mut TextBank) {
    while seq.pending_gate().is_none() {
        seq.advance(0.1, params, text);
    }
}

#[test]
fn wrong_passphrase_keeps_the_gate_armed_and_clears_the_accumulator() {
    let mut seq = Sequencer::new(typed_timeline());
    let (mut params, mut text) = cells();
    drive_to_gate(&mut seq, &mut params, &mut text);

    for c in "OVERRID".chars() {
        assert_eq!(seq.gate_input(GateInput::Char(c)), GateSignal::Updated);
    }
    assert_eq!(seq.gate_input(GateInput::Submit), GateSignal::Mismatch);
    assert!(seq.is_suspended());
    match seq.pending_gate() {
        Some(ActiveGate::Typed(gate)) => assert_eq!(gate.entered(), ""),
        other => panic!("expected typed gate, got {other:?}"),
    }

    // The failure cue still animates while the master clock is frozen.
    let frozen = seq.clock();
    seq.advance(0.5, &mut params, &mut text);
    assert_eq!(seq.clock(), frozen);
    assert_eq!(params.get(Param::Danger), 1.0);
}

#[test]
fn correct_passphrase_is_case_insensitive_and_splices_the_success_branch() {
    let mut seq = Sequencer::new(typed_timeline());
    let (mut params, mut text) = cells();
    drive_to_gate(&mut seq, &mut params, &mut text);

    for c in "override".chars() {
        seq.gate_input(GateInput::Char(c));
    }
    assert_eq!(seq.gate_input(GateInput::Submit), GateSignal::Matched);
    assert!(seq.pending_gate().is_none());
    assert!(!seq.is_suspended());

    while !seq.is_finished() {
        seq.advance(0.1, &mut params, &mut text);
    }
    assert_eq!(params.get(Param::Drive), 60.0);
}

#[test]
fn backspace_edits_the_accumulator() {
    let mut seq = Sequencer::new(typed_timeline());
    let (mut params, mut text) = cells();
    drive_to_gate(&mut seq, &mut params, &mut text);

    for c in "OVERRIDX".chars() {
        seq.gate_input(GateInput::Char(c));
    }
    assert_eq!(seq.gate_input(GateInput::Backspace), GateSignal::Updated);
    seq.gate_input(GateInput::Char('E'));
    assert_eq!(seq.gate_input(GateInput::Submit), GateSignal::Matched);
}

#[test]
fn input_beyond_the_target_length_is_ignored() {
    let mut seq = Sequencer::new(typed_timeline());
    let (mut params, mut text) = cells();
    drive_to_gate(&mut seq, &mut params, &mut text);

    for c in "OVERRIDE".chars() {
        seq.gate_input(GateInput::Char(c));
    }
    assert_eq!(seq.gate_input(GateInput::Char('X')), GateSignal::Ignored);
    assert_eq!(seq.gate_input(GateInput::Submit), GateSignal::Matched);
}

fn choice_timeline() -> Timeline {
    let mut b = TimelineBuilder::new();
    b.at(0.1, Act::gate(GateSpec::Choice(ChoiceSpec {
        question: "THE ENTITY AWAITS".into(),
        options: vec!["NEGOTIATE".into(), "RESIST".into()],
        reactions: vec![branch(Param::Pulse, 1.0), branch(Param::Shake, 4.0)],
        default_reaction: branch(Param::Corruption, 9.0),
    })));
    b.build()
}

#[test]
fn each_choice_takes_its_own_reaction_branch() {
    for (index, param, expected) in [(0, Param::Pulse, 1.0), (1, Param::Shake, 4.0)] {
        let mut seq = Sequencer::new(choice_timeline());
        let (mut params, mut text) = cells();
        drive_to_gate(&mut seq, &mut params, &mut text);
        assert!(seq.resolve_choice(index));
        while !seq.is_finished() {
            seq.advance(0.1, &mut params, &mut text);
        }
        assert_eq!(params.get(param), expected);
    }
}

#[test]
fn out_of_range_choice_takes_the_default_branch() {
    let mut seq = Sequencer::new(choice_timeline());
    let (mut params, mut text) = cells();
    drive_to_gate(&mut seq, &mut params, &mut text);
    assert!(seq.resolve_choice(5));
    while !seq.is_finished() {
        seq.advance(0.1, &mut params, &mut text);
    }
    assert_eq!(params.get(Param::Corruption), 9.0);
}

#[test]
fn resolving_without_a_pending_gate_is_a_no_op() {
    let mut seq = Sequencer::new(choice_timeline());
    let (mut params, mut text) = cells();
    assert!(!seq.resolve_choice(0));
    assert_eq!(seq.gate_input(GateInput::Submit), GateSignal::Ignored);
    seq.advance(0.05, &mut params, &mut text);
    assert!(!seq.is_finished());
}

#[test]
fn typed_input_into_a_choice_gate_is_ignored() {
    let mut seq = Sequencer::new(choice_timeline());
    let (mut params, mut text) = cells();
    drive_to_gate(&mut seq, &mut params, &mut text);
    assert_eq!(seq.gate_input(GateInput::Char('A')), GateSignal::Ignored);
    assert!(seq.is_suspended());
}
