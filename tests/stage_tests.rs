//! Stage progression and shutdown guarantees.

use std::cell::Cell;
use std::rc::Rc;

use noctra_landing::app::Playback;
use noctra_landing::sequencer::params::Param;
use noctra_landing::sequencer::timeline::{Act, TimelineBuilder};
use noctra_landing::stage::{Stage, StageController};

#[test]
fn stages_advance_monotonically_and_fire_the_callback_once() {
    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();
    let mut stages = StageController::new(move || counter.set(counter.get() + 1));

    assert_eq!(stages.stage(), Stage::Boot);
    assert!(stages.start());
    assert_eq!(stages.stage(), Stage::Anim);
    assert!(stages.cinematic_complete());
    assert_eq!(stages.stage(), Stage::Terminated);
    assert_eq!(fired.get(), 0);
    assert!(stages.postamble_complete());
    assert_eq!(stages.stage(), Stage::Done);
    assert_eq!(fired.get(), 1);

    // Repeats are refused and the callback never re-fires.
    assert!(!stages.postamble_complete());
    assert_eq!(fired.get(), 1);
}

#[test]
fn stages_cannot_be_skipped() {
    let mut stages = StageController::new(|| {});
    assert!(!stages.cinematic_complete());
    assert!(!stages.postamble_complete());
    assert_eq!(stages.stage(), Stage::Boot);
}

#[test]
fn double_start_is_refused() {
    let mut stages = StageController::new(|| {});
    assert!(stages.start());
    assert!(!stages.start());
    assert_eq!(stages.stage(), Stage::Anim);
}

#[test]
fn a_frame_after_teardown_changes_nothing() {
    let mut b = TimelineBuilder::new();
    b.at(0.0, Act::param_from(Param::Opacity, 0.0, 1.0).over(2.0))
        .at(1.0, Act::param(Param::Danger, 1.0));
    let mut playback = Playback::new(b.build(), [0.0; 3], [1.0; 3]);

    playback.advance(0.5);
    let opacity_before = playback.params().get(Param::Opacity);

    assert!(playback.teardown());
    assert!(!playback.teardown());

    playback.advance(1.0);
    playback.advance(1.0);
    assert_eq!(playback.params().get(Param::Opacity), opacity_before);
    assert_eq!(playback.params().get(Param::Danger), 0.0);
    assert!(!playback.is_finished());
}
