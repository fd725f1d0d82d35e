//! Top-level stage machine: boot → anim → terminated → done.
//!
//! The controller owns only the state and the `on_finish` callback; the app
//! mounts and unmounts the renderer and sequencer when it observes a
//! transition. Transitions are strictly monotonic and requests that do not
//! match the current stage are warn-level no-ops, never errors.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Idle splash, waiting for the user to start.
    Boot,
    /// The cinematic is playing.
    Anim,
    /// Post-cinematic reboot/diagnostic crawl.
    Terminated,
    /// Control has returned to the caller. Terminal.
    Done,
}

pub struct StageController {
    stage: Stage,
    on_finish: Option<Box<dyn FnOnce()>>,
}

impl StageController {
    pub fn new(on_finish: impl FnOnce() + 'static) -> Self {
        Self {
            stage: Stage::Boot,
            on_finish: Some(Box::new(on_finish)),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// User-initiated start. Only valid from boot.
    pub fn start(&mut self) -> bool {
        if self.stage != Stage::Boot {
            warn!(stage = ?self.stage, "start requested outside boot stage");
            return false;
        }
        info!("stage boot -> anim");
        self.stage = Stage::Anim;
        true
    }

    /// The cinematic timeline reached its completion (the ejection sequence
    /// ends in completion too, so both paths arrive here).
    pub fn cinematic_complete(&mut self) -> bool {
        if self.stage != Stage::Anim {
            warn!(stage = ?self.stage, "cinematic completion outside anim stage");
            return false;
        }
        info!("stage anim -> terminated");
        self.stage = Stage::Terminated;
        true
    }

    /// The reboot postamble finished; invokes `on_finish` exactly once.
    pub fn postamble_complete(&mut self) -> bool {
        if self.stage != Stage::Terminated {
            warn!(stage = ?self.stage, "postamble completion outside terminated stage");
            return false;
        }
        info!("stage terminated -> done");
        self.stage = Stage::Done;
        if let Some(on_finish) = self.on_finish.take() {
            on_finish();
        }
        true
    }
}
