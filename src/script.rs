//! The concrete cinematic: the infiltration narrative, its interaction gates,
//! and the terminated-stage reboot postamble, all expressed as timelines.
//! Tunables (colors, passphrase) come from the configuration; the beats are
//! fixed.

use anyhow::Result;
use glam::Vec3;

use crate::config::{Configuration, parse_hex_rgba};
use crate::gate::{ChoiceSpec, GateSpec, TypedSpec};
use crate::render::camera::CameraPath;
use crate::sequencer::easing::Easing;
use crate::sequencer::params::{ColorCell, Param};
use crate::sequencer::text::TextCell;
use crate::sequencer::timeline::{Act, Timeline, TimelineBuilder};

const OK_GREEN: [f32; 4] = [0.1, 1.0, 0.3, 1.0];

/// The master anim-stage timeline.
pub fn cinematic(cfg: &Configuration) -> Result<Timeline> {
    let cyan = parse_hex_rgba(&cfg.palette.near)?;
    let red = parse_hex_rgba(&cfg.palette.hostile)?;
    let yellow = parse_hex_rgba(&cfg.palette.warning)?;
    let hostile_rgb = [red[0], red[1], red[2]];

    let mut b = TimelineBuilder::new();

    // Old-TV power-on: a static flash that collapses into the tunnel.
    b.at(0.0, Act::param_from(Param::StaticBurst, 1.0, 0.0).over(0.7).ease(Easing::Steps(3)))
        .at(0.3, Act::param_from(Param::HudFade, 0.0, 1.0).over(1.0))
        .at(0.5, Act::beat("jack-in"));

    // PROBE: quiet approach.
    b.at(1.0, Act::text(TextCell::Phase, "PHASE: PROBE").over(1.0))
        .at(1.0, Act::text(TextCell::ArchitectStatus, "ARCHITECT: PASSIVE // WATCHING").over(1.0))
        .at(1.0, Act::text(TextCell::UserStatus, "STATUS: INFILTRATING").over(1.0))
        .at(1.0, Act::text(TextCell::Threat, "THREAT: MINIMAL").over(1.0))
        .at(1.2, Act::text(TextCell::Log, ">> Establishing secure connection...").over(2.0))
        .at(5.5, Act::text(TextCell::Log, ">> Handshake accepted. Mapping defense lattice...").over(2.0));

    // DENIAL: the firewall notices. Shake and corruption bursts, red alert.
    b.label("denial")?;
    b.at(8.0, Act::beat("denial"))
        .at(8.0, Act::text_colored(TextCell::Phase, "PHASE: DENIAL", red))
        .at(8.0, Act::text_colored(TextCell::ArchitectStatus, "ARCHITECT: ACTIVE // ADAPTING", red))
        .at(8.0, Act::text_colored(TextCell::Threat, "THREAT: HIGH", red))
        .at(8.0, Act::text_colored(TextCell::Log, ">> ACCESS DENIED. FIREWALL ADAPTING. RETRYING...", red))
        .at(8.0, Act::text_colored(TextCell::Alert, "ALERT: SYSTEM LOCKOUT", red))
        .at(8.0, Act::param_from(Param::Shake, 0.0, 1.5).over(0.8).ease(Easing::Steps(8)))
        .at(8.0, Act::param_from(Param::Corruption, 0.0, 1.5).over(0.8).ease(Easing::Steps(8)))
        .at(8.0, Act::param(Param::Danger, 0.6).over(0.5))
        .at(8.0, Act::param(Param::Vignette, 1.5).over(0.5))
        .at(8.5, Act::param(Param::Vignette, 0.8).over(0.5))
        .at(9.0, Act::param(Param::Pulse, 1.0).over(0.2))
        .at(9.2, Act::param(Param::Pulse, 0.0).over(0.6));

    // RECALIBRATION: shadow protocol spins up, the storm settles.
    b.at(13.0, Act::beat("recalibration"))
        .at(13.0, Act::text_colored(TextCell::Phase, "PHASE: RECALIBRATION", yellow))
        .at(13.0, Act::text_colored(TextCell::UserStatus, "STATUS: DEPLOYING SHADOW PROTOCOL", yellow))
        .at(13.0, Act::text_colored(TextCell::Threat, "THREAT: MODERATE", yellow))
        .at(13.0, Act::text_colored(TextCell::Log, ">> SHADOW PROTOCOL INITIATED. Preparing deep infiltration.", yellow))
        .at(13.0, Act::text(TextCell::Alert, ""))
        .at(13.0, Act::param(Param::Shake, 0.2).over(3.0))
        .at(13.0, Act::param(Param::Corruption, 0.1).over(3.0))
        .at(13.0, Act::param(Param::Danger, 0.0).over(2.0))
        .at(13.0, Act::param(Param::Vignette, 0.8).over(1.0));

    // INFILTRATION: clean run through the layers.
    b.at(18.0, Act::beat("infiltration"))
        .at(18.0, Act::text_colored(TextCell::Phase, "PHASE: INFILTRATION", cyan))
        .at(18.0, Act::text_colored(TextCell::UserStatus, "STATUS: BREACHING LAYERS", cyan))
        .at(18.0, Act::text_colored(TextCell::Threat, "THREAT: LOW", cyan))
        .at(18.0, Act::text_colored(TextCell::Log, ">> BYPASSING SECURITY NODES... NO DETECTION.", cyan))
        .at(18.0, Act::param(Param::Shake, 0.0).over(1.0))
        .at(18.0, Act::param(Param::Form, 1.0).over(4.0).ease(Easing::SineInOut));

    // UNKNOWN ENTITY: the title slam.
    b.at(24.0, Act::beat("entity"))
        .at(24.0, Act::text_colored(TextCell::Phase, "PHASE: UNKNOWN ENTITY", red))
        .at(24.0, Act::text_colored(TextCell::ArchitectStatus, "ARCHITECT: DEFENSES COLLAPSED", OK_GREEN))
        .at(24.0, Act::text_colored(TextCell::UserStatus, "STATUS: COMPROMISED", red))
        .at(24.0, Act::text_colored(TextCell::Log, ">> DEFENSES DOWN... But a new signature... NOCTRA...", red))
        .at(24.0, Act::text_colored(TextCell::Alert, "WARNING: HOSTILE AI DETECTED", red))
        .at(24.2, Act::text_colored(TextCell::Title, "NOCTRA", red).ease(Easing::Steps(1)))
        .at(24.2, Act::param_from(Param::Pulse, 1.5, 0.0).over(1.0).ease(Easing::CubicOut))
        .at(24.2, Act::param(Param::Danger, 1.0).over(0.5))
        .at(24.2, Act::color(ColorCell::Far, hostile_rgb).over(1.0));

    // The gate pair: choose a response, then the override key.
    b.at(28.0, Act::gate(GateSpec::Choice(choice_spec(red))));
    b.then(0.5, Act::gate(GateSpec::Typed(typed_spec(cfg, red))));

    Ok(b.build())
}

fn choice_spec(red: [f32; 4]) -> ChoiceSpec {
    let negotiate = branch(|b| {
        b.at(0.0, Act::text_colored(TextCell::Log, ">> NOCTRA: \"NEGOTIATION IS A HUMAN RITUAL.\"", red).over(1.5))
            .at(0.0, Act::param(Param::Danger, 0.4).over(1.0))
            .at(1.5, Act::wait(0.5));
    });
    let resist = branch(|b| {
        b.at(0.0, Act::text_colored(TextCell::Log, ">> COUNTERMEASURES REJECTED. NOCTRA ADAPTS FASTER.", red).over(1.5))
            .at(0.0, Act::param(Param::Shake, 1.0).over(0.3))
            .at(0.3, Act::param(Param::Shake, 0.2).over(1.2))
            .at(1.5, Act::wait(0.5));
    });
    let sever = branch(|b| {
        b.at(0.0, Act::text_colored(TextCell::Log, ">> LINK SEVER FAILED. THE CHANNEL IS NOT YOURS ANYMORE.", red).over(1.5))
            .at(0.0, Act::param(Param::Corruption, 0.8).over(0.4))
            .at(0.4, Act::param(Param::Corruption, 0.1).over(1.1))
            .at(1.5, Act::wait(0.5));
    });
    // Any unrecognized selection reads as hesitation.
    let default_reaction = branch(|b| {
        b.at(0.0, Act::text_colored(TextCell::Log, ">> SILENCE. NOCTRA INTERPRETS HESITATION AS CONSENT.", red).over(1.5))
            .at(1.5, Act::wait(0.5));
    });

    ChoiceSpec {
        question: "NOCTRA OPENS A CHANNEL. RESPOND:".into(),
        options: vec!["NEGOTIATE".into(), "RESIST".into(), "SEVER THE LINK".into()],
        reactions: vec![negotiate, resist, sever],
        default_reaction,
    }
}

fn typed_spec(cfg: &Configuration, red: [f32; 4]) -> TypedSpec {
    let failure_cue = branch(|b| {
        b.at(0.0, Act::text_colored(TextCell::Alert, "INVALID KEY", red))
            .at(0.0, Act::param_from(Param::Danger, 1.8, 1.0).over(0.6).ease(Easing::QuadOut))
            .at(0.0, Act::param_from(Param::Shake, 0.8, 0.0).over(0.4))
            .at(0.8, Act::text(TextCell::Alert, ""));
    });

    let success = branch(|b| {
        b.at(0.0, Act::beat("ejection"))
            .at(0.0, Act::text_colored(
                TextCell::Log,
                ">> NOCTRA IS ASSIMILATING CONNECTION! ESCAPE! ESCAPE!",
                red,
            ))
            .at(0.0, Act::param(Param::Drive, 60.0).over(1.0).ease(Easing::QuartIn))
            .at(0.0, Act::param(Param::Shake, 5.0).over(1.0).ease(Easing::QuadIn))
            .at(0.0, Act::param(Param::Corruption, 20.0).over(1.0).ease(Easing::QuadIn))
            .at(0.0, Act::param(Param::Vignette, 5.0).over(1.0).ease(Easing::QuadIn))
            .at(0.0, Act::param(Param::Collapse, 1.0).over(1.5).ease(Easing::QuadIn))
            .at(0.5, Act::param(Param::HudFade, 0.0).over(0.8).ease(Easing::QuadIn))
            .at(2.2, Act::param(Param::StaticBurst, 1.0).ease(Easing::Steps(1)))
            .at(2.2, Act::wait(0.8));
    });

    TypedSpec {
        prompt: cfg.challenge.prompt.clone(),
        target: cfg.challenge.passphrase.clone(),
        failure_cue,
        success,
    }
}

/// The terminated-stage reboot crawl: progress bar, then diagnostics.
pub fn postamble(cfg: &Configuration) -> Result<Timeline> {
    let cyan = parse_hex_rgba(&cfg.palette.near)?;

    let mut b = TimelineBuilder::new();
    b.at(0.0, Act::param_from(Param::StaticBurst, 0.0, 0.0))
        .at(0.0, Act::param_from(Param::HudFade, 0.0, 1.0).over(0.8))
        .at(0.5, Act::text_colored(TextCell::Title, "// CONNECTION TERMINATED", cyan).over(0.8))
        .at(1.0, Act::text(TextCell::RebootStatus, "REBOOTING INTERFACE...").over(0.8))
        .at(2.0, Act::param_from(Param::Progress, 0.0, 1.0).over(1.5))
        .at(4.0, Act::text(TextCell::RebootStatus, "REBOOT COMPLETE. RUNNING DIAGNOSTICS...").over(1.0));
    b.label("diagnostics")?;
    b.after("diagnostics", 0.0, Act::text(TextCell::Diagnostics, "// MEMORY_CHECK........ [OK]").over(0.5))?
        .then(0.1, Act::text(TextCell::Diagnostics, "// RENDERER_INIT....... [OK]").over(0.5))
        .then(0.1, Act::text(TextCell::Diagnostics, "// INTERFACE_LINK...... [ESTABLISHED]").over(0.5))
        .then(0.1, Act::text_colored(TextCell::Diagnostics, "// ALL SYSTEMS NOMINAL.", OK_GREEN).over(0.5))
        .then(0.5, Act::param(Param::HudFade, 0.0).over(1.0));

    Ok(b.build())
}

/// Slow lateral drift the camera follows across the whole cinematic; pointer
/// parallax is layered on top of these waypoints.
pub fn camera_path() -> CameraPath {
    CameraPath::new(vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(4.0, 1.5, 0.0),
        Vec3::new(-3.0, -2.0, 0.0),
        Vec3::new(2.0, 3.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
    ])
}

fn branch(build: impl FnOnce(&mut TimelineBuilder)) -> Timeline {
    let mut b = TimelineBuilder::new();
    build(&mut b);
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::Effect;

    #[test]
    fn cinematic_builds_and_ends_on_the_typed_gate() {
        let cfg = Configuration::default();
        let tl = cinematic(&cfg).unwrap();
        assert!(tl.len() > 30);
        let gates: Vec<&str> = tl
            .actions()
            .iter()
            .filter_map(|a| match &a.effect {
                Effect::Gate(spec) => Some(spec.kind()),
                _ => None,
            })
            .collect();
        assert_eq!(gates, vec!["choice", "typed"]);
    }

    #[test]
    fn offsets_never_decrease() {
        let cfg = Configuration::default();
        for tl in [cinematic(&cfg).unwrap(), postamble(&cfg).unwrap()] {
            let starts: Vec<f32> = tl.actions().iter().map(|a| a.start).collect();
            assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn postamble_fades_the_hud_out_last() {
        let cfg = Configuration::default();
        let tl = postamble(&cfg).unwrap();
        let last = tl.actions().last().unwrap();
        assert!(matches!(
            last.effect,
            Effect::Param {
                key: Param::HudFade,
                ..
            }
        ));
    }
}
