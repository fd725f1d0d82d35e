//! The windowed application: stage driving, input routing, and the render
//! loop. GPU-free playback state lives in [`Playback`] so the sequencer,
//! gate and teardown behavior stay testable without a window.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::Vec2;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::config::{Configuration, parse_hex_rgb};
use crate::hud::{Hud, HudFrame};
use crate::render::camera::CameraRig;
use crate::render::{Gfx, SceneRenderer, point_field};
use crate::script;
use crate::sequencer::params::{Param, ParamSet};
use crate::sequencer::text::TextBank;
use crate::sequencer::timeline::Timeline;
use crate::sequencer::{GateInput, Sequencer};
use crate::stage::{Stage, StageController};

/// A running timeline plus the cells it writes. One exists for the cinematic
/// and a fresh one for the terminated-stage postamble.
pub struct Playback {
    sequencer: Sequencer,
    params: ParamSet,
    text: TextBank,
    torn_down: bool,
}

impl Playback {
    pub fn new(timeline: Timeline, near: [f32; 3], far: [f32; 3]) -> Self {
        Self {
            sequencer: Sequencer::new(timeline),
            params: ParamSet::new(near, far),
            text: TextBank::new(),
            torn_down: false,
        }
    }

    /// Step the master clock and the sequencer. No-op after teardown, so a
    /// frame that slips in after shutdown has no effect.
    pub fn advance(&mut self, dt: f32) {
        if self.torn_down {
            return;
        }
        let time = self.params.get(Param::Time);
        self.params.set(Param::Time, time + dt);
        self.sequencer.advance(dt, &mut self.params, &mut self.text);
    }

    /// Kill the sequencer and mark this playback dead. Returns `true` the
    /// first time; repeat calls are no-ops.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.sequencer.kill();
        true
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.sequencer
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    pub fn text(&self) -> &TextBank {
        &self.text
    }
}

pub struct LandingApp {
    cfg: Configuration,
    seed: u64,
    stages: StageController,
    window: Option<Arc<Window>>,
    gfx: Option<Gfx>,
    hud: Option<Hud>,
    scene: Option<SceneRenderer>,
    rig: Option<CameraRig>,
    playback: Option<Playback>,
    rng: StdRng,
    last_frame: Option<Instant>,
    pointer_held: bool,
}

impl LandingApp {
    pub fn new(cfg: Configuration, seed: u64, on_finish: impl FnOnce() + 'static) -> Self {
        Self {
            cfg,
            seed,
            stages: StageController::new(on_finish),
            window: None,
            gfx: None,
            hud: None,
            scene: None,
            rig: None,
            playback: None,
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            last_frame: None,
            pointer_held: false,
        }
    }

    fn palette_pair(&self) -> Result<([f32; 3], [f32; 3])> {
        Ok((
            parse_hex_rgb(&self.cfg.palette.near)?,
            parse_hex_rgb(&self.cfg.palette.far)?,
        ))
    }

    /// Boot -> anim: generate the field, mount the scene renderer, arm the
    /// cinematic timeline.
    fn begin_cinematic(&mut self) {
        if !self.stages.start() {
            return;
        }
        let result: Result<()> = (|| {
            let gfx = self.gfx.as_ref().context("gpu not initialized")?;
            let field = point_field::generate(&self.cfg, self.seed)?;
            let scene = SceneRenderer::new(gfx, &self.cfg, &field)?;
            let timeline = script::cinematic(&self.cfg)?;
            let (near, far) = self.palette_pair()?;
            self.rig = Some(CameraRig::new(
                self.cfg.camera.clone(),
                self.cfg.point_field.tunnel_length,
                script::camera_path(),
            ));
            self.scene = Some(scene);
            self.playback = Some(Playback::new(timeline, near, far));
            self.last_frame = None;
            Ok(())
        })();
        if let Err(err) = result {
            error!(error = ?err, "failed to start cinematic");
        }
    }

    /// Anim -> terminated: tear the cinematic down and arm the reboot crawl.
    fn begin_postamble(&mut self) {
        if !self.stages.cinematic_complete() {
            return;
        }
        if let Some(playback) = self.playback.as_mut() {
            playback.teardown();
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.stop();
        }
        self.scene = None;
        self.rig = None;

        let result: Result<()> = (|| {
            let timeline = script::postamble(&self.cfg)?;
            let (near, far) = self.palette_pair()?;
            self.playback = Some(Playback::new(timeline, near, far));
            Ok(())
        })();
        if let Err(err) = result {
            error!(error = ?err, "failed to start postamble");
        }
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(playback) = self.playback.as_mut() {
            playback.teardown();
        }
        if self.stages.postamble_complete() {
            info!("landing sequence complete");
            event_loop.exit();
        }
    }

    fn frame_dt(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map(|prev| (now - prev).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        // Long stalls (window drags, suspends) step at most a quarter second.
        dt.min(0.25)
    }

    fn step(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.frame_dt();
        match self.stages.stage() {
            Stage::Boot | Stage::Done => {}
            Stage::Anim => {
                let Some(playback) = self.playback.as_mut() else {
                    return;
                };
                playback.advance(dt);

                // Flow chases the pointer-held intent; the rig and shader
                // both read the smoothed value.
                let target = if self.pointer_held { 1.0 } else { 0.0 };
                let flow = playback.params.get(Param::Flow);
                let blend = 1.0 - (-4.0 * dt).exp();
                playback
                    .params
                    .set(Param::Flow, flow + (target - flow) * blend);

                let duration = playback.sequencer.duration().max(1e-3);
                let path_t = playback.sequencer.clock() / duration;
                let (flow, shake, drive) = (
                    playback.params.get(Param::Flow),
                    playback.params.get(Param::Shake),
                    playback.params.get(Param::Drive),
                );
                if let Some(rig) = self.rig.as_mut() {
                    rig.update(dt, path_t, flow, shake, drive, &mut self.rng);
                }

                if playback.is_finished() {
                    self.begin_postamble();
                }
            }
            Stage::Terminated => {
                let Some(playback) = self.playback.as_mut() else {
                    return;
                };
                playback.advance(dt);
                if playback.is_finished() {
                    self.finish(event_loop);
                }
            }
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        self.step(event_loop);

        let Some(window) = self.window.as_ref() else {
            return;
        };
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };

        let frame = match gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("surface lost; reconfiguring");
                let size = window.inner_size();
                gfx.resize(size.width, size.height);
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("surface reported an unknown error; retrying");
                let size = window.inner_size();
                gfx.resize(size.width, size.height);
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("landing-encoder"),
            });

        let stage = self.stages.stage();
        let mut idle = ParamSet::new([0.0; 3], [0.0; 3]);
        idle.set(Param::HudFade, 1.0);
        let idle_text = TextBank::new();
        let (params, text, gate) = match self.playback.as_ref() {
            Some(playback) => (
                playback.params(),
                playback.text(),
                playback.sequencer().pending_gate(),
            ),
            None => (&idle, &idle_text, None),
        };

        let mut scene_drawn = false;
        if stage == Stage::Anim {
            if let (Some(scene), Some(rig)) = (self.scene.as_mut(), self.rig.as_ref()) {
                scene.render(gfx, &mut encoder, params, rig, &view);
                scene_drawn = !scene.is_stopped();
            }
        }

        if let Some(hud) = self.hud.as_mut() {
            let clear = (!scene_drawn).then_some(wgpu::Color {
                r: 0.004,
                g: 0.006,
                b: 0.012,
                a: 1.0,
            });
            let hud_frame = HudFrame {
                text,
                params,
                gate,
                stage,
            };
            hud.render(&mut encoder, &view, &hud_frame, clear);
        }

        gfx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn handle_resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if let Some(gfx) = self.gfx.as_mut() {
            gfx.resize(size.width, size.height);
            if let Some(scene) = self.scene.as_mut() {
                scene.resize(gfx);
            }
        }
        if let Some(hud) = self.hud.as_mut() {
            hud.resize(size);
        }
    }

    fn handle_key(&mut self, key: Key) {
        match self.stages.stage() {
            Stage::Boot => {
                if matches!(key, Key::Named(NamedKey::Enter) | Key::Named(NamedKey::Space)) {
                    self.begin_cinematic();
                }
            }
            Stage::Anim => self.route_gate_key(key),
            Stage::Terminated | Stage::Done => {}
        }
    }

    fn route_gate_key(&mut self, key: Key) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        let is_choice = matches!(
            playback.sequencer().pending_gate(),
            Some(crate::gate::ActiveGate::Choice(_))
        );
        if playback.sequencer().pending_gate().is_none() {
            return;
        }
        match key {
            Key::Named(NamedKey::Enter) => {
                playback.sequencer_mut().gate_input(GateInput::Submit);
            }
            Key::Named(NamedKey::Backspace) => {
                playback.sequencer_mut().gate_input(GateInput::Backspace);
            }
            Key::Character(text) => {
                for c in text.chars() {
                    if is_choice {
                        // Digit keys 1..=9 select an option.
                        if let Some(digit) = c.to_digit(10).filter(|d| (1..=9).contains(d)) {
                            playback.sequencer_mut().resolve_choice(digit as usize - 1);
                        }
                    } else {
                        playback.sequencer_mut().gate_input(GateInput::Char(c));
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_pointer_button(&mut self, state: ElementState) {
        self.pointer_held = state == ElementState::Pressed;
        if self.stages.stage() == Stage::Boot && state == ElementState::Pressed {
            self.begin_cinematic();
        }
    }
}

impl ApplicationHandler for LandingApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = WindowAttributes::default().with_title("NOCTRA//TERMINAL");
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!(error = %err, "failed to create window");
                event_loop.exit();
                return;
            }
        };
        match Gfx::new(window.clone()) {
            Ok(gfx) => {
                let hud = Hud::new(
                    &gfx.device,
                    &gfx.queue,
                    gfx.surface_config.format,
                    &self.cfg.hud,
                );
                self.gfx = Some(gfx);
                self.hud = Some(hud);
            }
            Err(err) => {
                error!(error = ?err, "gpu initialization failed");
                event_loop.exit();
                return;
            }
        }
        let size = window.inner_size();
        self.window = Some(window);
        self.handle_resize(size);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
                        event_loop.exit();
                        return;
                    }
                    self.handle_key(event.logical_key);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let size = window.inner_size();
                if size.width > 0 && size.height > 0 {
                    let ndc = Vec2::new(
                        position.x as f32 / size.width as f32 * 2.0 - 1.0,
                        1.0 - position.y as f32 / size.height as f32 * 2.0,
                    );
                    if let Some(rig) = self.rig.as_mut() {
                        rig.set_pointer(ndc);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.handle_pointer_button(state);
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

/// Build the event loop, run the whole landing sequence, and invoke
/// `on_finish` when the reboot crawl completes.
pub fn run_windowed(cfg: Configuration, seed: u64, on_finish: impl FnOnce() + 'static) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to build event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = LandingApp::new(cfg, seed, on_finish);
    event_loop
        .run_app(&mut app)
        .context("event loop failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::easing::Easing;
    use crate::sequencer::timeline::{Act, TimelineBuilder};

    fn short_timeline() -> Timeline {
        let mut b = TimelineBuilder::new();
        b.at(0.0, Act::param(Param::Opacity, 0.5).over(1.0).ease(Easing::Linear));
        b.build()
    }

    #[test]
    fn playback_advances_the_master_time_cell() {
        let mut playback = Playback::new(short_timeline(), [0.0; 3], [1.0; 3]);
        playback.advance(0.25);
        playback.advance(0.25);
        assert!((playback.params().get(Param::Time) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn teardown_is_idempotent_and_freezes_playback() {
        let mut playback = Playback::new(short_timeline(), [0.0; 3], [1.0; 3]);
        playback.advance(0.5);
        assert!(playback.teardown());
        assert!(!playback.teardown());

        let frozen = playback.params().get(Param::Time);
        playback.advance(1.0);
        assert_eq!(playback.params().get(Param::Time), frozen);
        assert!(playback.is_torn_down());
    }
}
