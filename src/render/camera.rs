//! Camera rig: a waypoint path, pointer parallax, forward travel through the
//! tunnel, and shake jitter. The sequencer writes its targets through the
//! `shake` and `drive` parameter cells; the rig reads the latest values each
//! frame — both run on the same thread, so no locking is involved.

use std::f32::consts::FRAC_PI_3;

use glam::{Mat4, Vec2, Vec3};
use rand::Rng;

use crate::config::CameraConfig;

/// Ordered 3-D waypoints the camera drifts through over the timeline.
#[derive(Debug, Clone, Default)]
pub struct CameraPath {
    waypoints: Vec<Vec3>,
}

impl CameraPath {
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self { waypoints }
    }

    /// Piecewise-linear sample at `t` in [0, 1]. Empty paths sit at the
    /// origin; out-of-range `t` clamps to the ends.
    pub fn sample(&self, t: f32) -> Vec3 {
        match self.waypoints.len() {
            0 => Vec3::ZERO,
            1 => self.waypoints[0],
            n => {
                let t = t.clamp(0.0, 1.0) * (n - 1) as f32;
                let idx = (t.floor() as usize).min(n - 2);
                let frac = t - idx as f32;
                self.waypoints[idx].lerp(self.waypoints[idx + 1], frac)
            }
        }
    }
}

pub struct CameraRig {
    cfg: CameraConfig,
    path: CameraPath,
    tunnel_length: f32,
    position: Vec3,
    roll: f32,
    travel: f32,
    pointer: Vec2,
}

impl CameraRig {
    pub fn new(cfg: CameraConfig, tunnel_length: f32, path: CameraPath) -> Self {
        let start = path.sample(0.0);
        Self {
            cfg,
            path,
            tunnel_length: tunnel_length.max(1.0),
            position: Vec3::new(start.x, start.y, tunnel_length * 0.25),
            roll: 0.0,
            travel: 0.0,
            pointer: Vec2::ZERO,
        }
    }

    /// Latest pointer position in normalized device coordinates (-1..1).
    pub fn set_pointer(&mut self, ndc: Vec2) {
        self.pointer = ndc;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    /// Advance one frame. `path_t` is normalized timeline progress, `flow`,
    /// `shake` and `drive` are the current parameter cell values.
    pub fn update(
        &mut self,
        dt: f32,
        path_t: f32,
        flow: f32,
        shake: f32,
        drive: f32,
        rng: &mut impl Rng,
    ) {
        let speed = self.cfg.base_speed + flow * self.cfg.flow_boost + drive;
        self.travel += speed * dt;

        let half = self.tunnel_length * 0.5;
        let mut z = self.tunnel_length * 0.25 - self.travel;
        // Wrap so the tunnel reads as endless.
        z = (z + half).rem_euclid(self.tunnel_length) - half;

        let drift = self.path.sample(path_t);
        let target = Vec2::new(
            drift.x + self.pointer.x * self.cfg.parallax,
            drift.y + self.pointer.y * self.cfg.parallax,
        );
        let blend = 1.0 - (-self.cfg.chase_rate * dt).exp();
        self.position.x += (target.x - self.position.x) * blend;
        self.position.y += (target.y - self.position.y) * blend;
        self.position.z = z;

        if shake > 0.0 {
            self.roll += (rng.random_range(0.0..1.0) - 0.5) * shake * 0.05;
            self.position.x += (rng.random_range(0.0..1.0) - 0.5) * shake;
            self.position.y += (rng.random_range(0.0..1.0) - 0.5) * shake * 0.5;
        } else {
            self.roll += (0.0 - self.roll) * blend;
        }
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(FRAC_PI_3 * 1.125, aspect.max(1e-3), 0.1, 1000.0);
        let view = Mat4::from_rotation_z(-self.roll) * Mat4::from_translation(-self.position);
        proj * view
    }
}
