//! Point-field generation: the neural-tunnel substrate the cinematic flies
//! through. Points sit on concentric cylindrical shells along z; pairs closer
//! than the link threshold get a connecting "synapse" line. Generation runs
//! once at mount, so the O(n²) pairing scan is paid a single time.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::info;

use crate::config::{Configuration, parse_hex_rgb};

/// One generated point: position, size multiplier, linear RGB tint.
#[derive(Debug, Clone, Copy)]
pub struct FieldPoint {
    pub position: Vec3,
    pub size: f32,
    pub color: [f32; 3],
}

/// The generated geometry. Empty when the configured point count is zero;
/// the renderer draws empty buffers without error.
#[derive(Debug, Clone, Default)]
pub struct PointField {
    pub points: Vec<FieldPoint>,
    /// Index pairs into `points` for the synapse line list.
    pub links: Vec<(u32, u32)>,
}

impl PointField {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Generate the field. Deterministic for a given seed.
pub fn generate(cfg: &Configuration, seed: u64) -> anyhow::Result<PointField> {
    let pf = &cfg.point_field;
    if pf.points == 0 {
        return Ok(PointField::default());
    }

    let base = parse_hex_rgb(&cfg.palette.near)?;
    let highlight = parse_hex_rgb(&cfg.palette.far)?;
    let hostile = parse_hex_rgb(&cfg.palette.hostile)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(pf.points as usize);
    for _ in 0..pf.points {
        let layer = rng.random_range(0..pf.layers.max(1));
        let radius =
            layer as f32 * pf.shell_step + rng.random_range(-pf.shell_jitter..=pf.shell_jitter);
        let angle = rng.random_range(0.0..TAU);
        let z = rng.random_range(-pf.tunnel_length * 0.5..pf.tunnel_length * 0.5);

        let roll: f32 = rng.random_range(0.0..1.0);
        let color = if roll < cfg.palette.hostile_weight {
            hostile
        } else if roll < cfg.palette.hostile_weight + cfg.palette.highlight_weight {
            highlight
        } else {
            base
        };

        points.push(FieldPoint {
            position: Vec3::new(radius * angle.cos(), radius * angle.sin(), z),
            size: rng.random_range(0.5..1.5),
            color,
        });
    }

    let links = link_pairs(&points, pf.link_distance);
    info!(
        points = points.len(),
        links = links.len(),
        seed,
        "point field generated"
    );
    Ok(PointField { points, links })
}

/// All index pairs closer than `threshold`. O(n²) by design; runs at setup
/// only.
fn link_pairs(points: &[FieldPoint], threshold: f32) -> Vec<(u32, u32)> {
    if threshold <= 0.0 {
        return Vec::new();
    }
    let threshold_sq = threshold * threshold;
    let mut links = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if points[i].position.distance_squared(points[j].position) < threshold_sq {
                links.push((i as u32, j as u32));
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg(points: u32) -> Configuration {
        let mut cfg = Configuration::default();
        cfg.point_field.points = points;
        cfg.point_field.layers = 3;
        cfg.point_field.tunnel_length = 50.0;
        cfg.point_field.link_distance = 10.0;
        cfg
    }

    #[test]
    fn zero_points_yields_empty_buffers() {
        let field = generate(&small_cfg(0), 7).unwrap();
        assert!(field.is_empty());
        assert!(field.links.is_empty());
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = generate(&small_cfg(64), 42).unwrap();
        let b = generate(&small_cfg(64), 42).unwrap();
        assert_eq!(a.points.len(), b.points.len());
        for (pa, pb) in a.points.iter().zip(&b.points) {
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.color, pb.color);
        }
        assert_eq!(a.links, b.links);
    }

    #[test]
    fn points_stay_inside_the_tunnel() {
        let cfg = small_cfg(256);
        let field = generate(&cfg, 1).unwrap();
        let half = cfg.point_field.tunnel_length * 0.5;
        let max_radius = (cfg.point_field.layers as f32) * cfg.point_field.shell_step
            + cfg.point_field.shell_jitter;
        for p in &field.points {
            assert!(p.position.z.abs() <= half);
            assert!(p.position.truncate().length() <= max_radius + 1e-3);
        }
    }

    #[test]
    fn links_respect_the_distance_threshold() {
        let cfg = small_cfg(128);
        let field = generate(&cfg, 3).unwrap();
        for &(i, j) in &field.links {
            let d = field.points[i as usize]
                .position
                .distance(field.points[j as usize].position);
            assert!(d < cfg.point_field.link_distance);
        }
    }
}
