//! YAML configuration with per-section defaults and a validation pass.
//! Everything here is a tunable; the narrative itself lives in `script.rs`.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, ensure};
use palette::{LinSrgb, Srgb};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    pub point_field: PointFieldConfig,
    pub palette: PaletteConfig,
    pub camera: CameraConfig,
    pub challenge: ChallengeConfig,
    pub post: PostConfig,
    pub hud: HudConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PointFieldConfig {
    /// Number of points in the field. Zero is allowed and renders nothing.
    pub points: u32,
    /// Concentric cylindrical shells the points are distributed across.
    pub layers: u32,
    /// Extent of the tunnel along z.
    pub tunnel_length: f32,
    /// Radial distance between adjacent shells.
    pub shell_step: f32,
    /// Random radial jitter applied per point.
    pub shell_jitter: f32,
    /// Points closer than this get a connecting line (synapse). The pairing
    /// scan is O(n²) and runs once at mount.
    pub link_distance: f32,
}

impl Default for PointFieldConfig {
    fn default() -> Self {
        Self {
            points: 20_000,
            layers: 12,
            tunnel_length: 400.0,
            shell_step: 6.0,
            shell_jitter: 2.5,
            link_distance: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PaletteConfig {
    /// Base point color near the camera.
    pub near: String,
    /// Point color toward the far plane.
    pub far: String,
    /// Hostile accent mixed in by the `danger` uniform.
    pub hostile: String,
    /// Warning accent used by HUD beats.
    pub warning: String,
    /// Fraction of points tinted hostile at generation time.
    pub hostile_weight: f32,
    /// Fraction of points tinted white as highlights.
    pub highlight_weight: f32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            near: "#00f6ff".into(),
            far: "#ffffff".into(),
            hostile: "#ff4655".into(),
            warning: "#ffff00".into(),
            hostile_weight: 0.1,
            highlight_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Pointer parallax amplitude in world units.
    pub parallax: f32,
    /// Exponential chase rate toward the parallax target, per second.
    pub chase_rate: f32,
    /// Baseline forward speed along the tunnel, world units per second.
    pub base_speed: f32,
    /// Extra speed while the pointer is held (flow state).
    pub flow_boost: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            parallax: 20.0,
            chase_rate: 3.0,
            base_speed: 9.0,
            flow_boost: 48.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ChallengeConfig {
    pub prompt: String,
    /// Compared case-insensitively against the typed accumulator.
    pub passphrase: String,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            prompt: "ENTER OVERRIDE KEY".into(),
            passphrase: "OVERRIDE".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PostConfig {
    pub bloom_strength: f32,
    pub bloom_threshold: f32,
    pub vignette_darkness: f32,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            bloom_strength: 0.7,
            bloom_threshold: 0.2,
            vignette_darkness: 0.8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HudConfig {
    /// Optional font family name; falls back to DejaVu Sans, then sans-serif.
    pub font: Option<String>,
}

impl Configuration {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("failed to parse configuration YAML")
    }

    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.point_field.points <= 200_000,
            "point-field.points must be at most 200000 (got {})",
            self.point_field.points
        );
        ensure!(
            self.point_field.points == 0 || self.point_field.layers >= 1,
            "point-field.layers must be at least 1 when points are present"
        );
        ensure!(
            self.point_field.tunnel_length > 0.0,
            "point-field.tunnel-length must be positive"
        );
        ensure!(
            self.point_field.link_distance >= 0.0,
            "point-field.link-distance must not be negative"
        );
        let weights = self.palette.hostile_weight + self.palette.highlight_weight;
        ensure!(
            (0.0..=1.0).contains(&self.palette.hostile_weight)
                && (0.0..=1.0).contains(&self.palette.highlight_weight)
                && weights <= 1.0,
            "palette weights must be fractions summing to at most 1.0"
        );
        ensure!(
            !self.challenge.passphrase.trim().is_empty(),
            "challenge.passphrase must not be empty"
        );
        for (name, value) in [
            ("palette.near", &self.palette.near),
            ("palette.far", &self.palette.far),
            ("palette.hostile", &self.palette.hostile),
            ("palette.warning", &self.palette.warning),
        ] {
            parse_hex_rgb(value).with_context(|| format!("{name} is not a valid hex color"))?;
        }
        Ok(self)
    }
}

/// Parse `#rrggbb` into linear RGB the shaders consume.
pub fn parse_hex_rgb(input: &str) -> Result<[f32; 3]> {
    let rgb = Srgb::<u8>::from_str(input.trim())
        .map_err(|err| anyhow::anyhow!("bad hex color {input:?}: {err}"))?;
    let rgb: Srgb<f32> = rgb.into_format();
    let linear: LinSrgb<f32> = rgb.into_linear();
    Ok([linear.red, linear.green, linear.blue])
}

/// Same, with an alpha channel for HUD tints.
pub fn parse_hex_rgba(input: &str) -> Result<[f32; 4]> {
    let [r, g, b] = parse_hex_rgb(input)?;
    Ok([r, g, b, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Configuration::default().validated().unwrap();
    }

    #[test]
    fn hex_parsing_round_trips_white() {
        let white = parse_hex_rgb("#ffffff").unwrap();
        for channel in white {
            assert!((channel - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bad_color_is_rejected() {
        let mut cfg = Configuration::default();
        cfg.palette.near = "not-a-color".into();
        assert!(cfg.validated().is_err());
    }
}
