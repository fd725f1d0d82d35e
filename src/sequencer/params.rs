//! Shader uniform set: the named parameter cells shared between the sequencer
//! and the render loop.
//!
//! These cells are the only channel from the timeline into the renderer. The
//! sequencer tweens every cell except [`Param::Time`], which the render loop
//! writes from its elapsed-time accumulator; nothing else may write `time`, and
//! the render loop writes nothing else, so no cell ever has two writers in the
//! same frame.

/// Scalar parameter cells consumed by the shaders and the camera rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// Elapsed seconds; written by the render loop only.
    Time,
    /// Global point opacity.
    Opacity,
    /// Point-size pulse driven during alert beats.
    Pulse,
    /// Pulls the field toward the tunnel axis during the ejection.
    Collapse,
    /// Sinusoidal displacement magnitude ("signal corruption").
    Corruption,
    /// Morph between the raw shell layout and the flow-aligned layout.
    Form,
    /// Mixes the hostile color into the palette.
    Danger,
    /// Flow-state acceleration, 0 or easing toward 1 while the pointer is held.
    Flow,
    /// Camera shake magnitude; the camera rig reads this each frame.
    Shake,
    /// Extra forward drive along the camera path (the escape plunge).
    Drive,
    /// HUD overlay alpha.
    HudFade,
    /// Vignette darkness for the post chain.
    Vignette,
    /// Full-screen static burst at the end of the ejection.
    StaticBurst,
    /// Reboot progress for the terminated-stage bar.
    Progress,
}

/// Color cells interpolated in the point shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorCell {
    /// Near-plane palette color.
    Near,
    /// Far-plane palette color.
    Far,
}

const PARAM_COUNT: usize = 14;

fn index(param: Param) -> usize {
    match param {
        Param::Time => 0,
        Param::Opacity => 1,
        Param::Pulse => 2,
        Param::Collapse => 3,
        Param::Corruption => 4,
        Param::Form => 5,
        Param::Danger => 6,
        Param::Flow => 7,
        Param::Shake => 8,
        Param::Drive => 9,
        Param::HudFade => 10,
        Param::Vignette => 11,
        Param::StaticBurst => 12,
        Param::Progress => 13,
    }
}

/// The full uniform set. Values are not validated beyond being finite floats;
/// out-of-range values are visually tolerated (they drive corruption looks).
#[derive(Debug, Clone)]
pub struct ParamSet {
    values: [f32; PARAM_COUNT],
    near: [f32; 3],
    far: [f32; 3],
}

impl ParamSet {
    pub fn new(near: [f32; 3], far: [f32; 3]) -> Self {
        let mut values = [0.0; PARAM_COUNT];
        values[index(Param::Opacity)] = 1.0;
        values[index(Param::Vignette)] = 0.8;
        Self { values, near, far }
    }

    pub fn get(&self, param: Param) -> f32 {
        self.values[index(param)]
    }

    pub fn set(&mut self, param: Param, value: f32) {
        self.values[index(param)] = value;
    }

    pub fn color(&self, cell: ColorCell) -> [f32; 3] {
        match cell {
            ColorCell::Near => self.near,
            ColorCell::Far => self.far,
        }
    }

    pub fn set_color(&mut self, cell: ColorCell, value: [f32; 3]) {
        match cell {
            ColorCell::Near => self.near = value,
            ColorCell::Far => self.far = value,
        }
    }
}

impl Default for ParamSet {
    fn default() -> Self {
        Self::new([0.0, 0.96, 1.0], [1.0, 0.27, 0.33])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_visible() {
        let params = ParamSet::default();
        assert_eq!(params.get(Param::Opacity), 1.0);
        assert_eq!(params.get(Param::Corruption), 0.0);
        assert_eq!(params.get(Param::Time), 0.0);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut params = ParamSet::default();
        params.set(Param::Danger, 2.5);
        assert_eq!(params.get(Param::Danger), 2.5);
        params.set_color(ColorCell::Far, [1.0, 0.0, 0.0]);
        assert_eq!(params.color(ColorCell::Far), [1.0, 0.0, 0.0]);
    }
}
