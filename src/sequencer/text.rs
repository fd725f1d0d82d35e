//! TextTarget bank: named mutable string cells the sequencer writes and the
//! HUD reads. The sequencer never touches a rendering surface directly; it
//! only mutates these cells (typewriter reveals included), which keeps the
//! timeline core testable without a window.

/// The fixed set of HUD text cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextCell {
    Phase,
    ArchitectStatus,
    UserStatus,
    Threat,
    Alert,
    Log,
    Title,
    Prompt,
    RebootStatus,
    Diagnostics,
}

pub const TEXT_CELLS: [TextCell; 10] = [
    TextCell::Phase,
    TextCell::ArchitectStatus,
    TextCell::UserStatus,
    TextCell::Threat,
    TextCell::Alert,
    TextCell::Log,
    TextCell::Title,
    TextCell::Prompt,
    TextCell::RebootStatus,
    TextCell::Diagnostics,
];

fn index(cell: TextCell) -> usize {
    match cell {
        TextCell::Phase => 0,
        TextCell::ArchitectStatus => 1,
        TextCell::UserStatus => 2,
        TextCell::Threat => 3,
        TextCell::Alert => 4,
        TextCell::Log => 5,
        TextCell::Title => 6,
        TextCell::Prompt => 7,
        TextCell::RebootStatus => 8,
        TextCell::Diagnostics => 9,
    }
}

/// One cell: current content plus an RGBA tint the HUD applies when drawing.
#[derive(Debug, Clone)]
pub struct TextSlot {
    pub content: String,
    pub color: [f32; 4],
}

impl Default for TextSlot {
    fn default() -> Self {
        Self {
            content: String::new(),
            color: [0.0, 0.96, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextBank {
    slots: [TextSlot; 10],
}

impl TextBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: TextCell) -> &TextSlot {
        &self.slots[index(cell)]
    }

    pub fn set(&mut self, cell: TextCell, content: impl Into<String>) {
        self.slots[index(cell)].content = content.into();
    }

    pub fn set_color(&mut self, cell: TextCell, color: [f32; 4]) {
        self.slots[index(cell)].color = color;
    }

    /// Typewriter reveal: show the first `floor(t * len)` characters of
    /// `full`, the whole string at `t >= 1`. Operates on characters, not
    /// bytes, so multi-byte glyphs never get split.
    pub fn reveal(&mut self, cell: TextCell, full: &str, t: f32) {
        let chars: Vec<char> = full.chars().collect();
        let shown = if t >= 1.0 {
            chars.len()
        } else {
            ((t.max(0.0) * chars.len() as f32).floor() as usize).min(chars.len())
        };
        self.slots[index(cell)].content = chars[..shown].iter().collect();
    }

    pub fn clear(&mut self, cell: TextCell) {
        self.slots[index(cell)].content.clear();
    }
}
