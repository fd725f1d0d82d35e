//! Terminal-styled HUD rendered with `glyphon`: the status row, narrative
//! title and log lines, gate prompts, and the reboot diagnostics crawl. Every
//! string comes out of the text bank; the only numeric inputs are the
//! `hud-fade` and `progress` parameter cells.

use fontdb::{Database, Family, Query};
use glyphon::cosmic_text::Align;
use glyphon::{
    Attrs, Buffer, Cache, Color, FamilyOwned, FontSystem, Metrics, Resolution, Shaping, SwashCache,
    TextArea, TextAtlas, TextBounds, TextRenderer, Viewport, Wrap,
};
use tracing::warn;
use winit::dpi::PhysicalSize;

use crate::config::HudConfig;
use crate::gate::ActiveGate;
use crate::sequencer::params::{Param, ParamSet};
use crate::sequencer::text::{TextBank, TextCell};
use crate::stage::Stage;

const PROGRESS_SLOTS: usize = 24;

/// Everything the HUD reads for one frame.
pub struct HudFrame<'a> {
    pub text: &'a TextBank,
    pub params: &'a ParamSet,
    pub gate: Option<&'a ActiveGate>,
    pub stage: Stage,
}

/// One positioned text block. Rebuilt every frame; the glyphon buffers
/// themselves persist.
struct Block {
    buffer: Buffer,
    top: f32,
    color: Color,
}

pub struct Hud {
    device: wgpu::Device,
    queue: wgpu::Queue,
    viewport: Viewport,
    atlas: TextAtlas,
    text_renderer: TextRenderer,
    font_system: FontSystem,
    swash_cache: SwashCache,
    font_family: FamilyOwned,
    buffers: Vec<Buffer>,
    size: PhysicalSize<u32>,
}

impl Hud {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        cfg: &HudConfig,
    ) -> Self {
        let mut font_system = FontSystem::new();
        font_system.db_mut().load_system_fonts();
        let font_family = resolve_font_family(&font_system, cfg.font.as_deref());

        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, format);
        let text_renderer =
            TextRenderer::new(&mut atlas, device, wgpu::MultisampleState::default(), None);
        let swash_cache = SwashCache::new();

        let buffers = (0..8)
            .map(|_| {
                let mut buffer = Buffer::new(&mut font_system, Metrics::new(16.0, 20.0));
                buffer.set_wrap(&mut font_system, Wrap::WordOrGlyph);
                buffer
            })
            .collect();

        Self {
            device: device.clone(),
            queue: queue.clone(),
            viewport,
            atlas,
            text_renderer,
            font_system,
            swash_cache,
            font_family,
            buffers,
            size: PhysicalSize::new(0, 0),
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
    }

    /// Render the HUD on top of `target_view`. `clear` paints the background
    /// first (boot and terminated stages own the whole frame); `None` loads
    /// whatever the scene pass left behind.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
        frame: &HudFrame<'_>,
        clear: Option<wgpu::Color>,
    ) {
        if self.size.width == 0 || self.size.height == 0 {
            return;
        }

        let fade = frame.params.get(Param::HudFade).clamp(0.0, 1.0);
        let blocks = self.layout(frame, fade);

        self.viewport.update(
            &self.queue,
            Resolution {
                width: self.size.width,
                height: self.size.height,
            },
        );

        let bounds = TextBounds {
            left: 0,
            top: 0,
            right: self.size.width as i32,
            bottom: self.size.height as i32,
        };
        let areas: Vec<TextArea<'_>> = blocks
            .iter()
            .map(|block| TextArea {
                buffer: &block.buffer,
                left: 0.0,
                top: block.top,
                scale: 1.0,
                bounds,
                default_color: block.color,
                custom_glyphs: &[],
            })
            .collect();

        if let Err(err) = self.text_renderer.prepare(
            &self.device,
            &self.queue,
            &mut self.font_system,
            &mut self.atlas,
            &self.viewport,
            areas,
            &mut self.swash_cache,
        ) {
            warn!(error = %err, "hud_prepare_failed");
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hud-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match clear {
                            Some(color) => wgpu::LoadOp::Clear(color),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Err(err) = self
                .text_renderer
                .render(&self.atlas, &self.viewport, &mut pass)
            {
                warn!(error = %err, "hud_draw_failed");
            }
        }

        self.atlas.trim();
        self.reclaim(blocks);
    }

    /// Shape every visible block for this frame. Buffers are reused in a
    /// fixed order; blocks with no content are skipped.
    fn layout(&mut self, frame: &HudFrame<'_>, fade: f32) -> Vec<Block> {
        let width = self.size.width as f32;
        let height = self.size.height as f32;
        let small = (height * 0.022).clamp(12.0, 22.0);
        let big = (width * 0.07).clamp(32.0, 140.0);

        let mut blocks = Vec::new();
        let mut buffers = std::mem::take(&mut self.buffers).into_iter();
        let mut push = |hud: &mut Self,
                        blocks: &mut Vec<Block>,
                        content: String,
                        color: [f32; 4],
                        font_size: f32,
                        align: Align,
                        top: f32| {
            let Some(mut buffer) = buffers.next() else {
                return;
            };
            if content.is_empty() {
                blocks.push(Block {
                    buffer,
                    top: -1.0e4,
                    color: Color::rgba(0, 0, 0, 0),
                });
                return;
            }
            let metrics = Metrics::new(font_size, font_size * 1.3);
            buffer.set_metrics_and_size(&mut hud.font_system, metrics, Some(width), Some(height));
            let attrs = Attrs::new().family(hud.font_family.as_family());
            buffer.set_text(&mut hud.font_system, &content, &attrs, Shaping::Advanced, None);
            for line in &mut buffer.lines {
                line.set_align(Some(align));
            }
            buffer.shape_until_scroll(&mut hud.font_system, false);
            blocks.push(Block {
                buffer,
                top,
                color: faded_color(color, fade),
            });
        };

        match frame.stage {
            Stage::Boot => {
                push(
                    self,
                    &mut blocks,
                    "NOCTRA//TERMINAL\n\nCLICK OR PRESS ENTER TO CONNECT".into(),
                    [0.0, 0.96, 1.0, 1.0],
                    small * 1.4,
                    Align::Center,
                    height * 0.45,
                );
            }
            Stage::Anim => {
                let status = [
                    TextCell::Phase,
                    TextCell::ArchitectStatus,
                    TextCell::UserStatus,
                    TextCell::Threat,
                ]
                .iter()
                .map(|&cell| frame.text.get(cell).content.as_str())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("   |   ");
                push(
                    self,
                    &mut blocks,
                    status,
                    frame.text.get(TextCell::Phase).color,
                    small,
                    Align::Left,
                    height * 0.03,
                );

                let title = frame.text.get(TextCell::Title);
                push(
                    self,
                    &mut blocks,
                    title.content.clone(),
                    title.color,
                    big,
                    Align::Center,
                    height * 0.34,
                );

                push(
                    self,
                    &mut blocks,
                    gate_prompt(frame),
                    [0.9, 0.95, 1.0, 1.0],
                    small * 1.2,
                    Align::Center,
                    height * 0.58,
                );

                let alert = frame.text.get(TextCell::Alert);
                push(
                    self,
                    &mut blocks,
                    alert.content.clone(),
                    alert.color,
                    small * 1.3,
                    Align::Center,
                    height * 0.8,
                );

                let log = frame.text.get(TextCell::Log);
                push(
                    self,
                    &mut blocks,
                    log.content.clone(),
                    log.color,
                    small,
                    Align::Left,
                    height * 0.92,
                );
            }
            Stage::Terminated | Stage::Done => {
                let title = frame.text.get(TextCell::Title);
                push(
                    self,
                    &mut blocks,
                    title.content.clone(),
                    title.color,
                    big * 0.5,
                    Align::Center,
                    height * 0.3,
                );

                let reboot = frame.text.get(TextCell::RebootStatus);
                push(
                    self,
                    &mut blocks,
                    reboot.content.clone(),
                    reboot.color,
                    small * 1.2,
                    Align::Center,
                    height * 0.46,
                );

                push(
                    self,
                    &mut blocks,
                    progress_bar(frame.params.get(Param::Progress)),
                    [0.0, 0.96, 1.0, 1.0],
                    small * 1.2,
                    Align::Center,
                    height * 0.52,
                );

                let diag = frame.text.get(TextCell::Diagnostics);
                push(
                    self,
                    &mut blocks,
                    diag.content.clone(),
                    diag.color,
                    small,
                    Align::Center,
                    height * 0.6,
                );
            }
        }

        // Park any unused buffers back in the pool.
        for buffer in buffers {
            blocks.push(Block {
                buffer,
                top: -1.0e4,
                color: Color::rgba(0, 0, 0, 0),
            });
        }
        blocks
    }

    /// Return the frame's buffers to the pool.
    fn reclaim(&mut self, blocks: Vec<Block>) {
        self.buffers = blocks.into_iter().map(|block| block.buffer).collect();
    }
}

/// ASCII progress bar for the reboot sequence, e.g. `[######..........] 42%`.
fn progress_bar(progress: f32) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = (progress * PROGRESS_SLOTS as f32).round() as usize;
    let mut bar = String::with_capacity(PROGRESS_SLOTS + 8);
    bar.push('[');
    for i in 0..PROGRESS_SLOTS {
        bar.push(if i < filled { '#' } else { '.' });
    }
    bar.push(']');
    bar.push_str(&format!(" {:>3.0}%", progress * 100.0));
    bar
}

/// Prompt block content for the active gate, or the plain prompt cell when no
/// gate is armed.
fn gate_prompt(frame: &HudFrame<'_>) -> String {
    match frame.gate {
        Some(ActiveGate::Choice(choice)) => {
            let mut out = String::from(&choice.question);
            for (i, option) in choice.options.iter().enumerate() {
                out.push_str(&format!("\n[{}] {option}", i + 1));
            }
            out
        }
        Some(ActiveGate::Typed(typed)) => {
            let blink = if frame.params.get(Param::Time).fract() < 0.5 {
                '\u{2588}'
            } else {
                ' '
            };
            format!("{}\n> {}{blink}", typed.spec.prompt, typed.entered())
        }
        None => frame.text.get(TextCell::Prompt).content.clone(),
    }
}

fn faded_color(color: [f32; 4], fade: f32) -> Color {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::rgba(
        to_u8(color[0]),
        to_u8(color[1]),
        to_u8(color[2]),
        to_u8(color[3] * fade),
    )
}

fn resolve_font_family(font_system: &FontSystem, requested: Option<&str>) -> FamilyOwned {
    let db = font_system.db();
    if let Some(name) = requested.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }) {
        if font_available(db, name) {
            return FamilyOwned::Name(name.into());
        }
        warn!(font = %name, "hud_font_missing");
    }

    for candidate in ["DejaVu Sans Mono", "DejaVu Sans"] {
        if font_available(db, candidate) {
            return FamilyOwned::Name(candidate.into());
        }
    }
    FamilyOwned::Monospace
}

fn font_available(db: &Database, name: &str) -> bool {
    let query = Query {
        families: &[Family::Name(name)],
        ..Default::default()
    };
    db.query(&query).is_some()
}

#[cfg(test)]
mod tests {
    use super::progress_bar;

    #[test]
    fn progress_bar_clamps_and_fills() {
        assert!(progress_bar(-1.0).starts_with("[........"));
        assert!(progress_bar(2.0).contains("100%"));
        let half = progress_bar(0.5);
        assert_eq!(half.matches('#').count(), 12);
    }
}
