//! Render projector: scene document → visual tree + desired media.
//!
//! Visual layers (text/image) are turned into [`VisualNode`]s in paint order
//! and hashed. The surface is only asked to re-render when that hash changes,
//! so redundant identical updates never cause flicker. Media layers
//! (audio/video) are returned as [`MediaSpec`]s for the media reconciler.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use overlay_proto::{Layer, LayerKind, Transition, TtsSpeak};

use crate::markup::render_markup;
use crate::media::{MediaSpec, resolve_url};
use crate::store::paint_order;

pub const DEFAULT_FONT_SIZE: u32 = 40;
pub const DEFAULT_COLOR: &str = "#ffffff";
pub const DEFAULT_BACKGROUND: &str = "transparent";

/// Text styling shared by plain and countdown text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub font_size: u32,
    pub color: String,
    pub bg: String,
}

impl TextStyle {
    fn of(layer: &Layer) -> Self {
        Self {
            font_size: layer.font_size.filter(|s| *s > 0).unwrap_or(DEFAULT_FONT_SIZE),
            color: layer
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            bg: layer
                .bg
                .clone()
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VisualContent {
    /// Escaped text with the markup subset applied.
    Text { html: String, style: TextStyle },
    /// Text driven by a countdown; the surface receives its value via
    /// [`PresentationSurface::set_timer_text`].
    Countdown { style: TextStyle },
    Image { src: String },
}

/// Computed representation of one visual layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisualNode {
    pub id: String,
    pub x: i32,
    pub y: i32,
    /// `None` means the surface must not force a size.
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub z: i32,
    pub content: VisualContent,
}

/// Where projections end up.
pub trait PresentationSurface {
    /// Replace the visual tree. `nodes` are in paint order.
    fn render_visual(&mut self, nodes: &[VisualNode], transition: Option<&Transition>);

    fn set_timer_text(&mut self, id: &str, text: &str);

    fn speak(&mut self, request: &TtsSpeak) {
        tracing::debug!(text = %request.text, "Surface has no speech output, dropping");
    }
}

/// Result of one projection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Whether the surface was asked to re-render.
    pub rendered: bool,
    pub media: Vec<MediaSpec>,
}

/// Visual nodes for `items`, in paint order. Unknown kinds are dropped.
pub fn visual_nodes(items: &[Layer], origin: Option<&str>) -> Vec<VisualNode> {
    paint_order(items)
        .into_iter()
        .filter_map(|layer| {
            let content = match layer.kind {
                LayerKind::Text if layer.timer.is_some() => VisualContent::Countdown {
                    style: TextStyle::of(layer),
                },
                LayerKind::Text => VisualContent::Text {
                    html: render_markup(&layer.content),
                    style: TextStyle::of(layer),
                },
                LayerKind::Image => VisualContent::Image {
                    src: resolve_url(&layer.content, origin),
                },
                LayerKind::Video | LayerKind::Audio | LayerKind::Unknown => return None,
            };
            Some(VisualNode {
                id: layer.id.clone(),
                x: layer.x,
                y: layer.y,
                w: layer.width(),
                h: layer.height(),
                z: layer.z,
                content,
            })
        })
        .collect()
}

pub fn content_hash(nodes: &[VisualNode]) -> u64 {
    let mut hasher = DefaultHasher::new();
    nodes.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Default)]
pub struct RenderProjector {
    origin: Option<String>,
    last_hash: Option<u64>,
}

impl RenderProjector {
    pub fn new(origin: Option<String>) -> Self {
        Self {
            origin,
            last_hash: None,
        }
    }

    /// Forget the last rendered tree so the next projection always renders.
    pub fn reset(&mut self) {
        self.last_hash = None;
    }

    pub fn project<S: PresentationSurface>(
        &mut self,
        items: &[Layer],
        surface: &mut S,
        transition: Option<&Transition>,
    ) -> Projection {
        let origin = self.origin.as_deref();
        let nodes = visual_nodes(items, origin);
        let hash = content_hash(&nodes);

        let rendered = self.last_hash != Some(hash);
        if rendered {
            surface.render_visual(&nodes, transition);
            self.last_hash = Some(hash);
        }

        let media = items
            .iter()
            .filter_map(|layer| MediaSpec::from_layer(layer, origin))
            .collect();

        Projection { rendered, media }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_proto::TimerSpec;

    #[derive(Default)]
    struct RecordingSurface {
        renders: Vec<Vec<VisualNode>>,
    }

    impl PresentationSurface for RecordingSurface {
        fn render_visual(&mut self, nodes: &[VisualNode], _transition: Option<&Transition>) {
            self.renders.push(nodes.to_vec());
        }

        fn set_timer_text(&mut self, _id: &str, _text: &str) {}
    }

    fn scene() -> Vec<Layer> {
        let mut title = Layer::new("title", LayerKind::Text, "**Live**");
        title.z = 3;
        let logo = Layer::new("logo", LayerKind::Image, "/uploads/logo.png");
        let music = Layer::new("music", LayerKind::Audio, "/uploads/a.mp3");
        vec![title, logo, music]
    }

    #[test]
    fn test_identical_projection_renders_once() {
        let mut projector = RenderProjector::new(None);
        let mut surface = RecordingSurface::default();

        assert!(projector.project(&scene(), &mut surface, None).rendered);
        assert!(!projector.project(&scene(), &mut surface, None).rendered);
        assert_eq!(surface.renders.len(), 1);
    }

    #[test]
    fn test_media_only_change_does_not_rerender() {
        let mut projector = RenderProjector::new(None);
        let mut surface = RecordingSurface::default();
        projector.project(&scene(), &mut surface, None);

        let mut changed = scene();
        changed[2].volume = Some(0.2);
        let projection = projector.project(&changed, &mut surface, None);

        assert!(!projection.rendered);
        assert_eq!(projection.media.len(), 1);
        assert!((projection.media[0].flags.volume - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reset_forces_render() {
        let mut projector = RenderProjector::new(None);
        let mut surface = RecordingSurface::default();
        projector.project(&scene(), &mut surface, None);
        projector.reset();
        assert!(projector.project(&scene(), &mut surface, None).rendered);
    }

    #[test]
    fn test_nodes_in_paint_order_with_markup() {
        let nodes = visual_nodes(&scene(), Some("http://host"));
        let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["logo", "title"]);

        assert_eq!(
            nodes[0].content,
            VisualContent::Image {
                src: "http://host/uploads/logo.png".into()
            }
        );
        let VisualContent::Text { html, style } = &nodes[1].content else {
            panic!("expected text");
        };
        assert_eq!(html, "<strong>Live</strong>");
        assert_eq!(style.font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_timed_text_is_a_countdown_node() {
        let mut layer = Layer::new("t", LayerKind::Text, "ignored");
        layer.timer = Some(TimerSpec::Countdown {
            deadline_epoch_ms: 0,
            format: "mm:ss".into(),
        });
        let nodes = visual_nodes(&[layer], None);
        assert!(matches!(nodes[0].content, VisualContent::Countdown { .. }));
    }

    #[test]
    fn test_unknown_kinds_are_dropped() {
        let nodes = visual_nodes(&[Layer::new("f", LayerKind::Unknown, "x.bin")], None);
        assert!(nodes.is_empty());
    }
}
