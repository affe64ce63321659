//! Overlay geometry: fitting the frame into the view, mapping clicks back to
//! frame space, and the per-highlight render list.

use crate::error::EyeError;
use crate::presentation::PresentationAdapter;
use crate::registry::ElementRegistry;
use pidscope_core::{normalize_confidence, BoundingBox, ElementId};
use std::path::Path;
use tracing::debug;

pub type Rgb = [u8; 3];

/// Outline color of the selected highlight.
pub const SELECTED_COLOR: Rgb = [0, 255, 255];

const RED: Rgb = [255, 0, 0];
const ORANGE: Rgb = [255, 165, 0];
const YELLOW: Rgb = [255, 255, 0];
const GREEN: Rgb = [0, 255, 0];

/// Red through orange and yellow to green as confidence rises. Input is a
/// fraction and is clamped to `[0, 1]`.
pub fn confidence_to_color(confidence: f32) -> Rgb {
    let c = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    if c <= 0.25 {
        interpolate(RED, ORANGE, c / 0.25)
    } else if c <= 0.5 {
        interpolate(ORANGE, YELLOW, (c - 0.25) / 0.25)
    } else if c <= 0.75 {
        interpolate(YELLOW, GREEN, (c - 0.5) / 0.25)
    } else {
        GREEN
    }
}

fn interpolate(from: Rgb, to: Rgb, factor: f32) -> Rgb {
    let mut out = [0u8; 3];
    for i in 0..3 {
        let value = from[i] as f32 + (to[i] as f32 - from[i] as f32) * factor;
        out[i] = value as u8;
    }
    out
}

/// Hex form used by toolkit color strings.
pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Aspect-preserving fit of a frame into a view, centered with letterbox
/// margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub frame_width: u32,
    pub frame_height: u32,
    pub view_width: u32,
    pub view_height: u32,
}

impl Viewport {
    pub fn new(frame: (u32, u32), view: (u32, u32)) -> Self {
        Self {
            frame_width: frame.0,
            frame_height: frame.1,
            view_width: view.0,
            view_height: view.1,
        }
    }

    fn is_empty(&self) -> bool {
        self.frame_width == 0 || self.frame_height == 0 || self.view_width == 0 || self.view_height == 0
    }

    /// Size of the scaled frame inside the view.
    pub fn fitted_size(&self) -> (u32, u32) {
        if self.is_empty() {
            return (0, 0);
        }
        let (fw, fh) = (self.frame_width as u64, self.frame_height as u64);
        let (vw, vh) = (self.view_width as u64, self.view_height as u64);

        // Compare aspect ratios without division
        if vw * fh > vh * fw {
            ((vh * fw / fh) as u32, self.view_height)
        } else {
            (self.view_width, (vw * fh / fw) as u32)
        }
    }

    /// Top-left corner of the scaled frame inside the view.
    pub fn offset(&self) -> (u32, u32) {
        let (width, height) = self.fitted_size();
        (
            self.view_width.saturating_sub(width) / 2,
            self.view_height.saturating_sub(height) / 2,
        )
    }

    /// Map a view point to frame coordinates, `None` in the margins.
    pub fn view_to_frame(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (width, height) = self.fitted_size();
        if width == 0 || height == 0 {
            return None;
        }
        let (off_x, off_y) = self.offset();
        let ax = x - off_x as f32;
        let ay = y - off_y as f32;
        if ax < 0.0 || ay < 0.0 || ax >= width as f32 || ay >= height as f32 {
            return None;
        }
        Some((
            ax * self.frame_width as f32 / width as f32,
            ay * self.frame_height as f32 / height as f32,
        ))
    }

    /// Map a frame box to a rectangle in the scaled image, excluding the
    /// margin offset.
    pub fn frame_to_view(&self, bbox: &BoundingBox) -> [i32; 4] {
        let (width, height) = self.fitted_size();
        if width == 0 || height == 0 {
            return [0; 4];
        }
        let sx = width as f32 / self.frame_width as f32;
        let sy = height as f32 / self.frame_height as f32;
        [
            (bbox.x1 * sx) as i32,
            (bbox.y1 * sy) as i32,
            (bbox.x2 * sx) as i32,
            (bbox.y2 * sy) as i32,
        ]
    }
}

/// Pixel size of a stored reference image, which becomes the frame space.
pub fn reference_frame_size(path: &Path) -> Result<(u32, u32), EyeError> {
    let size = image::image_dimensions(path)?;
    debug!("Reference image {:?} is {}x{}", path, size.0, size.1);
    Ok(size)
}

/// One highlight ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub id: ElementId,
    pub rect: [i32; 4],
    pub color: Rgb,
    pub caption: String,
    pub selected: bool,
}

/// Render list for the current highlights, in insertion order.
pub fn overlay_items<A: PresentationAdapter>(
    registry: &ElementRegistry<A>,
    viewport: &Viewport,
) -> Vec<OverlayItem> {
    registry
        .highlights()
        .iter()
        .map(|highlight| {
            let confidence = registry
                .element(&highlight.id)
                .and_then(|e| e.confidence())
                .unwrap_or(0.0);
            let color = if highlight.selected {
                SELECTED_COLOR
            } else {
                confidence_to_color(normalize_confidence(confidence))
            };
            OverlayItem {
                id: highlight.id,
                rect: viewport.frame_to_view(&highlight.bounding_box),
                color,
                caption: format!("{} ({:.2})", highlight.name, confidence),
                selected: highlight.selected,
            }
        })
        .collect()
}
