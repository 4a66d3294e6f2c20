//! Overlay model: ordered graphics, image-to-view transform, hit testing.

pub mod canvas;
pub mod graphic;

use argus_surface::SelectionSink;
use argus_types::{geometry::Rect, ArgusError};
use tracing::debug;

use crate::canvas::Canvas;
use crate::graphic::Graphic;

/// Maps detector-space coordinates to view-space under fill-to-cover scaling
/// and optional horizontal mirroring. Callers must set the image source info
/// before drawing anything that relies on it; the scale is recomputed lazily
/// on the next draw after the source or view changes.
#[derive(Debug, Clone)]
pub struct ViewTransform {
    image_width: f32,
    image_height: f32,
    mirrored: bool,
    view_width: f32,
    view_height: f32,
    scale: f32,
    needs_update: bool,
}

impl ViewTransform {
    pub fn new(view_width: u32, view_height: u32) -> Self {
        Self {
            image_width: 0.0,
            image_height: 0.0,
            mirrored: false,
            view_width: view_width as f32,
            view_height: view_height as f32,
            scale: 1.0,
            needs_update: true,
        }
    }

    /// Effective image dimensions as seen by the view. For 90/270 rotations
    /// the caller passes the already-swapped width/height.
    pub fn set_image_source_info(&mut self, image_width: u32, image_height: u32, mirrored: bool) {
        self.image_width = image_width as f32;
        self.image_height = image_height as f32;
        self.mirrored = mirrored;
        self.needs_update = true;
    }

    pub fn set_view_size(&mut self, view_width: u32, view_height: u32) {
        self.view_width = view_width as f32;
        self.view_height = view_height as f32;
        self.needs_update = true;
    }

    pub fn update_if_needed(&mut self) {
        if !self.needs_update {
            return;
        }
        if self.image_width > 0.0 && self.image_height > 0.0 {
            // Fill-to-cover: the image covers the view, cropping one axis.
            self.scale = (self.view_width / self.image_width)
                .max(self.view_height / self.image_height);
        } else {
            self.scale = 1.0;
        }
        self.needs_update = false;
        debug!(scale = self.scale, "overlay transform updated");
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translate_x(&self, x: f32) -> f32 {
        if self.mirrored {
            self.view_width - x * self.scale
        } else {
            x * self.scale
        }
    }

    pub fn translate_y(&self, y: f32) -> f32 {
        y * self.scale
    }

    /// Maps an image-space rect to view-space, clamping left/right after
    /// mirroring so left <= right always holds.
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let x0 = self.translate_x(rect.left);
        let x1 = self.translate_x(rect.right);
        Rect::new(
            x0.min(x1),
            self.translate_y(rect.top),
            x0.max(x1),
            self.translate_y(rect.bottom),
        )
    }
}

/// Owns the ordered graphic list and the coordinate transform. Insertion
/// order is z-order: the last added graphic draws on top and is hit-tested
/// first.
pub struct OverlayModel {
    graphics: Vec<Graphic>,
    transform: ViewTransform,
}

impl OverlayModel {
    pub fn new(view_width: u32, view_height: u32) -> Self {
        Self {
            graphics: Vec::new(),
            transform: ViewTransform::new(view_width, view_height),
        }
    }

    pub fn set_image_source_info(&mut self, image_width: u32, image_height: u32, mirrored: bool) {
        self.transform
            .set_image_source_info(image_width, image_height, mirrored);
    }

    pub fn set_view_size(&mut self, view_width: u32, view_height: u32) {
        self.transform.set_view_size(view_width, view_height);
    }

    pub fn add(&mut self, graphic: Graphic) {
        self.graphics.push(graphic);
    }

    /// Drops all graphics. The only way entries are removed; called once per
    /// completed detection cycle before repopulation.
    pub fn clear(&mut self) {
        self.graphics.clear();
    }

    pub fn len(&self) -> usize {
        self.graphics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty()
    }

    pub fn graphics(&self) -> &[Graphic] {
        &self.graphics
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn draw(&mut self, canvas: &mut dyn Canvas) {
        self.transform.update_if_needed();
        for graphic in &self.graphics {
            graphic.draw(canvas, &self.transform);
        }
    }

    /// Routes a view-space touch to the top-most graphic containing it. The
    /// first hit wins and is reported to the selection sink.
    pub fn dispatch_touch(&mut self, x: f32, y: f32, sink: &dyn SelectionSink) -> bool {
        self.transform.update_if_needed();
        for graphic in self.graphics.iter().rev() {
            if let Some(result) = graphic.hit_test(x, y, &self.transform) {
                sink.object_selected(result);
                return true;
            }
        }
        false
    }
}

pub fn overlay_error(message: impl Into<String>) -> ArgusError {
    ArgusError::Overlay(message.into())
}
