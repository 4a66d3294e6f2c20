use argus_types::{detection::DetectionResult, frame::Bitmap, geometry::Rect};

use crate::canvas::{Canvas, Color};
use crate::ViewTransform;

const TEXT_SIZE: f32 = 54.0;
const STROKE_WIDTH: f32 = 4.0;
const CORNER_RADIUS: f32 = 50.0;

/// `(text color, accent color)` pairs. The accent paints the box outline and
/// the label chip, the text color paints the label on top of it.
const PALETTE: [(Color, Color); 10] = [
    (Color::BLACK, Color::WHITE),
    (Color::WHITE, Color::MAGENTA),
    (Color::BLACK, Color::LIGHT_GRAY),
    (Color::WHITE, Color::RED),
    (Color::WHITE, Color::BLUE),
    (Color::WHITE, Color::DARK_GRAY),
    (Color::BLACK, Color::CYAN),
    (Color::BLACK, Color::YELLOW),
    (Color::WHITE, Color::BLACK),
    (Color::BLACK, Color::GREEN),
];

/// One renderable overlay entry. Immutable once constructed; owned
/// exclusively by the overlay model and destroyed on `clear`.
#[derive(Debug, Clone)]
pub enum Graphic {
    StillImage(StillImageGraphic),
    Detection(DetectionGraphic),
}

impl Graphic {
    pub fn draw(&self, canvas: &mut dyn Canvas, transform: &ViewTransform) {
        match self {
            Graphic::StillImage(graphic) => graphic.draw(canvas, transform),
            Graphic::Detection(graphic) => graphic.draw(canvas, transform),
        }
    }

    /// Returns the detection under the point, if this graphic handles it.
    /// Background images never consume touches.
    pub fn hit_test(&self, x: f32, y: f32, transform: &ViewTransform) -> Option<&DetectionResult> {
        match self {
            Graphic::StillImage(_) => None,
            Graphic::Detection(graphic) => graphic.hit_test(x, y, transform),
        }
    }
}

/// Renders the original capture behind the detections. Present only when a
/// pre-detection bitmap was supplied (still image or non-viewport preview).
#[derive(Debug, Clone)]
pub struct StillImageGraphic {
    bitmap: Bitmap,
}

impl StillImageGraphic {
    pub fn new(bitmap: Bitmap) -> Self {
        Self { bitmap }
    }

    fn draw(&self, canvas: &mut dyn Canvas, transform: &ViewTransform) {
        let dst = transform.map_rect(Rect::new(
            0.0,
            0.0,
            self.bitmap.width as f32,
            self.bitmap.height as f32,
        ));
        canvas.draw_bitmap(&self.bitmap, dst);
    }
}

/// Deterministic visual encoding of one detection result.
#[derive(Debug, Clone)]
pub struct DetectionGraphic {
    result: DetectionResult,
}

impl DetectionGraphic {
    pub fn new(result: DetectionResult) -> Self {
        Self { result }
    }

    pub fn result(&self) -> &DetectionResult {
        &self.result
    }

    /// Stable palette slot: the same tracked identity always renders with the
    /// same colors; untracked detections share slot 0.
    pub fn palette_index(&self) -> usize {
        self.result
            .tracking_id
            .map(|id| id.unsigned_abs() as usize % PALETTE.len())
            .unwrap_or(0)
    }

    fn view_rect(&self, transform: &ViewTransform) -> Rect {
        transform.map_rect(self.result.bounding_box)
    }

    fn draw(&self, canvas: &mut dyn Canvas, transform: &ViewTransform) {
        let (text_color, accent) = PALETTE[self.palette_index()];
        let rect = self.view_rect(transform);
        canvas.draw_round_rect(rect, CORNER_RADIUS, accent, STROKE_WIDTH);

        let Some(label) = self.result.primary_label() else {
            return;
        };
        let text_width = canvas.measure_text(&label.text, TEXT_SIZE);
        let line_height = TEXT_SIZE + STROKE_WIDTH;
        canvas.fill_rect(
            Rect::new(
                rect.left - STROKE_WIDTH,
                rect.top - line_height,
                rect.left + text_width + 2.0 * STROKE_WIDTH,
                rect.top,
            ),
            accent,
        );
        canvas.draw_text(
            &label.text,
            rect.left,
            rect.top - STROKE_WIDTH,
            TEXT_SIZE,
            text_color,
        );
    }

    /// Hit region is the transformed bounding box only, not the label chip.
    fn hit_test(&self, x: f32, y: f32, transform: &ViewTransform) -> Option<&DetectionResult> {
        self.view_rect(transform)
            .contains(x, y)
            .then_some(&self.result)
    }
}
