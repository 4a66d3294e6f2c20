use argus_types::{frame::Bitmap, geometry::Rect};
use serde::{Deserialize, Serialize};

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const LIGHT_GRAY: Color = Color::rgb(204, 204, 204);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const DARK_GRAY: Color = Color::rgb(68, 68, 68);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
}

/// Minimal drawing surface the overlay renders onto. Coordinates are
/// view-space pixels; the overlay applies its own transform before calling.
pub trait Canvas {
    fn draw_round_rect(&mut self, rect: Rect, corner_radius: f32, color: Color, stroke_width: f32);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color);
    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: Rect);
    fn measure_text(&self, text: &str, size: f32) -> f32;
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    RoundRect {
        rect: Rect,
        corner_radius: f32,
        color: Color,
        stroke_width: f32,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
    },
    Bitmap {
        width: u32,
        height: u32,
        dst: Rect,
    },
}

/// Canvas that records commands instead of rasterizing. Used by tests and by
/// headless consumers that forward the command list to a real renderer.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Canvas for RecordingCanvas {
    fn draw_round_rect(&mut self, rect: Rect, corner_radius: f32, color: Color, stroke_width: f32) {
        self.commands.push(DrawCommand::RoundRect {
            rect,
            corner_radius,
            color,
            stroke_width,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_owned(),
            x,
            y,
            size,
            color,
        });
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: Rect) {
        self.commands.push(DrawCommand::Bitmap {
            width: bitmap.width,
            height: bitmap.height,
            dst,
        });
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        // Fixed-advance approximation, good enough for layout assertions.
        text.chars().count() as f32 * size * 0.6
    }
}
