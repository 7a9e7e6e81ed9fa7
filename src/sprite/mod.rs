// ┌──────────────────────────── Sprite atlas ──────────────────────────────┐
// │  sheet json : frame name -> source rect inside the atlas image         │
// │  placement  : frame name + world position (fractional allowed)         │
// │  draw       : source rect -> floor(position), same width and height    │
// └────────────────────────────────────────────────────────────────────────┘
use crate::engine::{Point, Rect, Renderer, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use web_sys::HtmlImageElement;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Sheet {
    pub frames: HashMap<String, Cell>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Cell {
    pub frame: SheetRect,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct SheetRect {
    pub x: i16,
    pub y: i16,
    pub w: i16,
    pub h: i16,
}

impl From<SheetRect> for Rect {
    fn from(rect: SheetRect) -> Self {
        Rect::new(
            Point {
                x: rect.x,
                y: rect.y,
            },
            Size {
                width: rect.w,
                height: rect.h,
            },
        )
    }
}

/// One sprite in the world
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SpritePlacement {
    pub frame: String,
    pub x: f64,
    pub y: f64,
}

impl Sheet {
    /// (source, destination) for a placement, None when the frame is unknown
    pub fn blit_rects(&self, placement: &SpritePlacement) -> Option<(Rect, Rect)> {
        let source: Rect = self.frames.get(&placement.frame)?.frame.into();
        let destination = Rect::new(Point::floored(placement.x, placement.y), source.size);
        Some((source, destination))
    }
}

pub struct SpriteSheet {
    sheet: Sheet,
    image: HtmlImageElement,
}

impl SpriteSheet {
    pub fn new(sheet: Sheet, image: HtmlImageElement) -> Self {
        SpriteSheet { sheet, image }
    }

    pub fn draw(&self, renderer: &Renderer, placement: &SpritePlacement) {
        if let Some((source, destination)) = self.sheet.blit_rects(placement) {
            renderer.draw_image(&self.image, &source, &destination);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Sheet {
        let mut frames = HashMap::new();
        frames.insert(
            "skeleton".to_string(),
            Cell {
                frame: SheetRect {
                    x: 32,
                    y: 0,
                    w: 16,
                    h: 24,
                },
            },
        );
        Sheet { frames }
    }

    #[test]
    fn blit_floors_destination() {
        let placement = SpritePlacement {
            frame: "skeleton".into(),
            x: 100.75,
            y: 40.2,
        };
        let (source, destination) = sheet().blit_rects(&placement).unwrap();
        assert_eq!(source, Rect::new_from_x_y(32, 0, 16, 24));
        assert_eq!(destination, Rect::new_from_x_y(100, 40, 16, 24));
    }

    #[test]
    fn unknown_frame_is_skipped() {
        let placement = SpritePlacement {
            frame: "cloak".into(),
            x: 0.0,
            y: 0.0,
        };
        assert_eq!(sheet().blit_rects(&placement), None);
    }

    #[test]
    fn sheet_reads_atlas_json() {
        let json = r#"{"frames":{"torch":{"frame":{"x":1,"y":2,"w":3,"h":4}}}}"#;
        let sheet: Sheet = serde_json::from_str(json).unwrap();
        assert_eq!(
            sheet.frames["torch"].frame,
            SheetRect {
                x: 1,
                y: 2,
                w: 3,
                h: 4
            }
        );
    }
}
