use crate::engine::{Point, Rect, Renderer, Size};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use web_sys::HtmlImageElement;

/// Glyph order inside the font image, left to right then top to bottom
/// - space has no glyph, it only advances the pen
pub const GLYPH_TABLE: &str = concat!(
    "ABCDEFGHIJKLMNOP",
    "QRSTUVWXYZabcdef",
    "ghijklmnopqrstuv",
    "wxyz0123456789.,",
    "?!:;'\"<>-()/#_*+",
);

// layout of the font image
pub const GLYPH_WIDTH: i16 = 8;
pub const GLYPH_HEIGHT: i16 = 16;
pub const GLYPH_COLUMNS: usize = 16;

static GLYPH_INDEX: Lazy<HashMap<char, usize>> =
    Lazy::new(|| GLYPH_TABLE.chars().enumerate().map(|(i, ch)| (ch, i)).collect());

pub fn glyph_index(ch: char) -> Option<usize> {
    GLYPH_INDEX.get(&ch).copied()
}

/// Region of the font image holding `ch`
pub fn glyph_frame(ch: char) -> Option<Rect> {
    glyph_index(ch).map(|index| {
        Rect::new(
            Point {
                x: (index % GLYPH_COLUMNS) as i16 * GLYPH_WIDTH,
                y: (index / GLYPH_COLUMNS) as i16 * GLYPH_HEIGHT,
            },
            glyph_size(),
        )
    })
}

pub fn glyph_size() -> Size {
    Size {
        width: GLYPH_WIDTH,
        height: GLYPH_HEIGHT,
    }
}

/// Widest line of cells whose pixel offsets still fit in an i16
pub const MAX_CELLS: usize = (i16::MAX / GLYPH_WIDTH) as usize;

/// Pixel offset of cell `cells`, pinned to i16::MAX past `MAX_CELLS`
pub fn cell_offset(cells: usize) -> i16 {
    i16::try_from(cells)
        .ok()
        .and_then(|cells| cells.checked_mul(GLYPH_WIDTH))
        .unwrap_or(i16::MAX)
}

/// Pixel width of `text` drawn in this font, one cell per char
pub fn text_width(text: &str) -> i16 {
    cell_offset(text.chars().count())
}

/// Monospaced bitmap font cut from a single image
pub struct BitmapFont {
    image: HtmlImageElement,
}

impl BitmapFont {
    pub fn new(image: HtmlImageElement) -> Self {
        BitmapFont { image }
    }

    /// Draw `text` with its top left corner at `position`
    /// - characters missing from the glyph table leave an empty cell
    pub fn draw_text(&self, renderer: &Renderer, text: &str, position: Point) {
        let size = glyph_size();
        for (column, ch) in text.chars().enumerate().take(MAX_CELLS) {
            if let Some(frame) = glyph_frame(ch) {
                let destination = Rect::new(
                    Point {
                        x: position.x.saturating_add(cell_offset(column)),
                        y: position.y,
                    },
                    size,
                );
                renderer.draw_image(&self.image, &frame, &destination);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_line::is_accepted;

    #[test]
    fn table_has_no_duplicates() {
        assert_eq!(GLYPH_INDEX.len(), GLYPH_TABLE.chars().count());
    }

    #[test]
    fn every_accepted_character_but_space_has_a_glyph() {
        for ch in (0u8..128).map(char::from).filter(|ch| is_accepted(*ch)) {
            if ch == ' ' {
                assert_eq!(glyph_index(ch), None);
            } else {
                assert!(glyph_index(ch).is_some(), "{ch:?} has no glyph");
            }
        }
    }

    #[test]
    fn frame_walks_rows_and_columns() {
        assert_eq!(glyph_frame('A'), Some(Rect::new_from_x_y(0, 0, 8, 16)));
        assert_eq!(glyph_frame('P'), Some(Rect::new_from_x_y(120, 0, 8, 16)));
        assert_eq!(glyph_frame('Q'), Some(Rect::new_from_x_y(0, 16, 8, 16)));
        assert_eq!(glyph_frame('>'), Some(Rect::new_from_x_y(56, 64, 8, 16)));
        assert_eq!(glyph_frame('~'), None);
    }

    #[test]
    fn width_counts_characters() {
        assert_eq!(text_width(""), 0);
        assert_eq!(text_width("HELP"), 32);
        assert_eq!(text_width("a b"), 24);
    }

    #[test]
    fn very_long_text_pins_width() {
        assert_eq!(MAX_CELLS, 4095);
        assert_eq!(cell_offset(MAX_CELLS), 32760);
        assert_eq!(cell_offset(MAX_CELLS + 1), i16::MAX);
        assert_eq!(cell_offset(usize::MAX), i16::MAX);
        assert_eq!(text_width(&" ".repeat(5000)), i16::MAX);
    }
}
