use crate::api::TextRun;
use crate::geometry::{Path, Point};
use crate::style::{Font, TextAlign, TextBaseline};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl TextMetrics {
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

/// Measures text and turns a run into fillable outlines for backends that
/// have no text rendering of their own.
pub trait TextEngine {
    fn measure(&self, font: &Font, text: &str) -> TextMetrics;
    fn outline(&self, run: &TextRun) -> Path;
}

/// Fixed-advance engine drawing one box per visible character. Deterministic,
/// needs no font files.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockGlyphs;

impl BlockGlyphs {
    const ADVANCE: f64 = 0.6;
    const ASCENT: f64 = 0.8;
    const DESCENT: f64 = 0.2;
    const GLYPH_HEIGHT: f64 = 0.7;
    const GLYPH_WIDTH: f64 = 0.5;
}

impl TextEngine for BlockGlyphs {
    fn measure(&self, font: &Font, text: &str) -> TextMetrics {
        TextMetrics {
            width: text.chars().count() as f64 * font.size * Self::ADVANCE,
            ascent: font.size * Self::ASCENT,
            descent: font.size * Self::DESCENT,
        }
    }

    fn outline(&self, run: &TextRun) -> Path {
        let size = run.font.size;
        let metrics = self.measure(run.font, run.text);
        let origin = place_text(&metrics, run.origin, run.align, run.baseline);
        let advance = size * Self::ADVANCE;
        let inset = (advance - size * Self::GLYPH_WIDTH) / 2.0;

        let mut path = Path::new();
        for (i, ch) in run.text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            path.rect(
                origin.x + i as f64 * advance + inset,
                origin.y - size * Self::GLYPH_HEIGHT,
                size * Self::GLYPH_WIDTH,
                size * Self::GLYPH_HEIGHT,
            );
        }
        path
    }
}

/// Shifts an anchor point to the left end of the alphabetic baseline.
pub fn place_text(
    metrics: &TextMetrics,
    anchor: Point,
    align: TextAlign,
    baseline: TextBaseline,
) -> Point {
    let x = anchor.x
        - match align {
            TextAlign::Left | TextAlign::Start => 0.0,
            TextAlign::Center => metrics.width / 2.0,
            TextAlign::Right | TextAlign::End => metrics.width,
        };
    let y = anchor.y
        + match baseline {
            TextBaseline::Top => metrics.ascent,
            TextBaseline::Hanging => metrics.ascent * 0.8,
            TextBaseline::Middle => (metrics.ascent - metrics.descent) / 2.0,
            TextBaseline::Alphabetic => 0.0,
            TextBaseline::Ideographic => -metrics.descent * 0.5,
            TextBaseline::Bottom => -metrics.descent,
        };
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PathComponent;

    #[test]
    fn block_metrics_scale_with_font_size() {
        let m = BlockGlyphs.measure(&Font::new(10.0, "Sans"), "abcd");
        assert!((m.width - 24.0).abs() < 1e-9);
        assert!((m.height() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn alignment_shifts_origin() {
        let m = TextMetrics {
            width: 40.0,
            ascent: 8.0,
            descent: 2.0,
        };
        let anchor = Point::new(100.0, 50.0);
        assert_eq!(
            place_text(&m, anchor, TextAlign::Center, TextBaseline::Alphabetic),
            Point::new(80.0, 50.0)
        );
        assert_eq!(
            place_text(&m, anchor, TextAlign::Right, TextBaseline::Top),
            Point::new(60.0, 58.0)
        );
        assert_eq!(
            place_text(&m, anchor, TextAlign::Start, TextBaseline::Bottom),
            Point::new(100.0, 48.0)
        );
    }

    #[test]
    fn outline_skips_whitespace() {
        let font = Font::new(10.0, "Sans");
        let run = TextRun {
            text: "a b",
            origin: Point::new(0.0, 20.0),
            font: &font,
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
        };
        let path = BlockGlyphs.outline(&run);
        let moves: Vec<_> = path
            .components()
            .iter()
            .filter_map(|c| match *c {
                PathComponent::MoveTo { x, y } => Some((x, y)),
                _ => None,
            })
            .collect();
        assert_eq!(moves.len(), 2);
        assert!((moves[0].0 - 0.5).abs() < 1e-9);
        assert!((moves[1].0 - 12.5).abs() < 1e-9);
        assert!((moves[0].1 - 13.0).abs() < 1e-9);
    }
}
