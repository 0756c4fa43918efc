//! Word cloud layout and rasterization.
//!
//! Words are counted in the prepared text, sized by frequency and placed one
//! by one along a spiral starting at the center of the canvas. A summed-area
//! table over the occupied pixels makes every collision test O(1).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, RenderError, Result};
use crate::models::WordCloudOptions;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w[\w']+").unwrap();
}

/// Word colors, assigned by rank.
const PALETTE: [[u8; 3]; 8] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
    [190, 60, 90],
    [230, 120, 30],
    [40, 40, 40],
];

/// Shrink step, in pixels, when a word does not fit.
const FONT_STEP: u32 = 2;
/// Distance between consecutive candidate positions along the spiral, in pixels.
const SPIRAL_STEP: f32 = 2.0;
/// Radius growth per radian of the spiral, in pixels.
const SPIRAL_SPACING: f32 = 1.5;

/// Counts the words of `text`, most frequent first. Ties keep the order in
/// which the words first appear.
pub fn count_words(text: &str) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for m in WORD.find_iter(text) {
        let word = m.as_str();
        match positions.get(word) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push((word.to_string(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Parses a CSS color name or a `#rgb` / `#rrggbb` hex code.
pub fn parse_color(color: &str) -> std::result::Result<Rgb<u8>, RenderError> {
    let value = color.trim().to_ascii_lowercase();

    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_ascii() {
            return Err(RenderError::UnknownColor(color.to_string()));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(RenderError::UnknownColor(color.to_string())),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16);
        return match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Rgb([r, g, b])),
            _ => Err(RenderError::UnknownColor(color.to_string())),
        };
    }

    let rgb = match value.as_str() {
        "white" => [255, 255, 255],
        "black" => [0, 0, 0],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "gray" | "grey" => [128, 128, 128],
        "lightgray" | "lightgrey" => [211, 211, 211],
        "darkgray" | "darkgrey" => [169, 169, 169],
        "navy" => [0, 0, 128],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "pink" => [255, 192, 203],
        "ivory" => [255, 255, 240],
        "beige" => [245, 245, 220],
        _ => return Err(RenderError::UnknownColor(color.to_string())),
    };
    Ok(Rgb(rgb))
}

/// Font size of a word given its frequency and the top frequency.
pub fn font_size_for(frequency: usize, max_frequency: usize, options: &WordCloudOptions) -> u32 {
    let rs = options.relative_scaling;
    let ratio = frequency as f32 / max_frequency.max(1) as f32;
    (options.max_font_size as f32 * (rs * ratio + (1.0 - rs))).round() as u32
}

/// Loads a font file.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes = fs::read(path).map_err(|e| Error::from_io(e, path))?;
    FontVec::try_from_vec(bytes).map_err(|_| {
        RenderError::InvalidFont {
            path: path.to_path_buf(),
        }
        .into()
    })
}

/// A word drawn on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub frequency: usize,
    pub font_size: u32,
    /// Top-left corner of the word's box.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: Rgb<u8>,
}

/// Pixel coverage of the canvas with a summed-area table for fast rectangle
/// queries.
struct Occupancy {
    width: usize,
    height: usize,
    filled: Vec<bool>,
    sums: Vec<u32>,
}

impl Occupancy {
    fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Occupancy {
            width,
            height,
            filled: vec![false; width * height],
            sums: vec![0; (width + 1) * (height + 1)],
        }
    }

    /// Returns `true` if the rectangle lies inside the canvas and is empty.
    fn is_free(&self, x: i64, y: i64, w: u32, h: u32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        if x + w > self.width || y + h > self.height {
            return false;
        }
        let stride = self.width + 1;
        let at = |cx: usize, cy: usize| self.sums[cy * stride + cx] as i64;
        at(x + w, y + h) - at(x, y + h) - at(x + w, y) + at(x, y) == 0
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.filled[row * self.width + col] = true;
            }
        }
        self.rebuild_from(y);
    }

    /// Recomputes the table from row `y` down; rows above are unchanged.
    fn rebuild_from(&mut self, y: usize) {
        let stride = self.width + 1;
        for row in y..self.height {
            let mut row_sum = 0u32;
            for col in 0..self.width {
                row_sum += self.filled[row * self.width + col] as u32;
                self.sums[(row + 1) * stride + col + 1] = self.sums[row * stride + col + 1] + row_sum;
            }
        }
    }
}

/// Size of the box that `text` occupies at `px`.
fn measure<F: Font>(font: &F, px: f32, text: &str) -> (u32, u32) {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut width = 0.0f32;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    let height = scaled.ascent() - scaled.descent();
    (width.ceil().max(1.0) as u32, height.ceil().max(1.0) as u32)
}

fn draw_text<F: Font>(image: &mut RgbImage, font: &F, px: f32, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);
    let mut caret = point(x as f32, y as f32 + scaled.ascent());
    let mut prev = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            caret.x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, caret);
        caret.x += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let tx = bounds.min.x as i64 + gx as i64;
            let ty = bounds.min.y as i64 + gy as i64;
            if tx < 0 || ty < 0 || tx >= image.width() as i64 || ty >= image.height() as i64 {
                return;
            }
            let coverage = coverage.clamp(0.0, 1.0);
            let pixel = image.get_pixel_mut(tx as u32, ty as u32);
            for ch in 0..3 {
                let bg = pixel.0[ch] as f32;
                let fg = color.0[ch] as f32;
                pixel.0[ch] = (bg + (fg - bg) * coverage).round() as u8;
            }
        });
    }
}

/// Walks an archimedean spiral from the canvas center and returns the first
/// free top-left corner for a `w`×`h` box.
fn find_position(occupancy: &Occupancy, w: u32, h: u32) -> Option<(u32, u32)> {
    let (cw, ch) = (occupancy.width as f32, occupancy.height as f32);
    let aspect = if ch > 0.0 { cw / ch } else { 1.0 };
    let max_radius = (cw * cw + ch * ch).sqrt() / 2.0;
    let (cx, cy) = (cw / 2.0 - w as f32 / 2.0, ch / 2.0 - h as f32 / 2.0);

    let mut theta = 0.0f32;
    loop {
        let radius = SPIRAL_SPACING * theta;
        if radius > max_radius {
            return None;
        }
        let x = (cx + radius * theta.cos() * aspect).round() as i64;
        let y = (cy + radius * theta.sin()).round() as i64;
        if occupancy.is_free(x, y, w, h) {
            return Some((x as u32, y as u32));
        }
        theta += SPIRAL_STEP / radius.max(SPIRAL_STEP);
    }
}

/// A rendered word cloud.
pub struct WordCloud {
    words: Vec<PlacedWord>,
    image: RgbImage,
}

impl WordCloud {
    /// Lays out and draws the words of `text`.
    ///
    /// Fails with [`RenderError::EmptyText`] when `text` contains no word.
    pub fn generate(text: &str, options: &WordCloudOptions) -> Result<Self> {
        let mut frequencies = count_words(text);
        if frequencies.is_empty() {
            return Err(RenderError::EmptyText.into());
        }
        let max_frequency = frequencies[0].1;
        frequencies.truncate(options.max_words);

        let background = parse_color(&options.background_color)?;
        let font = load_font(&options.font_path)?;

        tracing::info!(
            "generating word cloud with {} distinct words on {}x{}",
            frequencies.len(),
            options.width,
            options.height
        );

        let mut image = RgbImage::from_pixel(options.width, options.height, background);
        let mut occupancy = Occupancy::new(options.width, options.height);
        let mut words = Vec::new();
        let margin = options.margin;
        let min_size = options.min_font_size.max(1);

        for (rank, (word, frequency)) in frequencies.into_iter().enumerate() {
            let mut size = font_size_for(frequency, max_frequency, options);
            let mut slot = None;
            while size >= min_size {
                let (w, h) = measure(&font, size as f32, &word);
                if let Some(corner) = find_position(&occupancy, w + 2 * margin, h + 2 * margin) {
                    slot = Some((corner, w, h));
                    break;
                }
                size = size.saturating_sub(FONT_STEP);
            }

            let Some(((bx, by), w, h)) = slot else {
                tracing::debug!("no room left for {:?}", word);
                continue;
            };

            let (x, y) = (bx + margin, by + margin);
            let color = Rgb(PALETTE[rank % PALETTE.len()]);
            draw_text(&mut image, &font, size as f32, x, y, &word, color);
            occupancy.fill(
                bx as usize,
                by as usize,
                (w + 2 * margin) as usize,
                (h + 2 * margin) as usize,
            );
            words.push(PlacedWord {
                word,
                frequency,
                font_size: size,
                x,
                y,
                width: w,
                height: h,
                color,
            });
        }

        Ok(WordCloud { words, image })
    }

    pub fn words(&self) -> &[PlacedWord] {
        &self.words
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Saves the image. The format follows the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("saving word cloud to {}", path.display());
        self.image.save(path).map_err(RenderError::from)?;
        Ok(())
    }
}

/// Renders `text` into an image using `options`.
pub fn render(text: &str, options: &WordCloudOptions) -> Result<RgbImage> {
    WordCloud::generate(text, options).map(WordCloud::into_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_count_words() {
        assert!(count_words("b a b c a b x").is_empty());

        let counts = count_words("bb aa bb cc aa bb");
        assert_eq!(
            counts,
            vec![
                ("bb".to_string(), 3),
                ("aa".to_string(), 2),
                ("cc".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_count_words_presentation_forms() {
        let word = "\u{FE8D}\u{FE8F}";
        let counts = count_words(&format!("{word} {word}, {word}!"));
        assert_eq!(counts, vec![(word.to_string(), 3)]);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("white").unwrap(), Rgb([255, 255, 255]));
        assert_eq!(parse_color(" Black ").unwrap(), Rgb([0, 0, 0]));
        assert_eq!(parse_color("#1e90ff").unwrap(), Rgb([30, 144, 255]));
        assert_eq!(parse_color("#fff").unwrap(), Rgb([255, 255, 255]));
        assert!(matches!(parse_color("chartreuse-ish"), Err(RenderError::UnknownColor(_))));
        assert!(matches!(parse_color("#12345"), Err(RenderError::UnknownColor(_))));
        assert!(matches!(parse_color("#zzzzzz"), Err(RenderError::UnknownColor(_))));
        assert!(matches!(parse_color("#€aaa"), Err(RenderError::UnknownColor(_))));
        assert!(matches!(parse_color("#ééé"), Err(RenderError::UnknownColor(_))));
    }

    #[test]
    fn test_font_size_for() {
        let options = WordCloudOptions::default();
        assert_eq!(font_size_for(10, 10, &options), 130);
        assert_eq!(font_size_for(5, 10, &options), 98);
        assert_eq!(font_size_for(0, 10, &options), 65);

        let linear = WordCloudOptions {
            relative_scaling: 1.0,
            ..Default::default()
        };
        assert_eq!(font_size_for(5, 10, &linear), 65);
    }

    #[test]
    fn test_occupancy() {
        let mut occupancy = Occupancy::new(10, 10);
        assert!(occupancy.is_free(0, 0, 10, 10));
        assert!(!occupancy.is_free(-1, 0, 2, 2));
        assert!(!occupancy.is_free(5, 5, 6, 2));

        occupancy.fill(2, 2, 3, 3);
        assert!(!occupancy.is_free(0, 0, 10, 10));
        assert!(!occupancy.is_free(4, 4, 1, 1));
        assert!(occupancy.is_free(5, 0, 5, 10));
        assert!(occupancy.is_free(0, 5, 10, 5));
    }

    #[test]
    fn test_find_position_starts_at_center() {
        let occupancy = Occupancy::new(100, 100);
        assert_eq!(find_position(&occupancy, 10, 10), Some((45, 45)));
        assert_eq!(find_position(&occupancy, 101, 10), None);
    }

    #[test]
    fn test_find_position_reaches_narrow_edge_band() {
        // Only a thin band along the right edge is left free.
        let mut occupancy = Occupancy::new(800, 600);
        occupancy.fill(0, 0, 780, 600);
        let (x, _) = find_position(&occupancy, 12, 12).unwrap();
        assert!(x >= 780);
    }

    #[test]
    fn test_generate_draws_words() {
        let options = WordCloudOptions {
            font_path: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data/fonts/DejaVuSans.ttf")),
            ..Default::default()
        };
        let cloud = WordCloud::generate("\u{FE8D}\u{FE8F} \u{FE8D}\u{FE8F} \u{FEE1}\u{FEE1}", &options).unwrap();

        assert_eq!(cloud.words().len(), 2);
        assert_eq!(cloud.words()[0].font_size, options.max_font_size);
        let white = Rgb([255, 255, 255]);
        assert!(cloud.image().pixels().any(|p| *p != white));
    }

    #[test]
    fn test_generate_empty_text() {
        let err = WordCloud::generate("   ", &WordCloudOptions::default()).err().unwrap();
        assert!(matches!(err, Error::Render(RenderError::EmptyText)));
    }

    #[test]
    fn test_generate_missing_font() {
        let options = WordCloudOptions {
            font_path: PathBuf::from("/nonexistent/font.ttf"),
            ..Default::default()
        };
        let err = render("سلام سلام", &options).unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[test]
    fn test_generate_invalid_font() {
        let dir = tempfile::TempDir::new().unwrap();
        let font_path = dir.path().join("broken.ttf");
        std::fs::write(&font_path, b"not a font").unwrap();
        let options = WordCloudOptions {
            font_path,
            ..Default::default()
        };
        let err = render("سلام سلام", &options).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::InvalidFont { .. })));
    }

    #[test]
    fn test_generate_unknown_background() {
        let options = WordCloudOptions {
            background_color: "not-a-color".to_string(),
            ..Default::default()
        };
        let err = render("سلام سلام", &options).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::UnknownColor(_))));
    }
}
