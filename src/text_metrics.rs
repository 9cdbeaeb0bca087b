//! Text measurement for labels and story-text sections.
//!
//! Widths come from the first system font matching the theme's font stack
//! (via `fontdb`/`ttf-parser`); when no face can be loaded, or fast metrics
//! are requested, a per-character width table is used instead.

use std::collections::HashMap;
use std::sync::Mutex;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use regex::Regex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));
static MARKUP_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]*>").ok());
static BLOCK_BREAK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6])\s*/?>").ok());

/// Measured width of `text`, or `None` when no font face is available.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Width of `text`, measured or estimated.
pub fn text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if fast {
        return fallback_text_width(text, font_size);
    }
    measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

pub fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Width of a glyph relative to the font size for a typical proportional
/// sans-serif face.
pub fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' | '\'' => {
            0.321
        }
        'I' | 'i' | 'j' | 'l' => 0.25,
        'f' | 'r' | 't' => 0.34,
        'M' | 'W' => 0.93,
        'm' | 'w' => 0.84,
        'A'..='Z' => 0.66,
        'a'..='z' => 0.56,
        '0'..='9' => 0.6,
        '@' | '#' | '%' | '&' => 0.946,
        '…' => 1.0,
        c if (c as u32) >= 0x2E80 => 1.0,
        _ => 0.568,
    }
}

/// Greedy word wrap to `max_width`. Words wider than the limit get a line of
/// their own.
pub fn wrap_text(
    text: &str,
    max_width: f32,
    font_size: f32,
    font_family: &str,
    fast: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if text_width(paragraph, font_size, font_family, fast) <= max_width {
            lines.push(paragraph.to_string());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font_size, font_family, fast) > max_width
                && !current.is_empty()
            {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Plain text of a (possibly HTML) narrative summary. Block-level closings
/// become line breaks; other tags are dropped and common entities decoded.
pub fn plain_text(markup: &str) -> String {
    let with_breaks = match BLOCK_BREAK.as_ref() {
        Some(re) => re.replace_all(markup, "\n").into_owned(),
        None => markup.to_string(),
    };
    let stripped = match MARKUP_TAG.as_ref() {
        Some(re) => re.replace_all(&with_breaks, "").into_owned(),
        None => with_breaks,
    };
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Truncates `text` with an ellipsis so it fits `max_width`.
pub fn truncate_to_width(
    text: &str,
    max_width: f32,
    font_size: f32,
    font_family: &str,
    fast: bool,
) -> String {
    if text_width(text, font_size, font_family, fast) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        let candidate = format!("{out}…");
        if text_width(&candidate, font_size, font_family, fast) > max_width {
            out.pop();
            break;
        }
    }
    format!("{}…", out.trim_end())
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.cache.contains_key(&key) {
            let face = self.load_face(font_family);
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get_mut(&key)?.as_mut()?;
        Some(face.measure_width(text, font_size))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                "monospace" | "ui-monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::parse(data, index))
            .flatten()
    }
}

/// Horizontal advances extracted from a parsed face. The face itself is not
/// retained; non-ASCII glyphs are looked up lazily from the raw bytes.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn parse(data: &[u8], index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data: data.to_vec(),
            index,
            units_per_em: face.units_per_em().max(1),
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn advance(&mut self, ch: char) -> Option<u16> {
        if ch.is_ascii() {
            return Some(self.ascii_advances[ch as usize]).filter(|adv| *adv > 0);
        }
        if let Some(cached) = self.advance_cache.get(&ch) {
            return *cached;
        }
        let advance = Face::parse(&self.data, self.index).ok().and_then(|face| {
            let glyph = face.glyph_index(ch)?;
            face.glyph_hor_advance(glyph)
        });
        self.advance_cache.insert(ch, advance);
        advance
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            width += match self.advance(ch) {
                Some(advance) => advance as f32 * scale,
                None => char_width_factor(ch) * font_size,
            };
        }
        width.max(0.0)
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_width_factor_returns_positive_values() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}', '…'] {
            assert!(char_width_factor(ch) > 0.0, "char {ch:?} has zero width");
        }
    }

    #[test]
    fn fallback_width_scales_with_font_size() {
        let w10 = fallback_text_width("FRIEND", 10.0);
        let w20 = fallback_text_width("FRIEND", 20.0);
        assert!((w20 - w10 * 2.0).abs() < 0.01);
    }

    #[test]
    fn wraps_long_paragraphs() {
        let lines = wrap_text(
            "the heist crew meets at the docks before dawn to plan the job",
            80.0,
            10.0,
            "sans-serif",
            true,
        );
        assert!(lines.len() > 1, "expected wrapping, got {lines:?}");
        for line in &lines {
            assert!(!line.is_empty());
        }
    }

    #[test]
    fn keeps_short_text_on_one_line() {
        assert_eq!(wrap_text("short", 500.0, 10.0, "serif", true), vec!["short"]);
        assert!(wrap_text("   ", 500.0, 10.0, "serif", true).is_empty());
    }

    #[test]
    fn strips_markup_from_summaries() {
        let text = plain_text("<p>Act one &amp; two</p><p>Fin<br/>ale</p>");
        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Act one & two", "Fin", "ale"]);
    }

    #[test]
    fn truncates_with_ellipsis() {
        let out = truncate_to_width("A very long community title", 40.0, 10.0, "serif", true);
        assert!(out.ends_with('…'));
        assert!(fallback_text_width(&out, 10.0) <= 40.0 + 10.0);
        assert_eq!(truncate_to_width("ok", 400.0, 10.0, "serif", true), "ok");
    }
}
