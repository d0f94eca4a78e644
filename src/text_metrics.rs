//! System-font text measurement.
//!
//! Faces are resolved once per family through `fontdb` and their raw bytes
//! are cached on disk, so later processes skip the system font scan.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use ttf_parser::{Face, GlyphId};
use tracing::debug;

static FONT_REGISTRY: Lazy<Mutex<FontRegistry>> = Lazy::new(|| Mutex::new(FontRegistry::new()));

const CACHE_DIR_NAME: &str = "pie-labeller";

/// Width of a single line of text in pixels, or `None` when no face is available.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONT_REGISTRY.lock().ok()?;
    let face = guard.face(font_family)?;
    face.line_width(&text.replace('\t', "    "), font_size)
}

/// Height of one line box (ascender to descender plus line gap) in pixels.
pub fn line_height(font_size: f32, font_family: &str) -> Option<f32> {
    if font_size <= 0.0 {
        return None;
    }
    let mut guard = FONT_REGISTRY.lock().ok()?;
    let face = guard.face(font_family)?;
    Some(face.line_height(font_size))
}

struct FontRegistry {
    db: Database,
    system_fonts_loaded: bool,
    faces: HashMap<String, Option<LoadedFace>>,
}

impl FontRegistry {
    fn new() -> Self {
        Self {
            db: Database::new(),
            system_fonts_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn face(&mut self, font_family: &str) -> Option<&LoadedFace> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.resolve(&key);
            self.faces.insert(key.clone(), face);
        }
        self.faces.get(&key).and_then(|face| face.as_ref())
    }

    fn resolve(&mut self, key: &str) -> Option<LoadedFace> {
        if let Some(face) = read_cached_face(key) {
            debug!(target: "label", family = key, "font loaded from cache");
            return Some(face);
        }

        let names: Vec<String> = key
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.system_fonts_loaded {
            self.db.load_system_fonts();
            self.system_fonts_loaded = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let (bytes, index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))?;
        let face = LoadedFace::from_bytes(bytes, index)?;
        write_cached_face(key, &face);
        debug!(target: "label", family = key, "font resolved from system database");
        Some(face)
    }
}

struct LoadedFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    line_units: f32,
    ascii_advances: [u16; 128],
}

impl LoadedFace {
    fn from_bytes(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = f32::from(face.units_per_em().max(1));
        let line_units =
            f32::from(face.ascender()) - f32::from(face.descender()) + f32::from(face.line_gap());
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            line_units,
            ascii_advances,
        })
    }

    fn line_height(&self, font_size: f32) -> f32 {
        if self.line_units <= 0.0 {
            return font_size;
        }
        self.line_units * font_size / self.units_per_em
    }

    fn line_width(&self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em;
        let missing = font_size * 0.56;

        if text.is_ascii() {
            let width = text
                .bytes()
                .filter(|byte| *byte != b'\n')
                .map(|byte| match self.ascii_advances[byte as usize] {
                    0 => missing,
                    advance => f32::from(advance) * scale,
                })
                .sum::<f32>();
            return Some(width.max(0.0));
        }

        let face = Face::parse(&self.data, self.index).ok()?;
        let width = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(GlyphId(glyph.0)))
                    .map(|advance| f32::from(advance) * scale)
                    .unwrap_or(missing)
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

fn cache_paths(key: &str) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join(CACHE_DIR_NAME).join("fonts");
    Some((dir.join(format!("{hash:x}.font")), dir.join(format!("{hash:x}.index"))))
}

fn read_cached_face(key: &str) -> Option<LoadedFace> {
    let (font_path, index_path) = cache_paths(key)?;
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(index_path).ok()?.trim().parse().ok()?;
    LoadedFace::from_bytes(bytes, index)
}

fn write_cached_face(key: &str, face: &LoadedFace) {
    let Some((font_path, index_path)) = cache_paths(key) else {
        return;
    };
    if font_path.exists() {
        return;
    }
    if let Some(parent) = font_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(&font_path, &face.data);
    let _ = fs::write(&index_path, face.index.to_string());
}
