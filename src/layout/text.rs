use serde::Serialize;

use crate::text_metrics;

const ELLIPSIS: &str = "...";

/// Wrapped lines together with the box they occupy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasuredText {
    pub lines: Vec<String>,
    pub line_height: f32,
    pub width: f32,
    pub height: f32,
}

/// Text measurement collaborator used by preprocessing.
///
/// Implementations must be deterministic: identical inputs always produce
/// identical dimensions.
pub trait TextMeasure {
    /// Width and height of a single unwrapped line.
    fn line_dimensions(&self, line: &str, font_size: f32, font_family: &str) -> (f32, f32);

    fn wrap_and_measure(
        &self,
        text: &str,
        font_size: f32,
        font_family: &str,
        max_width: f32,
        max_lines: usize,
        line_padding: f32,
    ) -> MeasuredText {
        let mut lines = Vec::new();
        for line in split_lines(text) {
            lines.extend(wrap_line(&line, max_width, |candidate| {
                self.line_dimensions(candidate, font_size, font_family).0
            }));
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        let max_lines = max_lines.max(1);
        if lines.len() > max_lines {
            lines.truncate(max_lines);
            if let Some(last) = lines.last_mut() {
                last.push_str(ELLIPSIS);
            }
        }

        let mut width = 0.0f32;
        let mut height = 0.0f32;
        let mut line_height = 0.0f32;
        for line in &lines {
            let (w, h) = self.line_dimensions(line, font_size, font_family);
            width = width.max(w);
            height += h;
            line_height = line_height.max(h);
        }
        height += line_padding * (lines.len() - 1) as f32;

        MeasuredText {
            lines,
            line_height,
            width,
            height,
        }
    }
}

/// Per-character width table; fully deterministic and font-independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl TextMeasure for ApproximateMetrics {
    fn line_dimensions(&self, line: &str, font_size: f32, _font_family: &str) -> (f32, f32) {
        (fallback_text_width(line, font_size), font_size)
    }
}

/// Measures with installed system fonts, falling back to [`ApproximateMetrics`]
/// when no face can be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMetrics {
    /// Skip font lookups for ASCII text.
    pub fast: bool,
}

impl TextMeasure for FontMetrics {
    fn line_dimensions(&self, line: &str, font_size: f32, font_family: &str) -> (f32, f32) {
        if self.fast && line.is_ascii() {
            return ApproximateMetrics.line_dimensions(line, font_size, font_family);
        }
        let width = text_metrics::measure_text_width(line, font_size, font_family)
            .unwrap_or_else(|| fallback_text_width(line, font_size));
        let height = text_metrics::line_height(font_size, font_family).unwrap_or(font_size);
        (width, height)
    }
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}

pub(crate) fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Splits on explicit breaks: newlines, `<br>`, `<br/>` and escaped `\n`.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

/// Greedy word wrap. A single word wider than `max_width` keeps its own line.
pub(crate) fn wrap_line(line: &str, max_width: f32, width_of: impl Fn(&str) -> f32) -> Vec<String> {
    if width_of(line) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if width_of(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
