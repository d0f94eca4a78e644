use crate::ir::{ChartData, ChartError, Slice};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static INIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%\{\s*init\s*:\s*(\{.*\})\s*\}%%").unwrap());
static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^pie(?:\s+(showdata))?(?:\s+title\s+(.*))?\s*$").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^title(?:\s+(.*))?$").unwrap());
static SLICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:"([^"]*)"|'([^']*)'|([^:]+?))\s*:\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*$"#)
        .unwrap()
});

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub chart: ChartData,
    pub init_config: Option<serde_json::Value>,
}

/// Parses a chart source. JSON objects are read as [`ChartData`] directly,
/// anything else as a mermaid-style `pie` block.
pub fn parse_chart(input: &str) -> Result<ParseOutput> {
    let trimmed = input.trim_start();
    let output = if trimmed.starts_with('{') {
        let chart: ChartData = match serde_json::from_str(trimmed) {
            Ok(chart) => chart,
            Err(_) => json5::from_str(trimmed)?,
        };
        ParseOutput {
            chart,
            init_config: None,
        }
    } else {
        parse_pie_source(input)?
    };
    output.chart.validate()?;
    Ok(output)
}

fn preprocess_input(input: &str) -> (Vec<(usize, String)>, Option<serde_json::Value>) {
    let mut init_config: Option<serde_json::Value> = None;
    let mut lines = Vec::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let trimmed_line = raw_line.trim();
        if trimmed_line.is_empty() {
            continue;
        }
        if let Some(caps) = INIT_RE.captures(trimmed_line) {
            if let Some(json_str) = caps.get(1).map(|m| m.as_str()) {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                    init_config = Some(value);
                } else if let Ok(value) = json5::from_str::<serde_json::Value>(json_str) {
                    init_config = Some(value);
                }
            }
            continue;
        }
        if trimmed_line.starts_with("%%") {
            continue;
        }
        let without_comment = strip_trailing_comment(trimmed_line);
        if without_comment.is_empty() {
            continue;
        }
        lines.push((idx + 1, without_comment.to_string()));
    }

    (lines, init_config)
}

fn parse_pie_source(input: &str) -> Result<ParseOutput> {
    let (lines, init_config) = preprocess_input(input);
    let mut chart = ChartData::new();
    let mut seen_header = false;

    for (line_no, line) in lines {
        if !seen_header {
            let caps = HEADER_RE.captures(&line).ok_or_else(|| ChartError::Syntax {
                line: line_no,
                message: format!("expected `pie` header, found {line:?}"),
            })?;
            chart.show_data = caps.get(1).is_some();
            chart.title = caps.get(2).map(|m| m.as_str().trim().to_string()).filter(|t| !t.is_empty());
            seen_header = true;
            continue;
        }
        if line.eq_ignore_ascii_case("showdata") {
            chart.show_data = true;
            continue;
        }
        if let Some(caps) = TITLE_RE.captures(&line) {
            let title = caps.get(1).map_or("", |m| m.as_str()).trim();
            if !title.is_empty() {
                chart.title = Some(title.to_string());
            }
            continue;
        }
        chart.slices.push(parse_slice_line(&line, line_no)?);
    }

    if !seen_header {
        return Err(ChartError::Empty.into());
    }
    Ok(ParseOutput { chart, init_config })
}

fn parse_slice_line(line: &str, line_no: usize) -> Result<Slice, ChartError> {
    let caps = SLICE_RE.captures(line).ok_or_else(|| ChartError::Syntax {
        line: line_no,
        message: format!("expected `\"label\" : value`, found {line:?}"),
    })?;
    let label = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map_or("", |m| m.as_str())
        .trim()
        .to_string();
    let raw_value = caps.get(4).map_or("", |m| m.as_str());
    let value = raw_value.parse::<f32>().map_err(|_| ChartError::Syntax {
        line: line_no,
        message: format!("invalid slice value {raw_value:?}"),
    })?;
    Ok(Slice {
        label,
        value,
        color: None,
    })
}

fn strip_trailing_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let bytes = line.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'%' if !in_quotes && bytes.get(idx + 1) == Some(&b'%') => return line[..idx].trim_end(),
            _ => {}
        }
    }
    line
}
