use crate::layout::{Diagnostics, Label, LabelLayout, Ring};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub center: [f32; 2],
    pub outer_radius: f32,
    pub inner_radius: f32,
    pub title: Option<String>,
    pub top_is_lifted: bool,
    pub bottom_is_lifted: bool,
    pub max_line_angle: f32,
    pub min_proportion: Option<f32>,
    pub segments: Vec<SegmentDump>,
    pub labels: Vec<LabelDump>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Serialize)]
pub struct SegmentDump {
    pub id: usize,
    pub label: String,
    pub value: f32,
    pub start_angle: f32,
    pub end_angle: f32,
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub id: usize,
    pub ring: Ring,
    pub shown: bool,
    pub lines: Vec<String>,
    pub font_size: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub connector: [[f32; 2]; 2],
    pub line_angle: f32,
}

impl LabelDump {
    fn from_label(label: &Label) -> Self {
        let (sx, sy) = label.segment_coord();
        let (cx, cy) = label.line_connector_coord;
        Self {
            id: label.id,
            ring: label.ring,
            shown: label.label_shown,
            lines: label.text_lines.clone(),
            font_size: label.font_size,
            x: label.top_left_coord.0,
            y: label.top_left_coord.1,
            width: label.width,
            height: label.height,
            connector: [[sx, sy], [cx, cy]],
            line_angle: label.label_line_angle(),
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &LabelLayout) -> Self {
        let geometry = &layout.geometry;
        let segments = layout
            .segments
            .iter()
            .map(|segment| SegmentDump {
                id: segment.id,
                label: segment.label.clone(),
                value: segment.value,
                start_angle: segment.start_angle,
                end_angle: segment.end_angle,
                color: segment.color.clone(),
            })
            .collect();

        let mut labels: Vec<LabelDump> = layout
            .outer
            .iter()
            .chain(&layout.inner)
            .chain(&layout.dropped)
            .map(LabelDump::from_label)
            .collect();
        labels.sort_by_key(|label| label.id);

        LayoutDump {
            width: geometry.canvas_width,
            height: geometry.canvas_height,
            center: [geometry.center.0, geometry.center.1],
            outer_radius: geometry.outer_radius,
            inner_radius: geometry.inner_radius,
            title: layout.title.clone(),
            top_is_lifted: layout.top_is_lifted,
            bottom_is_lifted: layout.bottom_is_lifted,
            max_line_angle: layout.max_line_angle,
            min_proportion: layout.min_proportion,
            segments,
            labels,
            diagnostics: layout.diagnostics.clone(),
        }
    }
}

/// Writes the layout as pretty JSON to `path`, or stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, layout: &LabelLayout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
