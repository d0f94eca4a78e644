use crate::config::RenderConfig;
use crate::layout::geometry::point_on_circle;
use crate::layout::inner::inner_label_line;
use crate::layout::placement::sample_placement_curve;
use crate::layout::{Hemisphere, Label, LabelLayout, PieContext, PieGeometry, SegmentLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Draws a preview of the layout: segments, labels and their connector lines.
pub fn render_svg(layout: &LabelLayout, theme: &Theme, config: &RenderConfig) -> String {
    let geometry = &layout.geometry;
    let width = geometry.canvas_width.max(1.0);
    let height = geometry.canvas_height.max(1.0);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    let background = if config.background.is_empty() {
        theme.background.as_str()
    } else {
        config.background.as_str()
    };
    svg.push_str(&format!("<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>", background));

    for segment in &layout.segments {
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            segment_path(segment, geometry),
            escape_xml(&segment.color),
            theme.pie_opacity,
            theme.pie_stroke_color,
            theme.pie_stroke_width
        ));
    }

    if let Some(title) = &layout.title {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"hanging\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            geometry.cx(),
            4.0,
            escape_xml(&theme.font_family),
            theme.pie_title_text_size,
            theme.pie_title_text_color,
            escape_xml(title)
        ));
    }

    if config.show_placement_curve {
        let mut ctx = PieContext::new(*geometry, 0.0, 0.0);
        ctx.max_font_size = layout
            .outer
            .iter()
            .map(|label| label.line_height)
            .fold(0.0, f32::max);
        for hemisphere in [Hemisphere::Left, Hemisphere::Right] {
            let points = sample_placement_curve(&ctx, hemisphere, 2.0);
            if points.len() < 2 {
                continue;
            }
            svg.push_str(&format!(
                "<polyline points=\"{}\" fill=\"none\" stroke=\"#d62728\" stroke-width=\"0.8\" stroke-dasharray=\"3 2\"/>",
                points_to_attr(&points)
            ));
        }
    }

    for label in &layout.outer {
        let [from, to] = [label.segment_coord(), label.line_connector_coord];
        svg.push_str(&line_svg(from, to, &theme.line_color));
        svg.push_str(&label_svg(label, theme, config));
    }
    for label in &layout.inner {
        let [from, to] = inner_label_line(label);
        svg.push_str(&line_svg(from, to, &theme.line_color));
        svg.push_str(&label_svg(label, theme, config));
    }

    svg.push_str("</svg>");
    svg
}

fn segment_path(segment: &SegmentLayout, geometry: &PieGeometry) -> String {
    let center = geometry.center;
    let outer = geometry.outer_radius;
    let inner = geometry.inner_radius;
    let extent = segment.end_angle - segment.start_angle;

    if extent >= 359.99 {
        // a single full slice: two half arcs, since one arc cannot close on itself
        let mid = segment.start_angle + 180.0;
        let mut d = full_ring(center, outer, segment.start_angle, mid);
        if inner > 0.0 {
            d.push(' ');
            d.push_str(&full_ring(center, inner, segment.start_angle, mid));
        }
        return d;
    }

    let large_arc = if extent > 180.0 { 1 } else { 0 };
    let (osx, osy) = point_on_circle(center, outer, segment.start_angle);
    let (oex, oey) = point_on_circle(center, outer, segment.end_angle);
    if inner > 0.0 {
        let (isx, isy) = point_on_circle(center, inner, segment.start_angle);
        let (iex, iey) = point_on_circle(center, inner, segment.end_angle);
        format!(
            "M {osx:.2} {osy:.2} A {outer:.2} {outer:.2} 0 {large_arc} 1 {oex:.2} {oey:.2} L {iex:.2} {iey:.2} A {inner:.2} {inner:.2} 0 {large_arc} 0 {isx:.2} {isy:.2} Z"
        )
    } else {
        let (cx, cy) = center;
        format!(
            "M {cx:.2} {cy:.2} L {osx:.2} {osy:.2} A {outer:.2} {outer:.2} 0 {large_arc} 1 {oex:.2} {oey:.2} Z"
        )
    }
}

fn full_ring(center: (f32, f32), radius: f32, start: f32, mid: f32) -> String {
    let (sx, sy) = point_on_circle(center, radius, start);
    let (mx, my) = point_on_circle(center, radius, mid);
    format!(
        "M {sx:.2} {sy:.2} A {radius:.2} {radius:.2} 0 1 1 {mx:.2} {my:.2} A {radius:.2} {radius:.2} 0 1 1 {sx:.2} {sy:.2} Z"
    )
}

fn line_svg(from: (f32, f32), to: (f32, f32), color: &str) -> String {
    format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        from.0, from.1, to.0, to.1, color
    )
}

fn label_svg(label: &Label, theme: &Theme, config: &RenderConfig) -> String {
    let (x, y) = label.top_left_coord;
    let mut out = String::new();
    if config.show_label_boxes {
        let _ = write!(
            out,
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            label.width,
            label.height,
            escape_xml(&label.color)
        );
    }
    let text_x = x + label.inner_padding;
    let _ = write!(
        out,
        "<text x=\"{text_x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" dominant-baseline=\"text-before-edge\">",
        y + label.inner_padding,
        escape_xml(&label.font_family),
        label.font_size,
        theme.pie_section_text_color
    );
    let lines: Vec<&str> = if label.text_lines.is_empty() {
        vec![label.text.as_str()]
    } else {
        label.text_lines.iter().map(String::as_str).collect()
    };
    for (idx, line) in lines.iter().enumerate() {
        let line_y = y + label.inner_padding + idx as f32 * label.line_height;
        let _ = write!(
            out,
            "<tspan x=\"{text_x:.2}\" y=\"{line_y:.2}\">{}</tspan>",
            escape_xml(line)
        );
    }
    out.push_str("</text>");
    out
}

fn points_to_attr(points: &[(f32, f32)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::ChartData;
    use crate::layout::{ApproximateMetrics, compute_label_layout};

    fn layout_for(labels: &[(&str, f32)], config: &LayoutConfig) -> LabelLayout {
        let mut chart = ChartData::new();
        chart.title = Some("Pets & friends".to_string());
        for (label, value) in labels {
            chart.push_slice(*label, *value);
        }
        compute_label_layout(&chart, config, &Theme::modern(), &ApproximateMetrics)
    }

    #[test]
    fn render_svg_basic() {
        let layout = layout_for(&[("Dogs", 3.0), ("<Cats>", 1.0)], &LayoutConfig::default());
        let svg = render_svg(&layout, &Theme::modern(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("Dogs"));
        assert!(svg.contains("&lt;Cats&gt;"));
        assert!(svg.contains("Pets &amp; friends"));
    }

    #[test]
    fn single_slice_draws_a_closed_circle() {
        let layout = layout_for(&[("Everything", 1.0)], &LayoutConfig::default());
        let svg = render_svg(&layout, &Theme::modern(), &RenderConfig::default());
        assert_eq!(svg.matches(" A ").count(), 2);
    }

    #[test]
    fn donut_segments_have_two_arcs() {
        let mut config = LayoutConfig::default();
        config.pie.inner_radius_ratio = 0.5;
        let layout = layout_for(&[("a", 1.0), ("b", 1.0)], &config);
        let path = segment_path(&layout.segments[0], &layout.geometry);
        assert_eq!(path.matches(" A ").count(), 2);
    }

    #[test]
    fn debug_overlays_are_optional() {
        let layout = layout_for(&[("a", 1.0), ("b", 2.0)], &LayoutConfig::default());
        let plain = render_svg(&layout, &Theme::modern(), &RenderConfig::default());
        assert!(!plain.contains("<polyline"));
        let config = RenderConfig {
            show_placement_curve: true,
            show_label_boxes: true,
            ..RenderConfig::default()
        };
        let debug = render_svg(&layout, &Theme::modern(), &config);
        assert!(debug.contains("<polyline"));
    }
}
