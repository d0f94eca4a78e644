use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub background: String,
    pub pie_colors: Vec<String>,
    pub pie_stroke_color: String,
    pub pie_stroke_width: f32,
    pub pie_opacity: f32,
    pub pie_title_text_size: f32,
    pub pie_title_text_color: String,
    pub pie_section_text_color: String,
}

impl Theme {
    pub fn mermaid_default() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#333333".to_string(),
            line_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
            pie_colors: [
                "#ECECFF", "#FFFFDE", "#B9B9FF", "#FFD0D0", "#C8F2C2", "#FFE0B3", "#D7C3F0",
                "#BFE6F2", "#F2C2E0", "#E6E6A1", "#C2D8F2", "#F2D7C2",
            ]
            .iter()
            .map(|color| color.to_string())
            .collect(),
            pie_stroke_color: "#000000".to_string(),
            pie_stroke_width: 2.0,
            pie_opacity: 0.7,
            pie_title_text_size: 25.0,
            pie_title_text_color: "#333333".to_string(),
            pie_section_text_color: "#333333".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            background: "#FFFFFF".to_string(),
            pie_colors: [
                "#4C78A8", "#F58518", "#54A24B", "#E45756", "#72B7B2", "#EECA3B", "#B279A2",
                "#FF9DA6", "#9D755D", "#BAB0AC", "#5F9ED1", "#C85200",
            ]
            .iter()
            .map(|color| color.to_string())
            .collect(),
            pie_stroke_color: "#FFFFFF".to_string(),
            pie_stroke_width: 1.0,
            pie_opacity: 1.0,
            pie_title_text_size: 18.0,
            pie_title_text_color: "#1C2430".to_string(),
            pie_section_text_color: "#1C2430".to_string(),
        }
    }

    /// Segment color for slice `index`, cycling through the palette.
    pub fn pie_color(&self, index: usize) -> &str {
        if self.pie_colors.is_empty() {
            return "#CCCCCC";
        }
        &self.pie_colors[index % self.pie_colors.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles() {
        let theme = Theme::modern();
        assert_eq!(theme.pie_color(0), theme.pie_color(12));
        assert_ne!(theme.pie_color(0), theme.pie_color(1));
    }
}
