use crate::color::RgbColor;
use crate::ir::KNOWN_CATEGORIES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_CATEGORY_COLORS: [&str; 8] = [
    "#E74C3C", "#1ABC9C", "#3498DB", "#E67E22", "#2ECC71", "#F39C12", "#9B59B6", "#E91E63",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    /// Font sizes are given for a 1000px canvas and scaled with the minor dimension.
    pub title_font_size: f64,
    pub seed_font_size: f64,
    pub category_font_size: f64,
    pub subquery_font_size: f64,
    pub min_font_size: f64,
    pub label_line_height: f64,
    pub text_color: RgbColor,
    pub light_text_color: RgbColor,
    pub title_color: RgbColor,
    pub border_color: RgbColor,
    /// Border width as a fraction of the canvas minor dimension.
    pub border_width_ratio: f64,
    pub seed_fill: RgbColor,
    pub background: RgbColor,
    pub category_colors: BTreeMap<String, RgbColor>,
}

impl Theme {
    pub fn fanout_default() -> Self {
        Self {
            font_family: "\"Noto Sans CJK JP\", \"Hiragino Sans\", \"Yu Gothic\", Inter, sans-serif"
                .to_string(),
            title_font_size: 22.0,
            seed_font_size: 18.0,
            category_font_size: 13.0,
            subquery_font_size: 9.0,
            min_font_size: 6.0,
            label_line_height: 1.2,
            text_color: RgbColor::new(0x33, 0x33, 0x33),
            light_text_color: RgbColor::WHITE,
            title_color: RgbColor::new(0x2C, 0x3E, 0x50),
            border_color: RgbColor::WHITE,
            border_width_ratio: 0.0015,
            seed_fill: RgbColor::new(0xE8, 0xE8, 0xE8),
            background: RgbColor::WHITE,
            category_colors: default_category_colors(),
        }
    }

    /// Table color for a known category; `None` means the caller derives one.
    pub fn category_color(&self, category: &str) -> Option<RgbColor> {
        self.category_colors.get(category).copied()
    }

    /// Text color with enough contrast against `fill`.
    pub fn text_color_on(&self, fill: RgbColor) -> RgbColor {
        if fill.luminance() < 0.45 {
            self.light_text_color
        } else {
            self.text_color
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::fanout_default()
    }
}

pub fn default_category_colors() -> BTreeMap<String, RgbColor> {
    KNOWN_CATEGORIES
        .iter()
        .zip(DEFAULT_CATEGORY_COLORS)
        .filter_map(|(name, hex)| RgbColor::parse_hex(hex).map(|color| (name.to_string(), color)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_every_known_category() {
        let theme = Theme::fanout_default();
        assert_eq!(theme.category_colors.len(), KNOWN_CATEGORIES.len());
        assert_eq!(
            theme.category_color("曖昧さの解消"),
            Some(RgbColor::new(0xE7, 0x4C, 0x3C))
        );
        assert_eq!(
            theme.category_color("ユーザー個別化（過去検索や位置・時間などの信号を活用）"),
            Some(RgbColor::new(0xE9, 0x1E, 0x63))
        );
        assert_eq!(theme.category_color("unknown"), None);
    }

    #[test]
    fn text_color_contrasts_with_fill() {
        let theme = Theme::fanout_default();
        assert_eq!(theme.text_color_on(RgbColor::new(20, 20, 20)), theme.light_text_color);
        assert_eq!(theme.text_color_on(RgbColor::WHITE), theme.text_color);
    }
}
