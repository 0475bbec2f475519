use crate::color::RgbColor;
use crate::theme::Theme;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Ring radii as fractions of `min(width, height) / 2`.
    pub center_radius: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub subquery_lighten: f64,
    pub show_title: bool,
    pub seed_max_lines: usize,
    pub category_max_lines: usize,
    pub subquery_max_lines: usize,
    /// Share of the available wedge room a label may use.
    pub label_fill_ratio: f64,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_radius: 0.16,
            inner_radius: 0.46,
            outer_radius: 0.92,
            subquery_lighten: 0.3,
            show_title: true,
            seed_max_lines: 3,
            category_max_lines: 3,
            subquery_max_lines: 2,
            label_fill_ratio: 0.9,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Whether a config file set `width` / `height`. `chart` only follows
    /// the configured size on those axes.
    #[serde(skip)]
    pub width_configured: bool,
    #[serde(skip)]
    pub height_configured: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
            width_configured: false,
            height_configured: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub max_per_category: usize,
    pub temperature: f32,
    /// -1 lets the model pick its own thinking budget.
    pub thinking_budget: i32,
    pub enable_search: bool,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_per_category: 8,
            temperature: 0.3,
            thinking_budget: -1,
            enable_search: false,
            timeout_secs: 120,
            max_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    background: Option<RgbColor>,
    category_colors: Option<BTreeMap<String, RgbColor>>,
    theme: Option<ThemeFile>,
    layout: Option<LayoutFile>,
    generator: Option<GeneratorFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeFile {
    font_family: Option<String>,
    title_font_size: Option<f64>,
    seed_font_size: Option<f64>,
    category_font_size: Option<f64>,
    subquery_font_size: Option<f64>,
    min_font_size: Option<f64>,
    text_color: Option<RgbColor>,
    light_text_color: Option<RgbColor>,
    title_color: Option<RgbColor>,
    border_color: Option<RgbColor>,
    border_width_ratio: Option<f64>,
    seed_fill: Option<RgbColor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutFile {
    center_radius: Option<f64>,
    inner_radius: Option<f64>,
    outer_radius: Option<f64>,
    subquery_lighten: Option<f64>,
    show_title: Option<bool>,
    seed_max_lines: Option<usize>,
    category_max_lines: Option<usize>,
    subquery_max_lines: Option<usize>,
    label_fill_ratio: Option<f64>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratorFile {
    base_url: Option<String>,
    model: Option<String>,
    max_per_category: Option<usize>,
    temperature: Option<f32>,
    thinking_budget: Option<i32>,
    enable_search: Option<bool>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents, config)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn parse_config(contents: &str, mut config: Config) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(v) = parsed.width {
        config.render.width = v;
        config.render.width_configured = true;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
        config.render.height_configured = true;
    }
    if let Some(v) = parsed.background {
        config.theme.background = v;
    }
    if let Some(colors) = parsed.category_colors {
        config.theme.category_colors.extend(colors);
    }

    if let Some(theme) = parsed.theme {
        if let Some(v) = theme.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = theme.title_font_size {
            config.theme.title_font_size = v;
        }
        if let Some(v) = theme.seed_font_size {
            config.theme.seed_font_size = v;
        }
        if let Some(v) = theme.category_font_size {
            config.theme.category_font_size = v;
        }
        if let Some(v) = theme.subquery_font_size {
            config.theme.subquery_font_size = v;
        }
        if let Some(v) = theme.min_font_size {
            config.theme.min_font_size = v;
        }
        if let Some(v) = theme.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = theme.light_text_color {
            config.theme.light_text_color = v;
        }
        if let Some(v) = theme.title_color {
            config.theme.title_color = v;
        }
        if let Some(v) = theme.border_color {
            config.theme.border_color = v;
        }
        if let Some(v) = theme.border_width_ratio {
            config.theme.border_width_ratio = v;
        }
        if let Some(v) = theme.seed_fill {
            config.theme.seed_fill = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.center_radius {
            config.layout.center_radius = v;
        }
        if let Some(v) = layout.inner_radius {
            config.layout.inner_radius = v;
        }
        if let Some(v) = layout.outer_radius {
            config.layout.outer_radius = v;
        }
        if let Some(v) = layout.subquery_lighten {
            config.layout.subquery_lighten = v;
        }
        if let Some(v) = layout.show_title {
            config.layout.show_title = v;
        }
        if let Some(v) = layout.seed_max_lines {
            config.layout.seed_max_lines = v;
        }
        if let Some(v) = layout.category_max_lines {
            config.layout.category_max_lines = v;
        }
        if let Some(v) = layout.subquery_max_lines {
            config.layout.subquery_max_lines = v;
        }
        if let Some(v) = layout.label_fill_ratio {
            config.layout.label_fill_ratio = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
    }

    if let Some(generator) = parsed.generator {
        if let Some(v) = generator.base_url {
            config.generator.base_url = v;
        }
        if let Some(v) = generator.model {
            config.generator.model = v;
        }
        if let Some(v) = generator.max_per_category {
            config.generator.max_per_category = v;
        }
        if let Some(v) = generator.temperature {
            config.generator.temperature = v;
        }
        if let Some(v) = generator.thinking_budget {
            config.generator.thinking_budget = v;
        }
        if let Some(v) = generator.enable_search {
            config.generator.enable_search = v;
        }
        if let Some(v) = generator.timeout_secs {
            config.generator.timeout_secs = v;
        }
        if let Some(v) = generator.max_attempts {
            config.generator.max_attempts = v;
        }
        if let Some(v) = generator.retry_backoff_ms {
            config.generator.retry_backoff_ms = v;
        }
    }

    Ok(config)
}
