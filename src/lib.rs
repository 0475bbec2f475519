#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod dataset;
pub mod generator;
pub mod ir;
pub mod layout;
pub mod layout_dump;
#[cfg(feature = "cli")]
pub mod logging;
pub mod output;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use ir::{FanoutResult, Locale, SubqueryRow};
pub use layout::{LayoutError, SunburstLayout, compute_layout};
pub use render::{RenderError, build_scene, render_svg};
pub use theme::Theme;

/// Lays out `rows` and returns the chart as an SVG document.
pub fn render_rows_to_svg(rows: &[SubqueryRow], config: &Config) -> anyhow::Result<String> {
    let layout = compute_layout(rows, &config.theme, &config.layout)?;
    let scene = build_scene(
        &layout,
        config.render.width,
        config.render.height,
        &config.theme,
        &config.layout,
    )?;
    Ok(render_svg(&scene))
}
