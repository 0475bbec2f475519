use crate::color::RgbColor;
use crate::config::LayoutConfig;
use crate::layout::text::{FitOptions, LabelBox, fit_label};
use crate::layout::{LabelAnchor, LabelOrientation, SunburstLayout};
use crate::output::write_atomic;
use crate::theme::Theme;
use std::f64::consts::PI;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "png")]
pub use resvg::tiny_skia::Pixmap;

/// Font sizes in the theme are given for this minor canvas dimension.
const REFERENCE_CANVAS: f64 = 1000.0;
const FULL_TURN_EPS: f64 = 1e-9;
/// Vertical shift that centers a line of text on its anchor.
const BASELINE_SHIFT: f64 = 0.35;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render input: {0}")]
    InvalidInput(String),
    #[error("failed to parse generated SVG: {0}")]
    Svg(String),
    #[error("failed to allocate a {width}x{height} canvas")]
    Pixmap { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Title,
    Seed,
    Category,
    Subquery,
}

/// One annular sector in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorShape {
    pub center: (f64, f64),
    pub start_angle: f64,
    pub end_angle: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub fill: RgbColor,
}

impl SectorShape {
    /// Outer start, outer end, inner end, inner start.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            polar(self.center, self.outer_radius, self.start_angle),
            polar(self.center, self.outer_radius, self.end_angle),
            polar(self.center, self.inner_radius, self.end_angle),
            polar(self.center, self.inner_radius, self.start_angle),
        ]
    }

    fn is_full_turn(&self) -> bool {
        self.end_angle - self.start_angle >= 360.0 - FULL_TURN_EPS
    }

    fn path(&self) -> String {
        let (cx, cy) = self.center;
        let (r_out, r_in) = (self.outer_radius, self.inner_radius);
        if self.is_full_turn() {
            let mut d = ring_path(cx, cy, r_out);
            if r_in > 0.0 {
                d.push(' ');
                d.push_str(&ring_path(cx, cy, r_in));
            }
            return d;
        }
        let large = if self.end_angle - self.start_angle > 180.0 { 1 } else { 0 };
        let [outer_start, outer_end, inner_end, inner_start] = self.corners();
        let mut d = format!(
            "M {:.2} {:.2} A {r_out:.2} {r_out:.2} 0 {large} 1 {:.2} {:.2}",
            outer_start.0, outer_start.1, outer_end.0, outer_end.1
        );
        if r_in > 0.0 {
            d.push_str(&format!(
                " L {:.2} {:.2} A {r_in:.2} {r_in:.2} 0 {large} 0 {:.2} {:.2} Z",
                inner_end.0, inner_end.1, inner_start.0, inner_start.1
            ));
        } else {
            d.push_str(&format!(" L {cx:.2} {cy:.2} Z"));
        }
        d
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneLabel {
    pub kind: LabelKind,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub font_size: f64,
    pub lines: Vec<String>,
    pub fill: RgbColor,
    pub centered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedDisk {
    pub center: (f64, f64),
    pub radius: f64,
    pub fill: RgbColor,
}

/// Everything the SVG writer needs, already in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: RgbColor,
    pub border_color: RgbColor,
    pub border_width: f64,
    pub font_family: String,
    pub line_height: f64,
    pub seed_disk: Option<SeedDisk>,
    pub sectors: Vec<SectorShape>,
    pub labels: Vec<SceneLabel>,
}

struct Canvas {
    center: (f64, f64),
    /// Pixels per unit radius.
    scale: f64,
    font_scale: f64,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        let minor = width.min(height) as f64;
        Self {
            center: (width as f64 / 2.0, height as f64 / 2.0),
            scale: minor / 2.0,
            font_scale: minor / REFERENCE_CANVAS,
        }
    }
}

pub fn build_scene(
    layout: &SunburstLayout,
    width: u32,
    height: u32,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Scene, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidInput(format!(
            "canvas dimensions must be positive, got {width}x{height}"
        )));
    }
    if layout.wedges.is_empty() {
        return Err(RenderError::InvalidInput("no wedges to render".to_string()));
    }

    let canvas = Canvas::new(width, height);
    let mut sectors = Vec::with_capacity(layout.wedges.len() + layout.subquery_count());
    let mut labels = Vec::new();
    let mut skipped = 0usize;

    for wedge in &layout.wedges {
        sectors.push(SectorShape {
            center: canvas.center,
            start_angle: wedge.start_angle,
            end_angle: wedge.end_angle,
            inner_radius: wedge.inner_radius * canvas.scale,
            outer_radius: wedge.outer_radius * canvas.scale,
            fill: wedge.color,
        });
        let category_label = place_wedge_label(
            &wedge.category,
            &wedge.anchor,
            (wedge.inner_radius, wedge.outer_radius),
            wedge.end_angle - wedge.start_angle,
            wedge.color,
            LabelKind::Category,
            &canvas,
            theme,
            config,
        );
        match category_label {
            Some(label) => labels.push(label),
            None => skipped += 1,
        }

        for child in &wedge.children {
            sectors.push(SectorShape {
                center: canvas.center,
                start_angle: child.start_angle,
                end_angle: child.end_angle,
                inner_radius: child.inner_radius * canvas.scale,
                outer_radius: child.outer_radius * canvas.scale,
                fill: child.color,
            });
            let child_label = place_wedge_label(
                &child.label,
                &child.anchor,
                (child.inner_radius, child.outer_radius),
                child.span(),
                child.color,
                LabelKind::Subquery,
                &canvas,
                theme,
                config,
            );
            match child_label {
                Some(label) => labels.push(label),
                None => skipped += 1,
            }
        }
    }

    let seed_disk = (layout.center_radius > 0.0).then(|| SeedDisk {
        center: canvas.center,
        radius: layout.center_radius * canvas.scale,
        fill: theme.seed_fill,
    });
    if let (Some(disk), Some(seed)) = (&seed_disk, layout.seed.as_deref()) {
        if let Some(label) = place_seed_label(seed, disk, &canvas, theme, config) {
            labels.push(label);
        }
    }
    if config.show_title {
        if let Some(seed) = layout.seed.as_deref() {
            labels.push(title_label(seed, &canvas, theme));
        }
    }

    debug!(
        sectors = sectors.len(),
        labels = labels.len(),
        skipped_labels = skipped,
        "built sunburst scene"
    );

    Ok(Scene {
        width,
        height,
        background: theme.background,
        border_color: theme.border_color,
        border_width: (theme.border_width_ratio * width.min(height) as f64).max(1.0),
        font_family: theme.font_family.clone(),
        line_height: theme.label_line_height,
        seed_disk,
        sectors,
        labels,
    })
}

#[allow(clippy::too_many_arguments)]
fn place_wedge_label(
    text: &str,
    anchor: &LabelAnchor,
    ring: (f64, f64),
    span_deg: f64,
    fill: RgbColor,
    kind: LabelKind,
    canvas: &Canvas,
    theme: &Theme,
    config: &LayoutConfig,
) -> Option<SceneLabel> {
    let thickness = (ring.1 - ring.0) * canvas.scale;
    let radius = anchor.radius * canvas.scale;
    let inner = ring.0 * canvas.scale;
    let span = span_deg.min(360.0).to_radians();
    let room = match anchor.orientation {
        // Chord at the label radius; capped at the diameter for wide wedges.
        LabelOrientation::Tangential => LabelBox {
            along: 2.0 * radius * (span.min(PI) / 2.0).sin(),
            across: thickness,
        },
        // The wedge is narrowest at its inner edge.
        LabelOrientation::Radial => LabelBox {
            along: thickness,
            across: inner * span,
        },
    };
    let room = LabelBox {
        along: room.along * config.label_fill_ratio,
        across: room.across * config.label_fill_ratio,
    };
    let (base_size, max_lines) = match kind {
        LabelKind::Category => (theme.category_font_size, config.category_max_lines),
        _ => (theme.subquery_font_size, config.subquery_max_lines),
    };
    let options = FitOptions {
        base_size: base_size * canvas.font_scale,
        min_size: theme.min_font_size * canvas.font_scale,
        max_lines,
        line_height: theme.label_line_height,
        font_family: &theme.font_family,
        fast_metrics: config.fast_text_metrics,
    };
    let fitted = fit_label(text, room, &options)?;
    let (x, y) = polar(canvas.center, radius, anchor.angle);
    Some(SceneLabel {
        kind,
        x,
        y,
        rotation: anchor.rotation,
        font_size: fitted.font_size,
        lines: fitted.lines,
        fill: theme.text_color_on(fill),
        centered: true,
    })
}

fn place_seed_label(
    seed: &str,
    disk: &SeedDisk,
    canvas: &Canvas,
    theme: &Theme,
    config: &LayoutConfig,
) -> Option<SceneLabel> {
    // Square inscribed in the disk.
    let side = disk.radius * std::f64::consts::SQRT_2 * config.label_fill_ratio;
    let options = FitOptions {
        base_size: theme.seed_font_size * canvas.font_scale,
        min_size: theme.min_font_size * canvas.font_scale,
        max_lines: config.seed_max_lines,
        line_height: theme.label_line_height,
        font_family: &theme.font_family,
        fast_metrics: config.fast_text_metrics,
    };
    let fitted = fit_label(
        seed,
        LabelBox {
            along: side,
            across: side,
        },
        &options,
    )?;
    Some(SceneLabel {
        kind: LabelKind::Seed,
        x: disk.center.0,
        y: disk.center.1,
        rotation: 0.0,
        font_size: fitted.font_size,
        lines: fitted.lines,
        fill: theme.text_color_on(disk.fill),
        centered: true,
    })
}

fn title_label(seed: &str, canvas: &Canvas, theme: &Theme) -> SceneLabel {
    let font_size = theme.title_font_size * canvas.font_scale;
    let margin = font_size;
    SceneLabel {
        kind: LabelKind::Title,
        x: margin,
        y: margin + font_size,
        rotation: 0.0,
        font_size,
        lines: vec![format!("Query Fan-Out: {seed}")],
        fill: theme.title_color,
        centered: false,
    }
}

/// Point at `angle` degrees clockwise from 12 o'clock.
fn polar(center: (f64, f64), radius: f64, angle: f64) -> (f64, f64) {
    let rad = angle.to_radians();
    (center.0 + radius * rad.sin(), center.1 - radius * rad.cos())
}

fn ring_path(cx: f64, cy: f64, r: f64) -> String {
    format!(
        "M {cx:.2} {:.2} A {r:.2} {r:.2} 0 1 1 {cx:.2} {:.2} A {r:.2} {r:.2} 0 1 1 {cx:.2} {:.2} Z",
        cy - r,
        cy + r,
        cy - r
    )
}

pub fn render_svg(scene: &Scene) -> String {
    let mut svg = String::new();
    let (width, height) = (scene.width, scene.height);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        scene.background
    ));

    svg.push_str(&format!(
        "<g stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linejoin=\"round\">",
        scene.border_color, scene.border_width
    ));
    for sector in &scene.sectors {
        let rule = if sector.is_full_turn() {
            " fill-rule=\"evenodd\""
        } else {
            ""
        };
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"{}\"{rule}/>",
            sector.path(),
            sector.fill
        ));
    }
    if let Some(disk) = &scene.seed_disk {
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
            disk.center.0, disk.center.1, disk.radius, disk.fill
        ));
    }
    svg.push_str("</g>");

    svg.push_str(&format!(
        "<g font-family=\"{}\">",
        escape_xml(&scene.font_family)
    ));
    for label in &scene.labels {
        svg.push_str(&label_svg(label, scene.line_height));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn label_svg(label: &SceneLabel, line_height: f64) -> String {
    let (x, y) = (label.x, label.y);
    let line_step = label.font_size * line_height;
    let anchor = if label.centered { "middle" } else { "start" };
    let first_dy = if label.centered {
        -(label.lines.len() as f64 - 1.0) / 2.0 * line_step + BASELINE_SHIFT * label.font_size
    } else {
        0.0
    };
    let transform = if label.rotation.abs() > f64::EPSILON {
        format!(" transform=\"rotate({:.2} {x:.2} {y:.2})\"", label.rotation)
    } else {
        String::new()
    };
    let weight = match label.kind {
        LabelKind::Title | LabelKind::Seed | LabelKind::Category => " font-weight=\"600\"",
        LabelKind::Subquery => "",
    };

    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-size=\"{:.2}\" fill=\"{}\"{weight}{transform}>",
        label.font_size, label.fill
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { first_dy } else { line_step };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

#[cfg(feature = "png")]
static FONT_DB: once_cell::sync::Lazy<std::sync::Arc<usvg::fontdb::Database>> =
    once_cell::sync::Lazy::new(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        std::sync::Arc::new(db)
    });

/// Lays out the scene and rasterizes it onto a `width x height` canvas.
#[cfg(feature = "png")]
pub fn render(
    layout: &SunburstLayout,
    width: u32,
    height: u32,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Pixmap, RenderError> {
    let scene = build_scene(layout, width, height, theme, config)?;
    let svg = render_svg(&scene);
    rasterize_svg(&svg, width, height)
}

#[cfg(feature = "png")]
pub fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<Pixmap, RenderError> {
    let mut opt = usvg::Options::default();
    opt.fontdb = FONT_DB.clone();

    let tree =
        usvg::Tree::from_str(svg, &opt).map_err(|err| RenderError::Svg(err.to_string()))?;
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    Ok(pixmap)
}

#[cfg(feature = "png")]
pub fn write_output_png(pixmap: &Pixmap, output: &Path) -> Result<(), RenderError> {
    let bytes = pixmap
        .encode_png()
        .map_err(|err| RenderError::Encode(err.to_string()))?;
    write_atomic(output, &bytes)?;
    Ok(())
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<(), RenderError> {
    match output {
        Some(path) => {
            write_atomic(path, svg.as_bytes())?;
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
