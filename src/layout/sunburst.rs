use std::collections::HashMap;

use tracing::debug;

use crate::color::RgbColor;
use crate::config::LayoutConfig;
use crate::ir::SubqueryRow;
use crate::theme::Theme;

use super::{
    CategoryWedge, LabelAnchor, LabelOrientation, LayoutError, SubqueryWedge, SunburstLayout,
};

const FULL_CIRCLE: f64 = 360.0;

struct CategoryGroup<'a> {
    name: &'a str,
    subqueries: Vec<&'a str>,
}

pub(super) fn compute_sunburst_layout(
    rows: &[SubqueryRow],
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<SunburstLayout, LayoutError> {
    if rows.is_empty() {
        return Err(LayoutError::EmptyDataset);
    }
    validate_radii(config)?;

    let groups = group_by_category(rows);
    let total = rows.len();
    debug!(
        categories = groups.len(),
        subqueries = total,
        "grouped rows by category"
    );

    let category_ring = (config.center_radius, config.inner_radius);
    let subquery_ring = (config.inner_radius, config.outer_radius);

    let mut wedges = Vec::with_capacity(groups.len());
    let mut cumulative = 0usize;
    let mut start = 0.0_f64;
    let last_group = groups.len() - 1;
    for (idx, group) in groups.iter().enumerate() {
        cumulative += group.subqueries.len();
        let end = if idx == last_group {
            FULL_CIRCLE
        } else {
            FULL_CIRCLE * cumulative as f64 / total as f64
        };
        let color = resolve_category_color(group.name, theme);
        let child_color = color.lighten(config.subquery_lighten);
        let children = partition_children(group, start, end, subquery_ring, child_color);
        wedges.push(CategoryWedge {
            category: group.name.to_string(),
            start_angle: start,
            end_angle: end,
            inner_radius: category_ring.0,
            outer_radius: category_ring.1,
            color,
            row_count: group.subqueries.len(),
            anchor: label_anchor(start, end, category_ring, LabelOrientation::Tangential),
            children,
        });
        start = end;
    }

    Ok(SunburstLayout {
        seed: rows.first().map(|row| row.seed.clone()),
        total_rows: total,
        center_radius: config.center_radius,
        inner_radius: config.inner_radius,
        outer_radius: config.outer_radius,
        wedges,
    })
}

fn validate_radii(config: &LayoutConfig) -> Result<(), LayoutError> {
    let (center, inner, outer) = (config.center_radius, config.inner_radius, config.outer_radius);
    let ordered = center >= 0.0 && center < inner && inner < outer && outer <= 1.0;
    if !ordered {
        return Err(LayoutError::InvalidRadii {
            center,
            inner,
            outer,
        });
    }
    Ok(())
}

fn group_by_category(rows: &[SubqueryRow]) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let slot = *index.entry(row.category.as_str()).or_insert_with(|| {
            groups.push(CategoryGroup {
                name: row.category.as_str(),
                subqueries: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].subqueries.push(row.subquery.as_str());
    }
    groups
}

fn partition_children(
    group: &CategoryGroup<'_>,
    start: f64,
    end: f64,
    ring: (f64, f64),
    color: RgbColor,
) -> Vec<SubqueryWedge> {
    let count = group.subqueries.len();
    let span = end - start;
    let mut children = Vec::with_capacity(count);
    let mut child_start = start;
    for (idx, subquery) in group.subqueries.iter().enumerate() {
        let child_end = if idx + 1 == count {
            end
        } else {
            start + span * (idx + 1) as f64 / count as f64
        };
        children.push(SubqueryWedge {
            label: subquery.to_string(),
            start_angle: child_start,
            end_angle: child_end,
            inner_radius: ring.0,
            outer_radius: ring.1,
            color,
            anchor: label_anchor(child_start, child_end, ring, LabelOrientation::Radial),
        });
        child_start = child_end;
    }
    children
}

fn resolve_category_color(name: &str, theme: &Theme) -> RgbColor {
    theme
        .category_color(name)
        .unwrap_or_else(|| RgbColor::from_name(name))
}

fn label_anchor(
    start: f64,
    end: f64,
    ring: (f64, f64),
    orientation: LabelOrientation,
) -> LabelAnchor {
    let angle = (start + end) / 2.0;
    let rotation = match orientation {
        LabelOrientation::Tangential => tangential_rotation(angle),
        LabelOrientation::Radial => radial_rotation(angle),
    };
    LabelAnchor {
        angle,
        radius: (ring.0 + ring.1) / 2.0,
        rotation,
        orientation,
    }
}

/// Rotation for text following the arc; flipped in the lower half.
pub fn tangential_rotation(angle: f64) -> f64 {
    let a = angle.rem_euclid(FULL_CIRCLE);
    let rotation = if a > 90.0 && a < 270.0 { a - 180.0 } else { a };
    normalize_rotation(rotation)
}

/// Rotation for text following the radius; reads outward on the right half
/// and inward on the left half.
pub fn radial_rotation(angle: f64) -> f64 {
    let a = angle.rem_euclid(FULL_CIRCLE);
    let rotation = if a > 180.0 { a + 90.0 } else { a - 90.0 };
    normalize_rotation(rotation)
}

fn normalize_rotation(rotation: f64) -> f64 {
    let r = rotation.rem_euclid(FULL_CIRCLE);
    if r >= 180.0 { r - FULL_CIRCLE } else { r }
}
