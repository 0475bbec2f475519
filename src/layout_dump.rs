use crate::layout::SunburstLayout;
use crate::output::write_atomic;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub seed: Option<String>,
    pub total_rows: usize,
    pub radii: [f64; 3],
    pub categories: Vec<CategoryDump>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDump {
    pub name: String,
    pub color: String,
    pub rows: usize,
    pub start: f64,
    pub end: f64,
    pub label_rotation: f64,
    pub subqueries: Vec<SubqueryDump>,
}

#[derive(Debug, Serialize)]
pub struct SubqueryDump {
    pub label: String,
    pub color: String,
    pub start: f64,
    pub end: f64,
    pub label_rotation: f64,
}

impl LayoutDump {
    pub fn from_layout(layout: &SunburstLayout) -> Self {
        let categories = layout
            .wedges
            .iter()
            .map(|wedge| CategoryDump {
                name: wedge.category.clone(),
                color: wedge.color.to_hex(),
                rows: wedge.row_count,
                start: wedge.start_angle,
                end: wedge.end_angle,
                label_rotation: wedge.anchor.rotation,
                subqueries: wedge
                    .children
                    .iter()
                    .map(|child| SubqueryDump {
                        label: child.label.clone(),
                        color: child.color.to_hex(),
                        start: child.start_angle,
                        end: child.end_angle,
                        label_rotation: child.anchor.rotation,
                    })
                    .collect(),
            })
            .collect();

        LayoutDump {
            seed: layout.seed.clone(),
            total_rows: layout.total_rows,
            radii: [
                layout.center_radius,
                layout.inner_radius,
                layout.outer_radius,
            ],
            categories,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &SunburstLayout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    let json = serde_json::to_vec_pretty(&dump)?;
    write_atomic(path, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{Locale, SubqueryRow};
    use crate::layout::compute_layout;
    use crate::theme::Theme;

    #[test]
    fn dump_lists_wedges_in_order() {
        let rows = vec![
            SubqueryRow::new("tea", Locale::En, "b", "b1"),
            SubqueryRow::new("tea", Locale::En, "a", "a1"),
            SubqueryRow::new("tea", Locale::En, "b", "b2"),
        ];
        let layout =
            compute_layout(&rows, &Theme::fanout_default(), &LayoutConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        write_layout_dump(&path, &layout).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["seed"], "tea");
        assert_eq!(value["total_rows"], 3);
        assert_eq!(value["categories"][0]["name"], "b");
        assert_eq!(value["categories"][0]["rows"], 2);
        assert_eq!(value["categories"][0]["subqueries"][1]["label"], "b2");
        assert_eq!(value["categories"][1]["end"], 360.0);
        assert!(value["categories"][0]["color"].as_str().unwrap().starts_with('#'));
    }
}
