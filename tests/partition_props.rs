//! Property tests for the sunburst partition: for any non-empty row set the
//! wedges tile the circle exactly and keep insertion order.

use proptest::prelude::*;
use query_fanout::ir::{Locale, SubqueryRow};
use query_fanout::layout::{compute_layout, radial_rotation, tangential_rotation};
use query_fanout::{LayoutConfig, Theme, build_scene};

const EPS: f64 = 1e-6;

/// Rows drawn from a small category alphabet so categories repeat.
fn rows_strategy() -> impl Strategy<Value = Vec<SubqueryRow>> {
    prop::collection::vec((0usize..12, "[a-z ]{0,12}"), 1..200).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(idx, (category, text))| {
                SubqueryRow::new(
                    "seed",
                    Locale::En,
                    format!("category-{category}"),
                    format!("{idx}{text}"),
                )
            })
            .collect()
    })
}

fn fast_config() -> LayoutConfig {
    LayoutConfig {
        fast_text_metrics: true,
        ..LayoutConfig::default()
    }
}

proptest! {
    #[test]
    fn categories_tile_the_circle(rows in rows_strategy()) {
        let layout = compute_layout(&rows, &Theme::fanout_default(), &fast_config()).unwrap();
        let total: f64 = layout.wedges.iter().map(|w| w.span()).sum();
        prop_assert!((total - 360.0).abs() < EPS);
        prop_assert_eq!(layout.wedges.first().unwrap().start_angle, 0.0);
        prop_assert_eq!(layout.wedges.last().unwrap().end_angle, 360.0);
        for pair in layout.wedges.windows(2) {
            prop_assert_eq!(pair[0].end_angle, pair[1].start_angle);
        }
        prop_assert_eq!(layout.subquery_count(), rows.len());
    }

    #[test]
    fn children_tile_their_parent(rows in rows_strategy()) {
        let layout = compute_layout(&rows, &Theme::fanout_default(), &fast_config()).unwrap();
        for wedge in &layout.wedges {
            let sum: f64 = wedge.children.iter().map(|c| c.span()).sum();
            prop_assert!((sum - wedge.span()).abs() < EPS);
            prop_assert_eq!(wedge.children.first().unwrap().start_angle, wedge.start_angle);
            prop_assert_eq!(wedge.children.last().unwrap().end_angle, wedge.end_angle);
            for child in &wedge.children {
                prop_assert!(child.span() > 0.0);
            }
        }
    }

    #[test]
    fn order_follows_input(rows in rows_strategy()) {
        let layout = compute_layout(&rows, &Theme::fanout_default(), &fast_config()).unwrap();
        let mut seen: Vec<&str> = Vec::new();
        for row in &rows {
            if !seen.contains(&row.category.as_str()) {
                seen.push(&row.category);
            }
        }
        let categories: Vec<&str> = layout.wedges.iter().map(|w| w.category.as_str()).collect();
        prop_assert_eq!(categories, seen);

        for wedge in &layout.wedges {
            let expected: Vec<&str> = rows
                .iter()
                .filter(|r| r.category == wedge.category)
                .map(|r| r.subquery.as_str())
                .collect();
            let labels: Vec<&str> = wedge.children.iter().map(|c| c.label.as_str()).collect();
            prop_assert_eq!(labels, expected);
        }
    }

    #[test]
    fn layout_is_deterministic(rows in rows_strategy()) {
        let theme = Theme::fanout_default();
        let config = fast_config();
        prop_assert_eq!(
            compute_layout(&rows, &theme, &config).unwrap(),
            compute_layout(&rows, &theme, &config).unwrap()
        );
    }

    #[test]
    fn scene_doubles_with_canvas(rows in rows_strategy()) {
        let theme = Theme::fanout_default();
        let config = fast_config();
        let layout = compute_layout(&rows, &theme, &config).unwrap();
        let small = build_scene(&layout, 1000, 1000, &theme, &config).unwrap();
        let large = build_scene(&layout, 2000, 2000, &theme, &config).unwrap();
        for (a, b) in small.sectors.iter().zip(&large.sectors) {
            for (p, q) in a.corners().iter().zip(b.corners().iter()) {
                prop_assert!((p.0 * 2.0 - q.0).abs() < 1e-6);
                prop_assert!((p.1 * 2.0 - q.1).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn rotations_stay_upright(angle in 0.0f64..360.0) {
        for rotation in [tangential_rotation(angle), radial_rotation(angle)] {
            prop_assert!((-90.0..=90.0).contains(&rotation), "{} -> {}", angle, rotation);
        }
    }
}
