mod error;
mod sunburst;
pub mod text;
pub(crate) mod types;

pub use error::LayoutError;
pub use sunburst::{radial_rotation, tangential_rotation};
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::SubqueryRow;
use crate::theme::Theme;

/// Maps rows onto a two-ring sunburst: categories in first-seen order on the
/// inner ring, one equal wedge per sub-query on the outer ring.
pub fn compute_layout(
    rows: &[SubqueryRow],
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<SunburstLayout, LayoutError> {
    sunburst::compute_sunburst_layout(rows, theme, config)
}
