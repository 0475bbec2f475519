use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("cannot lay out an empty dataset")]
    EmptyDataset,
    #[error(
        "invalid ring radii: expected 0 <= center ({center}) < inner ({inner}) < outer ({outer}) <= 1"
    )]
    InvalidRadii { center: f64, inner: f64, outer: f64 },
}
