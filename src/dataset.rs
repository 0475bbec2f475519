use crate::ir::{Locale, SubqueryRow};
use crate::output::write_atomic;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const HEADER: [&str; 4] = ["seed", "locale", "category", "subquery"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct Columns {
    seed: usize,
    locale: usize,
    category: usize,
    subquery: usize,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self, DatasetError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|field| field.trim().trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| DatasetError::MalformedRow {
                    line: 1,
                    reason: format!("missing column '{name}'"),
                })
        };
        Ok(Self {
            seed: find("seed")?,
            locale: find("locale")?,
            category: find("category")?,
            subquery: find("subquery")?,
        })
    }
}

/// Reads `seed,locale,category,subquery` rows in file order.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<SubqueryRow>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::from_header(csv_reader.headers()?)?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        rows.push(parse_record(&record, &columns, line)?);
    }
    Ok(rows)
}

fn parse_record(
    record: &csv::StringRecord,
    columns: &Columns,
    line: u64,
) -> Result<SubqueryRow, DatasetError> {
    let field = |idx: usize, name: &str| {
        record.get(idx).ok_or_else(|| DatasetError::MalformedRow {
            line,
            reason: format!("missing field '{name}'"),
        })
    };
    let seed = field(columns.seed, "seed")?;
    let locale = field(columns.locale, "locale")?
        .parse::<Locale>()
        .map_err(|reason| DatasetError::MalformedRow { line, reason })?;
    let category = field(columns.category, "category")?.trim();
    if category.is_empty() {
        return Err(DatasetError::MalformedRow {
            line,
            reason: "empty category".to_string(),
        });
    }
    let subquery = field(columns.subquery, "subquery")?.trim();
    if subquery.is_empty() {
        return Err(DatasetError::MalformedRow {
            line,
            reason: "empty subquery".to_string(),
        });
    }
    Ok(SubqueryRow::new(seed, locale, category, subquery))
}

pub fn load_rows(path: &Path) -> Result<Vec<SubqueryRow>, DatasetError> {
    let file = std::fs::File::open(path)?;
    let rows = read_rows(file)?;
    debug!(path = %path.display(), rows = rows.len(), "loaded dataset");
    Ok(rows)
}

pub fn write_rows<W: Write>(writer: W, rows: &[SubqueryRow]) -> Result<(), DatasetError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for row in rows {
        csv_writer.write_record([
            row.seed.as_str(),
            row.locale.as_str(),
            row.category.as_str(),
            row.subquery.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the whole file or nothing; parent directories must exist.
pub fn save_rows(path: &Path, rows: &[SubqueryRow]) -> Result<(), DatasetError> {
    let mut buffer = Vec::new();
    write_rows(&mut buffer, rows)?;
    write_atomic(path, &buffer)?;
    debug!(path = %path.display(), rows = rows.len(), "saved dataset");
    Ok(())
}
