use once_cell::sync::Lazy;
use regex::Regex;
#[cfg(unix)]
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

static UNSAFE_FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

const MAX_SEED_CHARS: usize = 50;

/// Mode for newly created outputs; temp files start out as 0600.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// File-name friendly form of a seed: spaces become `_`, reserved characters
/// are dropped and the result is capped at 50 characters.
pub fn sanitize_filename(text: &str) -> String {
    let underscored = text.replace(' ', "_");
    let cleaned = UNSAFE_FILENAME_RE.replace_all(&underscored, "");
    cleaned.chars().take(MAX_SEED_CHARS).collect()
}

pub fn csv_path_for(output_dir: &Path, seed: &str) -> PathBuf {
    output_dir.join(format!("{}_fanout.csv", sanitize_filename(seed)))
}

pub fn chart_path_for(output_dir: &Path, seed: &str, ext: &str) -> PathBuf {
    output_dir.join(format!("{}_sunburst.{ext}", sanitize_filename(seed)))
}

/// Chart path next to the default output dir for a CSV produced by `generate`.
pub fn chart_path_for_csv(output_dir: &Path, csv: &Path, ext: &str) -> PathBuf {
    let stem = csv
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chart")
        .replace("_fanout", "");
    output_dir.join(format!("{stem}_sunburst.{ext}"))
}

/// Writes through a temp file in the target directory and renames it into
/// place, so `path` either keeps its old contents or holds all of `bytes`.
/// An existing file keeps its permissions; a new one gets 0644.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    #[cfg(unix)]
    tmp.as_file().set_permissions(output_permissions(path)?)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(unix)]
fn output_permissions(path: &Path) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    match fs::metadata(path) {
        Ok(meta) => Ok(fs::Permissions::from_mode(meta.permissions().mode() & 0o7777)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Ok(fs::Permissions::from_mode(NEW_FILE_MODE))
        }
        Err(err) => Err(err),
    }
}
