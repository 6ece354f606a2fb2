use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::curve::Curve;

/// Writes a curve as pretty JSON through a temp file in the same directory, then renames it.
#[instrument(skip(curve), fields(keyframes = curve.keyframe_count(), path = %path.display()))]
pub fn save_curve(path: &Path, curve: &Curve) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;

    let json = serde_json::to_vec_pretty(curve).context("failed to serialize curve")?;
    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).context("failed to create temp curve file")?;
    temp_file
        .write_all(&json)
        .context("failed to write temp curve file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist curve: {}", path.display()))?;

    info!("curve saved");
    Ok(())
}

#[instrument(fields(path = %path.display()))]
pub fn load_curve(path: &Path) -> Result<Curve> {
    let content =
        fs::read(path).with_context(|| format!("failed to read curve: {}", path.display()))?;
    let curve: Curve = serde_json::from_slice(&content).context("invalid curve json")?;
    info!(keyframes = curve.keyframe_count(), "curve loaded");
    Ok(curve)
}
