//! Directory thumbnailing.
//!
//! Every `*.ply` directly inside a directory becomes `<stem>.jpg` in each of
//! the output directories. Files are independent: they are rendered in
//! parallel and a failure is recorded without stopping the rest.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::RenderConfig;
use crate::io::{load_splat_ply, save_thumbnail, LoadError, OutputError};
use crate::render::{RenderStats, ThumbnailRenderer};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Cannot read splat directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

fn is_ply(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("ply"))
            .unwrap_or(false)
}

/// `*.ply` files directly inside `dir`, sorted by file name.
pub fn list_splat_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let read_err = |source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if is_ply(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `<out_dir>/<stem>.jpg` for every output directory.
pub fn thumbnail_paths(input: &Path, out_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "thumbnail".into());
    out_dirs
        .iter()
        .map(|dir| {
            let mut name = stem.clone();
            name.push(".jpg");
            dir.join(name)
        })
        .collect()
}

/// Load, render and save one scene to every path in `outputs`.
pub fn thumbnail_file(
    input: &Path,
    outputs: &[PathBuf],
    config: &RenderConfig,
) -> Result<RenderStats, BatchError> {
    let cloud = load_splat_ply(input)?;
    let renderer = ThumbnailRenderer::new(config.max_splats);
    let (image, stats) = renderer.render_with_stats(&cloud, &config.camera());

    if stats.nothing_visible() {
        tracing::warn!(input = %input.display(), "no visible splats; writing background-only thumbnail");
    }

    for path in outputs {
        save_thumbnail(&image, path, config.jpeg_quality)?;
    }

    tracing::info!(
        input = %input.display(),
        total = stats.input,
        kept = stats.kept,
        visible = stats.visible,
        rasterized = stats.rasterized,
        "rendered {} → {} splats, saved {} thumbnail(s)",
        stats.input,
        stats.kept,
        outputs.len()
    );
    tracing::debug!(?stats, "render stats");

    Ok(stats)
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub rendered: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.rendered.len() + self.failed.len()
    }

    /// True when there was at least one file and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.rendered.is_empty() && !self.failed.is_empty()
    }
}

/// Thumbnail every splat file in `dir` into each of `out_dirs`.
///
/// Only an unreadable `dir` is an error; per-file failures are logged and
/// collected in the summary.
pub fn run_batch(
    dir: &Path,
    out_dirs: &[PathBuf],
    config: &RenderConfig,
) -> Result<BatchSummary, BatchError> {
    let files = list_splat_files(dir)?;
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "no .ply files found");
        return Ok(BatchSummary::default());
    }
    tracing::info!("Found {} splat file(s) in {}", files.len(), dir.display());

    let results: Vec<(PathBuf, Result<RenderStats, BatchError>)> = files
        .into_par_iter()
        .map(|input| {
            let outputs = thumbnail_paths(&input, out_dirs);
            let result = thumbnail_file(&input, &outputs, config);
            (input, result)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (input, result) in results {
        match result {
            Ok(_) => summary.rendered.push(input),
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "failed to thumbnail");
                summary.failed.push((input, e.to_string()));
            }
        }
    }

    tracing::info!(
        "Generated {}/{} thumbnails",
        summary.rendered.len(),
        summary.total()
    );
    Ok(summary)
}
