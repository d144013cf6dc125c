//! Slide directory reader.
//!
//! A slide directory holds one `<name>.json` file per slide:
//!
//! ```json
//! { "slide_id": "BrM_01", "cells": [
//!     { "phenotype": "Tc", "x": 103.5, "y": 88.0 },
//!     { "phenotype": "Cancer", "boundary": [120345, 120346, 121345] }
//! ] }
//! ```
//!
//! A cell gives either its centroid directly or the row-major linear pixel
//! indices of its boundary. Boundary centroids need the image width, read from the
//! companion `<slide_id>.seg.json` (`{ "image_width": 1344 }`); when that file is
//! missing or unusable, [`DEFAULT_IMAGE_WIDTH`] is used and the slide is reported
//! as recovered.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use fencing_analysis::{
    event::{SlideEventSink, SlideLoad},
    slide::{CellRecord, Slide, UNKNOWN_PHENOTYPE},
};
use serde::Deserialize;

/// Image width assumed when segmentation metadata is unavailable.
pub const DEFAULT_IMAGE_WIDTH: u64 = 1000;

const SEGMENTATION_SUFFIX: &str = ".seg.json";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadSlideError {
    #[display("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("cell {index} has an empty boundary")]
    EmptyBoundary { index: usize },
    #[display("cell {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

#[derive(Debug, Deserialize)]
struct RawSlide {
    slide_id: Option<String>,
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(default)]
    phenotype: Option<String>,
    #[serde(flatten)]
    position: RawPosition,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPosition {
    Centroid { x: f64, y: f64 },
    Boundary { boundary: Vec<u64> },
}

#[derive(Debug, Deserialize)]
struct SegmentationMeta {
    image_width: u64,
}

/// Slides read from a directory, with per-outcome counts.
#[derive(Debug, Default)]
pub struct LoadedSlides {
    pub slides: Vec<Slide>,
    pub loaded: usize,
    pub recovered: usize,
    pub skipped: usize,
}

/// Slide files of `dir` in file-name order, companion files excluded.
pub fn slide_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read slide directory: {}", dir.display()))?;
    let mut files = vec![];
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read slide directory: {}", dir.display()))?
            .path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file()
            && name.ends_with(".json")
            && !name.ends_with(SEGMENTATION_SUFFIX)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every slide of `dir`, reporting each outcome to `sink`.
pub fn load_slides(dir: &Path, sink: &mut dyn SlideEventSink) -> anyhow::Result<LoadedSlides> {
    let mut loaded = LoadedSlides::default();
    for path in slide_files(dir)? {
        let load = load_slide(&path);
        match &load {
            SlideLoad::Loaded(_) => loaded.loaded += 1,
            SlideLoad::Recovered { .. } => loaded.recovered += 1,
            SlideLoad::Skipped { .. } => loaded.skipped += 1,
        }
        loaded.slides.extend(load.report(sink));
    }
    log::info!(
        "Loaded {} slides from {} ({} with default image width, {} skipped)",
        loaded.slides.len(),
        dir.display(),
        loaded.recovered,
        loaded.skipped,
    );
    Ok(loaded)
}

/// Loads one slide file.
pub fn load_slide(path: &Path) -> SlideLoad {
    let fallback_id = file_stem(path);
    let raw = match read_raw_slide(path) {
        Ok(raw) => raw,
        Err(e) => {
            return SlideLoad::Skipped {
                slide_id: fallback_id,
                reason: e.to_string(),
            };
        }
    };
    let slide_id = raw.slide_id.clone().unwrap_or(fallback_id);

    let needs_width = raw
        .cells
        .iter()
        .any(|c| matches!(c.position, RawPosition::Boundary { .. }));
    let (image_width, missing) = if needs_width {
        let seg_path = path.with_file_name(format!("{slide_id}{SEGMENTATION_SUFFIX}"));
        match read_image_width(&seg_path) {
            Ok(width) => (width, None),
            Err(reason) => (DEFAULT_IMAGE_WIDTH, Some(reason)),
        }
    } else {
        (DEFAULT_IMAGE_WIDTH, None)
    };

    match build_slide(slide_id.clone(), raw, image_width) {
        Ok(slide) => match missing {
            None => SlideLoad::Loaded(slide),
            Some(reason) => SlideLoad::Recovered {
                slide,
                detail: format!("{reason}, assuming image width {DEFAULT_IMAGE_WIDTH}"),
            },
        },
        Err(e) => SlideLoad::Skipped {
            slide_id,
            reason: e.to_string(),
        },
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_raw_slide(path: &Path) -> Result<RawSlide, LoadSlideError> {
    let text = fs::read_to_string(path).map_err(|source| LoadSlideError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadSlideError::Json {
        path: path.to_owned(),
        source,
    })
}

fn read_image_width(path: &Path) -> Result<u64, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("no segmentation metadata at {} ({e})", path.display()))?;
    let meta: SegmentationMeta = serde_json::from_str(&text)
        .map_err(|e| format!("unreadable segmentation metadata {} ({e})", path.display()))?;
    if meta.image_width == 0 {
        return Err(format!("zero image width in {}", path.display()));
    }
    Ok(meta.image_width)
}

fn build_slide(slide_id: String, raw: RawSlide, image_width: u64) -> Result<Slide, LoadSlideError> {
    let cells = raw
        .cells
        .into_iter()
        .enumerate()
        .map(|(index, cell)| {
            let (x, y) = match cell.position {
                RawPosition::Centroid { x, y } => (x, y),
                RawPosition::Boundary { boundary } => boundary_centroid(&boundary, image_width)
                    .ok_or(LoadSlideError::EmptyBoundary { index })?,
            };
            if !x.is_finite() || !y.is_finite() {
                return Err(LoadSlideError::NonFiniteCoordinate { index });
            }
            let phenotype = cell
                .phenotype
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| UNKNOWN_PHENOTYPE.to_owned());
            Ok(CellRecord::new(phenotype, x, y))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Slide::new(slide_id, cells))
}

/// Mean column and mean row of row-major pixel indices.
#[expect(clippy::cast_precision_loss)]
fn boundary_centroid(boundary: &[u64], image_width: u64) -> Option<(f64, f64)> {
    if boundary.is_empty() {
        return None;
    }
    let n = boundary.len() as f64;
    let (sum_x, sum_y) = boundary.iter().fold((0.0, 0.0), |(sx, sy), &idx| {
        (sx + (idx % image_width) as f64, sy + (idx / image_width) as f64)
    });
    Some((sum_x / n, sum_y / n))
}
