//! Baseline store: committed reference images plus retained run artifacts
//!
//! Baselines are read-only during a run. They change only through the
//! explicit promote operations, never as a side effect of a comparison.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::compare::{self, CompareOptions};
use crate::error::{CheckError, CheckResult};

/// Directory layout for baselines and run artifacts.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Committed reference images, `<name>.png`
    pub baseline_dir: PathBuf,

    /// Captures taken by the current run
    pub capture_dir: PathBuf,

    /// Diff images written on failure, `<name>-diff.png`
    pub diff_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("baselines"),
            capture_dir: PathBuf::from("test-results/captures"),
            diff_dir: PathBuf::from("test-results/diffs"),
        }
    }
}

/// A passed verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedCheck {
    pub diff_ratio: f64,
    pub diff_pixels: u64,
    pub total_pixels: u64,
}

pub struct BaselineStore {
    baseline_dir: PathBuf,
    capture_dir: PathBuf,
    diff_dir: PathBuf,
}

impl BaselineStore {
    pub fn new(config: StoreConfig) -> CheckResult<Self> {
        std::fs::create_dir_all(&config.baseline_dir)?;
        std::fs::create_dir_all(&config.capture_dir)?;
        std::fs::create_dir_all(&config.diff_dir)?;

        Ok(Self {
            baseline_dir: config.baseline_dir,
            capture_dir: config.capture_dir,
            diff_dir: config.diff_dir,
        })
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir.join(format!("{}.png", name))
    }

    pub fn capture_path(&self, name: &str) -> PathBuf {
        self.capture_dir.join(format!("{}.png", name))
    }

    pub fn diff_path(&self, name: &str) -> PathBuf {
        self.diff_dir.join(format!("{}-diff.png", name))
    }

    pub fn has_baseline(&self, name: &str) -> bool {
        self.baseline_path(name).exists()
    }

    /// Verify the retained capture for `name` against its baseline.
    ///
    /// Passes iff the fraction of differing pixels is at or below
    /// `tolerance`. On failure the diff image is written and returned in
    /// the error; the baseline is never touched.
    pub fn verify(
        &self,
        name: &str,
        tolerance: f64,
        options: CompareOptions,
    ) -> CheckResult<VerifiedCheck> {
        let capture_path = self.capture_path(name);
        let baseline_path = self.baseline_path(name);

        if !capture_path.exists() {
            return Err(CheckError::CaptureNotFound(capture_path));
        }
        if !baseline_path.exists() {
            return Err(CheckError::MissingBaseline(baseline_path));
        }

        // Byte-identical files need no pixel loop
        if hash_file(&capture_path)? == hash_file(&baseline_path)? {
            debug!(name, "capture matches baseline exactly (same hash)");
            let capture = image::open(&capture_path)?;
            let total = u64::from(capture.width()) * u64::from(capture.height());
            return Ok(VerifiedCheck {
                diff_ratio: 0.0,
                diff_pixels: 0,
                total_pixels: total,
            });
        }

        let capture = image::open(&capture_path)?.to_rgba8();
        let baseline = image::open(&baseline_path)?.to_rgba8();

        let diff = compare::compare(&capture, &baseline, options)?;

        if diff.passes(tolerance) {
            return Ok(VerifiedCheck {
                diff_ratio: diff.diff_ratio,
                diff_pixels: diff.diff_pixels,
                total_pixels: diff.total_pixels,
            });
        }

        let diff_path = self.diff_path(name);
        if let Some(diff_image) = &diff.diff_image {
            diff_image.save(&diff_path)?;
        }

        Err(CheckError::ThresholdExceeded {
            name: name.to_string(),
            diff_ratio: diff.diff_ratio,
            tolerance,
            diff_image: diff_path,
        })
    }

    /// Promote the retained capture for `name` to be the new baseline.
    pub fn promote(&self, name: &str) -> CheckResult<PathBuf> {
        let capture_path = self.capture_path(name);
        if !capture_path.exists() {
            return Err(CheckError::CaptureNotFound(capture_path));
        }

        let baseline_path = self.baseline_path(name);
        std::fs::copy(&capture_path, &baseline_path)?;
        info!(name, "baseline updated from capture");
        Ok(baseline_path)
    }

    /// Promote every retained capture to a baseline. Returns the names.
    pub fn promote_all(&self) -> CheckResult<Vec<String>> {
        let mut promoted = Vec::new();

        for name in png_stems(&self.capture_dir)? {
            self.promote(&name)?;
            promoted.push(name);
        }

        promoted.sort();
        Ok(promoted)
    }

    /// Names of all committed baselines.
    pub fn list_baselines(&self) -> CheckResult<Vec<String>> {
        let mut names = png_stems(&self.baseline_dir)?;
        names.sort();
        Ok(names)
    }

    /// Remove retained diff images. Returns how many were deleted.
    pub fn clean_diffs(&self) -> CheckResult<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.diff_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "png").unwrap_or(false) {
                std::fs::remove_file(path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn png_stems(dir: &Path) -> CheckResult<Vec<String>> {
    let mut stems = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "png").unwrap_or(false) {
            if let Some(stem) = path.file_stem() {
                stems.push(stem.to_string_lossy().to_string());
            }
        }
    }

    Ok(stems)
}

fn hash_file(path: &Path) -> CheckResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
