// One-Time Setup Service
// Fetches tokenizer data and warms up the classifier endpoint ahead of the
// first validation call. Failures here are operator-facing and never part
// of the runtime validate contract.

use crate::services::classifier::{Classifier, HttpClassifier};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::PathBuf;
use tracing::{info, warn};

/// Tokenizer-data release where the dataset identifier changed.
const TOKENIZER_BREAKING_VERSION: &str = "3.8.2";

const TOKENIZER_DATA_BASE_URL: &str =
    "https://raw.githubusercontent.com/nltk/nltk_data/gh-pages/packages/tokenizers";

/// Extract the major, minor and patch numbers from a semantic version
/// string. Patch defaults to 0 when absent.
pub fn parse_major_minor_patch(version: &str) -> Result<(u64, u64, u64)> {
    let re = Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)(?:\.(0|[1-9]\d*))?(?:[-+][0-9A-Za-z-.]+)?$",
    )
    .expect("semver regex is valid");

    let caps = re
        .captures(version.trim())
        .ok_or_else(|| anyhow!("Invalid semantic version: '{}'", version))?;

    let major: u64 = caps[1].parse()?;
    let minor: u64 = caps[2].parse()?;
    let patch: u64 = caps.get(3).map(|m| m.as_str().parse()).transpose()?.unwrap_or(0);
    Ok((major, minor, patch))
}

/// Pick the tokenizer dataset identifier for the installed data-library
/// version: releases before 3.8.2 ship `punkt`, later ones `punkt_tab`.
pub fn select_tokenizer_dataset(data_version: &str) -> Result<&'static str> {
    let target = parse_major_minor_patch(TOKENIZER_BREAKING_VERSION)?;
    let installed = parse_major_minor_patch(data_version)?;

    if installed >= target {
        Ok("punkt_tab")
    } else {
        Ok("punkt")
    }
}

/// Default directory tokenizer datasets are stored under.
pub fn tokenizer_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("gibberish-guard").join("tokenizers"))
}

/// Download the selected tokenizer dataset if it is not already present.
/// Returns the path of the local archive.
pub async fn ensure_tokenizer_data(data_version: &str) -> Result<PathBuf> {
    let dataset = select_tokenizer_dataset(data_version)
        .context("Error selecting tokenizer dataset")?;

    let data_dir = tokenizer_data_dir()
        .ok_or_else(|| anyhow!("No local data directory available"))?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

    let archive = data_dir.join(format!("{}.zip", dataset));
    if archive.exists() {
        info!(dataset = dataset, path = %archive.display(), "setup.tokenizer_data_present");
        return Ok(archive);
    }

    let url = format!("{}/{}.zip", TOKENIZER_DATA_BASE_URL, dataset);
    info!(dataset = dataset, url = %url, "setup.downloading_tokenizer_data");

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to download tokenizer dataset from {}", url))?;
    if !response.status().is_success() {
        return Err(anyhow!(
            "Tokenizer dataset download returned status {}",
            response.status()
        ));
    }

    let bytes = response.bytes().await.context("Failed to read dataset body")?;
    std::fs::write(&archive, &bytes)
        .with_context(|| format!("Failed to write {}", archive.display()))?;

    info!(dataset = dataset, bytes = bytes.len(), "setup.tokenizer_data_downloaded");
    Ok(archive)
}

/// Issue one probe classification so model weights are resident before the
/// first real validation call.
pub async fn warm_up_classifier() -> Result<()> {
    let classifier = HttpClassifier::new().context("Failed to setup classifier")?;
    classifier
        .classify("warm-up probe")
        .await
        .context("Failed to setup pipeline")?;
    info!(model = classifier.name(), "setup.pipeline_warm");
    Ok(())
}

/// Full one-time setup: tokenizer data plus classifier warm-up. Dataset
/// problems are reported but do not abort the warm-up, matching the
/// best-effort install behavior operators expect.
pub async fn run_setup(tokenizer_data_version: &str) -> Result<()> {
    if let Err(e) = ensure_tokenizer_data(tokenizer_data_version).await {
        warn!(error = %e, "setup.tokenizer_data_failed");
        eprintln!(
            "Error auto-installing tokenizer dataset, please install manually.\n\
             Version < {v}: download 'punkt'; version >= {v}: download 'punkt_tab'.",
            v = TOKENIZER_BREAKING_VERSION
        );
    }

    warm_up_classifier().await
}
