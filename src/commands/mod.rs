//! Command handlers for the `samplemind` binary.
//!
//! Every handler returns the JSON document that `main` prints, so the
//! handlers stay testable without capturing stdout.

use anyhow::{Context, Result};
use futures_util::future::join_all;
use log::{debug, error};
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::{AnalysisLevel, AudioFile, ExtractionType};
use crate::http::{ApiClient, Transport};
use crate::runtime::Runtime;

pub mod config;

pub use config::Config;

pub async fn health<T: Transport>(client: &ApiClient<T>) -> Result<Value> {
    let status = client.health().await.map_err(|e| {
        error!("Health check failed: {}", e);
        e
    })?;
    debug!("Health check: {}", status.status);
    Ok(serde_json::to_value(status)?)
}

/// Analyzes every file concurrently. Fails if any analysis fails.
pub async fn analyze<R: Runtime, T: Transport>(
    runtime: &R,
    client: &ApiClient<T>,
    files: &[PathBuf],
    level: AnalysisLevel,
) -> Result<Value> {
    let audio = files
        .iter()
        .map(|path| AudioFile::load(runtime, path))
        .collect::<Result<Vec<_>>>()?;

    let results = join_all(
        audio
            .iter()
            .map(|file| async move { (file, client.analyze_audio(file, level).await) }),
    )
    .await;

    let mut analyses = Vec::with_capacity(results.len());
    for (file, result) in results {
        let analysis =
            result.with_context(|| format!("Analysis of {} failed", file.file_name))?;
        analyses.push(json!({
            "file": file.file_name,
            "analysis": analysis,
        }));
    }

    debug!("Analysis complete for {} file(s)", analyses.len());
    Ok(Value::Array(analyses))
}

pub async fn similar<R: Runtime, T: Transport>(
    runtime: &R,
    client: &ApiClient<T>,
    file: &Path,
    limit: usize,
) -> Result<Value> {
    let audio = AudioFile::load(runtime, file)?;
    let samples = client
        .find_similar(&audio, limit)
        .await
        .context("Similar search failed")?;
    Ok(Value::Array(samples))
}

pub async fn search<T: Transport>(client: &ApiClient<T>, query: &str, limit: usize) -> Result<Value> {
    let results = client
        .search(query, limit)
        .await
        .context("Search failed")?;
    Ok(Value::Array(results))
}

pub async fn project_sync<T: Transport>(
    client: &ApiClient<T>,
    bpm: f64,
    key: &str,
    limit: usize,
) -> Result<Value> {
    let matched = client
        .project_sync(bpm, key, limit)
        .await
        .context("Project sync failed")?;
    Ok(Value::Array(matched))
}

pub async fn generate_midi<R: Runtime, T: Transport>(
    runtime: &R,
    client: &ApiClient<T>,
    file: &Path,
    extraction_type: ExtractionType,
) -> Result<Value> {
    let audio = AudioFile::load(runtime, file)?;
    client
        .generate_midi(&audio, extraction_type)
        .await
        .context("MIDI generation failed")
}

pub async fn library_stats<T: Transport>(client: &ApiClient<T>) -> Result<Value> {
    client
        .library_stats()
        .await
        .context("Failed to get library stats")
}

pub async fn midi_types<T: Transport>(client: &ApiClient<T>) -> Result<Value> {
    client
        .midi_extraction_types()
        .await
        .context("Failed to get MIDI types")
}

pub async fn available_keys<T: Transport>(client: &ApiClient<T>) -> Result<Value> {
    client
        .available_keys()
        .await
        .context("Failed to get available keys")
}

pub async fn info<T: Transport>(client: &ApiClient<T>) -> Result<Value> {
    client.api_info().await.context("Failed to get API info")
}

/// Writes a command result as pretty-printed JSON followed by a newline.
pub fn print_json<W: Write>(out: &mut W, value: &Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
