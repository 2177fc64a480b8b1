//! Typed operations of the SampleMind backend.
//!
//! Each operation is a thin wrapper over [`ApiClient::request`]: it builds
//! the path and body, and pulls the interesting field out of the response.
//! Payloads are passed through as JSON values; the client does not interpret
//! them beyond the list fields it unwraps.

mod types;

use log::debug;
use serde_json::{Value, json};

use crate::http::{ApiClient, Body, Form, Method, RequestError, Transport};

pub use types::{AnalysisLevel, AudioFile, ExtractionType, HealthStatus};

/// Default result count for listing operations.
pub const DEFAULT_LIMIT: usize = 10;

impl<T: Transport> ApiClient<T> {
    /// `GET /health`
    #[tracing::instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, RequestError> {
        let body = self.get("/health").await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `POST /api/analyze` with the audio file and the analysis level.
    #[tracing::instrument(skip(self, file), fields(file = %file.file_name))]
    pub async fn analyze_audio(
        &self,
        file: &AudioFile,
        level: AnalysisLevel,
    ) -> Result<Value, RequestError> {
        debug!("Analyzing: {} ({})", file.file_name, level);
        let form = upload_form(file).text("analysis_level", level.to_string());
        self.request(Method::Post, "/api/analyze", Body::Multipart(form))
            .await
    }

    /// `POST /api/similar`. Returns `similar_samples`, empty when absent.
    #[tracing::instrument(skip(self, file), fields(file = %file.file_name))]
    pub async fn find_similar(
        &self,
        file: &AudioFile,
        limit: usize,
    ) -> Result<Vec<Value>, RequestError> {
        debug!("Finding similar samples for: {}", file.file_name);
        let form = upload_form(file).text("limit", limit.to_string());
        let body = self
            .request(Method::Post, "/api/similar", Body::Multipart(form))
            .await?;
        let samples = types::array_field(body, "similar_samples")?;
        debug!("Found {} similar samples", samples.len());
        Ok(samples)
    }

    /// `GET /api/search?query=..&limit=..`. Returns `results`, empty when absent.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Value>, RequestError> {
        let path = format!(
            "/api/search?query={}&limit={}",
            urlencoding::encode(query),
            limit
        );
        let body = self.get(&path).await?;
        let results = types::array_field(body, "results")?;
        debug!("Found {} results for '{}'", results.len(), query);
        Ok(results)
    }

    /// `POST /api/project-sync`. Returns `matched_samples`, empty when absent.
    #[tracing::instrument(skip(self))]
    pub async fn project_sync(
        &self,
        bpm: f64,
        key: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RequestError> {
        debug!("Project sync: BPM={}, Key={}", bpm, key);
        let payload = json!({
            "project_bpm": bpm,
            "project_key": key,
            "limit": limit,
        });
        let body = self
            .request(Method::Post, "/api/project-sync", Body::Json(payload))
            .await?;
        types::array_field(body, "matched_samples")
    }

    /// `POST /api/generate-midi` with the audio file and extraction type.
    #[tracing::instrument(skip(self, file), fields(file = %file.file_name))]
    pub async fn generate_midi(
        &self,
        file: &AudioFile,
        extraction_type: ExtractionType,
    ) -> Result<Value, RequestError> {
        debug!("Generating {} MIDI from: {}", extraction_type, file.file_name);
        let form = upload_form(file).text("extraction_type", extraction_type.to_string());
        self.request(Method::Post, "/api/generate-midi", Body::Multipart(form))
            .await
    }

    /// `GET /api/library/stats`
    pub async fn library_stats(&self) -> Result<Value, RequestError> {
        self.get("/api/library/stats").await
    }

    /// `GET /api/generate-midi/types`
    pub async fn midi_extraction_types(&self) -> Result<Value, RequestError> {
        self.get("/api/generate-midi/types").await
    }

    /// `GET /api/project-sync/available-keys`
    pub async fn available_keys(&self) -> Result<Value, RequestError> {
        self.get("/api/project-sync/available-keys").await
    }

    /// `GET /api/info`
    pub async fn api_info(&self) -> Result<Value, RequestError> {
        self.get("/api/info").await
    }
}

fn upload_form(file: &AudioFile) -> Form {
    Form::new().file(
        "file",
        file.file_name.clone(),
        file.bytes.clone(),
        Some(file.mime.clone()),
    )
}
