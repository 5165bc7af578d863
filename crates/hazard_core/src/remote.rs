//! Remote analyzer client.
//!
//! The analyzer is an external collaborator: `POST {description, location}`
//! returns an authoritative score. Any failure, including a reply we cannot
//! read, is reported as an error for the arbiter to fall back on.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub description: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAnalysis {
    pub authenticity_score: i64,
    pub classification: String,
    pub hazard_type: String,
    pub urgency: String,
    pub summary: String,
}

impl RemoteAnalysis {
    /// Score as a checked 0..=100 value; anything else is a malformed reply.
    pub fn checked_score(&self) -> Result<u8> {
        u8::try_from(self.authenticity_score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| {
                EngineError::MalformedResponse(format!(
                    "authenticityScore out of range: {}",
                    self.authenticity_score
                ))
            })
    }
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<RemoteAnalysis>;

    /// Cheap reachability check backing the advisory flag.
    async fn health(&self) -> Result<()>;
}

pub struct HttpAnalyzer {
    client: Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<RemoteAnalysis> {
        let url = format!("{}/analyze", self.base_url);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::RemoteUnavailable(format!(
                "analyzer returned {}",
                status
            )));
        }

        let body = response.bytes().await?;
        let analysis: RemoteAnalysis = serde_json::from_slice(&body)
            .map_err(|e| EngineError::MalformedResponse(e.to_string()))?;
        analysis.checked_score()?;
        Ok(analysis)
    }

    async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::RemoteUnavailable(format!(
                "health probe returned {}",
                response.status()
            )))
        }
    }
}
