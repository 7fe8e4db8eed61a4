//! Optional LLM-backed insight commentary.
//!
//! Best-effort by design: a missing credential, a network failure, or a
//! timeout all resolve to "no insight" with a debug trace. The core
//! answer is already printed by the time this runs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::InsightError;
use crate::planner::Plan;
use crate::table::{Schema, Table};

const SYSTEM_PROMPT: &str = "You are a careful data scientist. Provide brief, caveated insights.";

/// Plan kinds worth commenting on; metadata lookups are skipped.
const ELIGIBLE_KINDS: &[&str] = &["aggregate", "correlation", "anomaly", "group_count", "sort_top"];

/// Rows included in the result summary sent to the provider.
const SUMMARY_ROWS: usize = 5;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// Provider trait
// ============================================================================

/// A text-generation backend for insight commentary.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce a completion for the given system and user prompts.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, InsightError>;
}

// ============================================================================
// OpenAI-compatible provider
// ============================================================================

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    #[allow(dead_code)]
    role: String,
    content: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InsightError::Api(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl InsightProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, InsightError> {
        let body = json!({
            "model": OPENAI_MODEL,
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
        });
        let response = self
            .client
            .post(OPENAI_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(InsightError::Api(format!(
                "openai returned {}",
                response.status()
            )));
        }
        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| InsightError::Api("openai returned no choices".to_string()))
    }
}

// ============================================================================
// Anthropic provider
// ============================================================================

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InsightError::Api(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl InsightProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, InsightError> {
        let body = json!({
            "model": ANTHROPIC_MODEL,
            "temperature": 0.2,
            "max_tokens": 400,
            "system": system,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(InsightError::Api(format!(
                "anthropic returned {}",
                response.status()
            )));
        }
        let parsed: AnthropicResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();
        Ok(text.trim().to_string())
    }
}

// ============================================================================
// Insight generator
// ============================================================================

/// Tries each configured provider in order until one produces commentary.
pub struct InsightGenerator {
    providers: Vec<Box<dyn InsightProvider>>,
}

impl InsightGenerator {
    /// Build from configuration; providers without credentials are not
    /// registered.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Box<dyn InsightProvider>> = Vec::new();
        if let Some(key) = &config.openai_api_key {
            match OpenAiProvider::new(key.clone(), config.insight_timeout_secs) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => debug!(error = %e, "skipping openai provider"),
            }
        }
        if let Some(key) = &config.anthropic_api_key {
            match AnthropicProvider::new(key.clone(), config.insight_timeout_secs) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => debug!(error = %e, "skipping anthropic provider"),
            }
        }
        Self { providers }
    }

    /// Generate caveated commentary for an analytical result. Returns
    /// `None` for ineligible plan kinds, missing credentials, and any
    /// provider failure.
    pub async fn generate(
        &self,
        question: &str,
        plan: &Plan,
        result: &Table,
        schema: &Schema,
    ) -> Option<String> {
        if !plan_eligible(plan) {
            return None;
        }
        if self.providers.is_empty() {
            debug!("no insight providers configured");
            return None;
        }

        let prompt = build_prompt(question, plan, result, schema);
        for provider in &self.providers {
            match provider.complete(SYSTEM_PROMPT, &prompt).await {
                Ok(text) if !text.is_empty() => return Some(text),
                Ok(_) => debug!(provider = provider.name(), "empty insight response"),
                Err(e) => debug!(provider = provider.name(), error = %e, "insight call failed"),
            }
        }
        None
    }
}

/// Only analytical results get commentary.
fn plan_eligible(plan: &Plan) -> bool {
    let kind = plan.kind();
    ELIGIBLE_KINDS.iter().any(|p| kind.starts_with(p))
}

fn build_prompt(question: &str, plan: &Plan, result: &Table, schema: &Schema) -> String {
    let plan_json = serde_json::to_string(plan).unwrap_or_else(|_| format!("{plan:?}"));
    let summary = summarize_result(result);
    let columns_blob: String = result
        .column_names()
        .iter()
        .map(|c| {
            let dtype = schema
                .get(c)
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "?".to_string());
            format!("- {c}: {dtype}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "User question: {question}\n\
         Plan: {plan_json}\n\
         Result summary (JSON): {summary}\n\
         \n\
         Columns (type):\n\
         {columns_blob}\n\
         \n\
         Write 3-5 concise bullet insights. Be cautious:\n\
         - Correlation does not imply causation.\n\
         - Mention potential confounders and data quality concerns if relevant.\n\
         - If hypotheses are speculative, say so.\n"
    )
}

/// Compact JSON description of the result: shape metadata plus a few
/// preview records.
fn summarize_result(result: &Table) -> String {
    let preview_rows = SUMMARY_ROWS.min(result.n_rows());
    let records: Vec<serde_json::Value> = (0..preview_rows)
        .map(|i| {
            let record: serde_json::Map<String, serde_json::Value> = result
                .columns()
                .iter()
                .map(|c| {
                    let cell = serde_json::to_value(&c.values[i])
                        .unwrap_or(serde_json::Value::Null);
                    (c.name.clone(), cell)
                })
                .collect();
            serde_json::Value::Object(record)
        })
        .collect();

    json!({
        "meta": {
            "rows": result.n_rows(),
            "cols": result.n_cols(),
            "preview_rows": preview_rows,
        },
        "columns": result.column_names(),
        "preview": records,
    })
    .to_string()
}
