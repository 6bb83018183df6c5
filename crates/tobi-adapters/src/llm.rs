//! Chat-completion report generator
//!
//! Renders the selected analysis template against an OpenAI-compatible
//! `/v1/chat/completions` endpoint. The template text lives here; the
//! engine only chooses which chain to run and supplies named sections.

use crate::{AdapterConfig, AdapterError, AdapterResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tobi_core::adapter::ReportGenerator;
use tobi_core::error::TriageError;
use tobi_core::model::AnalysisChain;

const COMPREHENSIVE_PREAMBLE: &str = "You are a SOC analyst. Using the \
knowledge-graph correlation paths and supporting evidence below, assess \
the alert. State the attack progression if one is visible, name affected \
hosts and accounts, and finish with a risk level line: one of critical, \
high, medium, low, informational.";

const TRADITIONAL_PREAMBLE: &str = "You are a SOC analyst. Using the \
similar alerts, metrics and log evidence below, assess the alert. Note \
whether the pattern is recurring or isolated, and finish with a risk \
level line: one of critical, high, medium, low, informational.";

pub struct ChatReportGenerator {
    config: AdapterConfig,
    client: Client,
    model: String,
    provider_name: String,
}

impl ChatReportGenerator {
    pub fn new(config: AdapterConfig, model: &str, provider_name: &str) -> Self {
        Self {
            client: Client::new(),
            config,
            model: model.to_string(),
            provider_name: provider_name.to_string(),
        }
    }

    async fn complete(&self, system: &str, user: &str) -> AdapterResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.2
        });

        let mut request = self.client.post(&url).json(&body);
        for (key, value) in self.config.auth_headers() {
            request = request.header(&key, &value);
        }

        let response = request
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status,
                message: text,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AdapterError::Parse("completion carried no choices".into()))
    }
}

/// Section map rendered as markdown headings in key order
fn render_sections(sections: &BTreeMap<String, String>) -> String {
    sections
        .iter()
        .map(|(key, value)| format!("## {}\n{}", key, value))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn analysis_error(err: AdapterError) -> TriageError {
    if err.is_transient() {
        TriageError::Transient(err.to_string())
    } else {
        TriageError::Analysis(err.to_string())
    }
}

#[async_trait]
impl ReportGenerator for ChatReportGenerator {
    async fn generate(
        &self,
        chain: AnalysisChain,
        sections: &BTreeMap<String, String>,
    ) -> Result<String, TriageError> {
        let preamble = match chain {
            AnalysisChain::Comprehensive => COMPREHENSIVE_PREAMBLE,
            AnalysisChain::Traditional => TRADITIONAL_PREAMBLE,
        };
        self.complete(preamble, &render_sections(sections))
            .await
            .map_err(analysis_error)
    }

    fn provider(&self) -> &str {
        &self.provider_name
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}
