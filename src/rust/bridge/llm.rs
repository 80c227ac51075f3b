// SPDX-License-Identifier: PMPL-1.0-or-later

//! Heuristic adapter backed by an OpenAI-compatible chat endpoint
//!
//! The model sees the problem in the native notation and is asked for a
//! one-word verdict. Answers are unchecked, so the descriptor marks the
//! adapter as heuristic and it runs after every solver by default. Calls are
//! metered by the shared [`TokenBucket`].

use anyhow::{anyhow, Context as AnyhowContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use super::{
    AdapterKind, Capabilities, LlmConfig, ProverAdapter, ProverDescriptor, RawOutput, TokenBucket, Translation,
};
use crate::error::TdfolError;
use crate::formula::Formula;
use crate::prover::ProofStatus;

const SYSTEM_PROMPT: &str = "You are a careful logician working in temporal deontic first-order logic. \
Decide whether the goal follows from the axioms. O, P and F are obligation, permission and prohibition \
for the bracketed agent; BEFORE[t], AFTER[t] and DURING[a, b] are temporal operators. \
Answer with exactly one word: PROVED, DISPROVED or UNKNOWN.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Problem statement shown to the model
pub fn prompt(goal: &Formula, axioms: &[Formula]) -> String {
    let mut out = String::from("Axioms:\n");
    if axioms.is_empty() {
        out.push_str("(none)\n");
    }
    for (i, a) in axioms.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, a);
    }
    let _ = writeln!(out, "Goal: {}", goal);
    out
}

/// Verdict from the first word of a reply
pub fn parse_reply(reply: &str) -> ProofStatus {
    let word: String = reply
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    match word.as_str() {
        "PROVED" => ProofStatus::Proved,
        "DISPROVED" => ProofStatus::Disproved,
        _ => ProofStatus::Unknown,
    }
}

pub struct LlmAdapter {
    name: String,
    config: LlmConfig,
    api_key: Option<String>,
    client: reqwest::Client,
    bucket: Arc<TokenBucket>,
}

impl LlmAdapter {
    pub fn new(name: &str, config: LlmConfig, bucket: Arc<TokenBucket>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        let api_key = config.resolved_api_key();
        Ok(LlmAdapter {
            name: name.to_string(),
            config,
            api_key,
            client,
            bucket,
        })
    }

    fn url(&self) -> Option<String> {
        self.config
            .endpoint
            .as_deref()
            .map(|base| format!("{}/chat/completions", base.trim_end_matches('/')))
    }
}

#[async_trait]
impl ProverAdapter for LlmAdapter {
    fn descriptor(&self) -> ProverDescriptor {
        ProverDescriptor {
            name: self.name.clone(),
            kind: AdapterKind::Llm,
            capabilities: Capabilities {
                propositional: true,
                first_order: true,
                quantifiers: true,
                temporal: true,
                deontic: true,
                induction: false,
                heuristic: true,
                abstracts_modalities: false,
            },
            priority: AdapterKind::Llm.default_priority(),
            available: None,
        }
    }

    async fn probe(&self) -> bool {
        self.config.endpoint.is_some() && self.api_key.is_some()
    }

    fn translate_in(&self, goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
        Ok(Translation {
            text: prompt(goal, axioms),
            lossy: false,
        })
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<RawOutput> {
        self.bucket.acquire()?;
        let url = self.url().ok_or_else(|| anyhow!("no LLM endpoint configured"))?;
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        };

        let mut call = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(1_000, |secs| secs * 1_000);
            return Err(TdfolError::RateLimited { retry_after_ms }.into());
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Ok(RawOutput {
                stderr: format!("HTTP {}: {}", status, body),
                exit_code: Some(i32::from(status.as_u16())),
                ..RawOutput::default()
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).context("malformed chat completion")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(adapter = %self.name, reply = %content, "model replied");
        Ok(RawOutput {
            stdout: content,
            exit_code: Some(0),
            ..RawOutput::default()
        })
    }

    fn translate_out(&self, raw: &RawOutput, _translation: &Translation) -> ProofStatus {
        if raw.exit_code != Some(0) {
            return ProofStatus::Unknown;
        }
        parse_reply(&raw.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn adapter(endpoint: Option<&str>, key: Option<&str>) -> LlmAdapter {
        let config = LlmConfig {
            endpoint: endpoint.map(str::to_string),
            api_key: key.map(str::to_string),
            api_key_env: None,
            ..LlmConfig::default()
        };
        LlmAdapter::new("llm", config, Arc::new(TokenBucket::new(1, 0.001))).unwrap()
    }

    #[test]
    fn test_prompt_lists_axioms() {
        let p = prompt(&parse("Mortal(Socrates)").unwrap(), &[parse("Human(Socrates)").unwrap()]);
        assert!(p.contains("1. Human(Socrates)"));
        assert!(p.trim_end().ends_with("Goal: Mortal(Socrates)"));
    }

    #[test]
    fn test_reply_parsing() {
        assert_eq!(parse_reply("PROVED"), ProofStatus::Proved);
        assert_eq!(parse_reply("  disproved."), ProofStatus::Disproved);
        assert_eq!(parse_reply("I think it is proved"), ProofStatus::Unknown);
        assert_eq!(parse_reply(""), ProofStatus::Unknown);
    }

    #[tokio::test]
    async fn test_availability_needs_endpoint_and_key() {
        assert!(!adapter(None, Some("k")).probe().await);
        assert!(!adapter(Some("http://localhost:9"), None).probe().await);
        assert!(adapter(Some("http://localhost:9/"), Some("k")).probe().await);
        assert_eq!(
            adapter(Some("http://localhost:9/"), None).url().as_deref(),
            Some("http://localhost:9/chat/completions")
        );
    }

    #[tokio::test]
    async fn test_empty_bucket_is_rate_limited() {
        let a = adapter(Some("http://127.0.0.1:9"), Some("k"));
        a.bucket.acquire().unwrap();
        let err = a.invoke("Goal: p").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TdfolError>(),
            Some(TdfolError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_failed_call_is_unknown() {
        let a = adapter(Some("http://localhost:9"), Some("k"));
        let raw = RawOutput {
            stdout: "PROVED".into(),
            exit_code: Some(500),
            ..RawOutput::default()
        };
        let t = Translation {
            text: String::new(),
            lossy: false,
        };
        assert_eq!(a.translate_out(&raw, &t), ProofStatus::Unknown);
    }
}
