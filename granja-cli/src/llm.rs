use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use granja_core::{Category, ClassifierError, SecondaryClassifier, StubClassifier, TransactionKind};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClassifierSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }

    fn default_key_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Secondary classifier backed by a chat-completion API.
pub struct LlmClassifier {
    provider: Provider,
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmClassifier {
    pub fn new(provider: Provider, section: &ClassifierSection) -> Result<Self> {
        let key_env = section
            .api_key_env
            .clone()
            .unwrap_or_else(|| provider.default_key_env().to_string());
        let api_key = std::env::var(&key_env).ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            debug!(env = %key_env, "no API key in environment");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(section.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            provider,
            model: section.model.clone(),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client,
        })
    }

    async fn complete(&self, key: &str, system: &str, user: &str) -> Result<String, ClassifierError> {
        match self.provider {
            Provider::Anthropic => self.anthropic_complete(key, system, user).await,
            Provider::OpenAI => self.openai_complete(key, system, user).await,
        }
    }

    async fn anthropic_complete(&self, key: &str, system: &str, user: &str) -> Result<String, ClassifierError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'static str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: i32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &self.model,
            max_tokens: 20,
            system,
            messages: vec![Msg {
                role: "user",
                content: user,
            }],
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(key).map_err(|e| ClassifierError::NotConfigured(e.to_string()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Provider {
                status: status.as_u16(),
                message: txt,
            });
        }

        let out: Resp = resp.json().await.map_err(transport)?;
        let mut s = String::new();
        for b in out.content {
            if b.t == "text"
                && let Some(t) = b.text
            {
                s.push_str(&t);
            }
        }
        Ok(s)
    }

    async fn openai_complete(&self, key: &str, system: &str, user: &str) -> Result<String, ClassifierError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'static str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Provider {
                status: status.as_u16(),
                message: txt,
            });
        }

        let out: Resp = resp.json().await.map_err(transport)?;
        Ok(out
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

fn transport(err: reqwest::Error) -> ClassifierError {
    ClassifierError::Transport(err.to_string())
}

#[async_trait]
impl SecondaryClassifier for LlmClassifier {
    async fn classify(&self, description: &str, kind: TransactionKind) -> Result<Category, ClassifierError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ClassifierError::NotConfigured(format!(
                "no API key for {:?}",
                self.provider
            )));
        };
        let answer = self
            .complete(key, &system_prompt(kind), description)
            .await?;
        debug!(model = %self.model, answer = %answer.trim(), "classifier answer");
        parse_answer(&answer, kind)
    }
}

/// Instructions listing every valid code for `kind`.
pub fn system_prompt(kind: TransactionKind) -> String {
    let kind_label = match kind {
        TransactionKind::Income => "un ingreso",
        TransactionKind::Expense => "un gasto",
    };
    let mut s = format!(
        "Clasifica la descripción de {kind_label} de una finca familiar. \
         Responde únicamente con uno de estos códigos:\n"
    );
    for c in Category::all(kind) {
        s.push_str(&format!("- {}: {}\n", c.code(), c.label()));
    }
    s
}

/// Read a category code out of a model answer. An exact code wins; otherwise
/// the first valid code mentioned anywhere in the text is used.
pub fn parse_answer(answer: &str, kind: TransactionKind) -> Result<Category, ClassifierError> {
    let cleaned = answer
        .trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
        .to_lowercase();
    if let Ok(c) = cleaned.parse::<Category>()
        && c.kind() == kind
    {
        return Ok(c);
    }
    Category::all(kind)
        .into_iter()
        .find(|c| cleaned.contains(c.code()))
        .ok_or(ClassifierError::UnknownCategory(cleaned))
}

/// The classifier selected by `[classifier].provider`.
pub enum ConfiguredClassifier {
    Stub(StubClassifier),
    Llm(LlmClassifier),
}

impl ConfiguredClassifier {
    pub fn from_config(section: &ClassifierSection) -> Result<Self> {
        match section.provider.trim().to_lowercase().as_str() {
            "" | "stub" | "none" => Ok(Self::Stub(StubClassifier)),
            "openai" => Ok(Self::Llm(LlmClassifier::new(Provider::OpenAI, section)?)),
            "anthropic" => Ok(Self::Llm(LlmClassifier::new(Provider::Anthropic, section)?)),
            other => bail!("unknown classifier provider '{other}' (expected stub, openai or anthropic)"),
        }
    }
}

#[async_trait]
impl SecondaryClassifier for ConfiguredClassifier {
    async fn classify(&self, description: &str, kind: TransactionKind) -> Result<Category, ClassifierError> {
        match self {
            Self::Stub(c) => c.classify(description, kind).await,
            Self::Llm(c) => c.classify(description, kind).await,
        }
    }
}
