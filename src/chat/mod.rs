//! Interactive conversation client for the gateway.
//!
//! Each turn asks for an endpoint, a query text and that endpoint's filters,
//! posts a structured query under a fixed session id, and prints the
//! conversation metadata followed by a table of records.

pub mod render;

use std::time::Duration;

use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::gateway::{QueryEnvelope, QueryMeta, StructuredQuery};
use crate::resources::source::truncate_upstream_error;
use crate::resources::{
    AllocationFilters, AssetFilters, CloudCostFilters, ResourceFilter, ResourceKind,
};

pub use render::{render_meta, render_records, Tabular};

/// Failure while talking to the gateway.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("gateway answered {status} ({error_type}): {message}")]
    Gateway {
        status: u16,
        error_type: String,
        message: String,
    },
    #[error("invalid gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_type: String,
}

/// Outcome of one conversation turn. On failure `records` is empty and
/// `error` is set; a partial reply is never produced.
#[derive(Debug)]
pub struct ChatReply<R, F> {
    pub records: Vec<R>,
    pub meta: Option<QueryMeta<F>>,
    pub error: Option<ChatError>,
}

impl<R: Tabular, F> ChatReply<R, F> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn render(&self) -> String {
        let mut out = String::from("\n--- Gateway Response ---\n");
        if let Some(error) = &self.error {
            out.push_str(&format!("Error: {error}\n"));
        }
        if let Some(meta) = &self.meta {
            out.push_str(&render_meta(meta));
        }
        out.push_str("\n--- Data Records ---\n");
        out.push_str(&render_records(&self.records));
        out
    }
}

/// HTTP client posting structured queries to a gateway.
pub struct ChatClient {
    base_url: String,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a structured query to the endpoint for `F`.
    pub async fn query<F: ResourceFilter>(
        &self,
        query: &StructuredQuery<F>,
    ) -> Result<QueryEnvelope<F::Record, F>, ChatError> {
        let url = format!("{}/{}", self.base_url, F::KIND.path());
        let transport = |source| ChatError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .post(&url)
            .json(query)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let (error_type, message) = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => (parsed.error_type, parsed.error),
                Err(_) => (String::from("Unknown"), truncate_upstream_error(&body)),
            };
            return Err(ChatError::Gateway {
                status: status.as_u16(),
                error_type,
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Like [`ChatClient::query`], folding failures into an empty reply.
    pub async fn ask<F: ResourceFilter>(
        &self,
        query: &StructuredQuery<F>,
    ) -> ChatReply<F::Record, F> {
        match self.query(query).await {
            Ok(envelope) => ChatReply {
                records: envelope.data,
                meta: Some(envelope.meta),
                error: None,
            },
            Err(e) => {
                tracing::debug!(kind = %F::KIND, error = %e, "Gateway query failed");
                ChatReply {
                    records: Vec::new(),
                    meta: None,
                    error: Some(e),
                }
            }
        }
    }
}

// ── Interactive loop ────────────────────────────────────────────

/// Filters that can be collected from the terminal.
trait PromptFilters: ResourceFilter {
    fn prompt(theme: &ColorfulTheme) -> Result<Self>;
}

fn ask_field(theme: &ColorfulTheme, prompt: &str) -> Result<String> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

impl PromptFilters for AllocationFilters {
    fn prompt(theme: &ColorfulTheme) -> Result<Self> {
        Ok(Self {
            namespace: ask_field(theme, "Namespace")?,
            start: ask_field(theme, "Start date (RFC3339)")?,
            end: ask_field(theme, "End date (RFC3339)")?,
        })
    }
}

impl PromptFilters for CloudCostFilters {
    fn prompt(theme: &ColorfulTheme) -> Result<Self> {
        Ok(Self {
            namespace: ask_field(theme, "Namespace")?,
        })
    }
}

impl PromptFilters for AssetFilters {
    fn prompt(theme: &ColorfulTheme) -> Result<Self> {
        Ok(Self {
            provider: ask_field(theme, "Provider")?,
            region: ask_field(theme, "Region")?,
        })
    }
}

fn is_exit_command(query: &str) -> bool {
    matches!(query.trim().to_ascii_lowercase().as_str(), "quit" | "exit")
}

async fn turn<F>(
    client: &ChatClient,
    theme: &ColorfulTheme,
    query: &str,
    session_id: &str,
) -> Result<()>
where
    F: PromptFilters,
    F::Record: Tabular,
{
    let filters = F::prompt(theme)?;
    let reply = client
        .ask(&StructuredQuery::new(query, filters, session_id))
        .await;
    if reply.is_error() {
        println!("{}", style("Request failed").red().bold());
    }
    println!("{}", reply.render());
    Ok(())
}

/// Run the interactive conversation loop until the user types `quit`/`exit`.
pub async fn run_chat(config: &Config, url: Option<String>, session: Option<String>) -> Result<()> {
    let base_url = url.unwrap_or_else(|| config.chat_gateway_url());
    let session_id = session.unwrap_or_else(|| config.chat.session_id.clone());
    let client = ChatClient::new(
        &base_url,
        Duration::from_secs(config.upstream.timeout_secs),
    );
    let theme = ColorfulTheme::default();

    println!("{}", style("costgate conversation client").white().bold());
    println!("Gateway:  {}", style(client.base_url()).cyan());
    println!("Session:  {}", style(&session_id).cyan());
    println!("Type 'quit' or 'exit' as the query to end the session.\n");

    let endpoints: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.path()).collect();

    loop {
        let choice = match Select::with_theme(&theme)
            .with_prompt("Choose endpoint")
            .items(&endpoints)
            .default(0)
            .interact()
        {
            Ok(choice) => choice,
            Err(e) => {
                tracing::debug!("Endpoint prompt ended: {e}");
                break;
            }
        };

        let query: String = Input::with_theme(&theme)
            .with_prompt("Enter query")
            .allow_empty(true)
            .interact_text()?;
        let query = query.trim().to_string();
        if is_exit_command(&query) {
            break;
        }

        match ResourceKind::ALL[choice] {
            ResourceKind::Allocations => {
                turn::<AllocationFilters>(&client, &theme, &query, &session_id).await?;
            }
            ResourceKind::CloudCosts => {
                turn::<CloudCostFilters>(&client, &theme, &query, &session_id).await?;
            }
            ResourceKind::Assets => {
                turn::<AssetFilters>(&client, &theme, &query, &session_id).await?;
            }
        }
    }

    println!("\nGoodbye! Conversation session ended.");
    Ok(())
}
