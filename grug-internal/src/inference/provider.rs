//! OpenAI-compatible streaming completion client.
//!
//! The provider's SSE chunk stream is reduced to plain text fragments here;
//! the endpoint layer decides how they reach the caller. Provider error
//! payloads stay server-side (logged via the error type, never forwarded).

use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DisplayOrDebugGateway, Error, ErrorDetails};
use crate::inference::{ChatMessage, CompletionChunkStream};

/// Whether a completion provider is configured, resolved once at startup.
#[derive(Clone)]
pub enum ProviderInfo {
    Connected(CompletionProvider),
    Unconfigured,
}

#[derive(Clone)]
pub struct CompletionProvider {
    api_base: Url,
    model: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
struct ProviderRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ProviderChunk {
    #[serde(default)]
    choices: Vec<ProviderChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ProviderChunkChoice {
    #[serde(default)]
    delta: ProviderDelta,
}

// Some deployments put the fragment in `text` instead of `content`.
#[derive(Debug, Default, Deserialize)]
struct ProviderDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ProviderChunk {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content.or(choice.delta.text))
    }
}

fn chat_url(api_base: &Url) -> Result<Url, Error> {
    let mut base = api_base.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join("chat/completions").map_err(|e| {
        Error::new(ErrorDetails::Config {
            message: format!("Invalid provider base URL: {e}"),
        })
    })
}

impl CompletionProvider {
    pub fn new(api_base: Url, model: String, api_key: SecretString) -> Self {
        Self {
            api_base,
            model,
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Open a streamed completion for the given turns. Errors here mean the
    /// request could not be started at all; errors after the stream opens
    /// arrive as items of the returned stream.
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        client: &reqwest::Client,
    ) -> Result<CompletionChunkStream, Error> {
        let request_body = ProviderRequest {
            model: &self.model,
            messages,
            stream: true,
        };
        let request_url = chat_url(&self.api_base)?;

        let event_source = client
            .post(request_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body)
            .eventsource()
            .map_err(|e| {
                Error::new(ErrorDetails::InferenceClient {
                    message: format!(
                        "Error starting provider stream: {}",
                        DisplayOrDebugGateway::new(e)
                    ),
                    status_code: None,
                    raw_response: None,
                })
            })?;

        Ok(stream_provider_events(event_source))
    }
}

fn stream_provider_events(mut event_source: EventSource) -> CompletionChunkStream {
    Box::pin(async_stream::stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data == "[DONE]" {
                        break;
                    }
                    match serde_json::from_str::<ProviderChunk>(&message.data) {
                        Ok(chunk) => {
                            if let Some(content) = chunk.into_content() {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                        }
                        Err(e) => {
                            yield Err(Error::new(ErrorDetails::InferenceServer {
                                message: format!("Error parsing provider chunk: {e}"),
                                raw_response: Some(message.data.clone()),
                            }));
                            break;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield Err(convert_stream_error(e).await);
                    break;
                }
            }
        }
        event_source.close();
    })
}

async fn convert_stream_error(e: reqwest_eventsource::Error) -> Error {
    match e {
        reqwest_eventsource::Error::InvalidStatusCode(status_code, response) => {
            let raw_response = response.text().await.ok();
            Error::new(ErrorDetails::InferenceClient {
                message: "Provider returned an error status".to_string(),
                status_code: Some(status_code),
                raw_response,
            })
        }
        _ => Error::new(ErrorDetails::InferenceClient {
            message: format!("{}", DisplayOrDebugGateway::new(e)),
            status_code: None,
            raw_response: None,
        }),
    }
}
