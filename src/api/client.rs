use super::logging::{debug_payload_enabled, emit_debug_payload};
use super::provider::{
    FragmentStream, GenerationProvider, GenerationReply, GenerationRequest, InlineImage,
    ProviderError, StreamRequest,
};
use super::stream::StreamParser;
use crate::config::Config;
use crate::types::GenerateContentResponse;
use crate::util::truncate_chars;
use anyhow::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use tokio::sync::mpsc;

/// Raw SSE bytes as they come off the wire, before event framing.
type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// Text-only asset consultations go to the fast text model; the image
/// model is reserved for rounds that request an inline payload.
const ASSET_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Low randomness for code output.
const CODE_TEMPERATURE: f64 = 0.2;

/// Editor prefix folded into the system instruction, bounded to keep the
/// request payload within limits.
const EDITOR_CONTEXT_CHARS: usize = 5000;

const IMAGE_REPLY_FALLBACK: &str = "Here is your generated asset.";
const TEXT_REPLY_FALLBACK: &str = "I couldn't process that request.";

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    code_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            code_model: config.code_model.clone(),
            image_model: config.asset_model.clone(),
        })
    }

    async fn stream_completion_inner(
        &self,
        request: StreamRequest,
    ) -> Result<FragmentStream, ProviderError> {
        let request_url = format!(
            "{}?alt=sse",
            self.model_url(&self.code_model, "streamGenerateContent")
        );
        let payload = stream_payload(&request);
        let mut byte_stream = self.open_sse_stream(request_url, payload).await?;

        // Fragments are relayed through a channel so the parser state stays
        // with the reader task and the caller sees plain text items.
        let (fragment_tx, mut fragment_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut parser = StreamParser::new();
            while let Some(item) = byte_stream.next().await {
                match item {
                    Ok(chunk) => {
                        for fragment in parser.process(&chunk) {
                            if fragment_tx.send(Ok(fragment)).is_err() {
                                return;
                            }
                        }
                    }
                    Err(error) => {
                        let _ = fragment_tx.send(Err(error));
                        return;
                    }
                }
            }
            for fragment in parser.finish() {
                if fragment_tx.send(Ok(fragment)).is_err() {
                    return;
                }
            }
        });

        Ok(Box::pin(futures::stream::poll_fn(move |cx| {
            fragment_rx.poll_recv(cx)
        })))
    }

    async fn generate_inner(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationReply, ProviderError> {
        let model = if request.want_image {
            self.image_model.as_str()
        } else {
            ASSET_TEXT_MODEL
        };
        let request_url = self.model_url(model, "generateContent");
        let payload = generate_payload(&request);

        let response = self
            .prepared_post(&request_url, &payload)
            .send()
            .await
            .map_err(|error| map_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &request_url))?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::Decode(error.to_string()))?;
        Ok(reply_from_response(parsed, request.want_image))
    }

    async fn open_sse_stream(
        &self,
        request_url: String,
        payload: Value,
    ) -> Result<ByteStream, ProviderError> {
        let response = self
            .prepared_post(&request_url, &payload)
            .send()
            .await
            .map_err(|error| map_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    fn prepared_post(&self, request_url: &str, payload: &Value) -> reqwest::RequestBuilder {
        if debug_payload_enabled() {
            emit_debug_payload(request_url, payload);
        }

        // The key travels as a header so request URLs stay loggable.
        let mut request = self
            .http
            .post(request_url)
            .header("content-type", "application/json")
            .json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-goog-api-key", api_key);
        }
        request
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_url, model, method)
    }
}

impl GenerationProvider for GeminiClient {
    fn stream_completion(
        &self,
        request: StreamRequest,
    ) -> BoxFuture<'_, Result<FragmentStream, ProviderError>> {
        Box::pin(self.stream_completion_inner(request))
    }

    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationReply, ProviderError>> {
        Box::pin(self.generate_inner(request))
    }
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> ProviderError {
    if error.is_connect() {
        return ProviderError::Request(format!(
            "cannot reach API endpoint '{request_url}': {error}"
        ));
    }
    if error.is_timeout() {
        return ProviderError::Request(format!(
            "API request to '{request_url}' timed out: {error}"
        ));
    }
    if let Some(status) = error.status() {
        return ProviderError::Status {
            url: request_url.to_string(),
            status: status.as_u16(),
        };
    }
    ProviderError::Request(format!("API request to '{request_url}' failed: {error}"))
}

fn stream_payload(request: &StreamRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|turn| {
            json!({
                "role": turn.role.wire_name(),
                "parts": [{ "text": turn.text }],
            })
        })
        .collect();
    contents.push(json!({
        "role": "user",
        "parts": [{ "text": request.message }],
    }));

    json!({
        "contents": contents,
        "systemInstruction": {
            "parts": [{ "text": code_system_instruction(&request.editor_context) }],
        },
        "generationConfig": { "temperature": CODE_TEMPERATURE },
    })
}

fn generate_payload(request: &GenerationRequest) -> Value {
    let mut payload = json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
    });
    if let Some(instruction) = &request.system_instruction {
        let payload_object = payload
            .as_object_mut()
            .expect("payload must be a JSON object");
        payload_object.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": instruction }] }),
        );
    }
    payload
}

fn code_system_instruction(editor_context: &str) -> String {
    format!(
        "You are an expert Game Development AI Assistant (GameGen Code).\n\
         Your goal is to help the user write scripts, shaders, and game logic.\n\
         You are integrated into a Game IDE.\n\
         \n\
         Current Editor Content:\n\
         ```\n\
         {}... (truncated if too long)\n\
         ```\n\
         \n\
         When asked to write code, provide the full code block.\n\
         Focus on clean, performant code suitable for game engines like Godot, Unity, or generic WebGL/Canvas.\n\
         If the user asks to \"fix\" or \"change\" the code, assume they mean the Current Editor Content.",
        truncate_chars(editor_context, EDITOR_CONTEXT_CHARS)
    )
}

fn reply_from_response(response: GenerateContentResponse, want_image: bool) -> GenerationReply {
    let mut text = String::new();
    let mut image = None;

    if let Some(content) = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
    {
        for part in content.parts {
            if let Some(part_text) = part.text {
                text.push_str(&part_text);
            }
            if let Some(inline) = part.inline_data {
                image = Some(InlineImage {
                    mime_type: inline.mime_type,
                    base64_data: inline.data,
                });
            }
        }
    }

    if text.is_empty() {
        text = if want_image {
            IMAGE_REPLY_FALLBACK.to_string()
        } else {
            TEXT_REPLY_FALLBACK.to_string()
        };
    }

    GenerationReply { text, image }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::provider::{HistoryRole, HistoryTurn};

    fn test_config() -> Config {
        Config {
            gemini_api_key: Some("test-key".to_string()),
            api_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            code_model: "gemini-3-pro-preview".to_string(),
            asset_model: "gemini-2.5-flash-image".to_string(),
        }
    }

    #[test]
    fn test_model_url_joins_without_double_slash() {
        let client = GeminiClient::new(&test_config()).expect("client should build");
        assert_eq!(
            client.model_url(&client.code_model, "streamGenerateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-pro-preview:streamGenerateContent"
        );
    }

    #[test]
    fn test_stream_payload_appends_message_after_history() {
        let payload = stream_payload(&StreamRequest {
            history: vec![
                HistoryTurn {
                    role: HistoryRole::Model,
                    text: "Hello! What are we building?".to_string(),
                },
                HistoryTurn {
                    role: HistoryRole::User,
                    text: "a platformer".to_string(),
                },
            ],
            message: "write the jump code".to_string(),
            editor_context: "let speed = 10;".to_string(),
        });

        let contents = payload["contents"].as_array().expect("contents array");
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "model");
        assert_eq!(contents[1]["role"], "user");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "write the jump code");
        assert_eq!(payload["generationConfig"]["temperature"], 0.2);
    }

    #[test]
    fn test_stream_payload_embeds_editor_context_in_instruction() {
        let payload = stream_payload(&StreamRequest {
            history: Vec::new(),
            message: "fix it".to_string(),
            editor_context: "class PlayerController {}".to_string(),
        });

        let instruction = payload["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .expect("instruction text");
        assert!(instruction.contains("class PlayerController {}"));
        assert!(instruction.contains("Current Editor Content:"));
    }

    #[test]
    fn test_editor_context_is_bounded() {
        let instruction = code_system_instruction(&"x".repeat(6000));
        assert!(instruction.contains(&format!("{}... (truncated if too long)", "x".repeat(5000))));
        assert!(!instruction.contains(&"x".repeat(5001)));
    }

    #[test]
    fn test_generate_payload_leaves_instruction_out_unless_set() {
        let bare = generate_payload(&GenerationRequest {
            prompt: "a sprite".to_string(),
            system_instruction: None,
            want_image: true,
        });
        assert!(bare.get("systemInstruction").is_none());

        let instructed = generate_payload(&GenerationRequest {
            prompt: "plan my art style".to_string(),
            system_instruction: Some("You are an expert Game Asset Consultant.".to_string()),
            want_image: false,
        });
        assert_eq!(
            instructed["systemInstruction"]["parts"][0]["text"],
            "You are an expert Game Asset Consultant."
        );
    }

    #[test]
    fn test_reply_from_response_collects_text_and_image() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "A fine sword." },
                            { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                        ]
                    }
                }]
            }"#,
        )
        .expect("response should parse");

        let reply = reply_from_response(response, true);
        assert_eq!(reply.text, "A fine sword.");
        let image = reply.image.expect("image payload");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data_uri(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn test_reply_fallback_text_depends_on_path() {
        let empty: GenerateContentResponse =
            serde_json::from_str(r#"{ "candidates": [] }"#).expect("response should parse");
        assert_eq!(
            reply_from_response(empty.clone(), true).text,
            "Here is your generated asset."
        );
        assert_eq!(
            reply_from_response(empty, false).text,
            "I couldn't process that request."
        );
    }
}
