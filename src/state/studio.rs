//! Round orchestration for the two assistant panels.
//!
//! A round starts on the UI thread, which appends the user's turn and
//! marks the panel busy, then hands the provider call to a spawned task.
//! Workers never touch studio state directly; they report progress as
//! [`StudioUpdate`] values over a channel and the owning surface folds
//! each one back in with [`Studio::apply_update`] between frames.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::logging::emit_round_failure;
use crate::api::provider::{GenerationProvider, GenerationRequest, InlineImage, StreamRequest};
use crate::config::Settings;
use crate::state::assets::AssetLibrary;
use crate::state::intent;
use crate::state::interpreter::CodeBlockInterpreter;
use crate::state::session::ChatSession;

pub const CODE_ASSISTANT_GREETING: &str = "Hello! I'm your Coding Assistant. I can help you \
     write scripts, debug code, or optimize your game logic. What are we building?";

pub const ASSET_ASSISTANT_GREETING: &str = "Hi! I'm your Asset Architect. I can generate 2D \
     sprites, describe 3D models, or suggest sound effects. Try asking for a 'cyberpunk sword \
     sprite'.";

/// Replaces the in-flight turn when a code stream fails.
pub const CODE_STREAM_FAILURE_REPLY: &str = "Error connecting to AI Service.";

/// Appended as a fresh turn when an asset consultation fails.
pub const ASSET_FAILURE_REPLY: &str = "Failed to process asset request.";

/// Stands in for the reply when image generation fails. The round still
/// completes normally, so the classifier gets its chance to file a
/// placeholder record from the request text.
pub const IMAGE_FAILURE_REPLY: &str =
    "I tried to generate an image but encountered an error. Please try again.";

pub const ASSET_CONSULTANT_INSTRUCTION: &str = "You are an expert Game Asset Consultant. Help the \
     user plan their game's art style, sound design, and 3D pipeline. You cannot generate 3D \
     models or Audio files directly yet, but you can describe them or generate 2D concept \
     art/textures.";

/// Progress reports from round workers back to the owning surface.
#[derive(Debug)]
pub enum StudioUpdate {
    /// Latest accumulated text for the in-flight code turn, plus at most
    /// one extracted editor payload per round.
    CodeStream {
        turn_id: Uuid,
        full_text: String,
        extracted_code: Option<String>,
    },
    CodeFinished {
        turn_id: Uuid,
    },
    CodeFailed {
        turn_id: Uuid,
        reply: String,
    },
    AssetReply {
        request_text: String,
        text: String,
        image: Option<InlineImage>,
    },
    AssetFailed {
        reply: String,
    },
}

/// Follow-up the surface layer performs after an update is folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioEffect {
    /// Replace the editor buffer and bring the code view forward.
    ShowExtractedCode(String),
    /// A record landed in the library; bring the asset view forward.
    ShowAssetLibrary,
}

pub struct Studio {
    pub code: ChatSession,
    pub asset: ChatSession,
    pub assets: AssetLibrary,
    pub settings: Settings,
}

impl Studio {
    pub fn new(settings: Settings) -> Self {
        Self {
            code: ChatSession::with_greeting(CODE_ASSISTANT_GREETING),
            asset: ChatSession::with_greeting(ASSET_ASSISTANT_GREETING),
            assets: AssetLibrary::new(),
            settings,
        }
    }

    /// Begin a streamed code round. Returns false without side effects
    /// while the panel is still busy with the previous round.
    pub fn start_code_round(
        &mut self,
        provider: Arc<dyn GenerationProvider>,
        message: &str,
        editor_context: &str,
        update_tx: &mpsc::UnboundedSender<StudioUpdate>,
    ) -> bool {
        let Some(exchange) = self.code.begin_streamed_exchange(message) else {
            return false;
        };

        let request = StreamRequest {
            history: exchange.prior_turns,
            message: message.to_string(),
            editor_context: editor_context.to_string(),
        };
        tokio::spawn(run_code_round(
            provider,
            request,
            message.to_string(),
            exchange.pending_turn_id,
            update_tx.clone(),
        ));
        true
    }

    /// Begin a whole-reply asset round. Returns false while busy.
    pub fn start_asset_round(
        &mut self,
        provider: Arc<dyn GenerationProvider>,
        message: &str,
        update_tx: &mpsc::UnboundedSender<StudioUpdate>,
    ) -> bool {
        if !self.asset.begin_exchange(message) {
            return false;
        }
        tokio::spawn(run_asset_round(
            provider,
            message.to_string(),
            update_tx.clone(),
        ));
        true
    }

    /// Fold a worker update into the panels and report what the surface
    /// should bring forward.
    pub fn apply_update(&mut self, update: StudioUpdate) -> Option<StudioEffect> {
        match update {
            StudioUpdate::CodeStream {
                turn_id,
                full_text,
                extracted_code,
            } => {
                self.code.update_streaming_turn(turn_id, &full_text);
                extracted_code.map(StudioEffect::ShowExtractedCode)
            }
            StudioUpdate::CodeFinished { turn_id } => {
                self.code.finish_streamed_exchange(turn_id);
                None
            }
            StudioUpdate::CodeFailed { turn_id, reply } => {
                self.code.fail_streamed_exchange(turn_id, &reply);
                None
            }
            StudioUpdate::AssetReply {
                request_text,
                text,
                image,
            } => {
                let image_refs = image.iter().map(InlineImage::data_uri).collect();
                self.asset.finish_with_reply(&text, image_refs);
                self.assets
                    .ingest_generation(&request_text, image.as_ref())
                    .is_some()
                    .then_some(StudioEffect::ShowAssetLibrary)
            }
            StudioUpdate::AssetFailed { reply } => {
                self.asset.finish_with_reply(&reply, Vec::new());
                None
            }
        }
    }
}

async fn run_code_round(
    provider: Arc<dyn GenerationProvider>,
    request: StreamRequest,
    request_text: String,
    turn_id: Uuid,
    update_tx: mpsc::UnboundedSender<StudioUpdate>,
) {
    let mut fragments = match provider.stream_completion(request).await {
        Ok(fragments) => fragments,
        Err(error) => {
            emit_round_failure("code_stream_open", &error);
            emit_update(
                &update_tx,
                StudioUpdate::CodeFailed {
                    turn_id,
                    reply: CODE_STREAM_FAILURE_REPLY.to_string(),
                },
            );
            return;
        }
    };

    let mut interpreter = CodeBlockInterpreter::new(&request_text);
    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                let outcome = interpreter.accept_fragment(&fragment);
                emit_update(
                    &update_tx,
                    StudioUpdate::CodeStream {
                        turn_id,
                        full_text: outcome.full_text,
                        extracted_code: outcome.extracted_code,
                    },
                );
            }
            Err(error) => {
                emit_round_failure("code_stream", &error);
                emit_update(
                    &update_tx,
                    StudioUpdate::CodeFailed {
                        turn_id,
                        reply: CODE_STREAM_FAILURE_REPLY.to_string(),
                    },
                );
                return;
            }
        }
    }

    emit_update(&update_tx, StudioUpdate::CodeFinished { turn_id });
}

async fn run_asset_round(
    provider: Arc<dyn GenerationProvider>,
    message: String,
    update_tx: mpsc::UnboundedSender<StudioUpdate>,
) {
    if intent::requests_image(&message) {
        let request = GenerationRequest {
            prompt: image_generation_prompt(&message),
            system_instruction: None,
            want_image: true,
        };
        let (text, image) = match provider.generate(request).await {
            Ok(reply) => (reply.text, reply.image),
            Err(error) => {
                emit_round_failure("asset_image", &error);
                (IMAGE_FAILURE_REPLY.to_string(), None)
            }
        };
        emit_update(
            &update_tx,
            StudioUpdate::AssetReply {
                request_text: message,
                text,
                image,
            },
        );
        return;
    }

    let request = GenerationRequest {
        prompt: message.clone(),
        system_instruction: Some(ASSET_CONSULTANT_INSTRUCTION.to_string()),
        want_image: false,
    };
    match provider.generate(request).await {
        Ok(reply) => {
            // Consultation replies never carry an image payload.
            emit_update(
                &update_tx,
                StudioUpdate::AssetReply {
                    request_text: message,
                    text: reply.text,
                    image: None,
                },
            );
        }
        Err(error) => {
            emit_round_failure("asset_consult", &error);
            emit_update(
                &update_tx,
                StudioUpdate::AssetFailed {
                    reply: ASSET_FAILURE_REPLY.to_string(),
                },
            );
        }
    }
}

fn image_generation_prompt(message: &str) -> String {
    format!("Generate a high quality game asset: {message}. solid background if not specified otherwise.")
}

fn emit_update(update_tx: &mpsc::UnboundedSender<StudioUpdate>, update: StudioUpdate) {
    // The receiver disappears during shutdown; late updates just drop.
    let _ = update_tx.send(update);
}
