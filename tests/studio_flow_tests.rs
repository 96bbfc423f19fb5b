use std::sync::Arc;

use tokio::sync::mpsc;

use gamegen_studio::api::mock_client::ScriptedProvider;
use gamegen_studio::api::provider::{
    GenerationReply, HistoryRole, InlineImage, ProviderError,
};
use gamegen_studio::config::{
    ProviderConfig, ProviderKind, Settings, DEFAULT_ASSET_MODEL, DEFAULT_CODE_MODEL,
};
use gamegen_studio::state::assets::AssetCategory;
use gamegen_studio::state::studio::{
    Studio, StudioEffect, StudioUpdate, ASSET_CONSULTANT_INSTRUCTION, ASSET_FAILURE_REPLY,
    CODE_ASSISTANT_GREETING, CODE_STREAM_FAILURE_REPLY, IMAGE_FAILURE_REPLY,
};

fn studio() -> Studio {
    Studio::new(Settings {
        code: ProviderConfig::gemini(DEFAULT_CODE_MODEL),
        asset: ProviderConfig::gemini(DEFAULT_ASSET_MODEL),
    })
}

fn png(base64_data: &str) -> InlineImage {
    InlineImage {
        mime_type: "image/png".to_string(),
        base64_data: base64_data.to_string(),
    }
}

/// Pump worker updates into the studio until both panels go idle,
/// collecting every surface effect on the way.
async fn drive_until_idle(
    studio: &mut Studio,
    update_rx: &mut mpsc::UnboundedReceiver<StudioUpdate>,
) -> Vec<StudioEffect> {
    let mut effects = Vec::new();
    while studio.code.is_busy() || studio.asset.is_busy() {
        let update = update_rx
            .recv()
            .await
            .expect("a busy panel's worker must report before dropping its sender");
        if let Some(effect) = studio.apply_update(update) {
            effects.push(effect);
        }
    }
    effects
}

#[tokio::test]
async fn test_code_round_streams_text_and_extracts_once() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_fragments([
        "Sure, here:\n```ts\n",
        "const x = 1;\n",
        "```\nAnd one more example:\n```",
    ]);

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let started = studio.start_code_round(
        provider.clone(),
        "write me some code",
        "let old = true;",
        &update_tx,
    );
    assert!(started);
    assert!(studio.code.is_busy());

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert_eq!(
        effects,
        vec![StudioEffect::ShowExtractedCode("const x = 1;\n".to_string())]
    );

    let turns = studio.code.turns();
    let reply = turns.last().expect("the reply turn exists");
    assert!(!reply.pending);
    assert_eq!(
        reply.text,
        "Sure, here:\n```ts\nconst x = 1;\n```\nAnd one more example:\n```"
    );

    let requests = provider.recorded_stream_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "write me some code");
    assert_eq!(requests[0].editor_context, "let old = true;");
    assert_eq!(requests[0].history.len(), 1);
    assert_eq!(requests[0].history[0].role, HistoryRole::Model);
    assert_eq!(requests[0].history[0].text, CODE_ASSISTANT_GREETING);
}

#[tokio::test]
async fn test_code_stream_break_replaces_the_inflight_turn() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_stream_break(
        ["I was about to say"],
        ProviderError::Request("connection reset".to_string()),
    );

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_code_round(provider.clone(), "some code please", "", &update_tx));

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert!(effects.is_empty());

    let reply = studio.code.turns().last().expect("the reply turn exists");
    assert_eq!(reply.text, CODE_STREAM_FAILURE_REPLY);
    assert!(!reply.pending);
    assert!(!studio.code.is_busy());
}

#[tokio::test]
async fn test_code_stream_refusal_fails_the_round() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_stream_refusal(ProviderError::Unconfigured(ProviderKind::OpenAi));

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_code_round(provider.clone(), "a movement script", "", &update_tx));

    drive_until_idle(&mut studio, &mut update_rx).await;
    let reply = studio.code.turns().last().expect("the reply turn exists");
    assert_eq!(reply.text, CODE_STREAM_FAILURE_REPLY);
}

#[tokio::test]
async fn test_busy_panel_refuses_a_second_round() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_fragments(["reply"]);

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_code_round(provider.clone(), "first script", "", &update_tx));
    assert!(!studio.start_code_round(provider.clone(), "second script", "", &update_tx));

    drive_until_idle(&mut studio, &mut update_rx).await;
    assert_eq!(provider.recorded_stream_requests().len(), 1);

    // Greeting, the accepted request, and its reply. The refused
    // request left no trace.
    assert_eq!(studio.code.turns().len(), 3);
}

#[tokio::test]
async fn test_image_round_files_a_sprite_and_opens_the_library() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_reply(GenerationReply {
        text: "Here is your generated asset.".to_string(),
        image: Some(png("QUJD")),
    });

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_asset_round(provider.clone(), "a cyberpunk sword sprite", &update_tx));
    assert!(studio.asset.is_busy());

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert_eq!(effects, vec![StudioEffect::ShowAssetLibrary]);

    let reply = studio.asset.turns().last().expect("the reply turn exists");
    assert_eq!(reply.text, "Here is your generated asset.");
    assert_eq!(reply.images, vec!["data:image/png;base64,QUJD".to_string()]);

    assert_eq!(studio.assets.len(), 1);
    let record = &studio.assets.records()[0];
    assert_eq!(record.category, AssetCategory::Sprite2d);
    assert_eq!(record.name, "Generated Asset 1");
    assert_eq!(
        record.content_uri.as_deref(),
        Some("data:image/png;base64,QUJD")
    );

    let requests = provider.recorded_generate_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].want_image);
    assert_eq!(requests[0].system_instruction, None);
    assert_eq!(
        requests[0].prompt,
        "Generate a high quality game asset: a cyberpunk sword sprite. \
         solid background if not specified otherwise."
    );
}

#[tokio::test]
async fn test_consultation_round_carries_the_instruction_and_drops_images() {
    let provider = Arc::new(ScriptedProvider::new());
    // Even a backend that volunteers an image on the text path does not
    // get one into the transcript or the library.
    provider.script_reply(GenerationReply {
        text: "Start with a muted palette.".to_string(),
        image: Some(png("QUJD")),
    });

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_asset_round(provider.clone(), "plan my art style", &update_tx));

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert!(effects.is_empty());
    assert!(studio.assets.is_empty());

    let reply = studio.asset.turns().last().expect("the reply turn exists");
    assert_eq!(reply.text, "Start with a muted palette.");
    assert!(reply.images.is_empty());

    let requests = provider.recorded_generate_requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].want_image);
    assert_eq!(requests[0].prompt, "plan my art style");
    assert_eq!(
        requests[0].system_instruction.as_deref(),
        Some(ASSET_CONSULTANT_INSTRUCTION)
    );
}

#[tokio::test]
async fn test_text_round_files_a_model_placeholder() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_reply(GenerationReply {
        text: "A low-poly dragon with four wing bones.".to_string(),
        image: None,
    });

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_asset_round(provider.clone(), "I need a 3d model of a dragon", &update_tx));

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert_eq!(effects, vec![StudioEffect::ShowAssetLibrary]);

    let record = &studio.assets.records()[0];
    assert_eq!(record.category, AssetCategory::Model3d);
    assert_eq!(record.name, "3D: I need a 3d mod");
    assert_eq!(record.content_uri, None);
}

#[tokio::test]
async fn test_image_failure_still_replies_and_can_file_a_placeholder() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_generate_failure(ProviderError::Request("backend down".to_string()));

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_asset_round(provider.clone(), "explosion sprite with sound", &update_tx));

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert_eq!(effects, vec![StudioEffect::ShowAssetLibrary]);

    let reply = studio.asset.turns().last().expect("the reply turn exists");
    assert_eq!(reply.text, IMAGE_FAILURE_REPLY);
    assert!(reply.images.is_empty());

    // No image arrived, so the request text classified the round.
    let record = &studio.assets.records()[0];
    assert_eq!(record.category, AssetCategory::Audio);
    assert_eq!(record.name, "SFX: explosion sprit");
    assert_eq!(record.content_uri, None);
}

#[tokio::test]
async fn test_consultation_failure_appends_a_fresh_turn_and_no_record() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.script_generate_failure(ProviderError::Status {
        url: "https://example.invalid/v1beta".to_string(),
        status: 500,
    });

    let mut studio = studio();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    assert!(studio.start_asset_round(provider.clone(), "plan the boss fight pacing", &update_tx));

    let effects = drive_until_idle(&mut studio, &mut update_rx).await;
    assert!(effects.is_empty());
    assert!(studio.assets.is_empty());

    let turns = studio.asset.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns.last().expect("the failure turn exists").text, ASSET_FAILURE_REPLY);
    assert!(!studio.asset.is_busy());
}
