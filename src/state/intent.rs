//! Keyword checks over request and reply text.
//!
//! Both assistants route on plain keyword presence rather than a model call:
//! the code assistant decides whether a reply may contain an extractable
//! script, and the asset assistant decides between image generation and a
//! text description, then picks a library category for the finished round.
//! Matching is case-insensitive substring search over fixed vocabularies.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;

/// Request words that mark a coding exchange as code-producing.
const CODE_REQUEST_KEYWORDS: &[&str] = &["code", "script"];

/// Request words that route an asset exchange to image generation.
const IMAGE_REQUEST_KEYWORDS: &[&str] = &[
    "sprite",
    "texture",
    "image",
    "background",
    "icon",
    "ui",
    "character",
    "concept",
];

/// Request phrases that file a text-only round as a 3D model placeholder.
const MODEL_ASSET_KEYWORDS: &[&str] = &["3d model"];

/// Request words that file a text-only round as an audio placeholder.
const AUDIO_ASSET_KEYWORDS: &[&str] = &["sound", "sfx"];

fn matcher(cell: &'static OnceLock<AhoCorasick>, patterns: &[&str]) -> &'static AhoCorasick {
    cell.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(patterns)
            .expect("keyword vocabulary must build")
    })
}

/// True when the user's coding request asks for code or a script.
pub fn requests_code(text: &str) -> bool {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, CODE_REQUEST_KEYWORDS).is_match(text)
}

/// True when the user's asset request calls for a generated image.
pub fn requests_image(text: &str) -> bool {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, IMAGE_REQUEST_KEYWORDS).is_match(text)
}

/// True when the user's asset request mentions a 3D model.
pub fn mentions_model_asset(text: &str) -> bool {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, MODEL_ASSET_KEYWORDS).is_match(text)
}

/// True when the user's asset request mentions a sound effect.
pub fn mentions_audio_asset(text: &str) -> bool {
    static CELL: OnceLock<AhoCorasick> = OnceLock::new();
    matcher(&CELL, AUDIO_ASSET_KEYWORDS).is_match(text)
}
