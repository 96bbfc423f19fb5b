//! Generated-asset records and the classification that creates them.
//!
//! A record is created only as a side effect of a successful asset round
//! and is never mutated afterwards. Display order is newest first.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::provider::InlineImage;
use crate::state::intent;
use crate::util::truncate_chars;

/// Characters of the request text kept when a record is named after it.
const NAME_PREFIX_CHARS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    Sprite2d,
    Model3d,
    Audio,
    Particle,
    Animation,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 5] = [
        AssetCategory::Sprite2d,
        AssetCategory::Model3d,
        AssetCategory::Audio,
        AssetCategory::Particle,
        AssetCategory::Animation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AssetCategory::Sprite2d => "2D Assets",
            AssetCategory::Model3d => "3D Models",
            AssetCategory::Audio => "Audio/SFX",
            AssetCategory::Particle => "Particles",
            AssetCategory::Animation => "Animations",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub id: Uuid,
    pub name: String,
    pub category: AssetCategory,
    /// Data URI of the generated payload, when the round produced one.
    pub content_uri: Option<String>,
    /// Decoded size of that payload, for the gallery's size line.
    pub payload_bytes: Option<usize>,
    pub created_at: DateTime<Utc>,
}

/// Decide which category a finished generation round lands in. An image
/// payload always files as a 2D sprite; otherwise the request text picks a
/// placeholder category, a 3D-model mention winning over an audio one.
/// No match means no record.
pub fn classify_generation(request_text: &str, has_image: bool) -> Option<AssetCategory> {
    if has_image {
        Some(AssetCategory::Sprite2d)
    } else if intent::mentions_model_asset(request_text) {
        Some(AssetCategory::Model3d)
    } else if intent::mentions_audio_asset(request_text) {
        Some(AssetCategory::Audio)
    } else {
        None
    }
}

#[derive(Default)]
pub struct AssetLibrary {
    records: Vec<AssetRecord>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in display order, newest first.
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Classify a finished round and, when it matches, insert a record at
    /// the front. Returns the new record, or None when the round produced
    /// nothing for the library.
    pub fn ingest_generation(
        &mut self,
        request_text: &str,
        image: Option<&InlineImage>,
    ) -> Option<&AssetRecord> {
        let category = classify_generation(request_text, image.is_some())?;
        let record = AssetRecord {
            id: Uuid::new_v4(),
            name: record_name(category, request_text, self.records.len()),
            category,
            content_uri: image.map(InlineImage::data_uri),
            payload_bytes: image.and_then(decoded_payload_len),
            created_at: Utc::now(),
        };
        self.records.insert(0, record);
        self.records.first()
    }
}

fn record_name(category: AssetCategory, request_text: &str, existing: usize) -> String {
    let prefix = truncate_chars(request_text, NAME_PREFIX_CHARS);
    match category {
        AssetCategory::Sprite2d => format!("Generated Asset {}", existing + 1),
        AssetCategory::Model3d => format!("3D: {}", prefix),
        AssetCategory::Audio => format!("SFX: {}", prefix),
        AssetCategory::Particle | AssetCategory::Animation => prefix.to_string(),
    }
}

fn decoded_payload_len(image: &InlineImage) -> Option<usize> {
    BASE64.decode(&image.base64_data).ok().map(|bytes| bytes.len())
}
