//! Incremental interpretation of a streamed coding reply.
//!
//! The interpreter folds each arriving fragment into the accumulated reply
//! text and decides, per fragment, whether a complete fenced code block is
//! ready to take over the editor. Extraction fires at most once per reply
//! and only when the user's request asked for code in the first place.

use crate::state::intent;

const FENCE_MARKER: &str = "```";

/// Markers required in the accumulated text before extraction may fire.
/// A reply holding exactly one fenced pair (two markers) never extracts
/// until a further marker arrives; see the crate docs for this quirk.
const EXTRACTION_MARKER_THRESHOLD: usize = 3;

/// What one fragment did to the reply: the full text to display, and at
/// most once per reply, a code body ready to replace the editor buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentOutcome {
    pub full_text: String,
    pub extracted_code: Option<String>,
}

/// Accumulator for one streamed reply. Created fresh per exchange and
/// discarded when the stream ends; never reused across replies.
pub struct CodeBlockInterpreter {
    accumulated: String,
    code_intent: bool,
    extracted: bool,
}

impl CodeBlockInterpreter {
    /// The request text decides up front whether this reply may ever
    /// extract code; replies to non-code requests only update display text.
    pub fn new(request_text: &str) -> Self {
        Self {
            accumulated: String::new(),
            code_intent: intent::requests_code(request_text),
            extracted: false,
        }
    }

    /// Fold one fragment in and re-scan the whole accumulated text.
    ///
    /// Re-running with an empty fragment is a no-op apart from the returned
    /// snapshot: the latch guarantees a body is never emitted twice.
    pub fn accept_fragment(&mut self, fragment: &str) -> FragmentOutcome {
        self.accumulated.push_str(fragment);

        let mut extracted_code = None;
        if self.code_intent
            && !self.extracted
            && count_fence_markers(&self.accumulated) >= EXTRACTION_MARKER_THRESHOLD
        {
            if let Some(body) = first_complete_fenced_body(&self.accumulated) {
                self.extracted = true;
                extracted_code = Some(body.to_string());
            }
        }

        FragmentOutcome {
            full_text: self.accumulated.clone(),
            extracted_code,
        }
    }

    pub fn full_text(&self) -> &str {
        &self.accumulated
    }

    pub fn has_extracted(&self) -> bool {
        self.extracted
    }
}

/// Non-overlapping occurrences of the fence marker.
fn count_fence_markers(text: &str) -> usize {
    text.matches(FENCE_MARKER).count()
}

/// Body of the first complete fenced block: the first marker that begins a
/// line opens the block, the rest of that line is its language tag, and the
/// body runs from the following line to the next marker occurrence. Returns
/// None while no such region is complete.
fn first_complete_fenced_body(text: &str) -> Option<&str> {
    let mut search_from = 0;
    loop {
        let open = search_from + text[search_from..].find(FENCE_MARKER)?;
        if open > 0 && text.as_bytes()[open - 1] != b'\n' {
            search_from = open + FENCE_MARKER.len();
            continue;
        }

        let tag_start = open + FENCE_MARKER.len();
        // The opening line is still streaming in; nothing after it exists yet.
        let newline = text[tag_start..].find('\n')?;
        let body_start = tag_start + newline + 1;
        let close = text[body_start..].find(FENCE_MARKER)?;
        return Some(&text[body_start..body_start + close]);
    }
}
