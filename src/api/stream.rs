use crate::api::logging::emit_sse_parse_error;
use crate::types::GenerateContentResponse;

/// Incremental parser for the `alt=sse` stream format: events separated by
/// a blank line, each carrying one `data: {json}` response chunk. Events
/// that fail to parse are logged and skipped; the stream keeps going.
#[derive(Default)]
pub struct StreamParser {
    buffer: String,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold raw bytes in and return the text fragments of any events this
    /// chunk completed. Carriage returns are dropped up front so CRLF
    /// framing collapses to the `\n\n` separators scanned below.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer
            .push_str(&String::from_utf8_lossy(chunk).replace('\r', ""));
        let mut fragments = Vec::new();
        let mut start = 0;

        while let Some(end) = self.buffer[start..].find("\n\n") {
            let event_end = start + end + 2;
            collect_event_fragments(&self.buffer[start..event_end], &mut fragments);
            start = event_end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        fragments
    }

    /// The stream closed; parse whatever is still buffered as a final
    /// event. Some servers omit the trailing blank line on the last one.
    pub fn finish(&mut self) -> Vec<String> {
        let leftover = std::mem::take(&mut self.buffer);
        let mut fragments = Vec::new();
        collect_event_fragments(&leftover, &mut fragments);
        fragments
    }
}

fn collect_event_fragments(event_text: &str, fragments: &mut Vec<String>) {
    for line in event_text.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };

        match serde_json::from_str::<GenerateContentResponse>(data.trim()) {
            Ok(response) => {
                let text = chunk_text(&response);
                if !text.is_empty() {
                    fragments.push(text);
                }
            }
            Err(error) => emit_sse_parse_error(data, &error),
        }
    }
}

/// Text carried by one chunk: the text parts of its first candidate, in
/// order. Inline data and unknown part kinds contribute nothing.
fn chunk_text(response: &GenerateContentResponse) -> String {
    let mut text = String::new();
    if let Some(content) = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
    {
        for part in &content.parts {
            if let Some(part_text) = &part.text {
                text.push_str(part_text);
            }
        }
    }
    text
}
