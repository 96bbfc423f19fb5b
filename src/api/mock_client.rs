use super::provider::{
    FragmentStream, GenerationProvider, GenerationReply, GenerationRequest, ProviderError,
    StreamRequest,
};
use futures::future::{ready, BoxFuture};
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Deterministic stand-in for a live backend. Each call pops the next
/// scripted outcome and records the request it was given, so tests can
/// drive multi-round flows and assert on the exact payloads sent.
pub struct ScriptedProvider {
    stream_outcomes: Mutex<VecDeque<ScriptedStream>>,
    generate_outcomes: Mutex<VecDeque<Result<GenerationReply, ProviderError>>>,
    stream_requests: Mutex<Vec<StreamRequest>>,
    generate_requests: Mutex<Vec<GenerationRequest>>,
}

enum ScriptedStream {
    Items(Vec<Result<String, ProviderError>>),
    Refused(ProviderError),
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            stream_outcomes: Mutex::new(VecDeque::new()),
            generate_outcomes: Mutex::new(VecDeque::new()),
            stream_requests: Mutex::new(Vec::new()),
            generate_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a stream that yields the given fragments and then ends cleanly.
    pub fn script_fragments<I, S>(&self, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = fragments
            .into_iter()
            .map(|fragment| Ok(fragment.into()))
            .collect();
        self.push_stream(ScriptedStream::Items(items));
    }

    /// Queue a stream that yields the given fragments and then fails.
    pub fn script_stream_break<I, S>(&self, fragments: I, error: ProviderError)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<Result<String, ProviderError>> = fragments
            .into_iter()
            .map(|fragment| Ok(fragment.into()))
            .collect();
        items.push(Err(error));
        self.push_stream(ScriptedStream::Items(items));
    }

    /// Queue a call that fails before any fragment is produced.
    pub fn script_stream_refusal(&self, error: ProviderError) {
        self.push_stream(ScriptedStream::Refused(error));
    }

    pub fn script_reply(&self, reply: GenerationReply) {
        self.generate_outcomes
            .lock()
            .expect("scripted outcomes must not be poisoned")
            .push_back(Ok(reply));
    }

    pub fn script_generate_failure(&self, error: ProviderError) {
        self.generate_outcomes
            .lock()
            .expect("scripted outcomes must not be poisoned")
            .push_back(Err(error));
    }

    pub fn recorded_stream_requests(&self) -> Vec<StreamRequest> {
        self.stream_requests
            .lock()
            .expect("recorded requests must not be poisoned")
            .clone()
    }

    pub fn recorded_generate_requests(&self) -> Vec<GenerationRequest> {
        self.generate_requests
            .lock()
            .expect("recorded requests must not be poisoned")
            .clone()
    }

    fn push_stream(&self, outcome: ScriptedStream) {
        self.stream_outcomes
            .lock()
            .expect("scripted outcomes must not be poisoned")
            .push_back(outcome);
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationProvider for ScriptedProvider {
    fn stream_completion(
        &self,
        request: StreamRequest,
    ) -> BoxFuture<'_, Result<FragmentStream, ProviderError>> {
        self.stream_requests
            .lock()
            .expect("recorded requests must not be poisoned")
            .push(request);
        let outcome = self
            .stream_outcomes
            .lock()
            .expect("scripted outcomes must not be poisoned")
            .pop_front();

        Box::pin(ready(match outcome {
            Some(ScriptedStream::Items(items)) => {
                let fragments: FragmentStream = Box::pin(stream::iter(items));
                Ok(fragments)
            }
            Some(ScriptedStream::Refused(error)) => Err(error),
            None => Err(ProviderError::Request(
                "no scripted stream outcome left".to_string(),
            )),
        }))
    }

    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationReply, ProviderError>> {
        self.generate_requests
            .lock()
            .expect("recorded requests must not be poisoned")
            .push(request);
        let outcome = self
            .generate_outcomes
            .lock()
            .expect("scripted outcomes must not be poisoned")
            .pop_front();

        Box::pin(ready(outcome.unwrap_or_else(|| {
            Err(ProviderError::Request(
                "no scripted generation outcome left".to_string(),
            ))
        })))
    }
}
