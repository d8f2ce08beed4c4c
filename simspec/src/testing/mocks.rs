//! Scripted stand-in for the vision-language runtime.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{InferenceError, ModelLoadError};
use crate::gateway::{LoadedModel, ModelChunk, ModelRuntime, ModelSession};
use crate::preprocess::PreparedFrame;

/// Canned answers keyed by prompt keywords, checked in order.
///
/// Used whenever the reply queue is empty.
const KEYWORD_REPLIES: &[(&[&str], &str)] = &[
    (
        &["connection", "bolts"],
        "The connection points consist of high-strength bolts with hex nuts, likely Grade 8 or \
         similar. The bolts appear to be in tension loading configuration with visible thread engagement.",
    ),
    (
        &["surface", "condition"],
        "Surface shows signs of light corrosion and weathering typical of outdoor industrial \
         environments. Some bolt heads show minor rust staining but no significant structural \
         deterioration is visible.",
    ),
    (
        &["overall", "system"],
        "This image shows a large industrial pipe flange assembly with multiple bolt connections. \
         The system appears to be part of a pressure vessel or piping network with metallic components.",
    ),
    (
        &["component", "mechanical"],
        "The main component is a flanged pipe connection with approximately 8-12 bolts arranged in \
         a circular pattern. The flange appears to be a raised-face type with gasket sealing surface.",
    ),
    (
        &["summary", "function"],
        "This flanged connection appears to be functioning within normal parameters. The slight \
         surface corrosion suggests routine maintenance inspection is recommended.",
    ),
];

const UNKNOWN_REPLY: &str = "Unable to analyze this aspect of the component.";

/// One scripted model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Stream these chunks, then signal completion.
    Chunks(Vec<String>),
    /// Stream the same chunk forever without completing.
    Endless(String),
    /// Yield an inference error.
    Fail(String),
    /// Never yield anything.
    Stall,
    /// Wait, then behave like the inner reply.
    Delayed(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    /// Streams `text` word by word, then completes.
    #[must_use]
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::Chunks(
            text.as_ref()
                .split_inclusive(' ')
                .map(str::to_string)
                .collect(),
        )
    }

    /// Streams the given chunks, then completes.
    #[must_use]
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    /// Repeats `chunk` forever.
    #[must_use]
    pub fn endless(chunk: impl Into<String>) -> Self {
        Self::Endless(chunk.into())
    }

    /// Fails with `message`.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    /// Waits `delay` before replying.
    #[must_use]
    pub fn delayed(delay: Duration, reply: Self) -> Self {
        Self::Delayed(delay, Box::new(reply))
    }

    fn into_stream(self) -> BoxStream<'static, Result<ModelChunk, InferenceError>> {
        match self {
            Self::Chunks(chunks) => stream::iter(
                chunks
                    .into_iter()
                    .map(|c| Ok(ModelChunk::Text(c)))
                    .chain(std::iter::once(Ok(ModelChunk::Complete))),
            )
            .boxed(),
            Self::Endless(chunk) => stream::repeat(chunk).map(|c| Ok(ModelChunk::Text(c))).boxed(),
            Self::Fail(message) => stream::once(async move { Err::<ModelChunk, _>(InferenceError::new(message)) }).boxed(),
            Self::Stall => stream::pending().boxed(),
            Self::Delayed(delay, inner) => stream::once(tokio::time::sleep(delay))
                .flat_map(move |()| inner.as_ref().clone().into_stream())
                .boxed(),
        }
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    load_delay: Mutex<Duration>,
    asset_missing: AtomicBool,
    load_count: AtomicUsize,
    call_count: AtomicUsize,
    sessions_opened: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockState {
    fn next_reply(&self, prompt: &str) -> ScriptedReply {
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        let lower = prompt.to_lowercase();
        let text = KEYWORD_REPLIES
            .iter()
            .find(|(keys, _)| keys.iter().any(|k| lower.contains(k)))
            .map_or(UNKNOWN_REPLY, |(_, reply)| *reply);
        ScriptedReply::text(text)
    }
}

/// A [`ModelRuntime`] that answers from a script.
///
/// Replies queued with [`Self::with_reply`] are used first, in order; after
/// that the runtime answers by matching prompt keywords. Clones share state,
/// so a test can hand one clone to the gateway and inspect another.
#[derive(Clone, Default)]
pub struct MockVisionRuntime {
    state: Arc<MockState>,
}

impl MockVisionRuntime {
    /// Creates a runtime with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply.
    #[must_use]
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// Queues several replies.
    #[must_use]
    pub fn with_replies(self, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        self.state.replies.lock().extend(replies);
        self
    }

    /// Makes loading take `delay`.
    #[must_use]
    pub fn with_load_delay(self, delay: Duration) -> Self {
        *self.state.load_delay.lock() = delay;
        self
    }

    /// Makes loading fail as if the asset were absent.
    #[must_use]
    pub fn with_missing_asset(self) -> Self {
        self.state.asset_missing.store(true, Ordering::SeqCst);
        self
    }

    /// Queues a reply on a runtime that is already shared.
    pub fn push_reply(&self, reply: ScriptedReply) {
        self.state.replies.lock().push_back(reply);
    }

    /// Number of times `load` was called.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.state.load_count.load(Ordering::SeqCst)
    }

    /// Number of model calls started.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.call_count.load(Ordering::SeqCst)
    }

    /// Number of sessions opened.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Highest number of model calls that were streaming at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    #[must_use]
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.state.prompts.lock().clone()
    }
}

#[async_trait]
impl ModelRuntime for MockVisionRuntime {
    async fn load(&self, asset_path: &Path) -> Result<Arc<dyn LoadedModel>, ModelLoadError> {
        self.state.load_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.load_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.asset_missing.load(Ordering::SeqCst) {
            return Err(ModelLoadError::missing(asset_path));
        }
        Ok(Arc::new(MockLoadedModel {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockLoadedModel {
    state: Arc<MockState>,
}

impl LoadedModel for MockLoadedModel {
    fn name(&self) -> &str {
        "mock-vision"
    }

    fn open_session(&self) -> Box<dyn ModelSession> {
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Box::new(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

struct MockSession {
    state: Arc<MockState>,
}

impl ModelSession for MockSession {
    fn generate<'a>(
        &'a mut self,
        _frame: &'a PreparedFrame,
        prompt: &'a str,
    ) -> BoxStream<'a, Result<ModelChunk, InferenceError>> {
        self.state.call_count.fetch_add(1, Ordering::SeqCst);
        self.state.prompts.lock().push(prompt.to_string());
        let reply = self.state.next_reply(prompt);

        let guard = InFlight::enter(Arc::clone(&self.state));
        reply
            .into_stream()
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed()
    }
}

/// Counts a streaming call until its stream is dropped.
struct InFlight {
    state: Arc<MockState>,
}

impl InFlight {
    fn enter(state: Arc<MockState>) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(reply: ScriptedReply) -> Vec<Result<ModelChunk, InferenceError>> {
        reply.into_stream().collect().await
    }

    #[test]
    fn test_text_splits_on_spaces() {
        assert_eq!(
            ScriptedReply::text("a welded bracket"),
            ScriptedReply::chunks(["a ", "welded ", "bracket"])
        );
    }

    #[tokio::test]
    async fn test_chunks_end_with_complete() {
        let items = drain(ScriptedReply::chunks(["x", "y"])).await;
        assert_eq!(
            items,
            vec![
                Ok(ModelChunk::text("x")),
                Ok(ModelChunk::text("y")),
                Ok(ModelChunk::Complete)
            ]
        );
    }

    #[tokio::test]
    async fn test_fail_yields_error() {
        let items = drain(ScriptedReply::fail("boom")).await;
        assert_eq!(items, vec![Err(InferenceError::new("boom"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply_waits() {
        let started = tokio::time::Instant::now();
        let items = drain(ScriptedReply::delayed(Duration::from_secs(2), ScriptedReply::text("late"))).await;
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_keyword_fallback_order() {
        let state = MockState::default();
        let reply = state.next_reply("Focus on the connection points of this mechanical component");
        match reply {
            ScriptedReply::Chunks(chunks) => assert!(chunks.concat().starts_with("The connection points")),
            other => panic!("unexpected reply {other:?}"),
        }

        let reply = state.next_reply("Sing a song");
        assert_eq!(reply, ScriptedReply::text(UNKNOWN_REPLY));
    }

    #[tokio::test]
    async fn test_missing_asset_fails_load() {
        let runtime = MockVisionRuntime::new().with_missing_asset();
        let result = runtime.load(Path::new("models/absent.bundle")).await;
        assert!(matches!(result, Err(ModelLoadError::Missing { .. })));
        assert_eq!(runtime.load_count(), 1);
    }
}
