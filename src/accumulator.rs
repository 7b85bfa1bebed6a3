//! Folding stream events into one complete answer.
//!
//! An [`Accumulator`] owns the [`AccumulatedResponse`] for a single request
//! and drives a [`RenderSink`] while events arrive. Nothing is shared: the
//! response is handed out only by [`Accumulator::finalize`].

use std::borrow::Cow;
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use crate::citations::strip_citations;
use crate::client::ClientError;
use crate::event::{parse_line, SourceRef, StreamEvent, TokenUsage};
use crate::options::ChatProfile;
use crate::render::{RenderSink, CURSOR};
use crate::sources::filter_sources;

/// Everything received for one request.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedResponse {
    /// Concatenated text deltas, in arrival order, citations included
    pub full_text: String,

    /// Every source received, unfiltered and possibly repeated
    pub sources_seen: Vec<SourceRef>,

    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,

    /// Time of the first usage report
    pub first_token_at: Option<Instant>,

    /// Time of the latest usage report
    pub last_token_at: Option<Instant>,
}

impl AccumulatedResponse {
    /// The answer as shown to the user, with citation tags removed.
    pub fn display_text(&self) -> Cow<'_, str> {
        strip_citations(&self.full_text)
    }

    fn record_usage(&mut self, usage: TokenUsage) {
        let now = Instant::now();
        self.input_tokens = self.input_tokens.saturating_add(usage.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(usage.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.first_token_at.get_or_insert(now);
        self.last_token_at = Some(now);
    }
}

/// Knobs applied while folding events.
#[derive(Debug, Clone, Default)]
pub struct AccumulatorOptions {
    /// Push sources to the sink at all
    pub include_sources: bool,

    /// Minimum score for sources pushed to the sink
    pub score_threshold: Option<f64>,

    /// Keep citation tags in the final displayed text
    pub include_citations: bool,
}

impl From<&ChatProfile> for AccumulatorOptions {
    fn from(profile: &ChatProfile) -> Self {
        Self {
            include_sources: profile.include_sources,
            score_threshold: profile.score_threshold,
            include_citations: profile.include_citations,
        }
    }
}

/// What happened to one raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Applied,
    Ignored,
    Malformed,
}

/// Per-stream line counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub applied: usize,
    pub ignored: usize,
    pub malformed: usize,
}

/// Builds an [`AccumulatedResponse`] and keeps a sink up to date.
pub struct Accumulator<S: RenderSink> {
    response: AccumulatedResponse,
    options: AccumulatorOptions,
    sink: S,
    stats: LineStats,
}

impl<S: RenderSink> Accumulator<S> {
    pub fn new(options: AccumulatorOptions, sink: S) -> Self {
        Self {
            response: AccumulatedResponse::default(),
            options,
            sink,
            stats: LineStats::default(),
        }
    }

    /// Current, still growing state.
    pub fn response(&self) -> &AccumulatedResponse {
        &self.response
    }

    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Fold one event into the response.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } => {
                self.response.full_text.push_str(&text);
                let preview = format!("{}{}", self.response.full_text, CURSOR);
                self.sink.update(&preview);
            }
            StreamEvent::SourceDelta { sources } => {
                if self.options.include_sources {
                    let shown = filter_sources(&sources, self.options.score_threshold);
                    if !shown.is_empty() {
                        self.sink.sources(&shown);
                    }
                }
                self.response.sources_seen.extend(sources);
            }
            StreamEvent::Usage(usage) => self.response.record_usage(usage),
            StreamEvent::Unknown { kind } => {
                trace!(?kind, "ignoring unhandled event");
            }
        }
    }

    /// Parse and apply one raw line. Never fails: bad lines are logged and
    /// counted.
    pub fn feed_line(&mut self, line: &[u8]) -> LineOutcome {
        let outcome = match parse_line(line) {
            Ok(Some(event)) => {
                self.apply(event);
                LineOutcome::Applied
            }
            Ok(None) => LineOutcome::Ignored,
            Err(e) => {
                warn!(error = %e, "skipping malformed stream line");
                LineOutcome::Malformed
            }
        };

        match outcome {
            LineOutcome::Applied => self.stats.applied += 1,
            LineOutcome::Ignored => self.stats.ignored += 1,
            LineOutcome::Malformed => self.stats.malformed += 1,
        }
        outcome
    }

    /// Finish the stream: flush the final text to the sink and hand out the
    /// response.
    ///
    /// Returns `ClientError::EmptyResult` when no text arrived.
    pub fn finalize(mut self) -> Result<AccumulatedResponse, ClientError> {
        if self.response.full_text.is_empty() {
            self.sink.finish("");
            return Err(ClientError::EmptyResult);
        }

        let display = if self.options.include_citations {
            Cow::Borrowed(self.response.full_text.as_str())
        } else {
            self.response.display_text()
        };
        self.sink.finish(&display);

        Ok(self.response)
    }
}

/// Drive an accumulator from a line stream until it ends.
///
/// A transport error drops the partial answer and is returned as is.
pub async fn consume<S, L>(
    mut accumulator: Accumulator<S>,
    lines: L,
) -> Result<AccumulatedResponse, ClientError>
where
    S: RenderSink,
    L: Stream<Item = Result<Bytes, ClientError>>,
{
    futures::pin_mut!(lines);

    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                accumulator.feed_line(&line);
            }
            Err(e) => {
                debug!(
                    partial_len = accumulator.response().full_text.len(),
                    "stream failed, discarding partial answer"
                );
                return Err(e);
            }
        }
    }

    let stats = accumulator.stats();
    debug!(
        applied = stats.applied,
        ignored = stats.ignored,
        malformed = stats.malformed,
        "stream ended"
    );
    accumulator.finalize()
}
