//! Rendering sinks receiving streamed answers.

use std::borrow::Cow;
use std::io::Write;

use crate::citations::{settled_prefix, strip_citations};
use crate::event::SourceRef;
use crate::sources::dedupe_by_artifact;

/// Marker appended to incremental updates while the answer is still streaming.
pub const CURSOR: &str = "▌";

/// Receiver of incremental and final answer text.
///
/// `update` gets the full text so far (with a trailing cursor), `sources`
/// gets the filtered source list for side display and `finish` gets the
/// final text exactly once.
pub trait RenderSink {
    fn update(&mut self, text: &str);

    fn sources(&mut self, sources: &[SourceRef]);

    fn finish(&mut self, text: &str);
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn update(&mut self, text: &str) {
        (**self).update(text)
    }

    fn sources(&mut self, sources: &[SourceRef]) {
        (**self).sources(sources)
    }

    fn finish(&mut self, text: &str) {
        (**self).finish(text)
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn update(&mut self, _text: &str) {}

    fn sources(&mut self, _sources: &[SourceRef]) {}

    fn finish(&mut self, _text: &str) {}
}

/// Sink for line-oriented terminals.
///
/// Only the suffix that arrived since the previous update is written, so the
/// cursor never reaches the output. Citation spans are removed while
/// streaming: text from an unclosed `<citation` onward is held back until the
/// span closes or `finish` delivers the final text. Sources are listed once
/// per artifact.
pub struct TerminalSink<W: Write> {
    out: W,
    written: usize,
    keep_citations: bool,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            keep_citations: false,
        }
    }

    /// Print citation tags as they arrive. Pair with
    /// `ChatProfile::include_citations`.
    pub fn keep_citations(mut self, keep: bool) -> Self {
        self.keep_citations = keep;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        // Terminal output is best effort.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    /// Write the part of `shown` past what is already on screen.
    fn extend_to(&mut self, shown: &str) {
        if let Some(fresh) = shown.get(self.written..) {
            if !fresh.is_empty() {
                self.write(fresh);
            }
            self.written = shown.len();
        }
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn update(&mut self, text: &str) {
        let text = text.strip_suffix(CURSOR).unwrap_or(text);
        let shown = if self.keep_citations {
            Cow::Borrowed(text)
        } else {
            strip_citations(settled_prefix(text))
        };
        self.extend_to(&shown);
    }

    fn sources(&mut self, sources: &[SourceRef]) {
        let mut listing = String::from("\n[sources]\n");
        for source in dedupe_by_artifact(sources) {
            match source.score {
                Some(score) => listing.push_str(&format!(
                    "  - {} ({:.2})\n",
                    source.document_artifact, score
                )),
                None => listing.push_str(&format!("  - {}\n", source.document_artifact)),
            }
        }
        self.write(&listing);
    }

    fn finish(&mut self, text: &str) {
        self.extend_to(text);
        self.written = 0;
        self.write("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(sink: TerminalSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_terminal_sink_writes_suffixes_only() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.update(&format!("Hel{}", CURSOR));
        sink.update(&format!("Hello{}", CURSOR));
        sink.finish("Hello");
        assert_eq!(output(sink), "Hello\n");
    }

    #[test]
    fn test_terminal_sink_lists_sources_once() {
        let mut sink = TerminalSink::new(Vec::new());
        let source = SourceRef {
            document_artifact: "guide.pdf".to_string(),
            excerpt: "x".to_string(),
            score: Some(0.9),
        };
        sink.sources(&[source.clone(), source]);
        let out = output(sink);
        assert_eq!(out.matches("guide.pdf").count(), 1);
        assert!(out.contains("(0.90)"));
    }

    #[test]
    fn test_sink_through_mutable_reference() {
        let mut sink = TerminalSink::new(Vec::new());
        {
            let mut by_ref = &mut sink;
            RenderSink::update(&mut by_ref, "abc");
        }
        assert_eq!(output(sink), "abc");
    }

    #[test]
    fn test_terminal_sink_hides_citations_while_streaming() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.update(&format!("A <cit{}", CURSOR));
        sink.update(&format!("A <citation>X</cita{}", CURSOR));
        sink.update(&format!("A <citation>X</citation> B{}", CURSOR));
        sink.finish("A  B");
        assert_eq!(output(sink), "A  B\n");
    }

    #[test]
    fn test_terminal_sink_flushes_held_back_text_on_finish() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.update(&format!("see <citation>unclosed{}", CURSOR));
        sink.finish("see <citation>unclosed");
        assert_eq!(output(sink), "see <citation>unclosed\n");
    }

    #[test]
    fn test_terminal_sink_can_keep_citations() {
        let mut sink = TerminalSink::new(Vec::new()).keep_citations(true);
        sink.update(&format!("A <citation>X{}", CURSOR));
        sink.finish("A <citation>X</citation>");
        assert_eq!(output(sink), "A <citation>X</citation>\n");
    }

    #[test]
    fn test_accumulated_answer_prints_without_citations() {
        use crate::accumulator::{Accumulator, AccumulatorOptions};
        use crate::event::StreamEvent;

        let mut sink = TerminalSink::new(Vec::new());
        let mut acc = Accumulator::new(AccumulatorOptions::default(), &mut sink);
        for part in ["A <cit", "ation>X</citation>", " B"] {
            acc.apply(StreamEvent::TextDelta {
                text: part.to_string(),
            });
        }
        let response = acc.finalize().unwrap();

        assert_eq!(response.full_text, "A <citation>X</citation> B");
        assert_eq!(output(sink), "A  B\n");
    }
}
