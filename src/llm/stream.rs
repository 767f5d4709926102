// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Incremental stream parsing
//!
//! Raw transport fragments are split into lines by [`LineBuffer`], `data:`
//! lines are decoded into [`FrameEvent`]s by a protocol-specific
//! [`FrameDecoder`], and [`StreamParser`] assembles those events into text
//! and tool calls. The assembly rules are the same for every protocol.

use futures::{Stream, StreamExt};

use crate::error::{ApiError, GraphmindError, Result};
use crate::llm::cancel::CancellationSlot;
use crate::llm::message::ToolCall;
use crate::llm::provider::{ChatResponse, StopReason, StreamChunk};

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Splits arbitrary byte fragments into complete lines, holding back the
/// trailing incomplete line until more input arrives.
///
/// Works on bytes so a multi-byte character split across two fragments
/// is decoded only once it is whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    carry: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every line it completed
    pub fn push(&mut self, fragment: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(fragment);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.carry[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.carry[start..end]));
            start = end + 1;
        }
        self.carry.drain(..start);
        lines
    }

    /// Take whatever incomplete line remains
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let line = decode_line(&self.carry);
        self.carry.clear();
        Some(line)
    }

    /// Bytes currently held back
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Normalized protocol event
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A tool-use block opened. `slot` is the protocol's index for the
    /// call when it has one.
    ToolCallStart {
        slot: Option<usize>,
        id: String,
        name: String,
    },
    TextDelta(String),
    /// Argument fragment. Without a slot it belongs to the most recently
    /// opened call.
    ArgumentsDelta {
        slot: Option<usize>,
        fragment: String,
    },
    Stop(StopReason),
    /// Explicit end-of-stream
    End,
    /// The provider reported an error inside the stream
    Error(String),
}

/// Turns one decoded `data:` payload into events
pub trait FrameDecoder: Send {
    fn decode(&mut self, payload: &serde_json::Value) -> Vec<FrameEvent>;
}

#[derive(Debug)]
struct PendingCall {
    slot: Option<usize>,
    call: ToolCall,
}

/// State machine assembling a streamed response
pub struct StreamParser<D> {
    lines: LineBuffer,
    decoder: D,
    text: String,
    calls: Vec<PendingCall>,
    stop_reason: Option<StopReason>,
    stopped: bool,
    finished: bool,
    stream_error: Option<String>,
    skipped_frames: usize,
}

impl<D: FrameDecoder> StreamParser<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            lines: LineBuffer::new(),
            decoder,
            text: String::new(),
            calls: Vec::new(),
            stop_reason: None,
            stopped: false,
            finished: false,
            stream_error: None,
            skipped_frames: 0,
        }
    }

    /// Process one raw transport fragment
    pub fn feed(&mut self, fragment: &[u8], on_chunk: &mut (dyn FnMut(StreamChunk) + Send)) {
        for line in self.lines.push(fragment) {
            if self.finished {
                break;
            }
            self.feed_line(&line, on_chunk);
        }
    }

    /// Process one complete line
    pub fn feed_line(&mut self, line: &str, on_chunk: &mut (dyn FnMut(StreamChunk) + Send)) {
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            // event:, id:, comments and blank separators carry nothing we need
            return;
        };
        let data = data.trim();
        if data.is_empty() {
            return;
        }
        if data == DONE_SENTINEL {
            self.finished = true;
            return;
        }

        let payload: serde_json::Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                self.skipped_frames += 1;
                let err = GraphmindError::Protocol(format!("unparseable frame: {}", e));
                tracing::warn!(
                    target: "graphmind.llm.stream",
                    error = %err,
                    frame = %truncate(data, 200),
                    "skipping malformed stream frame"
                );
                return;
            }
        };

        for event in self.decoder.decode(&payload) {
            self.apply(event, on_chunk);
            if self.finished {
                break;
            }
        }
    }

    fn apply(&mut self, event: FrameEvent, on_chunk: &mut (dyn FnMut(StreamChunk) + Send)) {
        match event {
            FrameEvent::ToolCallStart { slot, id, name } if !self.stopped => {
                // A repeated start is a continuation unless it names a different call
                let open = match slot {
                    Some(_) => self.calls.iter().rev().find(|c| c.slot == slot),
                    None => self.calls.last().filter(|c| !id.is_empty() && c.call.id == id),
                };
                if open.is_some_and(|c| id.is_empty() || c.call.id == id) {
                    return;
                }
                let id = if id.is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    id
                };
                self.calls.push(PendingCall {
                    slot,
                    call: ToolCall::new(id, name, String::new()),
                });
            }
            FrameEvent::TextDelta(text) if !self.stopped => {
                if text.is_empty() {
                    return;
                }
                self.text.push_str(&text);
                on_chunk(StreamChunk::Text(text));
            }
            FrameEvent::ArgumentsDelta { slot, fragment } if !self.stopped => {
                let target = match slot {
                    Some(_) => self.calls.iter_mut().rev().find(|c| c.slot == slot),
                    None => self.calls.last_mut(),
                };
                match target {
                    Some(pending) => pending.call.function.arguments.push_str(&fragment),
                    None => tracing::warn!(
                        target: "graphmind.llm.stream",
                        ?slot,
                        "argument fragment without an open tool call"
                    ),
                }
            }
            FrameEvent::Stop(reason) => {
                self.stop_reason = Some(reason);
                self.stopped = true;
            }
            FrameEvent::End => self.finished = true,
            FrameEvent::Error(message) => {
                on_chunk(StreamChunk::Error(message.clone()));
                self.stream_error = Some(message);
                self.finished = true;
            }
            _ => {}
        }
    }

    /// Whether an end sentinel or error has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of frames dropped as malformed
    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    /// Collapse everything seen into a response.
    ///
    /// Tool calls whose arguments are not valid JSON are dropped with a
    /// warning. When `cancelled` is set the held-back partial line is
    /// discarded rather than parsed.
    pub fn finish(
        mut self,
        cancelled: bool,
        on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<ChatResponse> {
        if !cancelled && !self.finished {
            if let Some(line) = self.lines.finish() {
                self.feed_line(&line, on_chunk);
            }
        }

        if let Some(message) = self.stream_error.take() {
            return Err(GraphmindError::Api(ApiError::StreamError(message)));
        }

        let mut tool_calls = Vec::with_capacity(self.calls.len());
        for PendingCall { mut call, .. } in self.calls {
            if call.function.arguments.trim().is_empty() {
                call.function.arguments = "{}".to_string();
            }
            match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
                Ok(_) if !call.function.name.is_empty() => {
                    on_chunk(StreamChunk::ToolUse(call.clone()));
                    tool_calls.push(call);
                }
                Ok(_) => {
                    tracing::warn!(
                        target: "graphmind.llm.stream",
                        id = %call.id,
                        "dropping tool call without a name"
                    );
                }
                Err(e) => {
                    let err = GraphmindError::Protocol(format!(
                        "tool call {} had invalid arguments: {}",
                        call.function.name, e
                    ));
                    tracing::warn!(
                        target: "graphmind.llm.stream",
                        id = %call.id,
                        error = %err,
                        "dropping tool call with invalid JSON arguments"
                    );
                    on_chunk(StreamChunk::Error(err.to_string()));
                }
            }
        }

        Ok(ChatResponse {
            message: self.text,
            tool_calls,
            stop_reason: self.stop_reason,
            cancelled,
        })
    }
}

/// Pump a byte stream through `parser`, polling `cancel` after each
/// fragment.
pub async fn drive<S, B, E, D>(
    mut bytes: S,
    mut parser: StreamParser<D>,
    cancel: &CancellationSlot,
    on_chunk: &mut (dyn FnMut(StreamChunk) + Send),
) -> Result<ChatResponse>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    D: FrameDecoder,
{
    let mut cancelled = cancel.is_cancelled();
    while !cancelled {
        let Some(item) = bytes.next().await else {
            break;
        };
        let fragment = item.map_err(|e| GraphmindError::Api(ApiError::Network(e.to_string())))?;
        parser.feed(fragment.as_ref(), on_chunk);

        if cancel.is_cancelled() {
            cancelled = true;
        } else if parser.is_finished() {
            break;
        }
    }

    if cancelled {
        tracing::info!(
            target: "graphmind.llm.stream",
            partial_len = parser.text().len(),
            "stream cancelled"
        );
    }
    parser.finish(cancelled, on_chunk)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::cancel::CancellationHandle;
    use serde_json::Value;

    /// Minimal decoder over a synthetic protocol used to exercise assembly.
    struct TestDecoder;

    impl FrameDecoder for TestDecoder {
        fn decode(&mut self, payload: &Value) -> Vec<FrameEvent> {
            match payload["t"].as_str() {
                Some("text") => vec![FrameEvent::TextDelta(
                    payload["v"].as_str().unwrap_or_default().to_string(),
                )],
                Some("start") => vec![FrameEvent::ToolCallStart {
                    slot: payload["slot"].as_u64().map(|s| s as usize),
                    id: payload["id"].as_str().unwrap_or_default().to_string(),
                    name: payload["name"].as_str().unwrap_or_default().to_string(),
                }],
                Some("args") => vec![FrameEvent::ArgumentsDelta {
                    slot: payload["slot"].as_u64().map(|s| s as usize),
                    fragment: payload["v"].as_str().unwrap_or_default().to_string(),
                }],
                Some("stop") => vec![FrameEvent::Stop(StopReason::EndTurn)],
                Some("end") => vec![FrameEvent::End],
                Some("error") => vec![FrameEvent::Error("overloaded".to_string())],
                _ => vec![],
            }
        }
    }

    fn collect() -> (Vec<StreamChunk>, impl FnMut(StreamChunk) + Send) {
        (Vec::new(), |_c: StreamChunk| {})
    }

    fn run(input: &[&str]) -> (Result<ChatResponse>, Vec<StreamChunk>) {
        let mut chunks = Vec::new();
        let mut on_chunk = |c: StreamChunk| chunks.push(c);
        let mut parser = StreamParser::new(TestDecoder);
        for fragment in input {
            parser.feed(fragment.as_bytes(), &mut on_chunk);
        }
        let result = parser.finish(false, &mut on_chunk);
        (result, chunks)
    }

    // ===== LineBuffer Tests =====

    #[test]
    fn test_line_buffer_holds_partial_line() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(buf.pending(), 11);
        let lines = buf.push(b":1}\nnext");
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string()]);
        assert_eq!(buf.finish(), Some("next".to_string()));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_buffer_multiple_lines_and_crlf() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"a\r\nb\n\nc\n");
        assert_eq!(lines, vec!["a", "b", "", "c"]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_line_buffer_split_multibyte_char() {
        let bytes = "data: 你好\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..8]).is_empty());
        let lines = buf.push(&bytes[8..]);
        assert_eq!(lines, vec!["data: 你好".to_string()]);
    }

    // ===== Parser Tests =====

    #[test]
    fn test_text_concatenation() {
        let (result, chunks) = run(&[
            "data: {\"t\":\"text\",\"v\":\"Hel\"}\n",
            "data: {\"t\":\"text\",\"v\":\"lo\"}\n",
        ]);
        let response = result.unwrap();
        assert_eq!(response.message, "Hello");
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hel".to_string()),
                StreamChunk::Text("lo".to_string())
            ]
        );
    }

    #[test]
    fn test_line_split_across_fragments() {
        let (result, _) = run(&["data: {\"t\":\"te", "xt\",\"v\":\"whole\"}\n"]);
        assert_eq!(result.unwrap().message, "whole");
    }

    #[test]
    fn test_malformed_frame_skipped() {
        let mut on_chunk = |_c: StreamChunk| {};
        let mut parser = StreamParser::new(TestDecoder);
        parser.feed(b"data: {not json\n", &mut on_chunk);
        parser.feed(b"data: {\"t\":\"text\",\"v\":\"ok\"}\n", &mut on_chunk);
        assert_eq!(parser.skipped_frames(), 1);
        assert_eq!(parser.finish(false, &mut on_chunk).unwrap().message, "ok");
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let (result, _) = run(&[
            "event: message\n",
            ": keep-alive\n",
            "\n",
            "data: {\"t\":\"text\",\"v\":\"x\"}\n",
        ]);
        assert_eq!(result.unwrap().message, "x");
    }

    #[test]
    fn test_tool_call_assembled_from_fragments() {
        let (result, chunks) = run(&[
            "data: {\"t\":\"start\",\"id\":\"c1\",\"name\":\"whoogle_search\"}\n",
            "data: {\"t\":\"args\",\"v\":\"{\\\"query\\\":\"}\n",
            "data: {\"t\":\"args\",\"v\":\"\\\"rust\\\"}\"}\n",
        ]);
        let response = result.unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "c1");
        assert_eq!(
            response.tool_calls[0].parsed_arguments().unwrap(),
            serde_json::json!({"query": "rust"})
        );
        assert!(matches!(chunks.last(), Some(StreamChunk::ToolUse(_))));
    }

    #[test]
    fn test_invalid_tool_arguments_dropped() {
        let (result, chunks) = run(&[
            "data: {\"t\":\"start\",\"id\":\"bad\",\"name\":\"read_doc\"}\n",
            "data: {\"t\":\"args\",\"v\":\"{\\\"a\\\":\"}\n",
            "data: {\"t\":\"start\",\"id\":\"good\",\"name\":\"read_doc\"}\n",
            "data: {\"t\":\"args\",\"v\":\"{}\"}\n",
            "data: {\"t\":\"text\",\"v\":\"still here\"}\n",
        ]);
        let response = result.unwrap();
        assert_eq!(response.message, "still here");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "good");
        assert!(chunks.iter().any(|c| matches!(
            c,
            StreamChunk::Error(m) if m.starts_with("Protocol error: tool call read_doc had invalid arguments")
        )));
    }

    #[test]
    fn test_empty_arguments_become_object() {
        let (result, _) = run(&["data: {\"t\":\"start\",\"id\":\"c\",\"name\":\"read_doc\"}\n"]);
        assert_eq!(result.unwrap().tool_calls[0].function.arguments, "{}");
    }

    #[test]
    fn test_slotted_arguments_routed_by_index() {
        let (result, _) = run(&[
            "data: {\"t\":\"start\",\"slot\":0,\"id\":\"a\",\"name\":\"t1\"}\n",
            "data: {\"t\":\"start\",\"slot\":1,\"id\":\"b\",\"name\":\"t2\"}\n",
            "data: {\"t\":\"args\",\"slot\":0,\"v\":\"{\\\"x\\\":1}\"}\n",
            "data: {\"t\":\"args\",\"slot\":1,\"v\":\"{\\\"y\\\":2}\"}\n",
        ]);
        let calls = result.unwrap().tool_calls;
        assert_eq!(calls[0].function.arguments, r#"{"x":1}"#);
        assert_eq!(calls[1].function.arguments, r#"{"y":2}"#);
    }

    #[test]
    fn test_new_id_in_reused_slot_opens_new_call() {
        let (result, _) = run(&[
            "data: {\"t\":\"start\",\"slot\":0,\"id\":\"a\",\"name\":\"t1\"}\n",
            "data: {\"t\":\"args\",\"slot\":0,\"v\":\"{\\\"x\\\":1}\"}\n",
            "data: {\"t\":\"start\",\"slot\":0,\"id\":\"b\",\"name\":\"t2\"}\n",
            "data: {\"t\":\"start\",\"slot\":0,\"id\":\"b\",\"name\":\"t2\"}\n",
            "data: {\"t\":\"args\",\"slot\":0,\"v\":\"{\\\"y\\\":2}\"}\n",
        ]);
        let calls = result.unwrap().tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[0].function.arguments, r#"{"x":1}"#);
        assert_eq!(calls[1].id, "b");
        assert_eq!(calls[1].function.arguments, r#"{"y":2}"#);
    }

    #[test]
    fn test_unslotted_arguments_follow_latest_call() {
        let (result, _) = run(&[
            "data: {\"t\":\"start\",\"id\":\"a\",\"name\":\"t1\"}\n",
            "data: {\"t\":\"args\",\"v\":\"{\\\"x\\\":1}\"}\n",
            "data: {\"t\":\"start\",\"id\":\"b\",\"name\":\"t2\"}\n",
            "data: {\"t\":\"args\",\"v\":\"{\\\"y\\\":2}\"}\n",
        ]);
        let calls = result.unwrap().tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.arguments, r#"{"x":1}"#);
        assert_eq!(calls[1].function.arguments, r#"{"y":2}"#);
    }

    #[test]
    fn test_stop_suppresses_further_chunks() {
        let (result, chunks) = run(&[
            "data: {\"t\":\"text\",\"v\":\"a\"}\n",
            "data: {\"t\":\"stop\"}\n",
            "data: {\"t\":\"text\",\"v\":\"b\"}\n",
        ]);
        let response = result.unwrap();
        assert_eq!(response.message, "a");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_done_sentinel_finishes() {
        let mut on_chunk = |_c: StreamChunk| {};
        let mut parser = StreamParser::new(TestDecoder);
        parser.feed(
            b"data: {\"t\":\"text\",\"v\":\"a\"}\ndata: [DONE]\ndata: {\"t\":\"text\",\"v\":\"b\"}\n",
            &mut on_chunk,
        );
        assert!(parser.is_finished());
        assert_eq!(parser.finish(false, &mut on_chunk).unwrap().message, "a");
    }

    #[test]
    fn test_trailing_line_without_newline_is_parsed() {
        let (result, _) = run(&["data: {\"t\":\"text\",\"v\":\"tail\"}"]);
        assert_eq!(result.unwrap().message, "tail");
    }

    #[test]
    fn test_error_event_fails_response() {
        let (result, _) = run(&[
            "data: {\"t\":\"text\",\"v\":\"partial\"}\n",
            "data: {\"t\":\"error\"}\n",
        ]);
        assert!(matches!(
            result,
            Err(GraphmindError::Api(ApiError::StreamError(_)))
        ));
    }

    // ===== drive Tests =====

    #[tokio::test]
    async fn test_drive_collects_until_close() {
        let fragments: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"t\":\"text\",\"v\":\"one \"}\nda".to_vec()),
            Ok(b"ta: {\"t\":\"text\",\"v\":\"two\"}\n".to_vec()),
        ];
        let slot = CancellationSlot::default();
        let (_, mut on_chunk) = collect();
        let response = drive(
            futures::stream::iter(fragments),
            StreamParser::new(TestDecoder),
            &slot,
            &mut on_chunk,
        )
        .await
        .unwrap();
        assert_eq!(response.message, "one two");
        assert!(!response.cancelled);
    }

    #[tokio::test]
    async fn test_drive_stops_on_cancel() {
        let handle = CancellationHandle::new();
        let slot = CancellationSlot::default();
        slot.set(Some(handle.clone()));

        let fragments: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"t\":\"text\",\"v\":\"kept\"}\n".to_vec()),
            Ok(b"data: {\"t\":\"text\",\"v\":\"never\"}\n".to_vec()),
        ];
        let mut seen = Vec::new();
        let mut on_chunk = |c: StreamChunk| {
            if let StreamChunk::Text(t) = &c {
                seen.push(t.clone());
                handle.cancel();
            }
        };
        let response = drive(
            futures::stream::iter(fragments),
            StreamParser::new(TestDecoder),
            &slot,
            &mut on_chunk,
        )
        .await
        .unwrap();
        assert!(response.cancelled);
        assert_eq!(response.message, "kept");
        assert_eq!(seen, vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn test_drive_transport_error() {
        let fragments: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![Err(
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
        )];
        let slot = CancellationSlot::default();
        let (_, mut on_chunk) = collect();
        let result = drive(
            futures::stream::iter(fragments),
            StreamParser::new(TestDecoder),
            &slot,
            &mut on_chunk,
        )
        .await;
        assert!(matches!(
            result,
            Err(GraphmindError::Api(ApiError::Network(ref m))) if m.contains("reset")
        ));
    }

    // ===== Property Tests =====

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn frames_for(parts: &[String]) -> String {
            parts
                .iter()
                .map(|p| format!("data: {}\n", serde_json::json!({"t": "text", "v": p})))
                .collect()
        }

        proptest! {
            #[test]
            fn text_equals_concatenation(parts in proptest::collection::vec(".{0,12}", 0..12)) {
                let wire = frames_for(&parts);
                let (result, _) = run(&[wire.as_str()]);
                prop_assert_eq!(result.unwrap().message, parts.concat());
            }

            #[test]
            fn arbitrary_fragmentation_is_transparent(
                parts in proptest::collection::vec("[a-z ]{0,8}", 1..8),
                cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
            ) {
                let wire = frames_for(&parts);
                let bytes = wire.as_bytes();
                let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
                offsets.sort_unstable();
                offsets.dedup();

                let mut on_chunk = |_c: StreamChunk| {};
                let mut parser = StreamParser::new(TestDecoder);
                let mut prev = 0;
                for off in offsets {
                    parser.feed(&bytes[prev..off], &mut on_chunk);
                    prev = off;
                }
                parser.feed(&bytes[prev..], &mut on_chunk);
                prop_assert_eq!(parser.finish(false, &mut on_chunk).unwrap().message, parts.concat());
            }

            #[test]
            fn split_arguments_reassemble(query in "[a-zA-Z0-9 ]{0,20}", cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..5)) {
                let args = serde_json::json!({"query": query, "pageno": 1}).to_string();
                let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(args.len() + 1)).collect();
                offsets.sort_unstable();
                offsets.dedup();

                let mut wire = String::from("data: {\"t\":\"start\",\"id\":\"c\",\"name\":\"whoogle_search\"}\n");
                let mut prev = 0;
                for off in offsets.into_iter().chain(std::iter::once(args.len())) {
                    let piece = &args[prev..off];
                    wire.push_str(&format!("data: {}\n", serde_json::json!({"t": "args", "v": piece})));
                    prev = off;
                }

                let (result, _) = run(&[wire.as_str()]);
                let calls = result.unwrap().tool_calls;
                prop_assert_eq!(calls.len(), 1);
                prop_assert_eq!(calls[0].parsed_arguments().unwrap(), serde_json::json!({"query": query, "pageno": 1}));
            }
        }
    }
}
