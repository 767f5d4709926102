// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Heuristic filter for low-value assistant replies
//!
//! After a tool round the model often answers with filler such as "OK" or
//! "searching..." before producing anything useful. `is_noise` decides
//! whether such intermediate text is worth showing. It only gates display;
//! the history always keeps what the model said.
//!
//! Both functions are pure: the same input always gives the same answer.

use std::sync::OnceLock;

use regex::Regex;

use crate::tools::ToolExecutionResult;

/// Replies shorter than this (in characters) need a digit, link or code
/// fence to count as content
const MIN_MEANINGFUL_CHARS: usize = 10;

/// Share of a reply that may be copied verbatim from tool output
const MAX_QUOTED_RATIO: f64 = 0.9;

/// Replies longer than this may count as analysis on length alone
const ANALYSIS_MIN_CHARS: usize = 50;

const ANALYTICAL_KEYWORDS: &[&str] = &[
    "因为", "所以", "因此", "导致", "说明", "表明", "分析", "总结", "建议", "推荐", "应该", "可以",
    "意味着", "显示", "证明", "反映", "揭示", "首先", "其次", "另外", "此外", "同时", "优点",
    "缺点", "优势", "劣势", "问题", "解决", "不同", "相同", "比较", "对比", "区别", "because",
    "therefore", "however", "suggest", "recommend", "should", "means", "shows", "compared",
    "in summary", "first,", "second,", "in contrast", "difference",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(target: "graphmind.chat.filter", pattern = p, error = %e, "bad filter pattern");
                None
            }
        })
        .collect()
}

fn ack_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            r"(?i)^(好的|ok|okay|sure|got it|收到)[，,。！!.]*$",
            r"(?i)^(正在|开始|已经)(调用|执行|使用).*(工具|tool)[，,。！!]*$",
            r"(?i)^(工具|tool).*(调用|执行)(成功|完成)[，,。！!]*$",
            r"^(已|正在)(搜索|查询|检索)[，,。！!]*$",
            r"(?i)^(calling|running|using|executing)\b.*\btools?\b[.!…]*$",
            r"(?i)^(the )?tool (call )?(succeeded|completed|done)[.!]*$",
            r"(?i)^(searching|looking it up)[.!…]*$",
        ])
    })
}

fn noise_intro_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            r"^(我|已经|正在)(读取|获取|查看|分析|检索|搜索)(了|到)?[，,。！!]*$",
            r"^(让我|我来)(看看|查看|分析|检索|搜索)[，,。！!]*$",
            r"^(查询|搜索|分析)(中|完成)[，,。！!]*$",
            r"(?i)^(let me|i'll|i will) (check|look|search|analy[sz]e)( (that|this|it|into it))?[.!…]*$",
            r"(?i)^(search|analysis) (in progress|complete|done)[.!]*$",
        ])
    })
}

fn meaningful_short_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| compile(&[r"\d|https?://|```"])).first()
}

fn emoji_only_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            compile(&[
                r"^[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{2600}-\x{26FF}\x{2700}-\x{27BF}\s]+$",
            ])
        })
        .first()
}

fn structure_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| compile(&[r"[-*]\s|\d+\.\s|#\s"]))
        .first()
}

/// Whether `message` is filler not worth displaying, judged against the tool
/// results of the round that preceded it. First matching rule wins.
pub fn is_noise(message: &str, tool_results: &[ToolExecutionResult]) -> bool {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return true;
    }

    if ack_patterns().iter().any(|re| re.is_match(trimmed)) {
        return true;
    }

    let length = trimmed.chars().count();
    if length < MIN_MEANINGFUL_CHARS
        && !meaningful_short_pattern().is_some_and(|re| re.is_match(trimmed))
    {
        return true;
    }

    let lower = trimmed.to_lowercase();
    if tool_results
        .iter()
        .any(|r| !r.tool_name.is_empty() && (trimmed == r.tool_name || lower == r.tool_name.to_lowercase()))
    {
        return true;
    }

    if emoji_only_pattern().is_some_and(|re| re.is_match(trimmed)) {
        return true;
    }

    if noise_intro_patterns().iter().any(|re| re.is_match(trimmed)) {
        return true;
    }

    if !tool_results.is_empty() {
        let quoted: usize = tool_results
            .iter()
            .filter_map(result_text)
            .filter(|text| !text.is_empty() && trimmed.contains(text.as_str()))
            .map(|text| text.chars().count())
            .sum();
        if quoted as f64 / length as f64 > MAX_QUOTED_RATIO {
            return true;
        }
    }

    false
}

/// Text a reply could have copied from a tool result
fn result_text(result: &ToolExecutionResult) -> Option<String> {
    match (&result.display_text, &result.result) {
        (Some(display), _) if !display.is_empty() => Some(display.clone()),
        (_, Some(value)) => serde_json::to_string(value).ok(),
        _ => None,
    }
}

/// Softer positive signal: the reply reasons about something (connectives,
/// structure, code or quotes) or is long and not filler
pub fn has_substantive_analysis(message: &str) -> bool {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return false;
    }

    let lower = message.to_lowercase();
    if ANALYTICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    if structure_pattern().is_some_and(|re| re.is_match(message)) {
        return true;
    }
    if message.contains("```") || message.contains('>') {
        return true;
    }

    trimmed.chars().count() > ANALYSIS_MIN_CHARS && !is_noise(message, &[])
}

/// Whether intermediate text from a tool round should be shown. Analysis
/// outweighs the rules that compare against tool output, never the
/// filler rules.
pub fn should_display_intermediate(message: &str, tool_results: &[ToolExecutionResult]) -> bool {
    if !is_noise(message, tool_results) {
        return true;
    }
    has_substantive_analysis(message) && !is_noise(message, &[])
}
