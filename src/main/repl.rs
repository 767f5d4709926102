// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use graphmind::chat::display::{
    format_interrupt_message, format_search_toggle, format_status, format_tool_invocation,
    format_tool_result, format_welcome,
};
use graphmind::chat::input_parser::{help_text, parse_input, ReplInput};
use graphmind::chat::{ChatController, ChatObserver};
use graphmind::cli::ChatArgs;
use graphmind::config::Settings;
use graphmind::llm::ToolCall;
use graphmind::tools::{ContextDocument, ToolExecutionResult};

/// Observer that renders a turn on the terminal
struct TerminalObserver;

fn flush() {
    let _ = io::stdout().flush();
}

impl ChatObserver for TerminalObserver {
    fn on_text_delta(&mut self, text: &str) {
        print!("{}", text);
        flush();
    }

    fn on_tool_invocation(&mut self, call: &ToolCall) {
        println!("\n  > {}", format_tool_invocation(call));
    }

    fn on_tool_result(&mut self, _call: &ToolCall, result: &ToolExecutionResult) {
        let display = format_tool_result(result);
        let mark = if display.is_error { "x" } else { "ok" };
        println!("    [{}] {}", mark, display.summary);
    }

    fn on_intermediate_text(&mut self, text: &str) {
        println!("{}", text);
    }

    fn on_final_answer(&mut self, answer: &str, streamed: bool) {
        if !streamed {
            print!("{}", answer);
        }
        println!();
    }

    fn on_stopped(&mut self) {
        println!("\n{}", format_interrupt_message());
    }

    fn on_error(&mut self, notice: &str) {
        eprintln!("\n{}", notice);
    }

    fn on_title_changed(&mut self, title: &str) {
        println!("    [title: {}]", title);
    }
}

async fn load_document(path: &Path) -> anyhow::Result<ContextDocument> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ContextDocument::new(name, content))
}

async fn send(controller: &mut ChatController, text: &str) {
    print!("\ngraphmind: ");
    flush();
    let outcome = controller.send(text, &mut TerminalObserver).await;
    tracing::debug!(?outcome, "turn finished");
    println!();
}

/// Run the interactive chat loop
pub(super) async fn run_chat(args: ChatArgs, settings: Settings) -> anyhow::Result<()> {
    let mut controller = ChatController::from_settings(&settings)?;
    if let Some(rounds) = args.max_tool_rounds {
        controller = controller.with_max_tool_rounds(rounds);
    }
    if args.web_search && !controller.state().is_web_search_enabled() {
        controller.toggle_web_search();
    }
    if let Some(path) = &args.doc {
        controller.set_context_document(load_document(path).await?);
    }

    print!(
        "{}",
        format_welcome(
            controller.provider().name(),
            controller.provider().model(),
            controller.state().is_web_search_enabled(),
        )
    );

    // Ctrl-C stops the running turn; at the prompt it exits
    let stop = controller.stop_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !stop.stop() {
                std::process::exit(130);
            }
        }
    });

    if let Some(prompt) = args.prompt.as_deref() {
        send(&mut controller, prompt).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you: ");
        flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            ReplInput::Empty => continue,
            ReplInput::Quit => break,
            ReplInput::Help => println!("{}", help_text()),
            ReplInput::New => {
                controller.new_chat();
                println!("Started a new conversation.");
            }
            ReplInput::ToggleSearch => {
                let enabled = controller.toggle_web_search();
                println!("{}", format_search_toggle(enabled));
                if enabled && !settings.is_search_configured() {
                    eprintln!("Warning: no search URL is configured; searches will fail.");
                }
            }
            ReplInput::AttachDocument(path) => match load_document(Path::new(path)).await {
                Ok(document) => {
                    println!("Attached {}", document.name);
                    controller.set_context_document(document);
                }
                Err(e) => eprintln!("{:#}", e),
            },
            ReplInput::DetachDocument => match controller.clear_context_document() {
                Some(document) => println!("Detached {}", document.name),
                None => println!("No document attached."),
            },
            ReplInput::Status => println!("{}", format_status(controller.state())),
            ReplInput::Invalid(message) => eprintln!("{}", message),
            ReplInput::Message(text) => send(&mut controller, text).await,
        }
    }

    controller.close();
    Ok(())
}
