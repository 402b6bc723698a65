//! Interactive chat command.

use super::{build_knowledge_base, preflight};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::generation::ChatMessage;
use crate::rag::{Conversation, RagResponse, Responder};
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Number of messages kept in the local transcript.
const MAX_TRANSCRIPT: usize = 50;

/// Chat backend: persona only, or answers from the advisor records.
enum Session {
    Persona(Conversation),
    Rag(Responder),
}

impl Session {
    fn welcome(&self) -> String {
        match self {
            Session::Persona(conversation) => conversation.welcome(),
            Session::Rag(responder) => responder.welcome(),
        }
    }

    async fn reply(&self, message: &str, history: &[ChatMessage]) -> Result<RagResponse> {
        match self {
            Session::Persona(conversation) => conversation.reply(message, history).await,
            Session::Rag(responder) => responder.answer(message, history).await,
        }
    }
}

/// Run the interactive chat command.
pub async fn run_chat(rag: bool, settings: Settings) -> anyhow::Result<()> {
    let session = if rag {
        preflight(Operation::Ask, &settings)?;
        let knowledge_base = build_knowledge_base(&settings).await?;
        Session::Rag(Responder::from_settings(Arc::new(knowledge_base), &settings)?)
    } else {
        preflight(Operation::Chat, &settings)?;
        Session::Persona(Conversation::from_settings(&settings)?)
    };

    println!("\n{}", style("Advisor Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );
    println!("{} {}\n", style("Advisor:").cyan().bold(), session.welcome());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = session.reply(input, &history).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                println!("\n{} {}\n", style("Advisor:").cyan().bold(), response.answer);
                record_turn(&mut history, input, &response);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}

/// Record a completed turn, dropping the oldest messages past the limit.
///
/// Fallback apologies are not recorded, so they are never replayed to the
/// model as history.
fn record_turn(history: &mut Vec<ChatMessage>, question: &str, response: &RagResponse) {
    if response.fallback {
        return;
    }
    history.push(ChatMessage::user(question));
    history.push(ChatMessage::assistant(response.answer.as_str()));
    if history.len() > MAX_TRANSCRIPT {
        let excess = history.len() - MAX_TRANSCRIPT;
        history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(answer: &str, fallback: bool) -> RagResponse {
        RagResponse {
            answer: answer.to_string(),
            sources: Vec::new(),
            fallback,
        }
    }

    #[test]
    fn test_record_turn_bounds_transcript() {
        let mut history = Vec::new();
        for i in 0..40 {
            record_turn(&mut history, &format!("q{}", i), &reply(&format!("a{}", i), false));
        }

        assert_eq!(history.len(), MAX_TRANSCRIPT);
        assert_eq!(history.last(), Some(&ChatMessage::assistant("a39")));
        assert_eq!(history[0], ChatMessage::user("q15"));
    }

    #[test]
    fn test_fallback_is_not_recorded() {
        let mut history = vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello!")];
        record_turn(&mut history, "who teaches AI?", &reply("I'm sorry...", true));

        assert_eq!(history.len(), 2);
        assert_eq!(history[1], ChatMessage::assistant("Hello!"));
    }
}
