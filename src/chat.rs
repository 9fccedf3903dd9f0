//! Query commands: single-shot `ask` and the multi-turn `chat` loop.
//!
//! The loop reads from any [`BufRead`] and writes to any [`Write`], so it
//! is driven by stdin/stdout in the binary and by byte buffers in tests.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::answer::{self, Answer};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::llm::AnswerModel;

/// Characters of each answer shown by the `history` command.
const HISTORY_PREVIEW_CHARS: usize = 100;

/// `docqa ask <question>`: answer once, without conversation history.
pub async fn run_ask(config: &Config, model: &dyn AnswerModel, question: &str) -> Result<()> {
    let answer = answer::answer_question(config, model, question, None).await;
    print_answer(&answer);
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources: {}", answer.sources.join(", "));
    }
}

/// `docqa chat`: interactive loop on stdin/stdout.
pub async fn run_chat(config: &Config, model: &dyn AnswerModel) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut conversation = Conversation::new();
    chat_loop(
        config,
        model,
        &mut conversation,
        stdin.lock(),
        &mut stdout.lock(),
    )
    .await
}

/// Read questions line by line until `exit` or end of input.
///
/// `clear` empties the conversation and `history` lists it with answers
/// cut to 100 characters. Blank lines are ignored.
pub async fn chat_loop<R: BufRead, W: Write>(
    config: &Config,
    model: &dyn AnswerModel,
    conversation: &mut Conversation,
    mut input: R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "docqa - multi-turn conversation")?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(
        out,
        "Type 'exit' to quit, 'clear' to clear history, 'history' to see conversation"
    )?;

    let mut line = String::new();
    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match question.to_lowercase().as_str() {
            "exit" | "quit" => {
                writeln!(out, "Goodbye!")?;
                break;
            }
            "clear" => {
                conversation.clear();
                writeln!(out, "Conversation history cleared.")?;
            }
            "history" => write_history(conversation, out)?,
            _ => {
                let answer =
                    answer::answer_question(config, model, question, Some(&mut *conversation))
                        .await;
                writeln!(out, "\nAssistant:\n{}", answer.text)?;
                if !answer.sources.is_empty() {
                    writeln!(out, "\nSources: {}", answer.sources.join(", "))?;
                }
            }
        }
    }
    Ok(())
}

fn write_history<W: Write>(conversation: &Conversation, out: &mut W) -> Result<()> {
    if conversation.is_empty() {
        writeln!(out, "No conversation history yet.")?;
        return Ok(());
    }
    writeln!(out, "\n--- Conversation History ---")?;
    for (i, exchange) in conversation.exchanges().iter().enumerate() {
        writeln!(out, "\n[{}] User: {}", i + 1, exchange.question)?;
        writeln!(out, "    Assistant: {}...", preview(&exchange.answer))?;
    }
    Ok(())
}

fn preview(answer: &str) -> String {
    answer.chars().take(HISTORY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledModel;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.data_dir = tmp.path().join("data");
        config.paths.store_dir = tmp.path().join("vector_store");
        config.embedding.provider = "hash".into();
        config
    }

    #[test]
    fn preview_counts_characters() {
        let long = "é".repeat(150);
        assert_eq!(preview(&long).chars().count(), 100);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn commands_and_history_without_store() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let mut conversation = Conversation::new();
        conversation.push("earlier question", "x".repeat(150));

        let input = b"history\nclear\nhistory\n\nwhat is mitosis?\nexit\nignored\n";
        let mut out = Vec::new();
        chat_loop(&config, &DisabledModel, &mut conversation, &input[..], &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("[1] User: earlier question"));
        assert!(text.contains(&format!("    Assistant: {}...", "x".repeat(100))));
        assert!(text.contains("Conversation history cleared."));
        assert!(text.contains("No conversation history yet."));
        assert!(text.contains(answer::STORE_UNAVAILABLE));
        assert!(text.trim_end().ends_with("Goodbye!"));
        // store-unavailable answers are not recorded
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn end_of_input_stops_loop() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let mut conversation = Conversation::new();
        let mut out = Vec::new();
        chat_loop(&config, &DisabledModel, &mut conversation, &b""[..], &mut out)
            .await
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("You: "));
    }
}
