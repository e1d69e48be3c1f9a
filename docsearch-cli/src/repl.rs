//! Interactive command loop.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::client::DocsearchClient;
use crate::format::{BANNER, COMMANDS, HELP, format_response};

pub const DEFAULT_RESULT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Upload,
    List,
    Search,
    Similar,
    Delete,
    Stats,
    Help,
    Quit,
}

impl Command {
    /// Accepts the command name or its menu number, any case.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "upload" => Some(Self::Upload),
            "2" | "list" => Some(Self::List),
            "3" | "search" => Some(Self::Search),
            "4" | "similar" => Some(Self::Similar),
            "5" | "delete" => Some(Self::Delete),
            "6" | "stats" => Some(Self::Stats),
            "7" | "help" => Some(Self::Help),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// A positive count, or `default` for empty or invalid input.
pub fn parse_count(input: &str, default: usize) -> usize {
    input.trim().parse().ok().filter(|n| *n > 0).unwrap_or(default)
}

/// `y` or `yes`, any case.
pub fn is_confirmation(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Outcome of one prompt.
enum Input {
    Line(String),
    Exit,
}

struct Prompter {
    editor: DefaultEditor,
}

impl Prompter {
    fn read(&mut self, prompt: &str) -> anyhow::Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Input::Line(line.trim().to_string()))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(Input::Exit),
            Err(e) => Err(e.into()),
        }
    }

    fn read_count(&mut self) -> anyhow::Result<Option<usize>> {
        let prompt = format!("Number of results (default {DEFAULT_RESULT_COUNT}): ");
        Ok(match self.read(&prompt)? {
            Input::Line(line) => {
                let count = parse_count(&line, DEFAULT_RESULT_COUNT);
                if !line.is_empty() && line.parse::<usize>().ok().is_none_or(|n| n == 0) {
                    println!("Invalid input, using default: {DEFAULT_RESULT_COUNT}");
                }
                Some(count)
            }
            Input::Exit => None,
        })
    }
}

/// Run the loop until `quit`, Ctrl-C or Ctrl-D. Returns early if the server
/// is unreachable.
pub async fn run(client: &DocsearchClient) -> anyhow::Result<()> {
    println!("{BANNER}");
    println!("Checking server connection at {}...", client.base_url());

    let health = client.health_check().await;
    if let Some(error) = health.get("error").and_then(|e| e.as_str()) {
        println!("❌ Server connection failed: {error}");
        return Ok(());
    }
    println!("✅ Server is running!\n");
    println!("{COMMANDS}");

    let mut prompter = Prompter { editor: DefaultEditor::new()? };
    loop {
        let line = match prompter.read("\nEnter command: ")? {
            Input::Line(line) => line,
            Input::Exit => break,
        };
        if line.is_empty() {
            continue;
        }
        let Some(command) = Command::parse(&line) else {
            println!("Unknown command. Type 'help' for commands or 'quit' to exit.");
            continue;
        };

        let response = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Upload => {
                let Input::Line(path) = prompter.read("Enter file path: ")? else { break };
                client.upload_document(path).await
            }
            Command::List => client.list_documents().await,
            Command::Search => {
                let Input::Line(query) = prompter.read("Enter search query: ")? else { break };
                let Some(k) = prompter.read_count()? else { break };
                client.search_documents(&query, k, None).await
            }
            Command::Similar => {
                let Input::Line(doc_id) = prompter.read("Enter document ID: ")? else { break };
                let Some(k) = prompter.read_count()? else { break };
                client.find_similar_documents(&doc_id, k).await
            }
            Command::Delete => {
                let Input::Line(doc_id) = prompter.read("Enter document ID to delete: ")? else {
                    break;
                };
                let prompt = format!("Are you sure you want to delete {doc_id}? (y/N): ");
                let Input::Line(answer) = prompter.read(&prompt)? else { break };
                if !is_confirmation(&answer) {
                    println!("Delete cancelled.");
                    continue;
                }
                client.delete_document(&doc_id).await
            }
            Command::Stats => client.get_search_stats().await,
        };
        println!("{}", format_response(&response));
    }

    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_by_name_or_number() {
        assert_eq!(Command::parse("1"), Some(Command::Upload));
        assert_eq!(Command::parse(" SEARCH "), Some(Command::Search));
        assert_eq!(Command::parse("4"), Some(Command::Similar));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse("8"), None);
        assert_eq!(Command::parse("upload now"), None);
    }

    #[test]
    fn counts_fall_back_to_default() {
        assert_eq!(parse_count("3", 5), 3);
        assert_eq!(parse_count("", 5), 5);
        assert_eq!(parse_count("abc", 5), 5);
        assert_eq!(parse_count("0", 5), 5);
        assert_eq!(parse_count("-2", 5), 5);
    }

    #[test]
    fn confirmation_accepts_y_and_yes_only() {
        assert!(is_confirmation("y"));
        assert!(is_confirmation("YES"));
        assert!(!is_confirmation(""));
        assert!(!is_confirmation("no"));
        assert!(!is_confirmation("yep"));
    }
}
