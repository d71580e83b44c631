//! Line-oriented front end for `docchat chat`.
//!
//! [`LineEvents`] turns input lines into [`Event`]s; plain text is a
//! question and `/`-prefixed lines are commands. [`TerminalSurface`] prints
//! conversation output to stdout and notifications to stderr.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::app::{DocumentInfo, Event, EventSource, FileStatus, NoticeLevel, Surface};
use crate::ingest::read_upload;
use crate::models::{ChatTurn, ConnectionStatus, Provider, Role, SearchResult, Theme};
use crate::search::print_results;

pub const HELP: &str = "\
Commands:
  /upload <path>                    load a pdf, docx, txt or md file
  /remove <name>                    forget a loaded document
  /docs                             list loaded documents
  /search <query>                   search loaded documents
  /summary <name>                   regenerate a document summary
  /config <provider> <key> [model]  save provider settings
  /test                             test the provider connection
  /clear                            clear the conversation
  /theme                            toggle light/dark
  /quit                             leave
Anything else is sent as a question.";

/// Result of parsing one input line.
#[derive(Debug)]
pub enum Parsed {
    Event(Event),
    Upload(PathBuf),
    Help,
    Invalid(String),
    Empty,
}

pub fn parse_line(line: &str) -> Parsed {
    let line = line.trim();
    if line.is_empty() {
        return Parsed::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Parsed::Event(Event::Ask(line.to_string()));
    };
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let needs_arg = |usage: &str, make: fn(String) -> Parsed| {
        if rest.is_empty() {
            Parsed::Invalid(format!("usage: {}", usage))
        } else {
            make(rest.to_string())
        }
    };
    match name {
        "upload" => needs_arg("/upload <path>", |p| Parsed::Upload(PathBuf::from(p))),
        "remove" => needs_arg("/remove <name>", |id| Parsed::Event(Event::RemoveDocument(id))),
        "search" => needs_arg("/search <query>", |q| Parsed::Event(Event::Search(q))),
        "summary" => needs_arg("/summary <name>", |id| Parsed::Event(Event::Summarize(id))),
        "config" => parse_config(rest),
        "docs" => Parsed::Event(Event::ListDocuments),
        "test" => Parsed::Event(Event::TestConnection),
        "clear" => Parsed::Event(Event::ClearChat),
        "theme" => Parsed::Event(Event::ToggleTheme),
        "quit" | "exit" => Parsed::Event(Event::Quit),
        "help" => Parsed::Help,
        other => Parsed::Invalid(format!("unknown command /{}; try /help", other)),
    }
}

fn parse_config(rest: &str) -> Parsed {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let (provider, api_key, model) = match parts.as_slice() {
        [provider, key] => (*provider, *key, None),
        [provider, key, model] => (*provider, *key, Some(*model)),
        _ => return Parsed::Invalid("usage: /config <provider> <key> [model]".to_string()),
    };
    match provider.parse::<Provider>() {
        Ok(provider) => Parsed::Event(Event::SaveConfig {
            provider,
            api_key: api_key.to_string(),
            model: model.unwrap_or(provider.default_model()).to_string(),
        }),
        Err(e) => Parsed::Invalid(e),
    }
}

/// Events read line by line from any async reader (normally stdin).
pub struct LineEvents<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin + Send> LineEvents<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> EventSource for LineEvents<R> {
    async fn next_event(&mut self) -> Option<Event> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    eprintln!("error: failed to read input: {}", e);
                    return None;
                }
            };
            match parse_line(&line) {
                Parsed::Event(event) => return Some(event),
                Parsed::Upload(path) => match read_upload(&path) {
                    Ok(upload) => return Some(Event::Upload(upload)),
                    Err(e) => eprintln!("error: {:#}", e),
                },
                Parsed::Help => println!("{}", HELP),
                Parsed::Invalid(message) => eprintln!("error: {}", message),
                Parsed::Empty => {}
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        let tag = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{}] {}", tag, message);
    }

    fn render_turn(&mut self, turn: &ChatTurn) {
        if turn.role == Role::Assistant {
            println!("assistant ({}): {}\n", turn.at.format("%H:%M"), turn.text);
        }
    }

    fn set_typing(&mut self, visible: bool) {
        if visible {
            eprintln!("thinking...");
        }
    }

    fn file_status(&mut self, id: &str, status: FileStatus) {
        let label = match status {
            FileStatus::Processing => "processing",
            FileStatus::Ready => "ready",
            FileStatus::Failed => "failed",
        };
        eprintln!("{}: {}", id, label);
    }

    fn render_search(&mut self, query: &str, results: &[SearchResult]) {
        print_results(query, results);
    }

    fn render_summary(&mut self, id: &str, summary: &str) {
        println!("Summary of {}:\n{}\n", id, summary);
    }

    fn render_connection(&mut self, status: &ConnectionStatus) {
        match status {
            ConnectionStatus::Connected => println!("connection: connected"),
            ConnectionStatus::Error(message) => println!("connection: error ({})", message),
        }
    }

    fn render_documents(&mut self, documents: &[DocumentInfo]) {
        if documents.is_empty() {
            println!("No documents loaded.");
            return;
        }
        for doc in documents {
            let marker = if doc.has_summary { "" } else { " (no summary)" };
            println!("  {}  {} chars{}", doc.id, doc.chars, marker);
        }
    }

    fn apply_theme(&mut self, theme: Theme) {
        eprintln!("theme: {}", theme.as_str());
    }
}
