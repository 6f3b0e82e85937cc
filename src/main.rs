//! tour-chat - conversational client for a documentation chat API
//!
//! A line-oriented front end over a session state machine: ask questions,
//! play the guided tour, and keep the conversation across restarts.

mod client;
mod config;
mod db;
mod runtime;
mod state_machine;
mod typing;

use client::{HttpChatClient, LoggingClient};
use config::ClientConfig;
use db::{ConversationEntry, Database};
use runtime::{spawn_session, DatabaseHistory, SessionHandle, SessionUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use typing::TypingSimulator;

const HELP: &str = "Type a question, or /tour, /clear, /cancel, /quit";

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ask(String),
    Tour,
    Clear,
    Cancel,
    Quit,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a line; blank lines yield `None`
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line {
            "/tour" => Command::Tour,
            "/clear" => Command::Clear,
            "/cancel" => Command::Cancel,
            "/quit" | "/exit" => Command::Quit,
            "/help" => Command::Help,
            other if other.starts_with('/') => Command::Unknown(other.to_string()),
            question => Command::Ask(question.to_string()),
        };
        Some(command)
    }
}

fn print_entry(entry: &ConversationEntry) {
    println!("[{}] {}", entry.kind, entry.text);
}

/// Print session updates as they arrive
async fn print_updates(mut updates: broadcast::Receiver<SessionUpdate>) {
    loop {
        match updates.recv().await {
            Ok(SessionUpdate::Init { entries, .. }) => {
                for entry in &entries {
                    print_entry(entry);
                }
                println!("{HELP}");
            }
            Ok(SessionUpdate::EntryAppended { entry }) => print_entry(&entry),
            Ok(SessionUpdate::Cleared) => println!("-- history cleared --"),
            Ok(SessionUpdate::Typing { active: true }) => println!("..."),
            Ok(SessionUpdate::Rejected { reason }) => println!("! {reason}"),
            Ok(SessionUpdate::Typing { active: false } | SessionUpdate::ModeChanged { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Update printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn dispatch(
    handle: &SessionHandle,
    command: Command,
) -> Result<bool, runtime::SessionClosed> {
    match command {
        Command::Ask(question) => handle.ask(question).await?,
        Command::Tour => handle.start_tour().await?,
        Command::Clear => handle.clear().await?,
        Command::Cancel => handle.cancel().await?,
        Command::Quit => return Ok(false),
        Command::Help => println!("{HELP}"),
        Command::Unknown(other) => println!("! Unknown command {other}. {HELP}"),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stderr keeps the conversation on stdout readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tour_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env();
    let endpoints = config.endpoints();
    if endpoints.is_none() {
        tracing::warn!("No chat API configured. Set TOUR_CHAT_API_URL.");
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    let history = DatabaseHistory::new(db, config.storage_key.clone());

    let client = LoggingClient::new(HttpChatClient::new(endpoints, config.request_timeout)?);
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, "Starting session");

    let (handle, updates) = spawn_session(
        session_id,
        history,
        client,
        TypingSimulator::new(config.typing),
    );
    tokio::spawn(print_updates(updates));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if !dispatch(&handle, command).await? {
            break;
        }
    }

    Ok(())
}
