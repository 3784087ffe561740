//! CLI channel: stdin/stdout REPL over a chat session.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::{ChatSession, View};
use crate::llm::Role;
use crate::profile::{DashboardSummary, Profile};

/// A line entered at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Home,
    Chat(Option<String>),
    /// Add a reminder to the task list.
    Remind(String),
    Reminders,
    Quit,
    Say(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match head {
            "/home" => Self::Home,
            "/quit" | "/exit" => Self::Quit,
            "/chat" if rest.is_empty() => Self::Chat(None),
            "/chat" => Self::Chat(Some(rest.to_string())),
            "/remind" => Self::Remind(rest.to_string()),
            "/reminders" => Self::Reminders,
            _ => Self::Say(line.to_string()),
        }
    }
}

/// Render the home view as plain text.
pub fn render_dashboard(summary: &DashboardSummary) -> String {
    let mut out = vec![format!("── AURA ── Hello, {}!", summary.name)];

    out.push(format!("Tasks ({} pending):", summary.pending_task_count));
    if summary.upcoming_tasks.is_empty() {
        out.push("  All caught up! 🎉".to_string());
    }
    out.extend(summary.upcoming_tasks.iter().map(|t| format!("  • {t}")));

    out.push(format!("Shopping ({}):", summary.shopping_count));
    out.extend(summary.shopping_preview.iter().map(|i| format!("  • {i}")));

    match &summary.next_event {
        Some(event) => {
            let when = event
                .starts_at()
                .map(|t| t.format("%-I:%M %p").to_string())
                .unwrap_or_else(|| event.date.clone());
            out.push(format!("Next event: {} at {}", event.title, when));
        }
        None => out.push("Next event: your schedule is clear".to_string()),
    }

    out.push("Smart home:".to_string());
    out.extend(
        summary
            .devices
            .iter()
            .map(|d| format!("  • {}: {}", d.name, d.status)),
    );

    out.join("\n")
}

/// Numbered list of pending tasks.
pub fn render_reminders(profile: &Profile) -> String {
    let pending: Vec<String> = profile
        .pending_tasks()
        .enumerate()
        .map(|(i, task)| format!("{}. {}", i + 1, task.text))
        .collect();
    if pending.is_empty() {
        return "You have no pending reminders.".to_string();
    }
    format!("Here are your pending reminders:\n{}", pending.join("\n"))
}

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    session: Arc<ChatSession>,
}

impl CliChannel {
    pub fn new(session: Arc<ChatSession>) -> Self {
        Self { session }
    }

    /// Read commands until EOF or `/quit`.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.print_home().await;
        eprint!("> ");

        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Command::Empty => {}
                Command::Quit => break,
                Command::Home => {
                    self.session.leave_chat().await;
                    self.print_home().await;
                }
                Command::Chat(draft) => self.open_chat(draft).await,
                Command::Remind(text) if text.is_empty() => {
                    eprintln!("   Usage: /remind <what to remember>");
                }
                Command::Remind(text) => {
                    self.session.profiles().add_task(&text).await;
                    println!("Reminder set: '{text}'.");
                }
                Command::Reminders => {
                    let profile = self.session.profiles().snapshot().await;
                    println!("\n{}\n", render_reminders(&profile));
                }
                Command::Say(text) => {
                    if self.session.view().await == View::Home {
                        self.open_chat(None).await;
                    }
                    eprintln!("⏳ thinking...");
                    match self.session.send(&text).await {
                        Ok(reply) => println!("\n{}\n", reply.content),
                        Err(e) => eprintln!("⚠️  {e}"),
                    }
                }
            }
            eprint!("> ");
        }
        Ok(())
    }

    async fn print_home(&self) {
        let profile = self.session.profiles().snapshot().await;
        println!("\n{}\n", render_dashboard(&DashboardSummary::from_profile(&profile)));
        eprintln!("   /chat [message] to talk, /home for the dashboard, /quit to exit");
        eprintln!("   /remind <text> adds a reminder, /reminders lists them");
    }

    async fn open_chat(&self, draft: Option<String>) {
        let was_empty = self.session.transcript().await.is_empty();
        self.session.enter_chat(draft).await;

        if was_empty {
            let transcript = self.session.transcript().await;
            if let Some(greeting) = transcript.iter().find(|m| m.role == Role::Assistant) {
                println!("\n{}\n", greeting.content);
            }
        }
        if let Some(draft) = self.session.draft().await {
            eprintln!("   Suggested: {draft}");
        }
    }
}
