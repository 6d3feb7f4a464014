//! Line-oriented terminal front-end.
//!
//! Plain lines are chat messages; lines starting with `/` are commands.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{Candidate, HelixApi, HttpExecutor};
use crate::config::HelixConfig;
use crate::session::{Applied, Session};
use crate::transport::{ConnectionStatus, TransportHandle};
use crate::workspace::{Projector, Sequence, SequenceMessage, body_text, sanitize_body};

const HELP: &str = "\
Commands:
  <text>                              send a chat message
  /ask <text>                         send a chat message over HTTP
  /sequences                          list outreach sequences
  /show <id>                          print a sequence body as sanitized HTML
  /edit <id> <subject> | <body>       replace a draft
  /delete <id>                        delete a sequence
  /run <id>                           execute a sequence
  /outreach <role> | <approach>       generate an outreach opener
  /candidate <name> | <role> | <status>  store a candidate
  /proxy <url>                        fetch a page through the backend proxy
  /status                             show connection status
  /help                               show this help
  /quit                               exit";

/// One parsed input line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Chat over the socket.
    Chat(String),
    /// Chat over HTTP.
    Ask(String),
    /// List sequences.
    Sequences,
    /// Print one sequence body.
    Show(i64),
    /// Replace a draft.
    Edit {
        /// Sequence id.
        id: i64,
        /// New draft.
        message: SequenceMessage,
    },
    /// Delete a sequence.
    Delete(i64),
    /// Execute a sequence.
    Run(i64),
    /// Generate an outreach opener.
    Outreach {
        /// Role being recruited for.
        role: String,
        /// Outreach approach.
        approach: String,
    },
    /// Store a candidate.
    Candidate(Candidate),
    /// Fetch a page through the proxy.
    Proxy(String),
    /// Show connection status.
    Status,
    /// Show help.
    Help,
    /// Exit.
    Quit,
    /// Blank line.
    Empty,
}

impl Command {
    /// Parse one input line.
    ///
    /// # Errors
    /// Returns a usage message when a command is unknown or malformed.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Self::Chat(line.to_string()));
        };

        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, rest)| (name, rest.trim()));

        match name {
            "ask" => non_empty(rest, "/ask <text>").map(Self::Ask),
            "sequences" | "seq" => Ok(Self::Sequences),
            "show" => parse_id(rest, "/show <id>").map(Self::Show),
            "edit" => {
                let (id, draft) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: /edit <id> <subject> | <body>".to_string())?;
                let id = parse_id(id, "/edit <id> <subject> | <body>")?;
                let [subject, body] = split_fields::<2>(draft, "/edit <id> <subject> | <body>")?;
                Ok(Self::Edit {
                    id,
                    message: SequenceMessage::new(subject, body),
                })
            }
            "delete" => parse_id(rest, "/delete <id>").map(Self::Delete),
            "run" => parse_id(rest, "/run <id>").map(Self::Run),
            "outreach" => {
                let [role, approach] = split_fields::<2>(rest, "/outreach <role> | <approach>")?;
                Ok(Self::Outreach { role, approach })
            }
            "candidate" => {
                let [name, role, outreach_status] =
                    split_fields::<3>(rest, "/candidate <name> | <role> | <status>")?;
                Ok(Self::Candidate(Candidate {
                    name,
                    role,
                    outreach_status,
                }))
            }
            "proxy" => non_empty(rest, "/proxy <url>").map(|url| Self::Proxy(with_scheme(url))),
            "status" => Ok(Self::Status),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command /{other}, try /help")),
        }
    }
}

fn non_empty(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

/// Default bare addresses to `https://`.
fn with_scheme(url: String) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url
    } else {
        format!("https://{url}")
    }
}

fn parse_id(raw: &str, usage: &str) -> Result<i64, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("usage: {usage}"))
}

fn split_fields<const N: usize>(raw: &str, usage: &str) -> Result<[String; N], String> {
    let fields: Vec<String> = raw.splitn(N, '|').map(|f| f.trim().to_string()).collect();
    if fields.iter().any(String::is_empty) {
        return Err(format!("usage: {usage}"));
    }
    fields.try_into().map_err(|_| format!("usage: {usage}"))
}

enum Step {
    Line(Option<String>),
    Update(Option<Applied>),
}

/// Run the terminal front-end until `/quit` or end of input.
///
/// # Errors
/// Returns an error if the transport or REST client cannot be created, or stdin fails.
pub async fn run(config: HelixConfig) -> anyhow::Result<()> {
    let transport =
        TransportHandle::spawn(&config.transport).context("failed to start transport")?;
    let api = HelixApi::new(&config.api).context("failed to build REST client")?;
    let mut session = Session::mount(
        &transport,
        Projector::new(config.precedence),
        Arc::new(HttpExecutor::new(api.clone())),
    );

    println!("Helix: type a message, or /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line.context("failed to read stdin")?),
            update = session.next_update() => Step::Update(update),
        };

        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => execute(command, &mut session, &transport, &api).await,
                Err(usage) => println!("{usage}"),
            },
            Step::Update(Some(applied)) => render_applied(&applied, &session),
            Step::Update(None) => break,
        }
    }

    drop(session);
    transport.shutdown().await;
    Ok(())
}

async fn execute(
    command: Command,
    session: &mut Session,
    transport: &TransportHandle,
    api: &HelixApi,
) {
    match command {
        Command::Chat(text) => {
            if let Err(err) = session.send_chat(text) {
                println!("! message not sent: {err}");
            } else if !transport.is_connected() {
                println!("(offline, message queued)");
            }
        }
        Command::Ask(text) => match api.send_message(&text).await {
            Ok(reply) => {
                for applied in session.apply_reply(reply) {
                    render_applied(&applied, session);
                }
            }
            Err(err) => println!("! request failed: {err}"),
        },
        Command::Sequences => {
            for applied in session.drain_pending() {
                render_applied(&applied, session);
            }
            print_sequences(session.sequences().sequences());
        }
        Command::Show(id) => match session.sequences().get(id) {
            Some(sequence) => {
                println!("#{} {}", sequence.id, sequence.title);
                println!("Subject: {}", sequence.message.subject);
                println!("{}", sanitize_body(&sequence.message.body));
            }
            None => println!("no sequence #{id}"),
        },
        Command::Edit { id, message } => {
            if session.edit_sequence(id, message) {
                println!("updated #{id}");
            } else {
                println!("no sequence #{id}");
            }
        }
        Command::Delete(id) => {
            if session.delete_sequence(id) {
                println!("deleted #{id}");
            } else {
                println!("no sequence #{id}");
            }
        }
        Command::Run(id) => match session.execute_sequence(id).await {
            Ok(Some(report)) => println!(
                "#{id}: {}{}",
                report.status,
                report.message.map(|m| format!(" ({m})")).unwrap_or_default()
            ),
            Ok(None) => println!("no sequence #{id}"),
            Err(err) => println!("! execution failed: {err}"),
        },
        Command::Outreach { role, approach } => {
            match api.fetch_outreach_sequence(&role, &approach).await {
                Ok(response) => println!("{}", response.initial_message),
                Err(err) => println!("! request failed: {err}"),
            }
        }
        Command::Candidate(candidate) => match api.store_candidate(&candidate).await {
            Ok(ack) => println!("{}", ack.message),
            Err(err) => println!("! request failed: {err}"),
        },
        Command::Proxy(url) => match api.fetch_proxy_page(&url).await {
            Ok(html) => println!("fetched {} bytes from {url}", html.len()),
            Err(err) => println!("! request failed: {err}"),
        },
        Command::Status => println!("{}", describe_status(&transport.status())),
        Command::Help => println!("{HELP}"),
        Command::Quit | Command::Empty => {}
    }
}

fn render_applied(applied: &Applied, session: &Session) {
    match applied {
        Applied::Chat(message) => println!("{}: {}", message.sender, message.text),
        Applied::Workspace(count) => {
            println!("[workspace updated: {count} sequence(s)]");
            print_sequences(session.sequences().sequences());
        }
    }
}

fn print_sequences(sequences: &[Sequence]) {
    if sequences.is_empty() {
        println!("(no sequences)");
        return;
    }
    for sequence in sequences {
        println!("#{} {}", sequence.id, sequence.title);
        println!("  Subject: {}", sequence.message.subject);
        for line in body_text(&sequence.message.body).lines() {
            println!("  | {line}");
        }
    }
}

/// One-line description of the connection status.
#[must_use]
pub fn describe_status(status: &ConnectionStatus) -> String {
    if status.is_connected() {
        return format!(
            "connected (session {})",
            status.session_id.as_deref().unwrap_or("-")
        );
    }
    let mut line = String::from("disconnected");
    if status.exhausted {
        line.push_str(", gave up reconnecting");
    } else if status.attempts > 0 {
        line.push_str(&format!(", reconnect attempt {}", status.attempts));
    }
    if let Some(err) = &status.last_error {
        line.push_str(&format!(" ({err})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ConnectionState, TransportError};

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Command::parse("  find me a designer "),
            Ok(Command::Chat("find me a designer".to_string()))
        );
        assert_eq!(Command::parse("   "), Ok(Command::Empty));
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(
            Command::parse("/edit 3 Quick question | <p>Are you open to a chat?</p>"),
            Ok(Command::Edit {
                id: 3,
                message: SequenceMessage::new("Quick question", "<p>Are you open to a chat?</p>"),
            })
        );
        assert!(Command::parse("/edit 3 no separator").is_err());
        assert!(Command::parse("/edit x a | b").is_err());
    }

    #[test]
    fn test_parse_body_may_contain_separator() {
        let Ok(Command::Edit { message, .. }) = Command::parse("/edit 1 s | a | b") else {
            panic!("expected edit");
        };
        assert_eq!(message.body, "a | b");
    }

    #[test]
    fn test_parse_candidate_and_outreach() {
        assert_eq!(
            Command::parse("/candidate Dana | Staff engineer | pending"),
            Ok(Command::Candidate(Candidate {
                name: "Dana".to_string(),
                role: "Staff engineer".to_string(),
                outreach_status: "pending".to_string(),
            }))
        );
        assert_eq!(
            Command::parse("/outreach Designer | casual"),
            Ok(Command::Outreach {
                role: "Designer".to_string(),
                approach: "casual".to_string(),
            })
        );
        assert!(Command::parse("/candidate Dana | Staff engineer").is_err());
    }

    #[test]
    fn test_parse_ids_and_misc() {
        assert_eq!(Command::parse("/delete 7"), Ok(Command::Delete(7)));
        assert_eq!(Command::parse("/run 2"), Ok(Command::Run(2)));
        assert_eq!(Command::parse("/show 4"), Ok(Command::Show(4)));
        assert_eq!(Command::parse("/seq"), Ok(Command::Sequences));
        assert_eq!(Command::parse("/quit"), Ok(Command::Quit));
        assert!(Command::parse("/delete").is_err());
        assert!(Command::parse("/proxy").is_err());
        assert!(Command::parse("/bogus").is_err());
    }

    #[test]
    fn test_proxy_defaults_to_https() {
        assert_eq!(
            Command::parse("/proxy example.com/jobs"),
            Ok(Command::Proxy("https://example.com/jobs".to_string()))
        );
        assert_eq!(
            Command::parse("/proxy http://example.com"),
            Ok(Command::Proxy("http://example.com".to_string()))
        );
        assert_eq!(
            Command::parse("/proxy HTTPS://Example.com"),
            Ok(Command::Proxy("HTTPS://Example.com".to_string()))
        );
    }

    #[test]
    fn test_describe_status() {
        let connected = ConnectionStatus {
            state: ConnectionState::Connected,
            session_id: Some("abc".to_string()),
            ..ConnectionStatus::default()
        };
        assert_eq!(describe_status(&connected), "connected (session abc)");

        let gave_up = ConnectionStatus {
            attempts: 10,
            last_error: Some(TransportError::Connect("refused".to_string())),
            exhausted: true,
            ..ConnectionStatus::default()
        };
        assert_eq!(
            describe_status(&gave_up),
            "disconnected, gave up reconnecting (Connection failed: refused)"
        );
    }
}
