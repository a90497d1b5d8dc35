//! Chat step - Talk to the spec agent until the spec is written.

use anyhow::{bail, Result};
use tracing::{info, warn};

use mity_chat::{
    AttachmentInput, ChatError, ChatSession, Endpoint, MessageRole, Question, SessionEvent,
    WsConnector,
};
use mity_wizard::{ClientConfig, Step, WizardController};

use super::wizard::report;
use crate::prompt::Prompt;

const HELP: &str = "\
Type a message to talk to the agent. Commands:
  /attach <path>   attach a file to your next message
  /answer 1,3      answer the pending question by option number
  /cancel          back to method selection
  /exit            leave the wizard and open the project
  /retry           retry starting the agent
  /reconnect       reopen the chat connection
  /help            show this help";

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Say(String),
    Attach(String),
    Answer(Vec<usize>),
    Cancel,
    Exit,
    Retry,
    Reconnect,
    Help,
    Empty,
}

fn parse_command(line: &str) -> Result<ChatCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ChatCommand::Empty);
    }
    if !line.starts_with('/') {
        return Ok(ChatCommand::Say(line.to_string()));
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/attach" if !rest.is_empty() => Ok(ChatCommand::Attach(rest.to_string())),
        "/attach" => Err("Usage: /attach <path>".to_string()),
        "/answer" => parse_answer(rest).map(ChatCommand::Answer),
        "/cancel" => Ok(ChatCommand::Cancel),
        "/exit" => Ok(ChatCommand::Exit),
        "/retry" => Ok(ChatCommand::Retry),
        "/reconnect" => Ok(ChatCommand::Reconnect),
        "/help" => Ok(ChatCommand::Help),
        other => Err(format!("Unknown command {} (try /help)", other)),
    }
}

/// Parse `1,3` into 1-based option numbers.
fn parse_answer(rest: &str) -> Result<Vec<usize>, String> {
    let usage = || "Usage: /answer 1,3".to_string();
    if rest.is_empty() {
        return Err(usage());
    }

    let mut picks = Vec::new();
    for part in rest.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<usize>() {
            Ok(n) if n > 0 => picks.push(n),
            _ => return Err(usage()),
        }
    }
    if picks.is_empty() {
        return Err(usage());
    }
    Ok(picks)
}

/// Option ids for 1-based picks, checked against the question.
fn selected_option_ids(question: &Question, picks: &[usize]) -> Result<Vec<String>, String> {
    if !question.multi_select && picks.len() > 1 {
        return Err("This question takes a single option".to_string());
    }
    picks
        .iter()
        .map(|n| {
            question
                .option_at(n - 1)
                .map(|option| option.id.clone())
                .ok_or_else(|| format!("No option {}", n))
        })
        .collect()
}

enum Input {
    Line(String),
    Event(SessionEvent),
}

/// Run the chat step until the wizard leaves it.
pub async fn run(wizard: &mut WizardController, prompt: &mut Prompt, config: &ClientConfig) -> Result<()> {
    let Some(project) = wizard.project_name().map(str::to_string) else {
        bail!("Chat step reached without a project name");
    };

    let mut session = ChatSession::new(
        project.clone(),
        Box::new(WsConnector::new()),
        Endpoint::new(&config.server_url),
    );
    if let Some(every) = config.keepalive() {
        session = session.with_keepalive(every);
    }

    println!();
    println!("💬 Spec chat for {}", project);
    println!("{}", HELP);
    connect(&mut session).await;

    let mut pending: Vec<AttachmentInput> = Vec::new();
    let mut shown = 0;

    while wizard.step() == Step::Chat && !wizard.is_finished() {
        let input = if session.is_connected() {
            tokio::select! {
                line = prompt.next_line() => Input::Line(line?),
                event = session.next_event() => Input::Event(event),
            }
        } else {
            Input::Line(prompt.next_line().await?)
        };

        match input {
            Input::Event(event) => {
                handle_event(wizard, &mut session, event, &mut shown).await;
            }
            Input::Line(line) => match parse_command(&line) {
                Ok(command) => {
                    run_command(wizard, &mut session, command, &mut pending).await;
                }
                Err(message) => println!("   {}", message),
            },
        }
    }

    session.close();
    Ok(())
}

async fn connect(session: &mut ChatSession) {
    match session.open().await {
        Ok(()) => println!("🔌 Connected"),
        Err(e) => {
            warn!(project = session.project(), error = %e, "Chat connection failed");
            println!("🔌 Not connected: {}. Type /reconnect to try again.", e);
        }
    }
}

async fn run_command(
    wizard: &mut WizardController,
    session: &mut ChatSession,
    command: ChatCommand,
    pending: &mut Vec<AttachmentInput>,
) {
    match command {
        ChatCommand::Empty => {}
        ChatCommand::Help => println!("{}", HELP),
        ChatCommand::Say(text) => match session.send_message(text, pending.clone()) {
            Ok(()) => pending.clear(),
            Err(ChatError::NotConnected) => {
                println!("   Not connected, message not sent. Type /reconnect.");
            }
            Err(ChatError::SendFailed { message_id }) => {
                pending.clear();
                println!("   ⚠️  Message {} was not delivered. Type /reconnect and send it again.", message_id);
            }
            Err(e) => println!("   Message not sent: {}", e),
        },
        ChatCommand::Attach(path) => match AttachmentInput::from_path(&path) {
            Ok(attachment) => {
                pending.push(attachment);
                println!("   📎 {} attached ({} pending)", path, pending.len());
            }
            Err(e) => println!("   Cannot attach {}: {}", path, e),
        },
        ChatCommand::Answer(picks) => {
            let Some(question) = session.store().current_question().cloned() else {
                println!("   No pending question");
                return;
            };
            match selected_option_ids(&question, &picks) {
                Ok(ids) => match session.answer_question(&question.question_id, ids) {
                    Ok(true) => {}
                    Ok(false) => println!("   Answer not sent"),
                    Err(e) => println!("   Answer not sent: {}", e),
                },
                Err(message) => println!("   {}", message),
            }
        }
        ChatCommand::Cancel => {
            if let Err(e) = wizard.cancel_chat() {
                report(wizard, &e);
            }
        }
        ChatCommand::Exit => {
            if let Err(e) = wizard.exit_to_project() {
                report(wizard, &e);
            }
        }
        ChatCommand::Retry => {
            if let Err(e) = wizard.retry_agent_start().await {
                report(wizard, &e);
            }
        }
        ChatCommand::Reconnect => connect(session).await,
    }
}

async fn handle_event(
    wizard: &mut WizardController,
    session: &mut ChatSession,
    event: SessionEvent,
    shown: &mut usize,
) {
    match event {
        SessionEvent::Updated { kind: "message" } => {
            let transcript = session.store().transcript();
            for message in transcript.iter().skip(*shown) {
                if message.role == MessageRole::Assistant {
                    println!("🤖 {}", message.content);
                }
            }
            *shown = transcript.len();
        }
        SessionEvent::Updated { kind: "progress" } => {
            if let Some(progress) = session.store().progress() {
                println!("   ⏳ {}", progress);
            }
        }
        SessionEvent::Updated { kind: "question" } => {
            if let Some(question) = session.store().current_question() {
                print_question(question);
            }
        }
        SessionEvent::Updated { .. } => {}
        SessionEvent::ServerError(message) => println!("   ⚠️  {}", message),
        SessionEvent::Disconnected => {
            let reason = session.last_error().unwrap_or("closed by server");
            println!("🔌 Disconnected ({}). Type /reconnect to try again.", reason);
        }
        SessionEvent::Completed { spec_path } => {
            info!(spec_path = %spec_path, "Spec written");
            println!("📄 Spec written to {}", spec_path);
            if let Err(e) = wizard.on_chat_complete(&spec_path).await {
                report(wizard, &e);
                println!("   Type /retry to start the agent again.");
            }
        }
    }
}

fn print_question(question: &Question) {
    println!("❓ {}", question.text);
    for (index, option) in question.options.iter().enumerate() {
        println!("   {}. {}", index + 1, option.label);
    }
    if question.multi_select {
        println!("   (pick one or more: /answer 1,3)");
    } else {
        println!("   (pick one: /answer 2)");
    }
}
