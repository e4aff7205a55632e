//! Tutor CLI - drives a learning session against a live tutoring service
//!
//! Plain lines are sent as chat messages; slash commands run assessments
//! and side flows. Ctrl-C cancels a reply that is still streaming.

use std::io::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_session::api::UploadFile;
use tutor_session::quiz::{ActiveQuiz, QuizReport};
use tutor_session::state_machine::SessionMode;
use tutor_session::{AssessmentKind, ClientConfig, HttpTutorApi, Session, SessionError, TutorApi};

const HELP: &str = "\
Commands:
  <text>                  send a chat message
  /mcq, /qa               start an assessment
  /answer <id> <value>    answer a question (option letter or number for MCQ)
  /submit                 submit all answers
  /exit                   leave the assessment
  /revise                 revision material for weak areas
  /upload <path>          ground the conversation in a file
  /history                list past sessions
  /profile                show the learner profile
  /reset                  wipe memory and start over
  /retry                  resend the last failed message
  /quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Chat(String),
    Assess(AssessmentKind),
    Answer { question_id: String, value: String },
    Submit,
    Exit,
    Revise,
    Upload(PathBuf),
    History,
    Profile,
    Reset,
    Retry,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Some(Command::Chat(line.to_string())));
        };

        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, rest)| (name, rest.trim()));
        let parsed = match name {
            "mcq" => Command::Assess(AssessmentKind::Mcq),
            "qa" => Command::Assess(AssessmentKind::Qa),
            "answer" => {
                let (question_id, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or("usage: /answer <id> <value>")?;
                Command::Answer {
                    question_id: question_id.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "submit" => Command::Submit,
            "exit" => Command::Exit,
            "revise" => Command::Revise,
            "upload" if !rest.is_empty() => Command::Upload(PathBuf::from(rest)),
            "upload" => return Err("usage: /upload <path>".to_string()),
            "history" => Command::History,
            "profile" => Command::Profile,
            "reset" => Command::Reset,
            "retry" => Command::Retry,
            "help" => Command::Help,
            "quit" => Command::Quit,
            other => return Err(format!("unknown command: /{other}")),
        };
        Ok(Some(parsed))
    }
}

/// Option index from a letter (`b`) or a 1-based number (`2`)
fn parse_option(value: &str) -> Option<usize> {
    if let Ok(n) = value.parse::<usize>() {
        return n.checked_sub(1);
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => u8::try_from(c.to_ascii_lowercase())
            .ok()
            .map(|b| usize::from(b - b'a')),
        _ => None,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tutor_session=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("TUTOR_LOG_FORMAT").is_ok_and(|f| f == "pretty") {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ClientConfig::from_env();
    let api = HttpTutorApi::new(&config.api_url)?;
    tracing::info!(
        api_url = %config.api_url,
        user_id = %config.user_id,
        session_id = %config.session_id,
        "Starting tutor session"
    );

    let mut session = Session::new(api, config);
    if !session.refresh_profile().await {
        println!("(profile unavailable; assessments need a loaded profile)");
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", session.mode());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&mut session, command).await {
            println!("error: {e}");
            if e.is_recoverable() {
                println!("(recoverable; try again)");
            }
        }
    }

    Ok(())
}

async fn run<A: TutorApi>(session: &mut Session<A>, command: Command) -> Result<(), SessionError> {
    match command {
        Command::Chat(text) => {
            let cancel = session.cancel_handle();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
            let result = session
                .send_message_with(&text, |fragment, _| {
                    print!("{fragment}");
                    let _ = std::io::stdout().flush();
                })
                .await;
            watcher.abort();
            println!();
            result?;
        }
        Command::Retry => {
            session.retry_last().await?;
            print_last_turn(session);
        }
        Command::Assess(kind) => {
            let count = session.start_assessment(kind).await?;
            println!("{kind} assessment with {count} question(s):");
            print_questions(session);
        }
        Command::Answer { question_id, value } => match session.mode() {
            SessionMode::Mcq => {
                let Some(option) = parse_option(&value) else {
                    println!("option must be a letter or a 1-based number");
                    return Ok(());
                };
                session.answer_option(&question_id, option)?;
            }
            SessionMode::Qa | SessionMode::Study => session.answer_text(&question_id, value)?,
        },
        Command::Submit => print_report(&session.submit().await?),
        Command::Exit => session.exit_assessment().await?,
        Command::Revise => {
            if session.revise().await? {
                print_last_turn(session);
            } else {
                println!("revision material is unavailable right now");
            }
        }
        Command::Upload(path) => {
            let file = match UploadFile::from_path(&path).await {
                Ok(file) => file,
                Err(e) => {
                    println!("cannot read {}: {e}", path.display());
                    return Ok(());
                }
            };
            session.upload_file(&file).await?;
            print_last_turn(session);
        }
        Command::History => {
            session.fetch_history().await;
            for entry in session.history() {
                println!(
                    "{}  {}  {} turn(s)",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.session_id,
                    entry.turns.len()
                );
            }
        }
        Command::Profile => {
            session.refresh_profile().await;
            match session.profile() {
                Some(profile) => println!(
                    "level: {}\nknown: {}\nweak: {}",
                    profile.knowledge_level,
                    profile.known_concepts.join(", "),
                    profile.weak_areas.join(", ")
                ),
                None => println!("profile unavailable"),
            }
        }
        Command::Reset => {
            let ack = session.reset().await?;
            println!("{}", ack.message);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_last_turn<A: TutorApi>(session: &Session<A>) {
    if let Some(turn) = session.state().transcript.last() {
        println!("{}", turn.content());
    }
}

fn print_questions<A: TutorApi>(session: &Session<A>) {
    match session.state().quiz.active() {
        Some(ActiveQuiz::Mcq(round)) => {
            for question in round.questions() {
                println!("[{}] {}", question.id, question.prompt);
                for (letter, option) in ('a'..='z').zip(&question.options) {
                    println!("    {letter}) {option}");
                }
            }
        }
        Some(ActiveQuiz::Qa(round)) => {
            for question in round.questions() {
                println!("[{}] {}", question.id, question.prompt);
            }
        }
        None => {}
    }
}

fn print_report(report: &QuizReport) {
    match report {
        QuizReport::Mcq { results, score } => {
            for (id, result) in results {
                let mark = if result.is_correct { "correct" } else { "incorrect" };
                println!("[{id}] {mark}: {}", result.explanation);
            }
            println!("score: {score} ({:.2}%)", score.percentage());
        }
        QuizReport::Qa {
            results,
            mean,
            grade,
        } => {
            for (id, result) in results {
                println!("[{id}] {:.1}/10: {}", result.total_score, result.feedback);
            }
            println!("mean: {mean:.2} ({grade})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Command::parse("  what is a borrow?  "),
            Ok(Some(Command::Chat("what is a borrow?".to_string())))
        );
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(
            Command::parse("/mcq"),
            Ok(Some(Command::Assess(AssessmentKind::Mcq)))
        );
        assert_eq!(
            Command::parse("/upload notes/ch1.pdf"),
            Ok(Some(Command::Upload(PathBuf::from("notes/ch1.pdf"))))
        );
        assert_eq!(
            Command::parse("/answer q2 Ownership moves the value into the callee."),
            Ok(Some(Command::Answer {
                question_id: "q2".to_string(),
                value: "Ownership moves the value into the callee.".to_string(),
            }))
        );
    }

    #[test]
    fn test_malformed_commands() {
        assert!(Command::parse("/answer q1").is_err());
        assert!(Command::parse("/upload").is_err());
        assert!(Command::parse("/dance").is_err());
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!(parse_option("b"), Some(1));
        assert_eq!(parse_option("C"), Some(2));
        assert_eq!(parse_option("1"), Some(0));
        assert_eq!(parse_option("0"), None);
        assert_eq!(parse_option("ab"), None);
    }
}
