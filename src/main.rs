//! Studybot: study session tracker
//!
//! `studybot serve` runs the daemon that owns every user's active session.
//! The remaining subcommands are thin clients that send one event over the
//! daemon socket and print the result.

use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use studybot::config::{self, Config};
use studybot::history::{HistoryStore, JsonHistoryStore};
use studybot::ipc::{IpcMessage, IpcResponse};
use studybot::registry::{Outcome, SessionRegistry};
use studybot::time::{format_hours_minutes, parse_rfc3339_utc};
use studybot::{EventEnvelope, SessionEvent, client, report, server};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "studybot", about = "Study session tracker")]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// When the action happened (RFC 3339), for recording it after the fact
    #[arg(long, global = true, value_parser = parse_at)]
    at: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the daemon (default)
    Serve,
    /// Start studying a subject
    Start {
        #[arg(short, long, default_value = "local")]
        user: String,
        subject: String,
        /// Goal as HH:MM or whole hours
        #[arg(short, long)]
        goal: Option<String>,
    },
    /// Take a break
    Break {
        #[arg(short, long, default_value = "local")]
        user: String,
    },
    /// End the current break and resume studying
    Resume {
        #[arg(short, long, default_value = "local")]
        user: String,
    },
    /// End the session and record it
    End {
        #[arg(short, long, default_value = "local")]
        user: String,
    },
    /// Abandon the session without recording it
    Cancel {
        #[arg(short, long, default_value = "local")]
        user: String,
    },
    /// Show the active session
    Status {
        #[arg(short, long, default_value = "local")]
        user: String,
    },
    /// List completed sessions
    History {
        #[arg(short, long, default_value = "local")]
        user: String,
        /// Print raw JSON summaries
        #[arg(long)]
        json: bool,
    },
    /// Totals over completed sessions
    Stats {
        #[arg(short, long, default_value = "local")]
        user: String,
    },
    /// Check whether the daemon is running
    Ping,
}

fn parse_at(s: &str) -> Result<DateTime<Utc>, String> {
    parse_rfc3339_utc(s).ok_or_else(|| format!("invalid RFC 3339 timestamp: {s}"))
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("STUDYBOT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(false).init();
}

/// Translate a client subcommand into its request. `None` for `serve`.
fn request_for(command: Command, at: Option<DateTime<Utc>>) -> Option<(IpcMessage, bool)> {
    let event = |user: String, event: SessionEvent| {
        IpcMessage::Event(EventEnvelope {
            user_id: user,
            at,
            event,
        })
    };
    let request = match command {
        Command::Serve => return None,
        Command::Start {
            user,
            subject,
            goal,
        } => (event(user, SessionEvent::StartSession { subject, goal }), false),
        Command::Break { user } => (event(user, SessionEvent::StartBreak), false),
        Command::Resume { user } => (event(user, SessionEvent::EndBreak), false),
        Command::End { user } => (event(user, SessionEvent::EndSession), false),
        Command::Cancel { user } => (event(user, SessionEvent::CancelSession), false),
        Command::Status { user } => (event(user, SessionEvent::Status), false),
        Command::History { user, json } => (IpcMessage::History { user_id: user }, json),
        Command::Stats { user } => (IpcMessage::Stats { user_id: user }, false),
        Command::Ping => (IpcMessage::Ping, false),
    };
    Some(request)
}

fn serve(config: &Config) -> ExitCode {
    let registry = Arc::new(SessionRegistry::new());
    let history: Arc<dyn HistoryStore> = Arc::new(JsonHistoryStore::new(config.history_dir()));
    let socket = config.socket_path();
    info!("recording history in {}", config.history_dir().display());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    match rt.block_on(server::start(&socket, registry, history)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error on {}: {e}", socket.display());
            eprintln!("studybot: server error on {}: {e}", socket.display());
            ExitCode::FAILURE
        }
    }
}

fn print_response(response: IpcResponse, json: bool, config: &Config) -> ExitCode {
    let tz = config.display_tz();
    match response {
        IpcResponse::Outcome(Outcome::Cancelled) => println!("Session cancelled."),
        IpcResponse::Outcome(outcome) => {
            let headline = match &outcome {
                Outcome::Started(s) => format!("Started studying {}.", s.subject),
                Outcome::BreakStarted(_) => "Break started.".to_string(),
                Outcome::BreakEnded(_) => "Break ended. Back to studying!".to_string(),
                Outcome::Ended(s) => format!("Ended your review on {}. Congrats!", s.subject),
                Outcome::Status(_) | Outcome::Cancelled => String::new(),
            };
            if !headline.is_empty() {
                println!("{headline}");
            }
            if let Some(summary) = outcome.summary() {
                print!("{}", report::render_summary(summary, &tz));
            }
        }
        IpcResponse::History { sessions } if json => match serde_json::to_string_pretty(&sessions) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("studybot: {e}");
                return ExitCode::FAILURE;
            }
        },
        IpcResponse::History { sessions } => {
            if sessions.is_empty() {
                println!("No completed sessions yet.");
            }
            for summary in &sessions {
                let date = summary.start_time.with_timezone(&tz).format("%Y-%m-%d");
                println!(
                    "{date}  {:<16} study {:>7}  break {:>7}  ratio {}",
                    summary.subject,
                    format_hours_minutes(summary.total_study_time()),
                    format_hours_minutes(summary.total_break_time()),
                    summary.study_break_ratio
                );
            }
        }
        IpcResponse::Stats(stats) => {
            println!("Sessions: {}", stats.total_sessions);
            println!(
                "Total study time: {}",
                format_hours_minutes(TimeDelta::seconds(stats.total_study_secs))
            );
            println!(
                "Total break time: {}",
                format_hours_minutes(TimeDelta::seconds(stats.total_break_secs))
            );
            println!(
                "Average study time: {}",
                format_hours_minutes(TimeDelta::seconds(stats.average_study_secs))
            );
        }
        IpcResponse::Unrecorded { summary, message } => {
            println!("Ended your review on {}.", summary.subject);
            print!("{}", report::render_summary(&summary, &tz));
            eprintln!("studybot: session was not saved to history: {message}");
            return ExitCode::FAILURE;
        }
        IpcResponse::Pong => println!("studybot daemon is running"),
        IpcResponse::Error { message, .. } => {
            eprintln!("studybot: {message}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    let Some((message, json)) = request_for(cli.command.unwrap_or(Command::Serve), cli.at) else {
        return serve(&config);
    };

    match client::request(&config.socket_path(), &message) {
        Ok(response) => print_response(response, json, &config),
        Err(e) => {
            eprintln!("studybot: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_no_subcommand() {
        let cli = Cli::try_parse_from(["studybot"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn cli_verbose_three() {
        let cli = Cli::try_parse_from(["studybot", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn cli_start_with_goal() {
        let cli =
            Cli::try_parse_from(["studybot", "start", "MATH", "--goal", "01:30", "-u", "42"])
                .unwrap();
        let (message, _) = request_for(cli.command.unwrap(), cli.at).unwrap();
        assert_eq!(
            message,
            IpcMessage::Event(EventEnvelope::new(
                "42",
                SessionEvent::StartSession {
                    subject: "MATH".into(),
                    goal: Some("01:30".into()),
                }
            ))
        );
    }

    #[test]
    fn cli_resume_ends_break() {
        let cli = Cli::try_parse_from(["studybot", "resume"]).unwrap();
        let (message, _) = request_for(cli.command.unwrap(), cli.at).unwrap();
        assert_eq!(
            message,
            IpcMessage::Event(EventEnvelope::new("local", SessionEvent::EndBreak))
        );
    }

    #[test]
    fn cli_backdated_break() {
        let cli = Cli::try_parse_from(["studybot", "break", "--at", "2025-06-04T20:10:00+08:00"])
            .unwrap();
        let (message, _) = request_for(cli.command.unwrap(), cli.at).unwrap();
        let IpcMessage::Event(envelope) = message else {
            panic!("expected event");
        };
        assert_eq!(envelope.at, parse_rfc3339_utc("2025-06-04T12:10:00Z"));
    }

    #[test]
    fn cli_rejects_bad_timestamp() {
        assert!(Cli::try_parse_from(["studybot", "end", "--at", "yesterday"]).is_err());
    }

    #[test]
    fn cli_history_json() {
        let cli = Cli::try_parse_from(["studybot", "history", "--json"]).unwrap();
        let (message, json) = request_for(cli.command.unwrap(), cli.at).unwrap();
        assert_eq!(
            message,
            IpcMessage::History {
                user_id: "local".into()
            }
        );
        assert!(json);
    }

    #[test]
    fn unrecorded_session_fails_the_command() {
        let mut session = studybot::StudySession::start(
            "local",
            "MATH",
            None,
            parse_rfc3339_utc("2025-06-04T12:00:00Z").unwrap(),
        );
        let end = session
            .end(parse_rfc3339_utc("2025-06-04T12:30:00Z").unwrap())
            .unwrap();
        let response = IpcResponse::Unrecorded {
            summary: studybot::SessionSummary::capture(&session, end),
            message: "disk full".into(),
        };
        assert_eq!(
            print_response(response, false, &Config::default()),
            ExitCode::FAILURE
        );
        assert_eq!(
            print_response(IpcResponse::Pong, false, &Config::default()),
            ExitCode::SUCCESS
        );
    }

    #[test]
    fn cli_serve_is_not_a_request() {
        let cli = Cli::try_parse_from(["studybot", "serve"]).unwrap();
        assert!(request_for(cli.command.unwrap(), cli.at).is_none());
    }
}
