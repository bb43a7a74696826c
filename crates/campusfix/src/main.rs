//! CampusFix command-line tracker
//!
//! Thin front end over [`LifecycleEngine`]: resolve the acting user, run one
//! operation, print the result as text or as a `--json` envelope.

use clap::Parser;
use campusfix::cli::{Cli, Commands, IssueCommands, MessCommands, UserCommands};
use campusfix::issue_log::JsonlIssueLog;
use campusfix::mess::MessRatingDraft;
use campusfix::output::OutputContext;
use campusfix::{
    ActionableError, ExitCode, IssueDraft, JsonError, JsonOutput, JsonFileStorage,
    LifecycleEngine, LifecycleError, ProfileUpdate, User,
};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Engine = LifecycleEngine<JsonFileStorage>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CAMPUSFIX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let command_name = command_name(&cli.command);

    let exit_code = match run(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => report_error(&e, json, command_name),
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

fn report_error(error: &anyhow::Error, json: bool, command: &str) -> ExitCode {
    match error.downcast_ref::<LifecycleError>() {
        Some(lifecycle) => {
            if json {
                let output = JsonError::from_lifecycle(lifecycle, command);
                match output.to_json_string() {
                    Ok(s) => println!("{}", s),
                    Err(_) => eprintln!("Error: {}", lifecycle),
                }
            } else {
                eprint!("{}", ActionableError::from(lifecycle));
            }
            ExitCode::from(lifecycle)
        }
        None => {
            if json {
                let output = JsonError::new("error", format!("{:#}", error), command);
                if let Ok(s) = output.to_json_string() {
                    println!("{}", s);
                }
            } else {
                eprintln!("Error: {:#}", error);
            }
            ExitCode::GenericError
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::Stats => "stats",
        Commands::User(sub) => match sub {
            UserCommands::Add { .. } => "user add",
            UserCommands::List { .. } => "user list",
            UserCommands::Update { .. } => "user update",
            UserCommands::RequestHostel { .. } => "user request-hostel",
            UserCommands::ManageHostel { .. } => "user manage-hostel",
        },
        Commands::Issue(sub) => match sub {
            IssueCommands::Create { .. } => "issue create",
            IssueCommands::List => "issue list",
            IssueCommands::Status { .. } => "issue status",
            IssueCommands::Delete { .. } => "issue delete",
            IssueCommands::Comment { .. } => "issue comment",
            IssueCommands::Rate { .. } => "issue rate",
        },
        Commands::Mess(sub) => match sub {
            MessCommands::Rate { .. } => "mess rate",
            MessCommands::Analytics { .. } => "mess analytics",
        },
    }
}

/// Data directory: CAMPUSFIX_DATA_DIR (relative to the working directory) or `.campusfix/`
fn data_dir() -> anyhow::Result<PathBuf> {
    let current_dir = env::current_dir()?;
    Ok(match env::var("CAMPUSFIX_DATA_DIR") {
        Ok(custom_dir) => current_dir.join(custom_dir),
        Err(_) => current_dir.join(".campusfix"),
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let dir = data_dir()?;
    let storage = JsonFileStorage::new(&dir);
    let engine = LifecycleEngine::open(storage)?
        .with_issue_log(Arc::new(JsonlIssueLog::new(dir.join("data/issue_log.jsonl"))));
    let out = OutputContext::new(cli.quiet, cli.json);
    let caller_id = cli.as_user.as_deref();

    match cli.command {
        Commands::Init => {
            engine.init()?;
            emit(&out, "init", &serde_json::json!({ "root": dir }), || {
                format!("Initialized CampusFix data in {}", dir.display())
            })
        }
        Commands::Stats => {
            let caller = caller(&engine, caller_id)?;
            let stats = engine.stats(&caller)?;
            emit(&out, "stats", &stats, || {
                format!(
                    "Total: {}  Pending: {}  Resolved: {}  Mine: {}",
                    stats.total_issues, stats.pending, stats.resolved, stats.my_issues
                )
            })
        }
        Commands::User(sub) => run_user(&engine, &out, caller_id, sub),
        Commands::Issue(sub) => run_issue(&engine, &out, caller_id, sub),
        Commands::Mess(sub) => run_mess(&engine, &out, caller_id, sub),
    }
}

fn caller(engine: &Engine, caller_id: Option<&str>) -> Result<User, LifecycleError> {
    engine.resolve_caller(caller_id.unwrap_or_default())
}

/// Print `data` as a JSON envelope, or the human line built by `human`.
fn emit<T: Serialize>(
    out: &OutputContext,
    command: &str,
    data: &T,
    human: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if out.is_json() {
        println!("{}", JsonOutput::success(data, command).to_json_string()?);
    } else {
        out.print_data(human())?;
    }
    Ok(())
}

fn run_user(
    engine: &Engine,
    out: &OutputContext,
    caller_id: Option<&str>,
    command: UserCommands,
) -> anyhow::Result<()> {
    match command {
        UserCommands::Add {
            name,
            role,
            email,
            hostel,
            room,
        } => {
            let mut user = User::new(name, role);
            user.email = email;
            user.hostel = hostel;
            user.room_no = room;
            let user = engine.register_user(user)?;
            emit(out, "user add", &user, || user.id.clone())
        }
        UserCommands::List { students } => {
            let users = if students {
                let caller = caller(engine, caller_id)?;
                engine.list_students(&caller)?
            } else {
                engine.list_users()?
            };
            emit(out, "user list", &users, || {
                users
                    .iter()
                    .map(|u| {
                        format!(
                            "{}  {:<24} {:?}  trust {:.1}  {}",
                            u.id,
                            u.full_name,
                            u.role,
                            u.trust_score,
                            u.hostel.as_deref().unwrap_or("-")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        UserCommands::Update {
            name,
            phone,
            hostel,
            room,
        } => {
            let caller = caller(engine, caller_id)?;
            let update = ProfileUpdate {
                full_name: name,
                phone,
                hostel,
                room_no: room,
            };
            let user = engine.update_profile(&caller, update)?;
            emit(out, "user update", &user, || {
                format!(
                    "Updated {} (hostel: {}, room: {})",
                    user.full_name,
                    user.hostel.as_deref().unwrap_or("-"),
                    user.room_no.as_deref().unwrap_or("-")
                )
            })
        }
        UserCommands::RequestHostel { hostel } => {
            let caller = caller(engine, caller_id)?;
            let user = engine.request_hostel_change(&caller, &hostel)?;
            emit(out, "user request-hostel", &user, || {
                format!("Requested move to {}", hostel)
            })
        }
        UserCommands::ManageHostel {
            student_id,
            approve,
            reject,
        } => {
            if approve == reject {
                return Err(LifecycleError::Validation(
                    "pass exactly one of --approve or --reject".to_string(),
                )
                .into());
            }
            let caller = caller(engine, caller_id)?;
            let student = engine.resolve_hostel_request(&caller, &student_id, approve)?;
            emit(out, "user manage-hostel", &student, || {
                let verdict = if approve { "Approved" } else { "Rejected" };
                format!(
                    "{} hostel request for {} (hostel: {})",
                    verdict,
                    student.full_name,
                    student.hostel.as_deref().unwrap_or("-")
                )
            })
        }
    }
}

fn run_issue(
    engine: &Engine,
    out: &OutputContext,
    caller_id: Option<&str>,
    command: IssueCommands,
) -> anyhow::Result<()> {
    let caller = caller(engine, caller_id)?;

    match command {
        IssueCommands::Create {
            title,
            description,
            category,
            location,
            spot,
            priority,
            image,
        } => {
            let draft = IssueDraft {
                title,
                description,
                category,
                sub_location: location,
                specific_location: spot,
                priority,
                image_data: image,
            };
            let view = engine.create_issue(draft, &caller)?;
            emit(out, "issue create", &view, || view.id.clone())
        }
        IssueCommands::List => {
            let views = engine.list_issues(&caller)?;
            emit(out, "issue list", &views, || {
                if views.is_empty() {
                    return "No issues".to_string();
                }
                views
                    .iter()
                    .map(|v| {
                        format!(
                            "{}  {:<6} {:<12} {:<28} {} / {}  ({}, trust {:.1})",
                            &v.id[..v.id.len().min(8)],
                            format!("{:?}", v.priority),
                            v.status.label(),
                            v.title,
                            v.sub_location,
                            v.specific_location,
                            v.owner_name,
                            v.owner_trust_score
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        IssueCommands::Status { id, status } => {
            let id = engine.resolve_issue_id(&id)?;
            let outcome = engine.change_status(&id, status, &caller)?;
            emit(out, "issue status", &outcome, || {
                if !outcome.effective {
                    return format!("Issue already {}", outcome.to);
                }
                match outcome.trust_delta {
                    Some(delta) if delta != 0.0 => format!(
                        "Status: {} -> {} (reporter trust {:+.1})",
                        outcome.from, outcome.to, delta
                    ),
                    _ => format!("Status: {} -> {}", outcome.from, outcome.to),
                }
            })
        }
        IssueCommands::Delete { id } => {
            let id = engine.resolve_issue_id(&id)?;
            engine.delete_issue(&id, &caller)?;
            if out.is_json() {
                println!(
                    "{}",
                    JsonOutput::success(serde_json::json!({ "id": id }), "issue delete")
                        .to_json_string()?
                );
            } else {
                out.print_success(format!("Deleted issue {}", id))?;
            }
            Ok(())
        }
        IssueCommands::Comment { id, text } => {
            let id = engine.resolve_issue_id(&id)?;
            let comment = engine.add_comment(&id, &text, &caller)?;
            emit(out, "issue comment", &comment, || comment.id.clone())
        }
        IssueCommands::Rate { id, rating, review } => {
            let id = engine.resolve_issue_id(&id)?;
            let issue = engine.rate_issue(&id, rating, review, &caller)?;
            emit(out, "issue rate", &issue, || {
                format!("Rated {} {}/5", issue.short_id(), rating)
            })
        }
    }
}

fn run_mess(
    engine: &Engine,
    out: &OutputContext,
    caller_id: Option<&str>,
    command: MessCommands,
) -> anyhow::Result<()> {
    match command {
        MessCommands::Rate {
            mess,
            hygiene,
            taste,
            quality,
            review,
            suggestions,
            image,
        } => {
            let caller = caller(engine, caller_id)?;
            let draft = MessRatingDraft {
                mess_name: mess,
                hygiene,
                taste,
                quality,
                review,
                suggestions,
                image_data: image,
            };
            let rating = engine.submit_mess_rating(draft, &caller)?;
            emit(out, "mess rate", &rating, || {
                format!("Recorded rating for {} (week of {})", rating.mess_name, rating.week_start)
            })
        }
        MessCommands::Analytics { mess, scope } => {
            let report = engine.mess_analytics(mess.as_deref(), scope)?;
            emit(out, "mess analytics", &report, || {
                format!(
                    "Overall {:.1} (hygiene {:.1}, taste {:.1}, quality {:.1}) from {} ratings\nSentiment: {}\nAction: {}",
                    report.avg.overall,
                    report.avg.hygiene,
                    report.avg.taste,
                    report.avg.quality,
                    report.total,
                    report.sentiment,
                    report.action_item
                )
            })
        }
    }
}
