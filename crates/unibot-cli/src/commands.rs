//! Subcommand parsing and execution.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;

use unibot_core::models::{NewAssignment, Registration, Role};
use unibot_core::{Settings, StoreBackend};

use crate::format;
use crate::Client;

/// Maximum username length accepted at the prompt.
const MAX_USERNAME_LENGTH: usize = 150;

pub const USAGE: &str = "\
Usage: unibot <command> [args]

Account:
  login [username]                 Log in (password is prompted)
  logout                           Forget stored tokens
  whoami                           Show the signed-in user
  register                         Create an account interactively
  store <file|keyring>             Choose where tokens are kept

Courses:
  dashboard                        Overview for your role
  courses                          List your courses
  course <id>                      Show one course
  enrollments                      List your enrollments (students)
  assignments                      List your assignments (faculty)
  assign <course> <title> <text..> Create an assignment (faculty)
         [--due <RFC 3339 time>]
  syllabus <course> <text..>       Replace a course syllabus (faculty)

Chat:
  chat <message..>                 Ask UNIBOT a question
  history                          Show previous questions

Other:
  feedback                         List your feedback
  feedback <1-5> <comment..>       Rate UNIBOT
  info                             Show API information
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    WhoAmI,
    Register,
    Store(StoreBackend),
    Dashboard,
    Courses,
    Course(i64),
    Enrollments,
    Assignments,
    Assign {
        course: i64,
        title: String,
        content: String,
        due_date: Option<DateTime<Utc>>,
    },
    Syllabus { course: i64, text: String },
    Chat(String),
    History,
    Feedback,
    SubmitFeedback { rating: u8, comment: String },
    Info,
    Help,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.with_context(|| format!("Missing {}", what))?;
    value
        .parse()
        .with_context(|| format!("Invalid {} '{}'", what, value))
}

fn rest(args: &[String], from: usize, what: &str) -> Result<String> {
    let text = args.get(from..).unwrap_or_default().join(" ");
    if text.trim().is_empty() {
        bail!("Missing {}", what);
    }
    Ok(text)
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "login" => Command::Login {
                username: args.get(1).cloned(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "register" => Command::Register,
            "store" => Command::Store(
                args.get(1)
                    .context("Missing store backend")?
                    .parse()?,
            ),
            "dashboard" => Command::Dashboard,
            "courses" => Command::Courses,
            "course" => Command::Course(parse_id(args.get(1), "course id")?),
            "enrollments" => Command::Enrollments,
            "assignments" => Command::Assignments,
            "assign" => {
                let mut args = args.to_vec();
                let due_date = match args.iter().position(|a| a == "--due") {
                    Some(pos) => {
                        let value = args
                            .get(pos + 1)
                            .cloned()
                            .context("Missing value for --due")?;
                        args.drain(pos..pos + 2);
                        let due = DateTime::parse_from_rfc3339(&value)
                            .with_context(|| format!("Invalid due date '{}'", value))?;
                        Some(due.with_timezone(&Utc))
                    }
                    None => None,
                };
                Command::Assign {
                    course: parse_id(args.get(1), "course id")?,
                    title: args.get(2).cloned().context("Missing assignment title")?,
                    content: rest(&args, 3, "assignment text")?,
                    due_date,
                }
            }
            "syllabus" => Command::Syllabus {
                course: parse_id(args.get(1), "course id")?,
                text: rest(args, 2, "syllabus text")?,
            },
            "chat" => Command::Chat(rest(args, 1, "message")?),
            "history" => Command::History,
            "feedback" if args.len() == 1 => Command::Feedback,
            "feedback" => {
                let rating: u8 = args[1]
                    .parse()
                    .with_context(|| format!("Invalid rating '{}'", args[1]))?;
                if !(1..=5).contains(&rating) {
                    bail!("Rating must be between 1 and 5");
                }
                Command::SubmitFeedback {
                    rating,
                    comment: rest(args, 2, "comment")?,
                }
            }
            "info" => Command::Info,
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command '{}'", other),
        };
        Ok(command)
    }
}

pub async fn run(command: Command, client: &Client, settings: &mut Settings) -> Result<()> {
    match command {
        Command::Help => print!("{}", USAGE),
        Command::Login { username } => login(client, settings, username).await?,
        Command::Logout => {
            client.logout()?;
            println!("Logged out.");
        }
        Command::WhoAmI => match client.current_user().await? {
            Some(user) => println!("{}", format::user_summary(&user)),
            None => println!("Not logged in."),
        },
        Command::Register => register(client).await?,
        Command::Store(backend) => {
            if backend != settings.store && client.is_authenticated()? {
                client.logout()?;
                println!("Cleared tokens from the {} store.", settings.store);
            }
            settings.store = backend;
            settings.save()?;
            println!("Tokens will be kept in the {} store.", backend);
        }
        Command::Dashboard => dashboard(client).await?,
        Command::Courses => {
            let courses = client.courses().await?;
            println!("{}", format::course_table(&courses));
        }
        Command::Course(id) => {
            let course = client.course(id).await?;
            println!("{}", format::course_detail(&course));
        }
        Command::Enrollments => {
            let enrollments = client.enrollments().await?;
            println!("{}", format::enrollment_table(&enrollments));
        }
        Command::Assignments => {
            let assignments = client.assignments().await?;
            println!("{}", format::assignment_table(&assignments));
        }
        Command::Assign {
            course,
            title,
            content,
            due_date,
        } => {
            let created = client
                .create_assignment(&NewAssignment {
                    course,
                    title,
                    content,
                    due_date,
                })
                .await?;
            println!("Created assignment #{}: {}", created.id, created.title);
        }
        Command::Syllabus { course, text } => {
            let updated = client.update_syllabus(course, &text).await?;
            println!("Updated syllabus for {}", updated.title());
        }
        Command::Chat(message) => {
            let reply = client.send_message(&message).await?;
            println!("{}", reply.response);
        }
        Command::History => {
            let history = client.chat_history().await?;
            println!("{}", format::chat_history(&history));
        }
        Command::Feedback => {
            let feedback = client.my_feedback().await?;
            println!("{}", format::feedback_list(&feedback));
        }
        Command::SubmitFeedback { rating, comment } => {
            client.submit_feedback(&comment, rating).await?;
            println!("Thanks for the feedback!");
        }
        Command::Info => {
            let info = client.api_info().await?;
            println!("{} v{}", info.name, info.version);
            if !info.description.is_empty() {
                println!("{}", info.description);
            }
            for (name, path) in &info.endpoints {
                println!("  {:<10} {}", name, path);
            }
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn prompt_optional(label: &str) -> Result<Option<String>> {
    let value = prompt(label)?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

async fn login(client: &Client, settings: &mut Settings, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => {
            let label = match settings.last_username {
                Some(ref last) => format!("Username [{}]", last),
                None => "Username".to_string(),
            };
            let entered = prompt(&label)?;
            match (entered.is_empty(), settings.last_username.clone()) {
                (true, Some(last)) => last,
                _ => entered,
            }
        }
    };
    if username.is_empty() || username.len() > MAX_USERNAME_LENGTH {
        bail!("Username must be between 1 and {} characters", MAX_USERNAME_LENGTH);
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password required");
    }

    client.login(&username, &password).await?;

    settings.last_username = Some(username.clone());
    if let Err(e) = settings.save() {
        warn!(error = %e, "Failed to save config");
    }

    match client.current_user().await? {
        Some(user) => println!("Logged in as {}", format::user_summary(&user)),
        None => println!("Logged in as {}", username),
    }
    Ok(())
}

async fn register(client: &Client) -> Result<()> {
    let username = prompt("Username")?;
    let email = prompt("Email")?;
    let first_name = prompt("First name")?;
    let last_name = prompt("Last name")?;
    let role = match prompt("Role (student/faculty) [student]")?.to_lowercase().as_str() {
        "" | "student" => Role::Student,
        "faculty" => Role::Faculty,
        other => bail!("Unknown role '{}'", other),
    };
    let department = prompt_optional("Department (optional)")?;
    let password = rpassword::prompt_password("Password: ")?;
    let password_confirm = rpassword::prompt_password("Confirm password: ")?;

    let user = client
        .register(&Registration {
            username,
            email,
            password,
            password_confirm,
            first_name,
            last_name,
            role,
            department,
        })
        .await?;

    println!("Account created for {}. Run `unibot login` to sign in.", user.display_name());
    Ok(())
}

/// Profile first, then the role's lists fetched concurrently.
async fn dashboard(client: &Client) -> Result<()> {
    let Some(user) = client.current_user().await? else {
        bail!(unibot_core::ApiError::Unauthorized);
    };
    println!("{}\n", format::user_summary(&user));

    match user.role {
        Role::Student => {
            let (courses, enrollments, history) = futures::try_join!(
                client.courses(),
                client.enrollments(),
                client.chat_history()
            )?;
            println!("Courses\n{}\n", format::course_table(&courses));
            println!("Enrollments\n{}\n", format::enrollment_table(&enrollments));
            println!("Recent questions\n{}", format::chat_history(&format::recent(&history, 5)));
        }
        Role::Faculty => {
            let (courses, assignments) =
                futures::try_join!(client.courses(), client.assignments())?;
            println!("Courses taught\n{}\n", format::course_table(&courses));
            println!("Assignments\n{}", format::assignment_table(&assignments));
        }
        Role::Admin => {
            let courses = client.courses().await?;
            println!("All courses\n{}", format::course_table(&courses));
        }
    }
    Ok(())
}
