use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use interview_core::Command;
use interview_core::evaluator::build_evaluator;
use interview_core::generation::{GenerationRequest, generate_interview};
use interview_core::interview::{initials_from_role, normalize_tech_name};
use interview_core::orchestrator::FeedbackOrchestrator;
use interview_core::prompt_loader::{self, PROMPTS_DIR};
use interview_core::repository::{DEFAULT_LATEST_LIMIT, InterviewRepository};
use interview_core::router::Destination;
use interview_core::session::{
    CallSession, ConductInterview, GenerateQuestions, InterviewContext, SessionPurpose,
};
use interview_core::store::JsonlStore;
use interview_service::config::Config;
use interview_service::voice_adapter::GatewayTransport;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Practice job interviews over a voice call")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate questions and store them as a new interview
    Generate {
        #[arg(long)]
        role: String,
        /// Junior, Mid-Level or Senior
        #[arg(long)]
        level: String,
        /// Technical, Behavioral or Mixed
        #[arg(long = "type")]
        interview_type: String,
        /// Comma-separated technologies
        #[arg(long)]
        techstack: String,
        #[arg(long, default_value_t = 5)]
        amount: u32,
        #[arg(long)]
        user_id: String,
    },
    /// Run a voice interview and request feedback when it ends
    Interview {
        interview_id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        user_name: Option<String>,
        /// Overwrite this feedback document instead of creating a new one
        #[arg(long)]
        feedback_id: Option<String>,
    },
    /// Talk to the planning assistant to set up a new interview
    Plan {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        user_name: Option<String>,
    },
    /// Show the stored feedback for an interview
    Feedback {
        interview_id: String,
        #[arg(long)]
        user_id: String,
    },
    /// List a user's interviews with their scores
    List {
        #[arg(long)]
        user_id: String,
    },
    /// Show recent interviews created by other users
    Latest {
        #[arg(long)]
        user_id: String,
        #[arg(long, default_value_t = DEFAULT_LATEST_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let cli = Cli::parse();

    // --- 4. Load Prompts ---
    let prompts = prompt_loader::load_prompt_set(Path::new(PROMPTS_DIR))
        .context("Failed to load LLM prompts")?;

    // --- 5. Initialize Collaborators ---
    let store = JsonlStore::open(&config.data_path)
        .await
        .with_context(|| format!("Failed to open store at {}", config.data_path.display()))?;
    let repository = InterviewRepository::new(Arc::new(store));
    let evaluator = build_evaluator(
        config.provider,
        config.api_key()?.to_string(),
        config.chat_model.clone(),
        prompts.clone(),
    );

    match cli.command {
        Commands::Generate {
            role,
            level,
            interview_type,
            techstack,
            amount,
            user_id,
        } => {
            let request = GenerationRequest {
                interview_type: Some(interview_type),
                role: Some(role),
                level: Some(level),
                techstack: Some(techstack),
                amount: Some(amount),
                user_id: Some(user_id),
            };
            let id = generate_interview(evaluator.as_ref(), &repository, &request).await?;
            println!("{id}");
        }
        Commands::Interview {
            interview_id,
            user_id,
            user_name,
            feedback_id,
        } => {
            let Some(interview) = repository.get_interview_by_id(&interview_id).await? else {
                bail!("Interview '{}' not found", interview_id);
            };
            tracing::info!(
                "Starting {} interview for {} ({} questions)",
                interview.interview_type,
                interview.role,
                interview.questions.len()
            );
            let context = InterviewContext {
                interview_id: Some(interview_id),
                user_id: Some(user_id.clone()),
                user_name,
                feedback_id,
                questions: interview.questions,
            };
            let orchestrator = FeedbackOrchestrator::new(evaluator, repository.clone());
            let purpose = ConductInterview::new(context, orchestrator, prompts);
            let destination = run_session(purpose, &config).await?;

            if let Destination::Feedback { interview_id } = destination {
                print_feedback(&repository, &interview_id, &user_id).await?;
            }
        }
        Commands::Plan { user_id, user_name } => {
            let purpose = GenerateQuestions::new(user_name, Some(user_id), prompts);
            run_session(purpose, &config).await?;
        }
        Commands::Feedback {
            interview_id,
            user_id,
        } => {
            print_feedback(&repository, &interview_id, &user_id).await?;
        }
        Commands::List { user_id } => {
            for listed in repository.get_interviews_by_user_id(&user_id).await? {
                let interview = &listed.interview;
                let score = listed
                    .feedback
                    .as_ref()
                    .map(|f| format!("{}/100", f.total_score))
                    .unwrap_or_else(|| "---/100".to_string());
                println!(
                    "[{}] {} {} ({}, {}) {} [{}]",
                    initials_from_role(&interview.role),
                    interview.id.as_deref().unwrap_or_default(),
                    interview.role,
                    interview.interview_type,
                    interview.level,
                    score,
                    tech_tags(&interview.techstack)
                );
            }
        }
        Commands::Latest { user_id, limit } => {
            for interview in repository.get_latest_interviews(&user_id, limit).await? {
                println!(
                    "[{}] {} {} ({}) [{}]",
                    initials_from_role(&interview.role),
                    interview.id.as_deref().unwrap_or_default(),
                    interview.role,
                    interview.created_at.format("%b %d, %Y"),
                    tech_tags(&interview.techstack)
                );
            }
        }
    }
    Ok(())
}

fn tech_tags(techstack: &[String]) -> String {
    techstack
        .iter()
        .map(|t| normalize_tech_name(t))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn print_feedback(
    repository: &InterviewRepository,
    interview_id: &str,
    user_id: &str,
) -> Result<()> {
    match repository
        .get_feedback_by_interview_id(interview_id, user_id)
        .await?
    {
        Some(feedback) => println!("{}", serde_json::to_string_pretty(&feedback)?),
        None => println!("No feedback for interview {interview_id} yet."),
    }
    Ok(())
}

/// Prints what the session asks the runtime to show.
fn spawn_command_handler(mut command_rx: mpsc::Receiver<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Caption(text) => println!("> {text}"),
                Command::Speaking(speaking) => tracing::debug!("Assistant speaking: {}", speaking),
                Command::Notify(message) => tracing::warn!("{}", message),
                Command::Processing(true) => println!("Generating feedback..."),
                Command::Processing(false) => tracing::debug!("Feedback generation finished"),
                Command::Navigate(destination) => tracing::info!("Next: {}", destination),
            }
        }
    })
}

/// Runs one call to completion. The first Ctrl-C hangs up; the session then
/// finishes its completion step before returning.
async fn run_session<P: SessionPurpose + 'static>(purpose: P, config: &Config) -> Result<Destination> {
    let transport = GatewayTransport::connect(&config.voice_gateway_url, &config.voice_api_key).await?;

    let (command_tx, command_rx) = mpsc::channel::<Command>(64);
    let command_handler = spawn_command_handler(command_rx);

    let (session, handle) = CallSession::new(purpose, Box::new(transport), command_tx);
    let mut run = tokio::spawn(session.run());

    let destination = loop {
        tokio::select! {
            result = &mut run => break result??,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, ending the call...");
                if let Err(e) = handle.stop().await {
                    tracing::warn!("{:#}", e);
                }
            }
        }
    };

    command_handler.await?;
    Ok(destination)
}
