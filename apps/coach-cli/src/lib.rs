#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use coach_client_core::{
    ENV_STATE_DIR, FeedbackRequest, FileStore, Goal, KeyValueStore, NudgeRequest, PlanRequest,
    SettingsPatch, StoredProfile, UserProfile, resolve_state_dir,
};
use coach_gateway_client::{GatewayClient, ScheduleResult};

mod render;

pub const ENV_GATEWAY_URL: &str = "HEALTH_COACH_GATEWAY_URL";
pub const ENV_USER_ID: &str = "HEALTH_COACH_USER_ID";

#[derive(Parser, Debug)]
#[command(name = "coach")]
#[command(about = "Plan, schedule, nudge, and feedback against a health coach gateway")]
pub struct CoachCli {
    /// Directory holding settings and cached results
    #[arg(long, global = true, env = ENV_STATE_DIR)]
    pub state_dir: Option<PathBuf>,
    /// Gateway base URL (saved for later runs)
    #[arg(long, global = true, env = ENV_GATEWAY_URL)]
    pub gateway_url: Option<String>,
    /// User id sent with every request (saved for later runs)
    #[arg(long, global = true, env = ENV_USER_ID)]
    pub user_id: Option<String>,
    /// Print gateway responses as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether the gateway is reachable
    Ping,
    /// Show or reset saved settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Request today's meal and workout plan
    Plan(PlanArgs),
    /// Commit today's schedule built from the last plan
    Schedule(ScheduleArgs),
    /// Send a motivational nudge
    Nudge(NudgeArgs),
    /// Submit feedback for a scheduled event
    Feedback(FeedbackArgs),
    /// Print the last cached plan or schedule
    Cached {
        #[arg(value_enum)]
        kind: CachedKind,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsCommand {
    Show,
    Reset,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedKind {
    Plan,
    Schedule,
}

/// Profile flags left unset fall back to the profile saved by the last plan.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    #[arg(long)]
    pub age: Option<u32>,
    #[arg(long)]
    pub sex: Option<String>,
    #[arg(long)]
    pub height_cm: Option<f64>,
    #[arg(long)]
    pub weight_kg: Option<f64>,
    #[arg(long)]
    pub activity: Option<String>,
    /// Goal type, e.g. fat_loss, muscle_gain, endurance, general_health
    #[arg(long = "goal")]
    pub goal_type: Option<String>,
    #[arg(long)]
    pub deficit_kcal: Option<i64>,
    #[arg(long)]
    pub target_minutes: Option<u32>,
    /// Comma-separated equipment list
    #[arg(long)]
    pub equipment: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Comma-separated HH:MM meal times
    #[arg(long, default_value = "08:00,13:00,19:00")]
    pub meal_times: String,
    /// HH:MM workout time; anything else skips the workout
    #[arg(long, default_value = "18:00")]
    pub workout_time: String,
}

#[derive(Args, Debug, Clone)]
pub struct NudgeArgs {
    #[arg(long, default_value = "coach")]
    pub tone: String,
    #[arg(long, default_value = "stay_consistent")]
    pub goal: String,
}

#[derive(Args, Debug, Clone)]
pub struct FeedbackArgs {
    #[arg(long)]
    pub event_id: String,
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub rating: i64,
    #[arg(long, default_value = "felt great")]
    pub reason: String,
    #[arg(long)]
    pub bandit_arm: Option<String>,
}

pub async fn run(cli: CoachCli) -> Result<()> {
    let state_dir = resolve_state_dir(cli.state_dir.as_deref());
    tracing::debug!(state_dir = %state_dir.display(), "using state directory");
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(state_dir));
    let client = GatewayClient::new(store);

    let patch = SettingsPatch {
        gateway_url: cli.gateway_url,
        user_id: cli.user_id,
    };
    if !patch.is_empty() {
        client
            .settings()
            .save(patch)
            .context("failed to save settings")?;
    }

    let output = execute(&client, cli.command, cli.json).await?;
    println!("{output}");
    Ok(())
}

/// Runs one command and returns what should be printed.
pub async fn execute(client: &GatewayClient, command: Commands, json: bool) -> Result<String> {
    match command {
        Commands::Ping => {
            let status = client.ping().await;
            Ok(if json {
                render::pretty_json(&serde_json::to_value(&status)?)
            } else {
                render::ping_summary(&status, &client.settings().gateway_base())
            })
        }
        Commands::Settings { command } => {
            let settings = match command {
                SettingsCommand::Show => client.settings().get(),
                SettingsCommand::Reset => client
                    .settings()
                    .reset()
                    .context("failed to reset settings")?,
            };
            Ok(render::pretty_json(&serde_json::to_value(&settings)?))
        }
        Commands::Plan(args) => {
            require_user_id(client)?;
            let request = plan_request(args, client.cache().load_profile())?;
            let plan = client.plan_today(&request).await?;
            client.cache().save_profile(&StoredProfile {
                profile: request.profile.clone(),
                goal: request.goal.clone(),
                equipment: request.equipment_or_empty().to_vec(),
            });
            Ok(if json {
                render::pretty_json(&plan)
            } else {
                render::plan_summary(&plan)
            })
        }
        Commands::Schedule(args) => {
            require_user_id(client)?;
            let response = client
                .schedule_from_cache(&args.meal_times, Some(args.workout_time.as_str()))
                .await?;
            Ok(if json {
                render::pretty_json(&response)
            } else {
                render::schedule_summary(&ScheduleResult::from_value(&response))
            })
        }
        Commands::Nudge(args) => {
            require_user_id(client)?;
            let goal = args.goal.trim();
            if goal.is_empty() {
                bail!("Goal text is required.");
            }
            let nudge = client
                .send_nudge(&NudgeRequest {
                    tone: args.tone.clone(),
                    goal: goal.to_string(),
                })
                .await?;
            Ok(if json {
                render::pretty_json(&nudge.raw)
            } else {
                render::nudge_summary(&nudge, &args.tone, goal)
            })
        }
        Commands::Feedback(args) => {
            require_user_id(client)?;
            if args.event_id.trim().is_empty() {
                bail!("Event ID is required.");
            }
            let response = client
                .submit_feedback(&FeedbackRequest {
                    event_id: args.event_id,
                    rating: args.rating,
                    reason: args.reason,
                    bandit_arm: args.bandit_arm,
                })
                .await?;
            Ok(render::pretty_json(&response))
        }
        Commands::Cached { kind } => {
            let cached = match kind {
                CachedKind::Plan => client.cache().cached_plan(),
                CachedKind::Schedule => client.cache().cached_schedule(),
            };
            Ok(match cached {
                Some(value) if json => render::pretty_json(&value),
                Some(value) => match kind {
                    CachedKind::Plan => render::plan_summary(&value),
                    CachedKind::Schedule => {
                        render::schedule_summary(&ScheduleResult::from_value(&value))
                    }
                },
                None => "Nothing cached yet.".to_string(),
            })
        }
    }
}

fn require_user_id(client: &GatewayClient) -> Result<()> {
    if client.settings().get().user_id.trim().is_empty() {
        bail!("User ID is required.");
    }
    Ok(())
}

/// Merges flags over the stored profile and checks the numbers are usable.
pub fn plan_request(args: PlanArgs, stored: Option<StoredProfile>) -> Result<PlanRequest> {
    let stored = stored.unwrap_or_default();
    let profile = UserProfile {
        age: args.age.or(stored.profile.age),
        sex: args.sex.or(stored.profile.sex),
        height_cm: args.height_cm.or(stored.profile.height_cm),
        weight_kg: args.weight_kg.or(stored.profile.weight_kg),
        activity: args.activity.or(stored.profile.activity),
        extra: stored.profile.extra,
    };

    // Age, height and weight are required, from flags or the stored profile.
    let positive =
        |value: Option<f64>| value.is_some_and(|value| value.is_finite() && value > 0.0);
    if profile.age.is_none_or(|age| age == 0)
        || !positive(profile.height_cm)
        || !positive(profile.weight_kg)
    {
        bail!("Enter valid profile numbers.");
    }

    let goal = match args.goal_type {
        Some(kind) => Goal {
            deficit_kcal: args.deficit_kcal,
            target_minutes: args.target_minutes,
            ..Goal::new(kind.trim())
        },
        None => Goal {
            deficit_kcal: args.deficit_kcal.or(stored.goal.deficit_kcal),
            target_minutes: args.target_minutes.or(stored.goal.target_minutes),
            ..stored.goal
        },
    };

    let equipment = match args.equipment {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToString::to_string)
            .collect(),
        None => stored.equipment,
    };

    Ok(PlanRequest {
        profile,
        goal,
        equipment: Some(equipment),
    })
}
