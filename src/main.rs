// taskpulse - tells you what to work on next
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::env;
use std::sync::Arc;
use taskpulse_lib::{
    config::PREFERENCE_PREFIX,
    core::Recorder,
    db::{Priority, WorkItem, WorkItemInput},
    intelligence::ScoredItem,
    Database, EngineConfig, EngineError, RecommendationEngine,
};
use tracing_subscriber::EnvFilter;

// How many characters of an id `list` shows and commands accept
const SHORT_ID_LEN: usize = 8;

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if let Err(err) = run(&args).await {
        // Library errors get their friendlier wording
        match err.downcast_ref::<EngineError>() {
            Some(engine_err) => eprintln!("Error: {}", engine_err.user_message()),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: &[String]) -> Result<()> {
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];

    match command.as_str() {
        "add" => handle_add(&args[2..]).await,
        "start" => handle_start(&args[2..]).await,
        "complete" | "done" => handle_complete(&args[2..]).await,
        "cancel" => handle_cancel(&args[2..]).await,
        "list" | "ls" => handle_list().await,
        "recommend" | "next" => handle_recommend(&args[2..]).await,
        "profile" => handle_profile(&args[2..]).await,
        "insights" => handle_insights().await,
        "config" => handle_config(&args[2..]).await,
        "status" => handle_status().await,
        "version" | "-v" | "--version" => {
            println!("taskpulse v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    }
}

async fn handle_add(args: &[String]) -> Result<()> {
    let mut title_parts = Vec::new();
    let mut priority = Priority::Medium;
    let mut due_at = None;
    let mut estimate = None;
    let mut tags = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--priority" | "-p" => {
                i += 1;
                let value = flag_value(args, i, "--priority")?;
                priority = value.parse()?;
            }
            "--due" => {
                i += 1;
                due_at = Some(parse_due(flag_value(args, i, "--due")?)?);
            }
            "--estimate" => {
                i += 1;
                let value = flag_value(args, i, "--estimate")?;
                estimate = Some(
                    value
                        .parse::<u32>()
                        .with_context(|| format!("--estimate expects minutes, got '{}'", value))?,
                );
            }
            "--tag" | "-t" => {
                i += 1;
                tags.push(flag_value(args, i, "--tag")?.to_string());
            }
            arg => title_parts.push(arg.to_string()),
        }
        i += 1;
    }

    if title_parts.is_empty() {
        bail!("No title given. Usage: taskpulse add <title> [--priority p] [--due date]");
    }

    let db = Arc::new(get_database().await?);
    let recorder = Recorder::new(db)?;
    let id = recorder
        .create(
            WorkItemInput {
                user_id: current_user(),
                title: title_parts.join(" "),
                priority,
                due_at,
                estimated_duration_min: estimate,
                tags,
            },
            Utc::now(),
        )
        .await?;

    println!("Added {}", short_id(&id));
    Ok(())
}

async fn handle_start(args: &[String]) -> Result<()> {
    let db = Arc::new(get_database().await?);
    let id = resolve_id(&db, args.first()).await?;
    Recorder::new(db)?.start(&id, Utc::now()).await?;
    println!("Started {}", short_id(&id));
    Ok(())
}

async fn handle_complete(args: &[String]) -> Result<()> {
    let mut minutes = None;
    let mut id_arg = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--minutes" | "-m" => {
                i += 1;
                let value = flag_value(args, i, "--minutes")?;
                minutes = Some(
                    value
                        .parse::<u32>()
                        .with_context(|| format!("--minutes expects a number, got '{}'", value))?,
                );
            }
            _ => id_arg = Some(&args[i]),
        }
        i += 1;
    }

    let db = Arc::new(get_database().await?);
    let id = resolve_id(&db, id_arg).await?;
    Recorder::new(db)?.complete(&id, Utc::now(), minutes).await?;
    println!("Completed {}", short_id(&id));
    Ok(())
}

async fn handle_cancel(args: &[String]) -> Result<()> {
    let db = Arc::new(get_database().await?);
    let id = resolve_id(&db, args.first()).await?;
    Recorder::new(db)?.cancel(&id, Utc::now()).await?;
    println!("Cancelled {}", short_id(&id));
    Ok(())
}

async fn handle_list() -> Result<()> {
    let db = get_database().await?;
    let items = db.get_open_work_items(&current_user()).await?;

    if items.is_empty() {
        println!("Nothing open. Add something with 'taskpulse add <title>'.");
        return Ok(());
    }

    println!("\nOpen work items:");
    println!("{}", "=".repeat(60));
    for item in &items {
        println!("{}", describe(item));
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_recommend(args: &[String]) -> Result<()> {
    let json = args.iter().any(|a| a == "--json");

    let (db, engine) = get_engine().await?;
    let user = current_user();
    let candidates = db.get_open_work_items(&user).await?;

    let Some(rec) = engine.get_recommendation(&user, &candidates).await? else {
        println!("Nothing to recommend yet. Add something with 'taskpulse add <title>'.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&rec)?);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("Next up: {}", rec.best.item.title);
    println!("{}", "=".repeat(60));
    print_scored(&rec.best);
    println!("\n  Why:    {}", rec.reasoning);
    println!("  When:   {}", rec.timing_advice);
    println!("  Energy: {}", rec.energy_advice);

    if !rec.alternatives.is_empty() {
        println!("\nAlternatives:");
        for (i, alt) in rec.alternatives.iter().enumerate() {
            println!(
                "  {}. {} (score {:.0}, confidence {:.0}%)",
                i + 1,
                alt.item.title,
                alt.score,
                alt.confidence
            );
        }
    }

    if let Some(insight) = rec.insights.first() {
        println!("\nTip: {} {}", insight.title, insight.suggestion);
    }

    println!(
        "\nContext: {} {} ({} energy, {} done today)",
        rec.context.day_of_week, rec.context.time_of_day, rec.context.energy_level, rec.context.completed_today
    );

    Ok(())
}

async fn handle_profile(args: &[String]) -> Result<()> {
    let json = args.iter().any(|a| a == "--json");

    let (_, engine) = get_engine().await?;
    let profile = engine.get_profile(&current_user()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let hours: Vec<String> = profile.optimal_hours.iter().map(|h| format!("{}:00", h)).collect();
    let days: Vec<&str> = profile.optimal_days.iter().map(|d| d.as_str()).collect();

    println!("{}", "=".repeat(60));
    println!("Productivity profile");
    println!("{}", "=".repeat(60));
    println!("  Best hours:       {}", hours.join(", "));
    println!("  Best days:        {}", days.join(", "));
    println!("  Typical task:     {} min", profile.avg_task_duration_min);
    println!("  Completion rate:  {:.0}%", profile.completion_rate);
    if !profile.preferred_tags.is_empty() {
        println!("  Favourite tags:   {}", profile.preferred_tags.join(", "));
    }
    for trigger in &profile.procrastination_triggers {
        println!("  Stalls on:        {}", trigger);
    }
    for pattern in &profile.productive_patterns {
        println!("  Habit:            {}", pattern);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_insights() -> Result<()> {
    let (_, engine) = get_engine().await?;
    let insights = engine.get_insights(&current_user()).await?;

    if insights.is_empty() {
        println!("No insights yet. Complete a few more tasks and check back!");
        return Ok(());
    }

    for (i, insight) in insights.iter().enumerate() {
        println!(
            "\n{}. [{}] {} ({}% confidence)",
            i + 1,
            insight.insight_type,
            insight.title,
            insight.confidence
        );
        println!("   {}", insight.description);
        println!("   -> {}", insight.suggestion);
    }

    Ok(())
}

async fn handle_config(args: &[String]) -> Result<()> {
    let db = get_database().await?;

    match args.first().map(String::as_str) {
        Some("set") => {
            let (Some(key), Some(value)) = (args.get(1), args.get(2)) else {
                bail!("Usage: taskpulse config set <key> <value>");
            };
            // Reject bad values before they reach the store
            EngineConfig::load(&db).await?.apply(key, value)?;
            db.set_preference(&format!("{}{}", PREFERENCE_PREFIX, key), value)
                .await?;
            println!("Set {} = {}", key, value);
        }
        Some(other) => bail!("Unknown config action '{}'", other),
        None => {
            let config = EngineConfig::load(&db).await?;
            println!("history_limit        {}", config.history_limit);
            println!("activity_limit       {}", config.activity_limit);
            println!("profile_ttl_secs     {}", config.profile_ttl.as_secs());
            println!("item_score_ttl_secs  {}", config.item_score_ttl.as_secs());
            println!("fetch_timeout_ms     {}", config.fetch_timeout.as_millis());
            println!("strict               {}", config.strict);
            println!("cache_enabled        {}", config.cache_enabled);
            println!("strategy             {}", config.strategy);
        }
    }

    Ok(())
}

async fn handle_status() -> Result<()> {
    let db = get_database().await?;
    let stats = db.stats().await?;

    println!("\n{}", "=".repeat(60));
    println!("taskpulse status");
    println!("{}", "=".repeat(60));
    println!("\nDatabase: {}", db.path().display());
    println!("  Work items:  {}", stats.total_work_items);
    println!("  Completed:   {}", stats.completed_work_items);
    println!("  Activity:    {}", stats.total_activity_entries);
    println!("  Pool:        {} open, {} idle", stats.pool_size, stats.idle_connections);
    println!("\nUser: {}", current_user());
    println!("{}", "=".repeat(60));

    Ok(())
}

fn print_scored(scored: &ScoredItem) {
    println!("  Priority:  {}", scored.item.priority);
    if let Some(due) = scored.item.due_at {
        println!("  Due:       {}", due.with_timezone(&Local).format("%a %d %b %H:%M"));
    }
    println!("  Score:     {:.0}/100", scored.score);
    println!("  Confidence:{:>4.0}%", scored.confidence);
    println!("  Success:   {}% likely", scored.success_probability);
    println!("  Duration:  ~{} min", scored.estimated_duration_min);
}

fn describe(item: &WorkItem) -> String {
    let due = item
        .due_at
        .map(|d| format!(" due {}", d.with_timezone(&Local).format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();
    let tags = if item.tags.is_empty() {
        String::new()
    } else {
        let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
        format!(" [{}]", tags.join(", "))
    };

    format!(
        "  {}  {:<11} {:<7} {}{}{}",
        short_id(&item.id),
        item.status.to_string(),
        item.priority.to_string(),
        item.title,
        due,
        tags
    )
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} needs a value", flag))
}

/// `YYYY-MM-DD` (end of that day) or `YYYY-MM-DD HH:MM`, in local time
fn parse_due(value: &str) -> Result<chrono::DateTime<Utc>> {
    let naive = match NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        Ok(dt) => dt,
        Err(_) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .with_context(|| format!("cannot read due date '{}'", value))?
            .and_hms_opt(23, 59, 0)
            .ok_or_else(|| anyhow!("cannot read due date '{}'", value))?,
    };

    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("{} does not exist in the local time zone", value))?;
    Ok(local.with_timezone(&Utc))
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Find the one open item whose id starts with `prefix`
async fn resolve_id(db: &Database, prefix: Option<&String>) -> Result<String> {
    let prefix = prefix.ok_or_else(|| anyhow!("No id given. Run 'taskpulse list' to see ids."))?;

    let matches: Vec<WorkItem> = db
        .get_open_work_items(&current_user())
        .await?
        .into_iter()
        .filter(|item| item.id.starts_with(prefix.as_str()))
        .collect();

    match matches.as_slice() {
        [item] => Ok(item.id.clone()),
        [] => bail!("No open item matches '{}'", prefix),
        _ => bail!("'{}' matches {} items, use more characters", prefix, matches.len()),
    }
}

fn current_user() -> String {
    env::var("TASKPULSE_USER")
        .or_else(|_| env::var("USER"))
        .unwrap_or_else(|_| "local".to_string())
}

async fn get_database() -> Result<Database> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    let db_path = home.join(".taskpulse").join("tasks.db");
    Database::new(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))
}

async fn get_engine() -> Result<(Arc<Database>, RecommendationEngine)> {
    let db = Arc::new(get_database().await?);
    let config = EngineConfig::load(&db).await?;
    let engine = RecommendationEngine::from_database(Arc::clone(&db), config);
    Ok((db, engine))
}

fn print_usage() {
    println!(
        r#"taskpulse v{} - What should I work on right now?

USAGE:
    taskpulse <COMMAND> [OPTIONS]

COMMANDS:
    add <title> [flags]    Add a work item
        --priority <p>         low | medium | high | urgent
        --due <date>           YYYY-MM-DD or "YYYY-MM-DD HH:MM"
        --estimate <min>       Estimated minutes
        --tag <tag>            Tag (repeatable)
    start <id>             Mark an item in progress
    complete <id> [-m n]   Mark an item done, optionally with minutes spent
    cancel <id>            Cancel an item
    list                   Show open items
    recommend [--json]     Recommend what to do next
    profile [--json]       Show your productivity profile
    insights               Show behavior insights
    config [set k v]       Show or change engine settings
    status                 Show status and stats
    version                Show version
    help                   Show this help

EXAMPLES:
    taskpulse add Write quarterly report --priority high --due 2026-11-02
    taskpulse recommend
    taskpulse complete 3f2a1b9c -m 45
    taskpulse config set strategy baseline

Set RUST_LOG=debug to see what the engine is doing.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
