//! Rejoin - game client restart watchdog
//!
//! Command-line front end: edits the settings file and runs the watchdog in
//! the foreground until Ctrl+C.

use clap::{Parser, Subcommand};
use colored::Colorize;
use rejoin::config::{Settings, ValidationReport, MAX_INTERVAL_MINUTES, MAX_WEBHOOKS};
use rejoin::notify::{messages, Notifier, WebhookNotifier};
use rejoin::watchdog::{RunStatus, Timings, Watchdog, WatchdogSnapshot};
use rejoin::RejoinError;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rejoin")]
#[command(version)]
#[command(about = "Keeps game clients alive with scheduled and crash-triggered restarts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "REJOIN_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watchdog until Ctrl+C or a restart fails
    Run,

    /// Inspect and edit settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Send a test message to every configured webhook
    NotifyTest,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate settings
    Validate,

    /// Show the settings file path
    Paths,

    /// Change one or more settings
    Set(SetArgs),

    /// Restore the defaults
    Reset,
}

#[derive(clap::Args)]
struct SetArgs {
    /// Minutes between scheduled restarts
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_INTERVAL_MINUTES as i64))]
    interval: Option<u32>,

    /// Webhook URL (repeat for a second one; replaces the saved list)
    #[arg(long = "webhook", value_name = "URL")]
    webhooks: Vec<String>,

    /// Remove every saved webhook
    #[arg(long, conflicts_with = "webhooks")]
    clear_webhooks: bool,

    /// Recipient mentioned when all restart attempts fail
    #[arg(long, value_name = "ID")]
    escalation_id: Option<String>,

    /// Keep only the oldest helper process after a restart
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    limit_helpers: Option<bool>,

    /// Screen X of the join button, used when UI automation fails
    #[arg(long, allow_negative_numbers = true, requires = "click_y")]
    click_x: Option<i32>,

    /// Screen Y of the join button
    #[arg(long, allow_negative_numbers = true, requires = "click_x")]
    click_y: Option<i32>,

    /// Forget the saved click position
    #[arg(long, conflicts_with_all = ["click_x", "click_y"])]
    clear_click: bool,

    /// Client process name
    #[arg(long, value_name = "NAME")]
    target_process: Option<String>,

    /// Helper process name
    #[arg(long, value_name = "NAME")]
    helper_process: Option<String>,

    /// Account manager window title
    #[arg(long, value_name = "TITLE")]
    manager_window: Option<String>,

    /// Join control name inside the manager window
    #[arg(long, value_name = "NAME")]
    join_control: Option<String>,

    /// Client count treated as a crash when reached from above
    #[arg(long, value_name = "COUNT")]
    crash_floor: Option<usize>,
}

impl SetArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(interval) = self.interval {
            settings.interval_minutes = interval;
        }
        if self.clear_webhooks {
            settings.webhook_urls.clear();
        } else if !self.webhooks.is_empty() {
            settings.webhook_urls = self.webhooks;
        }
        if let Some(id) = self.escalation_id {
            settings.escalation_id = id;
        }
        if let Some(limit) = self.limit_helpers {
            settings.limit_helpers = limit;
        }
        if self.clear_click {
            settings.click_x = None;
            settings.click_y = None;
        } else if let (Some(x), Some(y)) = (self.click_x, self.click_y) {
            settings.click_x = Some(x);
            settings.click_y = Some(y);
        }
        if let Some(name) = self.target_process {
            settings.target_process = name;
        }
        if let Some(name) = self.helper_process {
            settings.helper_process = name;
        }
        if let Some(title) = self.manager_window {
            settings.manager_window = title;
        }
        if let Some(name) = self.join_control {
            settings.join_control = name;
        }
        if let Some(floor) = self.crash_floor {
            settings.crash_floor = floor;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "rejoin=debug,info"
    } else {
        "rejoin=info,warn"
    };

    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    let settings_path = cli.config.unwrap_or_else(Settings::default_path);

    let result = match cli.command {
        Commands::Run => run_watchdog(&settings_path).await,
        Commands::Config { action } => run_config(action, &settings_path),
        Commands::NotifyTest => notify_test(&settings_path).await,
    };

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            let rejoin_error = e.downcast_ref::<RejoinError>();
            if rejoin_error.is_some_and(RejoinError::is_fatal) {
                eprintln!(
                    "{} Monitoring halted. Fix the clients, then start again with `rejoin run`.",
                    "Note:".blue()
                );
            }
            std::process::exit(rejoin_error.map_or(1, RejoinError::exit_code));
        }
    }
}

fn run_config(action: ConfigAction, path: &Path) -> anyhow::Result<i32> {
    match action {
        ConfigAction::Show { json } => {
            let settings = Settings::load_or_default(path);

            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                print_settings(&settings);
            }
            Ok(0)
        }

        ConfigAction::Validate => {
            let settings = match Settings::load(path) {
                Ok(settings) => settings,
                Err(e) => {
                    println!("{} {} (using defaults)", "Warning:".yellow(), e);
                    Settings::default()
                }
            };
            let report = settings.validate();
            print_report(&report);
            Ok(report.exit_code())
        }

        ConfigAction::Paths => {
            println!("\n{} Configuration Paths", "Config:".cyan().bold());
            println!("{}", "─".repeat(40));
            println!("   Settings: {}", path.display());
            println!(
                "   Exists:   {}",
                if path.exists() { "yes" } else { "no (defaults in use)" }
            );
            Ok(0)
        }

        ConfigAction::Set(args) => {
            let mut settings = Settings::load_or_default(path);
            args.apply(&mut settings);
            settings.save(path)?;
            println!("{} Settings saved to {}", "OK".green(), path.display());

            let report = settings.validate();
            if !report.is_valid() {
                for error in &report.errors {
                    println!("{} {}", "Warning:".yellow(), error);
                }
                println!(
                    "{} The watchdog will not start until these are fixed.",
                    "Note:".blue()
                );
            }
            Ok(0)
        }

        ConfigAction::Reset => {
            Settings::default().save(path)?;
            println!("{} Settings reset to defaults", "OK".green());
            Ok(0)
        }
    }
}

async fn run_watchdog(path: &Path) -> anyhow::Result<i32> {
    let settings = Settings::load_or_default(path);
    let config = match settings.to_restart_config() {
        Ok(config) => config,
        Err(report) => {
            print_report(&report);
            return Ok(report.exit_code());
        }
    };

    let timings = Timings::default();
    println!("\n{} Watchdog", "Rejoin:".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("   Interval: {} minute(s)", config.interval_minutes());
    println!("   Webhooks: {}", config.endpoints.len());
    println!("   Clients:  {}", config.target_process);
    println!(
        "   Helpers:  {}{}",
        config.helper_process,
        if config.limit_helpers { " (capped)" } else { "" }
    );
    match config.click_point {
        Some(point) => println!("   Fallback: click at {}", point),
        None => println!("   Fallback: none"),
    }

    let max_attempts = timings.max_attempts;
    let watchdog = Watchdog::system(config, timings)?;
    println!("   Run id:   {}", watchdog.run_id());
    println!("\nPress Ctrl+C to stop.\n");
    let mut updates = watchdog.subscribe();
    let mut handle = watchdog.spawn();
    let mut shown = WatchdogSnapshot::default();
    let mut stopping = false;

    let status = loop {
        let interrupted = tokio::select! {
            status = handle.wait() => break status,
            Ok(()) = updates.changed() => {
                let snapshot = updates.borrow_and_update().clone();
                render_update(&shown, &snapshot);
                shown = snapshot;
                false
            }
            _ = tokio::signal::ctrl_c(), if !stopping => true,
        };

        if interrupted {
            stopping = true;
            println!(
                "{} Stopping at the next safe point (a running restart finishes its attempt)...",
                "Info:".blue()
            );
            handle.stop();
        }
    };

    let snapshot = handle.snapshot();
    println!(
        "\n{} Watchdog {} after {} restart(s)",
        "Done:".cyan().bold(),
        status,
        snapshot.restarts
    );

    match status {
        RunStatus::Failed => Err(RejoinError::RestartExhausted {
            attempts: snapshot.last_attempts.unwrap_or(max_attempts),
        }
        .into()),
        RunStatus::Error => Err(RejoinError::Task {
            message: "monitoring task ended abnormally".to_string(),
        }
        .into()),
        _ => Ok(0),
    }
}

async fn notify_test(path: &Path) -> anyhow::Result<i32> {
    let settings = Settings::load_or_default(path);
    let endpoints: Vec<String> = settings.active_webhooks().map(str::to_string).collect();
    if endpoints.is_empty() {
        return Err(RejoinError::invalid(
            "webhookUrls",
            "no webhooks configured (use `rejoin config set --webhook URL`)",
        )
        .into());
    }

    let notifier = WebhookNotifier::new(endpoints, Timings::default().notify_timeout)?;
    let report = notifier.notify(&messages::test()).await;

    println!(
        "{} Delivered to {}/{} webhook(s)",
        if report.all_delivered() {
            "OK".green()
        } else {
            "Warning:".yellow()
        },
        report.delivered,
        notifier.endpoints().len()
    );
    for (endpoint, reason) in &report.failed {
        println!("   {} {}: {}", "✗".red(), endpoint, reason);
    }

    Ok(if report.all_delivered() { 0 } else { 1 })
}

fn print_settings(settings: &Settings) {
    println!("\n{} Watchdog Settings", "Config:".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("   Interval: {} minute(s)", settings.interval_minutes);
    let webhooks: Vec<&str> = settings.active_webhooks().collect();
    println!("   Webhooks: {}/{}", webhooks.len(), MAX_WEBHOOKS);
    for url in webhooks {
        println!("     - {}", rejoin::notify::webhook::redact(url));
    }
    println!(
        "   Escalation: {}",
        if settings.escalation_id.trim().is_empty() {
            "none"
        } else {
            settings.escalation_id.trim()
        }
    );
    println!("   Limit helpers: {}", settings.limit_helpers);
    match settings.click_point() {
        Some(point) => println!("   Click point: {}", point),
        None => println!("   Click point: not set"),
    }
    println!("   Client process: {}", settings.target_process);
    println!("   Helper process: {}", settings.helper_process);
    println!("   Manager window: {}", settings.manager_window);
    println!("   Join control: {}", settings.join_control);
    println!("   Crash floor: {}", settings.crash_floor);
}

fn print_report(report: &ValidationReport) {
    for error in &report.errors {
        eprintln!("{} {}", "Error:".red(), error);
    }
    for warning in &report.warnings {
        println!("{} {}", "Warning:".yellow(), warning);
    }
    if report.is_valid() {
        println!("{} {}", "OK".green().bold(), report.summary());
    } else {
        eprintln!("{} {}", "Invalid:".red().bold(), report.summary());
    }
}

fn render_update(previous: &WatchdogSnapshot, current: &WatchdogSnapshot) {
    if current.status != previous.status {
        let label = match current.status {
            RunStatus::Running => "Running".green().bold(),
            RunStatus::Stopping => "Stopping".yellow().bold(),
            RunStatus::Stopped => "Stopped".blue().bold(),
            RunStatus::Failed | RunStatus::Error => current.status.to_string().red().bold(),
            RunStatus::Idle => "Idle".normal(),
        };
        println!("{} {}", "Status:".cyan(), label);
    }

    if current.restarts != previous.restarts {
        let at = current
            .last_restart_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "{} Restart #{} completed at {} ({} attempt(s))",
            "OK".green(),
            current.restarts,
            at,
            current.last_attempts.unwrap_or(1)
        );
    }

    // Progress in 25% steps keeps the output readable
    if current.progress_percent / 25 != previous.progress_percent / 25 {
        println!("   Cycle {}%", current.progress_percent / 25 * 25);
    }
}
