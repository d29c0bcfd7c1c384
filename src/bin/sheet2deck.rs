//! CLI binary for sheet2deck.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, renders notifications in the terminal and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sheet2deck::notify::{Modal, NotificationListener, Toast, ToastLevel};
use sheet2deck::{
    AuthService, ClientConfig, ConversionOptions, ConversionWorkflow, FileCandidate, HttpApi,
    Navigator, Notifications, Route, Router, SessionStore, SubmitOutcome, Theme,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal notification surfaces ───────────────────────────────────────────

/// Prints toasts and the quota modal to stderr, pausing the spinner.
struct CliNotifier {
    bar: ProgressBar,
}

impl NotificationListener for CliNotifier {
    fn on_toast(&self, toast: &Toast) {
        let marker = match toast.level {
            ToastLevel::Info => cyan("ℹ"),
            ToastLevel::Success => green("✔"),
            ToastLevel::Warning => yellow("⚠"),
            ToastLevel::Error => red("✘"),
        };
        self.bar
            .suspend(|| eprintln!("{} {}", marker, toast.message));
    }

    fn on_modal_opened(&self, modal: &Modal) {
        let usage = match (modal.used, modal.limit) {
            (Some(used), Some(limit)) => format!("  ({used}/{limit} used)"),
            _ => String::new(),
        };
        self.bar.suspend(|| {
            eprintln!();
            eprintln!("{} {}{}", red("■"), bold(&modal.message), dim(&usage));
            eprintln!("  Upgrade with: {}", bold("sheet2deck billing checkout"));
            eprintln!();
        });
    }
}

/// The terminal has no pages; point the user at the matching command.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn navigate(&self, route: Route) {
        if route == Route::Login {
            eprintln!("  Run {} to continue.", bold("sheet2deck login"));
        }
    }
}

fn spinner(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Log in once; the session is kept on disk
  sheet2deck login --email ana@example.com

  # Convert a spreadsheet (deck saved in the current directory)
  sheet2deck convert ventes.csv --title "Performance Q4"

  # Pick a theme and an output path
  sheet2deck convert budget.xlsx --theme minimal -o decks/budget.pptx

  # Machine-readable outcome
  sheet2deck convert ventes.csv --json

  # Plan and usage
  sheet2deck whoami
  sheet2deck billing status
  sheet2deck billing checkout

ACCEPTED FILES:
  Class        Extensions          Max size
  ─────────    ──────────────────  ────────
  csv-like     .csv .tsv .txt      15 MiB
  excel-like   .xlsx .xls          8 MiB

ENVIRONMENT VARIABLES:
  SHEET2DECK_API_BASE      Backend base URL (default http://localhost:8000)
  SHEET2DECK_SESSION_FILE  Session file (default <config dir>/sheet2deck/session.json)
  SHEET2DECK_BASE_PATH     Prefix for route paths
  SHEET2DECK_ENABLE_ADMIN  Expose the admin route (1/true/yes/on)
  SHEET2DECK_PASSWORD      Password for login/register instead of prompting
"#;

/// Convert CSV and Excel files to PowerPoint decks.
#[derive(Parser, Debug)]
#[command(
    name = "sheet2deck",
    version,
    about = "Convert CSV and Excel files to PowerPoint decks",
    long_about = "Upload CSV, TSV, TXT, XLSX or XLS files to the Sheet2Deck service and \
download the generated PowerPoint deck. Handles login, plan quotas and billing.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL.
    #[arg(long, global = true, env = "SHEET2DECK_API_BASE")]
    api_base: Option<String>,

    /// Session file location.
    #[arg(long, global = true, env = "SHEET2DECK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Prefix for route paths.
    #[arg(long, global = true, env = "SHEET2DECK_BASE_PATH")]
    base_path: Option<String>,

    /// Expose the internal admin route.
    #[arg(long, global = true, env = "SHEET2DECK_ENABLE_ADMIN")]
    enable_admin: bool,

    /// Disable the upload spinner.
    #[arg(long, global = true, env = "SHEET2DECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SHEET2DECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SHEET2DECK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session.
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when absent.
        #[arg(long, env = "SHEET2DECK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in.
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "SHEET2DECK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget the stored session.
    Logout,

    /// Show the logged-in user and this month's usage.
    Whoami {
        #[arg(long)]
        json: bool,
    },

    /// Convert a spreadsheet to a deck.
    Convert {
        /// CSV, TSV, TXT, XLSX or XLS file.
        file: PathBuf,

        /// Deck title. Blank uses the default title.
        #[arg(short, long, default_value = "")]
        title: String,

        /// Visual theme.
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,

        /// Output file or directory. Default: current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Plan, checkout and customer portal.
    Billing {
        #[command(subcommand)]
        action: BillingAction,
    },

    /// Internal admin page.
    #[command(hide = true)]
    Admin,
}

#[derive(Subcommand, Debug)]
enum BillingAction {
    /// Current plan and usage.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Open a checkout session for the pro plan.
    Checkout,
    /// Open the customer portal.
    Portal,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Corporate,
    Minimal,
    Energetic,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Corporate => Theme::Corporate,
            ThemeArg::Minimal => Theme::Minimal,
            ThemeArg::Energetic => Theme::Energetic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner and toasts carry the user-facing feedback; library INFO
    // logs only show with -v.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let session = SessionStore::from_config(&config);
    let api = Arc::new(HttpApi::new(&config).context("Failed to create HTTP client")?);

    match cli.command {
        Command::Login { ref email, ref password } => {
            let email = value_or_prompt(email.clone(), "Email")?;
            let password = value_or_prompt(password.clone(), "Password")?;
            let auth = AuthService::new(api, session);
            let user = auth.login(&email, &password).await.context("Login failed")?;
            if !cli.quiet {
                eprintln!("{} Logged in as {}", green("✔"), bold(&display_email(&user.email)));
            }
        }

        Command::Register {
            ref email,
            ref password,
            ref name,
        } => {
            let email = value_or_prompt(email.clone(), "Email")?;
            let password = value_or_prompt(password.clone(), "Password")?;
            let auth = AuthService::new(api, session);
            let user = auth
                .register(&email, &password, name.as_deref())
                .await
                .context("Registration failed")?;
            if !cli.quiet {
                eprintln!("{} Account created for {}", green("✔"), bold(&display_email(&user.email)));
            }
        }

        Command::Logout => {
            AuthService::new(api, session)
                .logout()
                .context("Failed to clear session")?;
            if !cli.quiet {
                eprintln!("{} Logged out", green("✔"));
            }
        }

        Command::Whoami { json } => {
            let auth = AuthService::new(api, session);
            let user = auth.refresh_user().await.context("Failed to fetch account")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&user).context("Failed to serialise user")?
                );
            } else {
                println!("Email:        {}", display_email(&user.email));
                println!("Plan:         {}", user.plan);
                match user.remaining_conversions(config.free_monthly_limit) {
                    Some(remaining) => println!(
                        "Conversions:  {}/{} this month ({} left)",
                        user.conversions_this_month, config.free_monthly_limit, remaining
                    ),
                    None => println!("Conversions:  {} this month", user.conversions_this_month),
                }
                if let Some(ref date) = user.last_reset_date {
                    println!("Last reset:   {date}");
                }
            }
        }

        Command::Convert {
            ref file,
            ref title,
            theme,
            ref output,
            json,
        } => {
            let show_progress = !cli.quiet && !cli.no_progress && !json;
            return run_convert(
                config,
                api,
                session,
                ConvertArgs {
                    file: file.clone(),
                    title: title.clone(),
                    theme: theme.map(Theme::from),
                    output: output.clone(),
                    json,
                    show_progress,
                    quiet: cli.quiet,
                },
            )
            .await;
        }

        Command::Billing { ref action } => {
            let token = session
                .token()
                .context("Not logged in. Run `sheet2deck login` first.")?;
            match action {
                BillingAction::Status { json } => {
                    let status = api
                        .billing_status(&token)
                        .await
                        .context("Failed to fetch billing status")?;
                    if *json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&status)
                                .context("Failed to serialise billing status")?
                        );
                    } else {
                        println!("Plan:         {}", status.plan);
                        println!("Conversions:  {} this month", status.conversions_this_month);
                        if let Some(ref date) = status.last_reset_date {
                            println!("Last reset:   {date}");
                        }
                    }
                }
                BillingAction::Checkout => {
                    let redirect = api
                        .billing_checkout(&token)
                        .await
                        .context("Failed to start checkout")?;
                    println!("{}", redirect.url);
                }
                BillingAction::Portal => {
                    let redirect = api
                        .billing_portal(&token)
                        .await
                        .context("Failed to open customer portal")?;
                    println!("{}", redirect.url);
                }
            }
        }

        Command::Admin => {
            let router = Router::new(&config);
            let Some(route) = router.resolve(&router.href(Route::Admin)) else {
                anyhow::bail!("The admin route is disabled. Pass --enable-admin to expose it.");
            };
            let target = router.guard(route, &session);
            if target != Route::Admin {
                anyhow::bail!("Not logged in. Run `sheet2deck login` first.");
            }
            println!("{}  {}", router.href(target), dim(target.title()));
        }
    }

    Ok(ExitCode::SUCCESS)
}

struct ConvertArgs {
    file: PathBuf,
    title: String,
    theme: Option<Theme>,
    output: Option<PathBuf>,
    json: bool,
    show_progress: bool,
    quiet: bool,
}

async fn run_convert(
    config: ClientConfig,
    api: Arc<HttpApi>,
    session: SessionStore,
    args: ConvertArgs,
) -> Result<ExitCode> {
    let bar = spinner(args.show_progress);
    let notifications = Notifications::new(config.toast_timeout);
    if !args.quiet {
        notifications.subscribe(Arc::new(CliNotifier { bar: bar.clone() }));
    }

    let workflow = ConversionWorkflow::new(config, api, session, notifications)
        .with_navigator(Arc::new(CliNavigator));

    let candidate = FileCandidate::from_path(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    if workflow.select_file(candidate).is_err() {
        // Already reported through the toast.
        return Ok(ExitCode::FAILURE);
    }

    bar.set_prefix("Converting");
    bar.set_message(args.file.display().to_string());
    bar.enable_steady_tick(Duration::from_millis(80));

    let options = ConversionOptions {
        title: args.title,
        theme: args.theme,
    };
    let outcome = workflow.submit(&options).await;
    bar.finish_and_clear();

    let saved = match outcome {
        SubmitOutcome::Succeeded(_) => {
            let dest = args.output.unwrap_or_else(|| PathBuf::from("."));
            Some(
                workflow
                    .save_artifact(&dest)
                    .await
                    .with_context(|| format!("Failed to save deck to {}", dest.display()))?,
            )
        }
        _ => None,
    };

    if args.json {
        let report = serde_json::json!({ "outcome": outcome, "saved_to": saved });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise outcome")?
        );
    } else if !args.quiet {
        if let Some(message) = workflow.inline_error() {
            eprintln!("{} {}", red("✘"), message);
        }
        if let (SubmitOutcome::Succeeded(summary), Some(path)) = (&outcome, &saved) {
            for warning in &summary.warnings {
                eprintln!("  {} {}", yellow("⚠"), warning);
            }
            eprintln!(
                "{}  {}  {}",
                green("✔"),
                bold(&path.display().to_string()),
                dim(&format!("{} bytes", summary.size)),
            );
        }
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args onto `ClientConfig`, on top of the environment defaults.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().admin_route_enabled(cli.enable_admin);
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base.clone());
    }
    if let Some(ref path) = cli.base_path {
        builder = builder.base_path(path.clone());
    }
    if let Some(ref file) = cli.session_file {
        builder = builder.session_path(file.clone());
    }
    builder.build().context("Invalid configuration")
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    eprint!("{label}: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {}", label.to_lowercase()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn display_email(email: &Option<String>) -> String {
    email.clone().unwrap_or_else(|| "(unknown)".to_string())
}
