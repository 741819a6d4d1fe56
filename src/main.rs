//! Guild Booking - command-line driver for the booking wizard.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use guild_booking as app;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::directory::{Directory, InMemoryDirectory};
use app::models::{InitialData, OpenOptions, StaffChoice};
use app::pricing::{PriceBreakdown, format_amount};
use app::session::{BookingSession, BookingSummary};
use app::wizard::Step;

/// Book services from The Guild marketplace.
#[derive(Parser)]
#[command(name = "guild-booking", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,

    /// Explicit config file path
    #[arg(long, conflicts_with = "dev")]
    config: Option<PathBuf>,

    /// Service catalog and staff roster fixture
    #[arg(long, default_value = "data/directory.toml")]
    directory: PathBuf,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List services, prices and staff
    Catalog,
    /// Price a selection without booking it
    Quote {
        #[arg(long)]
        service: String,
        /// Sub-service name (repeatable)
        #[arg(long = "pick", required = true)]
        picks: Vec<String>,
        /// Staff id or "auto"
        #[arg(long, default_value = "auto")]
        staff: String,
    },
    /// Run the full booking flow and pay into escrow
    Book(BookArgs),
    /// Move an existing booking to a new date and time
    Reschedule(BookArgs),
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    service: String,
    /// Sub-service name (repeatable)
    #[arg(long = "pick", required = true)]
    picks: Vec<String>,
    /// Date as YYYY-MM-DD
    #[arg(long)]
    date: NaiveDate,
    /// Time slot label, e.g. "10:30 AM"
    #[arg(long)]
    slot: String,
    /// Staff id or "auto"
    #[arg(long, default_value = "auto")]
    staff: String,
    /// Note for the staff member
    #[arg(long)]
    note: Option<String>,
    /// Reference image path or URL
    #[arg(long)]
    image: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    if let Command::InitConfig { force } = cli.command {
        return init_config(&config_path, force);
    }

    let load_result = AppConfig::try_load(&config_path);
    let config = match &load_result {
        ConfigLoadResult::Loaded(config) => config.clone(),
        _ => AppConfig::default(),
    };

    let _guard = init_logging(&config.logging)?;
    tracing::info!("Guild Booking starting...");
    tracing::info!("Config path: {:?}", config_path);

    match load_result {
        ConfigLoadResult::Loaded(_) => tracing::info!("Config loaded successfully"),
        ConfigLoadResult::Missing => tracing::info!("Config missing, using defaults"),
        ConfigLoadResult::Invalid(e) => bail!("Invalid config {}: {e}", config_path.display()),
    }

    let directory: Arc<dyn Directory> = Arc::new(
        InMemoryDirectory::load(&cli.directory)
            .with_context(|| format!("Failed to load directory {}", cli.directory.display()))?,
    );

    match cli.command {
        Command::Catalog => show_catalog(directory.as_ref(), &config.pricing.currency),
        Command::Quote { service, picks, staff } => quote(&config, directory, &service, &picks, &staff, cli.json),
        Command::Book(args) => run_booking(&config, directory, args, false, cli.json).await,
        Command::Reschedule(args) => run_booking(&config, directory, args, true, cli.json).await,
        Command::InitConfig { .. } => unreachable!("handled before logging setup"),
    }
}

/// Initialize stderr logging, plus a daily log file when configured.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    let (file_layer, guard) = match &logging.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "guild-booking.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn show_catalog(directory: &dyn Directory, currency: &str) -> anyhow::Result<()> {
    for service in directory.services() {
        println!("{} ({})", service.name, service.id);
        for sub in &service.sub_services {
            println!("  - {:<28} {}", sub.name, format_amount(sub.price, currency));
        }
        println!("  Staff:");
        for member in directory.roster(&service.id) {
            let mut flags = Vec::new();
            if member.is_owner {
                flags.push("owner");
            }
            if !member.available {
                flags.push("busy");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            println!(
                "    {:<8} {} - {} ({:.1}){flags}",
                member.id.as_str(),
                member.name,
                member.role,
                member.rating
            );
        }
        println!();
    }
    Ok(())
}

fn quote(
    config: &AppConfig,
    directory: Arc<dyn Directory>,
    service: &str,
    picks: &[String],
    staff: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = BookingSession::from_config(config, directory, tokio::runtime::Handle::current())?;
    let choice = StaffChoice::parse(staff);
    let options = match &choice {
        StaffChoice::Auto => OpenOptions::book(service),
        StaffChoice::Specific(id) => OpenOptions::book(service).with_initial_staff(id.clone()),
    };
    session.open(options)?;

    let wizard = session.wizard_mut();
    for name in picks {
        wizard.select_service(name)?;
    }

    let breakdown = wizard.quote().context("wizard closed unexpectedly")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    } else {
        print_breakdown(&breakdown);
        if choice.is_auto() {
            println!("Staff: AUTO (director rate applies if the owner is assigned)");
        }
    }
    Ok(())
}

async fn run_booking(
    config: &AppConfig,
    directory: Arc<dyn Directory>,
    args: BookArgs,
    reschedule: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = BookingSession::from_config(config, directory, tokio::runtime::Handle::current())?
        .on_close(|reason| tracing::info!("Booking wizard closed: {reason:?}"));
    let choice = StaffChoice::parse(&args.staff);

    if reschedule {
        session.open(OpenOptions::reschedule(
            &args.service,
            InitialData {
                selected_services: args.picks.clone(),
                staff: Some(choice.clone()),
            },
        ))?;
    } else {
        session.open(OpenOptions::book(&args.service))?;
        for name in &args.picks {
            session.wizard_mut().select_service(name)?;
        }
        advance(&mut session, json)?;
    }

    // Date & time
    let wizard = session.wizard_mut();
    if !wizard.time_slots().contains(&args.slot) {
        bail!(
            "'{}' is not an offered time slot (choose one of: {})",
            args.slot,
            wizard.time_slots().join(", ")
        );
    }
    wizard.set_date(args.date)?;
    wizard.set_time_slot(&args.slot)?;
    advance(&mut session, json)?;

    // Customization
    let wizard = session.wizard_mut();
    wizard.set_custom_image(args.image.clone())?;
    wizard.set_special_note(args.note.clone())?;
    advance(&mut session, json)?;

    // Staff
    session.wizard_mut().choose_staff(choice)?;
    advance(&mut session, json)?;

    let summary = session.summary().context("wizard closed unexpectedly")?;
    if !json {
        println!("{}", summary.headline());
        print_breakdown(&summary.pricing);
        println!("Processing payment...");
    }

    let step = session.pay().await?;
    let summary = session.summary().context("wizard closed unexpectedly")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_outcome(step, &summary, session.wizard().last_error());
    }

    session.close()?;
    if step != Step::Success {
        bail!("Booking {} was not paid", summary.ticket_id);
    }
    Ok(())
}

/// Move to the next step and print the progress header.
fn advance(session: &mut BookingSession, json: bool) -> anyhow::Result<Step> {
    let step = session.next()?;
    if !json {
        println!("Step {}/{}: {step}", step.number(), Step::TOTAL_STEPS);
    }
    Ok(step)
}

fn print_breakdown(breakdown: &PriceBreakdown) {
    for line in &breakdown.lines {
        println!("  {:<28} {}", line.name, format_amount(line.charged, &breakdown.currency));
    }
    println!("{}", breakdown.summary());
}

fn print_outcome(step: Step, summary: &BookingSummary, error: Option<&str>) {
    match step {
        Step::Success => println!(
            "Booking confirmed! Ticket {} (payment ref {})",
            summary.ticket_id,
            summary.payment_reference.as_deref().unwrap_or("-")
        ),
        _ => println!("Payment failed: {}", error.unwrap_or("unknown error")),
    }
}
