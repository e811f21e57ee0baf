mod app;
mod config;
mod db;
mod error;
mod form;
mod models;
mod notify;
mod presentation;
mod storage;
mod store;
mod tui;
mod views;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use db::Database;
use error::Error;
use models::{non_blank, sample_applications, ApplicationFields, Status};
use presentation::{format_date, ChartData, TableView, EMPTY_TABLE_MESSAGE};
use storage::Storage;
use store::Store;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Job application tracker - record, search, and summarize where you've applied")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the application database (overrides config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage file
    Init {
        /// Seed the sample applications
        #[arg(long)]
        samples: bool,
    },

    /// Record a new application
    Add {
        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        title: String,

        /// Applied, "In Review", Interview, Offer, Rejected
        #[arg(short, long, default_value = "Applied")]
        status: String,

        /// Application date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Link to the job listing
        #[arg(short, long)]
        link: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Change an application; omitted fields keep their current value
    Edit {
        /// Application ID
        id: i64,

        #[arg(short, long)]
        company: Option<String>,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        date: Option<String>,

        /// New listing link (empty string clears it)
        #[arg(short, long)]
        link: Option<String>,

        /// New notes (empty string clears them)
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete an application
    Rm {
        /// Application ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List applications
    List {
        /// Case-insensitive text to look for in company, title, or notes
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only show this status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Summarize applications by status
    Chart {
        /// Print counts as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Print every application as JSON
    Export,

    /// Append the sample applications
    Seed,

    /// Interactive table, chart, and form
    Browse,
}

fn open_store(config: &Config) -> Result<Store<Database>> {
    let path = config.data_path();
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open storage at {}", path.display()))?;
    Store::open(Storage::new(db, config.storage_key.as_str()), Vec::new())
        .context("Failed to load applications")
}

fn init_logging(config: &Config, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env("APPTRACK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        // Keep the alternate screen clean while the TUI runs
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn parse_status(input: &str) -> Result<Status> {
    Status::parse(input).ok_or_else(|| {
        let known: Vec<&str> = Status::ALL.iter().map(|s| s.label()).collect();
        anyhow!("Unknown status '{}' (expected one of: {})", input, known.join(", "))
    })
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data) = cli.data {
        config.data_path = Some(data);
    }

    let log_file = matches!(cli.command, Commands::Browse)
        .then(|| config.data_path().with_file_name("apptrack.log"));
    init_logging(&config, log_file.as_deref())?;

    let mut store = open_store(&config)?;

    match cli.command {
        Commands::Init { samples } => {
            if samples {
                let added = store.extend(sample_applications())?;
                println!("Added {} sample application(s).", added);
            }
            if let Some(config_path) = cli.config.clone().or_else(Config::default_path) {
                if !config_path.exists() {
                    Config::default().save_to(&config_path)?;
                    println!("Wrote default config to {}", config_path.display());
                }
            }
            let path = store.storage().backend().path().map(Path::to_path_buf);
            println!(
                "Storage initialized at {} (slot '{}')",
                path.unwrap_or_else(|| config.data_path()).display(),
                store.storage().key()
            );
        }

        Commands::Add {
            company,
            title,
            status,
            date,
            link,
            notes,
        } => {
            let status = parse_status(&status)?;
            let date = match date {
                Some(d) => form::parse_date(&d)?,
                None => chrono::Local::now().date_naive(),
            };
            let fields = ApplicationFields::new(&company, &title, status, date)
                .with_link(link.as_deref())
                .with_notes(notes.as_deref());
            let record = store.add(fields)?;
            println!("Application to {} added successfully! (#{})", record.company, record.id);
        }

        Commands::Edit {
            id,
            company,
            title,
            status,
            date,
            link,
            notes,
        } => {
            let Some(existing) = store.get(id) else {
                println!("Application #{} not found.", id);
                return Ok(());
            };

            let mut fields = existing.fields();
            if let Some(company) = company {
                fields.company = company.trim().to_string();
            }
            if let Some(title) = title {
                fields.title = title.trim().to_string();
            }
            if let Some(status) = status {
                fields.status = parse_status(&status)?;
            }
            if let Some(date) = date {
                fields.date = form::parse_date(&date)?;
            }
            if let Some(link) = link {
                fields.link = non_blank(Some(link.as_str()));
            }
            if let Some(notes) = notes {
                fields.notes = non_blank(Some(notes.as_str()));
            }

            match store.update(id, fields) {
                Ok(_) => println!("Application updated successfully!"),
                Err(Error::NotFound(id)) => println!("Application #{} not found.", id),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Rm { id, yes } => {
            let Some(record) = store.get(id) else {
                println!("Application #{} not found.", id);
                return Ok(());
            };
            let label = format!("{} - {}", record.company, record.title);
            let prompt = format!("Are you sure you want to delete this application ({})?", label);
            if !yes && !confirm(&prompt)? {
                println!("Kept.");
                return Ok(());
            }
            if store.remove(id)? {
                println!("Application deleted!");
            } else {
                println!("Application #{} not found.", id);
            }
        }

        Commands::List { search, status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let search = search.as_deref().unwrap_or("");
            let filtered = views::filter(store.list(), search, status.as_ref());
            let table = TableView::render(filtered);
            if table.is_empty() {
                println!("{}", EMPTY_TABLE_MESSAGE);
            } else {
                println!(
                    "{:<14} {:<22} {:<24} {:<10} {:<13}",
                    "ID", "COMPANY", "TITLE", "STATUS", "DATE"
                );
                println!("{}", "-".repeat(87));
                for row in table.rows() {
                    println!(
                        "{:<14} {:<22} {:<24} {:<10} {:<13}",
                        row.id,
                        truncate(&row.company, 20),
                        truncate(&row.title, 22),
                        row.status,
                        row.date
                    );
                }
            }
        }

        Commands::Show { id } => match store.get(id) {
            Some(record) => {
                println!("Application #{}", record.id);
                println!("Company: {}", record.company);
                println!("Title: {}", record.title);
                println!("Status: {}", record.status);
                println!("Date: {}", format_date(record.date));
                if let Some(link) = &record.link {
                    println!("Link: {}", link);
                }
                if let Some(notes) = &record.notes {
                    println!("\n--- Notes ---\n{}", textwrap::fill(notes, 80));
                }
            }
            None => {
                println!("Application #{} not found.", id);
            }
        },

        Commands::Chart { json } => {
            let chart = ChartData::from_counts(&views::counts_by_status(store.list()));
            if json {
                let counts: serde_json::Map<String, serde_json::Value> = chart
                    .labels
                    .iter()
                    .zip(&chart.values)
                    .map(|(label, value)| (label.to_string(), (*value).into()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                let max = chart.values.iter().copied().max().unwrap_or(0).max(1);
                for (i, (label, value)) in chart.labels.iter().zip(&chart.values).enumerate() {
                    let width = (*value * 40 / max) as usize;
                    println!(
                        "{:<10} {:>4} {:<40} {:>3}%",
                        label,
                        value,
                        "#".repeat(width),
                        chart.share(i)
                    );
                }
                println!("{:<10} {:>4}", "Total", chart.total());
            }
        }

        Commands::Export => {
            println!("{}", serde_json::to_string_pretty(store.list())?);
        }

        Commands::Seed => {
            let added = store.extend(sample_applications())?;
            println!("Added {} sample application(s).", added);
        }

        Commands::Browse => {
            let mut app = App::new(store, config.notification_lifetime());
            tui::run_browse(&mut app)?;
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
