mod catalog;
mod config;
mod db;
mod digest;
mod filters;
mod matching;
mod models;
mod saved;
mod status;
mod store;
mod tui;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use config::Config;
use db::Database;
use digest::DigestStore;
use filters::{JobFilters, SortKey};
use models::{Experience, Job, JobStatus, Mode, Preferences, ScoredJob, split_list};
use saved::SavedJobs;
use status::StatusTracker;
use store::Storage;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Personal job tracker - match scoring, status tracking and a daily digest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs with their match scores
    List {
        /// Match title, company or skill
        #[arg(short, long)]
        keyword: Option<String>,

        /// Filter by location
        #[arg(short, long)]
        location: Option<String>,

        /// Filter by experience (Fresher, 0-1, 1-3, 3-5, 5+)
        #[arg(short, long)]
        experience: Option<Experience>,

        /// Filter by mode (Remote, Hybrid, Onsite)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Filter by source (LinkedIn, Naukri, Indeed)
        #[arg(short, long)]
        source: Option<String>,

        /// Filter by status (not-applied, applied, rejected, selected)
        #[arg(long)]
        status: Option<JobStatus>,

        /// Sort order (latest, match, salary)
        #[arg(long, default_value = "latest")]
        sort: SortKey,

        /// Hide jobs below your minimum match score
        #[arg(long)]
        only_matches: bool,

        /// Only saved jobs
        #[arg(long)]
        saved: bool,
    },

    /// Show job details and how its score was computed
    Show {
        /// Job ID
        id: String,
    },

    /// Save or unsave a job
    Save {
        /// Job ID
        id: String,
    },

    /// List saved jobs
    Saved,

    /// Track application status
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },

    /// Manage match preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Show today's digest of top matches
    Digest {
        /// Date key (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Regenerate even if a digest exists for the date
        #[arg(long)]
        force: bool,

        /// Print the plain-text version for copying
        #[arg(long)]
        text: bool,

        /// Print a mail-compose link for the digest
        #[arg(long)]
        mailto: bool,

        /// Recipient for the mail link (defaults to JOBTRACK_EMAIL)
        #[arg(long)]
        to: Option<String>,

        /// List dates with a stored digest
        #[arg(long)]
        list: bool,
    },

    /// Browse jobs interactively
    Browse {
        /// Start with only jobs above your minimum match score
        #[arg(long)]
        only_matches: bool,

        /// Sort order (latest, match, salary)
        #[arg(long, default_value = "match")]
        sort: SortKey,
    },
}

#[derive(Subcommand)]
enum StatusCommands {
    /// Set the status of a job
    Set {
        /// Job ID
        id: String,

        /// New status (not-applied, applied, rejected, selected)
        status: JobStatus,
    },

    /// Show the current status of a job
    Show {
        /// Job ID
        id: String,
    },

    /// Show recent status changes
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show current preferences
    Show,

    /// Update preferences (unset options keep their value)
    Set {
        /// Role keywords, comma separated
        #[arg(long)]
        keywords: Option<String>,

        /// Preferred locations, comma separated
        #[arg(long)]
        locations: Option<String>,

        /// Preferred modes, comma separated (Remote, Hybrid, Onsite)
        #[arg(long)]
        modes: Option<String>,

        /// Experience level (Fresher, 0-1, 1-3, 3-5, 5+, or "any")
        #[arg(long)]
        experience: Option<String>,

        /// Skills, comma separated
        #[arg(long)]
        skills: Option<String>,

        /// Minimum match score (0-100)
        #[arg(long)]
        min_score: Option<u8>,
    },

    /// Restore default preferences
    Reset,
}

fn open_storage(config: &Config) -> Storage {
    match Database::open(&config.db_path) {
        Ok(db) => {
            debug!(path = %db.path().display(), "opened database");
            Storage::new(Box::new(db))
        }
        Err(e) => Storage::degraded(format!("{:#}", e)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let catalog = catalog::load(config.catalog_path.as_deref())?;
    let mut storage = open_storage(&config);

    let result = run(cli.command, &config, &catalog, &mut storage);

    if let Some(notice) = storage.notice() {
        eprintln!("Note: {}", notice);
    }

    result
}

fn run(command: Commands, config: &Config, catalog: &[Job], storage: &mut Storage) -> Result<()> {
    match command {
        Commands::List {
            keyword,
            location,
            experience,
            mode,
            source,
            status,
            sort,
            only_matches,
            saved,
        } => {
            let prefs = storage.preferences();
            let active_filters = JobFilters {
                keyword,
                location,
                experience,
                mode,
                source,
                status,
                only_matches,
                sort,
            };
            let statuses = StatusTracker::new(storage).statuses();
            let scored = matching::score_catalog(catalog, &prefs);
            let mut jobs = filters::apply(&scored, &active_filters, &statuses, prefs.min_match_score);
            if saved {
                let ids = SavedJobs::new(storage).ids();
                jobs.retain(|j| ids.contains(&j.job.id));
            }

            if jobs.is_empty() {
                if only_matches {
                    println!(
                        "No jobs at or above your minimum match score ({}). Adjust filters or lower the threshold.",
                        prefs.min_match_score
                    );
                } else if !active_filters.is_empty() || saved {
                    println!("No jobs match your filters.");
                } else {
                    println!("No jobs found.");
                }
            } else {
                print_job_table(&jobs, &statuses);
                println!("\n{} job(s)", jobs.len());
            }
        }

        Commands::Show { id } => {
            let job = require_job(catalog, &id)?;
            let prefs = storage.preferences();
            let scored = matching::score_job(job, &prefs);
            let status = StatusTracker::new(storage).get_status(&job.id);
            let is_saved = SavedJobs::new(storage).is_saved(&job.id);

            println!("{} ({})", job.title, job.id);
            println!("Company: {}", job.company);
            println!("Location: {} ({})", job.location, job.mode);
            println!("Experience: {}", job.experience);
            if !job.salary_range.is_empty() {
                println!("Salary: {}", job.salary_range);
            }
            println!("Source: {} | Posted: {}", job.source, job.posted_label());
            println!("Status: {}{}", status.label(), if is_saved { " | Saved" } else { "" });
            if !job.skills.is_empty() {
                println!("Skills: {}", job.skills.join(", "));
            }
            if !job.apply_url.is_empty() {
                println!("Apply: {}", job.apply_url);
            }

            println!(
                "\nMatch: {}% ({})",
                scored.match_score,
                scored.match_color.as_str()
            );
            let rules = matching::breakdown(job, &prefs);
            if rules.is_empty() {
                println!("  No rules matched. Set preferences with 'jobtrack prefs set'.");
            }
            for rule in rules {
                println!("  +{:<3} {}", rule.points(), rule.describe());
            }

            if !job.description.is_empty() {
                println!("\n--- Description ---");
                println!("{}", textwrap::fill(&job.description, 80));
            }
        }

        Commands::Save { id } => {
            let job = require_job(catalog, &id)?;
            if SavedJobs::new(storage).toggle(&job.id) {
                println!("Saved '{}'.", job.title);
            } else {
                println!("Removed '{}' from saved jobs.", job.title);
            }
        }

        Commands::Saved => {
            let ids = SavedJobs::new(storage).ids();
            if ids.is_empty() {
                println!("No saved jobs. Save one with 'jobtrack save <id>'.");
                return Ok(());
            }
            let prefs = storage.preferences();
            let statuses = StatusTracker::new(storage).statuses();
            let jobs: Vec<ScoredJob> = ids
                .iter()
                .filter_map(|id| catalog::find(catalog, id))
                .map(|job| matching::score_job(job, &prefs))
                .collect();
            print_job_table(&jobs, &statuses);
            let missing = ids.len() - jobs.len();
            if missing > 0 {
                println!("\n{} saved job(s) are no longer in the catalog.", missing);
            }
        }

        Commands::Status { command } => match command {
            StatusCommands::Set { id, status } => {
                let (title, company) = match catalog::find(catalog, &id) {
                    Some(job) => (job.title.clone(), job.company.clone()),
                    None => {
                        warn!(job_id = %id, "status set for a job not in the catalog");
                        match catalog::closest_id(catalog, &id) {
                            Some(suggestion) => eprintln!(
                                "Job '{}' is not in the catalog (did you mean '{}'?). Recording anyway.",
                                id, suggestion
                            ),
                            None => eprintln!("Job '{}' is not in the catalog. Recording anyway.", id),
                        }
                        (String::new(), String::new())
                    }
                };
                StatusTracker::new(storage).set_status(&id, status, &title, &company);
                println!("Status updated: {}", status.label());
            }

            StatusCommands::Show { id } => {
                let status = StatusTracker::new(storage).get_status(&id);
                println!("{}: {} ({})", id, status.label(), status.color());
            }

            StatusCommands::History { limit } => {
                let history = StatusTracker::new(storage).history();
                if history.is_empty() {
                    println!("No status changes yet.");
                } else {
                    println!("{:<20} {:<12} {:<10} {:<28} {:<18}", "WHEN", "STATUS", "ID", "TITLE", "COMPANY");
                    println!("{}", "-".repeat(92));
                    for item in history.iter().take(limit) {
                        println!(
                            "{:<20} {:<12} {:<10} {:<28} {:<18}",
                            item.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                            item.status.label(),
                            truncate(&item.job_id, 10),
                            truncate(&item.title, 28),
                            truncate(&item.company, 18)
                        );
                    }
                }
            }
        },

        Commands::Prefs { command } => match command {
            PrefsCommands::Show => print_preferences(&storage.preferences()),

            PrefsCommands::Set {
                keywords,
                locations,
                modes,
                experience,
                skills,
                min_score,
            } => {
                let mut prefs = storage.preferences();
                if let Some(value) = keywords {
                    prefs.role_keywords = split_list(&value);
                }
                if let Some(value) = locations {
                    prefs.preferred_locations = split_list(&value);
                }
                if let Some(value) = modes {
                    prefs.preferred_mode = split_list(&value)
                        .iter()
                        .map(|m| m.parse::<Mode>())
                        .collect::<Result<Vec<_>, _>>()?;
                }
                if let Some(value) = experience {
                    prefs.experience_level = match value.trim() {
                        "" | "any" | "Any" => None,
                        label => Some(label.parse::<Experience>()?),
                    };
                }
                if let Some(value) = skills {
                    prefs.skills = split_list(&value);
                }
                if let Some(value) = min_score {
                    prefs.min_match_score = value;
                }

                let saved = storage
                    .save_preferences(prefs)
                    .context("Preferences not saved")?;
                println!("Preferences saved.\n");
                print_preferences(&saved);
            }

            PrefsCommands::Reset => {
                storage.reset_preferences();
                println!("Preferences reset to defaults.");
            }
        },

        Commands::Digest {
            date,
            force,
            text,
            mailto,
            to,
            list,
        } => {
            let prefs = storage.preferences();
            let mut store = DigestStore::new(storage);
            if list {
                let dates = store.dates();
                if dates.is_empty() {
                    println!("No digests yet.");
                }
                for date in dates {
                    println!("{}", date);
                }
                return Ok(());
            }

            let date = match date {
                Some(value) => digest::parse_date_key(&value)
                    .map_err(|e| anyhow!("Invalid date '{}' (expected YYYY-MM-DD): {}", value, e))?,
                None => digest::today_key(),
            };

            if (force || store.lookup(date).is_none()) && !config.digest_delay.is_zero() {
                println!("Generating digest...");
                std::thread::sleep(config.digest_delay);
            }

            let (digest, cached) = if force {
                (store.regenerate(catalog, &prefs, date), false)
            } else {
                store.get_or_generate(catalog, &prefs, date)
            };

            if mailto {
                let recipient = to.as_deref().or(config.email.as_deref());
                println!("{}", digest::mailto_link(&digest, recipient));
            } else if text {
                print!("{}", digest::to_clipboard_text(&digest));
            } else {
                print_digest(&digest, cached);
            }
        }

        Commands::Browse { only_matches, sort } => {
            let filters = JobFilters {
                only_matches,
                sort,
                ..Default::default()
            };
            tui::run_browse(storage, catalog, filters)?;
        }
    }

    Ok(())
}

fn require_job<'a>(catalog: &'a [Job], id: &str) -> Result<&'a Job> {
    catalog::find(catalog, id).ok_or_else(|| match catalog::closest_id(catalog, id) {
        Some(suggestion) => anyhow!("Job '{}' not found. Did you mean '{}'?", id, suggestion),
        None => anyhow!("Job '{}' not found.", id),
    })
}

fn print_job_table(jobs: &[ScoredJob], statuses: &store::StatusMap) {
    println!(
        "{:<8} {:>5} {:<8} {:<28} {:<16} {:<16} {:<7} {:<12}",
        "ID", "MATCH", "TIER", "TITLE", "COMPANY", "LOCATION", "POSTED", "STATUS"
    );
    println!("{}", "-".repeat(106));
    for scored in jobs {
        let job = &scored.job;
        println!(
            "{:<8} {:>4}% {:<8} {:<28} {:<16} {:<16} {:<7} {:<12}",
            truncate(&job.id, 8),
            scored.match_score,
            scored.match_color.as_str(),
            truncate(&job.title, 28),
            truncate(&job.company, 16),
            truncate(&job.location, 16),
            format!("{}d", job.posted_days_ago),
            statuses.get(&job.id).label()
        );
    }
}

fn print_preferences(prefs: &Preferences) {
    let list = |items: &[String]| {
        if items.is_empty() {
            "(any)".to_string()
        } else {
            items.join(", ")
        }
    };
    let modes: Vec<String> = prefs.preferred_mode.iter().map(|m| m.to_string()).collect();
    println!("Role keywords:       {}", list(&prefs.role_keywords));
    println!("Preferred locations: {}", list(&prefs.preferred_locations));
    println!("Preferred modes:     {}", list(&modes));
    println!(
        "Experience level:    {}",
        prefs.experience_level.map(|e| e.as_str()).unwrap_or("(any)")
    );
    println!("Skills:              {}", list(&prefs.skills));
    println!("Min match score:     {}", prefs.min_match_score);
}

fn print_digest(digest: &models::Digest, cached: bool) {
    println!(
        "Daily digest for {}{}",
        digest.date_key(),
        if cached { " (cached)" } else { "" }
    );
    if digest.jobs.is_empty() {
        println!("\nNo matching roles today. Check again tomorrow.");
        return;
    }
    println!();
    println!(
        "{:<5} {:<8} {:>5} {:<28} {:<16} {:<14} {:<8} {:>7}",
        "RANK", "ID", "MATCH", "TITLE", "COMPANY", "LOCATION", "EXP", "POSTED"
    );
    println!("{}", "-".repeat(100));
    for (i, entry) in digest.jobs.iter().enumerate() {
        let job = &entry.job;
        println!(
            "{:<5} {:<8} {:>4}% {:<28} {:<16} {:<14} {:<8} {:>7}",
            i + 1,
            truncate(&job.id, 8),
            entry.match_score,
            truncate(&job.title, 28),
            truncate(&job.company, 16),
            truncate(&job.location, 14),
            job.experience.as_str(),
            format!("{}d", job.posted_days_ago)
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
