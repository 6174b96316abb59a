use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "swiftapply")]
#[command(about = "Command-line client for the SwiftApply job application service", long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Sets the logger's verbosity level
    #[arg(short, long, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Must match --password
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },

    /// Sign in with a Google account (authorization-code flow)
    GoogleLogin,

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Browse and manage job listings
    #[command(subcommand)]
    Jobs(JobsCommand),

    /// Auto-apply to a job and watch its progress
    Apply {
        job_id: String,
        /// Use the original auto-apply pipeline instead of the enhanced one
        #[arg(long)]
        legacy: bool,
    },

    /// Cancel an in-flight auto-apply for a job
    Cancel {
        job_id: String,
        /// Cancel a legacy session by its key instead
        #[arg(long, value_name = "KEY")]
        key: Option<String>,
    },

    /// Inspect submitted applications
    #[command(subcommand)]
    Applications(ApplicationsCommand),

    /// View or edit the stored applicant profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// List uploaded resumes
    Resumes,

    /// Drive Greenhouse scraping sessions
    #[command(subcommand)]
    Greenhouse(GreenhouseCommand),

    /// Ask the backend to clear finished auto-apply sessions
    Cleanup,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// Page through the stored job listings
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },

    /// Search listings by keyword and location
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },

    /// Show listing statistics
    Stats,

    /// Trigger a Greenhouse scrape run
    Scrape {
        /// Re-scrape boards that were already visited
        #[arg(long)]
        force: bool,
    },

    /// Download all listings as CSV
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "jobs.csv")]
        output: PathBuf,
    },

    /// Upload listings from a CSV file
    Import {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ApplicationsCommand {
    /// List submitted applications
    List,

    /// Show one application
    Show { id: String },

    /// Withdraw an application
    Withdraw { id: String },

    /// Overwrite an application's status
    SetStatus { id: String, status: String },

    /// List auto-apply runs for the signed-in user
    History {
        /// Read the original auto-apply pipeline's history instead
        #[arg(long)]
        legacy: bool,
        /// Show the run for a single job
        #[arg(long)]
        job_id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Fetch and print the applicant profile
    Show,

    /// Replace the applicant profile from a JSON file
    Update {
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum GreenhouseCommand {
    /// Open an authenticated Greenhouse session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Start scraping as soon as the session is verified
        #[arg(long)]
        auto_scrape: bool,
    },

    /// Scrape using the stored Greenhouse session
    Scrape,

    /// List active Greenhouse sessions on the backend
    Sessions,

    /// Show one session's verification state
    Session { id: String },

    /// Drop a session on the backend
    Clear { id: String },

    /// Re-send the verification email
    VerifyEmail {
        #[arg(long)]
        email: String,
    },

    /// Show the Greenhouse integration's health
    Status,

    /// Kick off scraping for an already-verified session
    StartScraping,
}
