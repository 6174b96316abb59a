mod api;
mod apply;
mod models;
mod session;
mod utils;

use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Result, eyre};
use log::{debug, info, warn};

use crate::api::client::ApiClient;
use crate::apply::controller::{
    AutoApplyController, EnhancedBackend, LegacyBackend, ProgressBackend,
};
use crate::apply::progress::{ApplyProgress, ApplyStatus};
use crate::models::job::{JobPage, JobStatistics};
use crate::models::user::{Profile, User};
use crate::session::gate::{self, GateDecision};
use crate::session::oauth::GoogleOauth;
use crate::session::persist::{FileCookieJar, FileStorage, KeyValueStorage, MemoryStorage};
use crate::session::store::{PROFILE_STORAGE_KEY, SessionStore};
use crate::utils::cli::{
    ApplicationsCommand, Args, Command, GreenhouseCommand, JobsCommand, ProfileCommand,
};
use crate::utils::config::{Config, config};
use crate::utils::log::Logger;

const GREENHOUSE_CREDENTIALS_KEY: &str = "greenhouseCredentials";
const AUTO_START_GREENHOUSE_KEY: &str = "autoStartGreenhouseScraping";
const GOOGLE_REDIRECT_KEY: &str = "google_auth_redirect";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.verbosity);

    info!(
        "starting swiftapply {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.config)?;

    let state_dir = config
        .state_dir
        .clone()
        .or_else(|| dirs::home_dir().map(|home| home.join(".swiftapply")))
        .ok_or_else(|| eyre!("cannot determine a state directory, set state_dir in config.toml"))?;

    let storage: Arc<dyn KeyValueStorage> =
        Arc::new(FileStorage::open(state_dir.join("storage.json"))?);
    let cookies = Arc::new(FileCookieJar::open(state_dir.join("cookies.json"))?);
    let store = SessionStore::open(storage.clone(), cookies);
    let client = Arc::new(ApiClient::new(&config.backend.base_url));
    debug!("backend base url: {}", client.base());

    match args.command {
        Command::Login { email, password } => sign_in(&client, &store, &email, &password).await,
        Command::Register {
            email,
            password,
            confirm_password,
            first_name,
            last_name,
        } => {
            register(
                &client,
                &store,
                &email,
                &password,
                &confirm_password,
                &first_name,
                &last_name,
            )
            .await
        }
        Command::GoogleLogin => google_sign_in(&client, &store, &storage, &config).await,
        Command::Logout => {
            store.logout()?;
            println!("signed out, the app would now show you {}", gate::LOGIN_PATH);
            Ok(())
        }
        Command::Whoami => whoami(&store),
        Command::Jobs(command) => jobs(&client, &store, command).await,
        Command::Apply { job_id, legacy } => {
            let user = authenticated(&store, "/jobSearch")?;
            run_auto_apply(&client, &config, &user, &job_id, legacy).await
        }
        Command::Cancel { job_id, key } => {
            let user = authenticated(&store, "/jobSearch")?;
            let ack = match key {
                Some(key) => client.auto_apply_cancel(&key).await?,
                None => client.enhanced_cancel(&user.id, &job_id).await?,
            };
            if ack.success {
                println!("{}", format!("auto-apply for {} cancelled", job_id).yellow());
            } else {
                warn!(
                    "backend refused the cancellation: {}",
                    ack.error.as_deref().unwrap_or("no reason given")
                );
            }
            Ok(())
        }
        Command::Applications(command) => applications(&client, &store, command).await,
        Command::Profile(command) => profile(&client, &store, &storage, command).await,
        Command::Resumes => resumes(&client, &store).await,
        Command::Greenhouse(command) => greenhouse(&client, &store, &storage, command).await,
        Command::Cleanup => {
            authenticated(&store, "/dashboard")?;
            let legacy = client.auto_apply_cleanup().await?;
            let enhanced = client.enhanced_cleanup().await?;
            if !legacy.success || !enhanced.success {
                warn!("the backend refused part of the cleanup");
            }
            println!(
                "cleared {} finished sessions ({} legacy, {} enhanced)",
                legacy.removed + enhanced.removed,
                legacy.removed,
                enhanced.removed
            );
            Ok(())
        }
    }
}

/// Runs the request gate for a guarded product path and resolves the
/// signed-in user. Mirrors the redirect the web client would perform.
fn authenticated(store: &SessionStore, path: &str) -> Result<User> {
    match gate::decide(path, store.has_session_cookie()) {
        GateDecision::RedirectToLogin { return_to } => Err(eyre!(
            "sign in required, the app would redirect you to {}",
            gate::login_redirect(&return_to)
        )),
        GateDecision::Allow | GateDecision::RedirectToDashboard => store
            .current()
            .ok_or_else(|| eyre!("session cookie found but no stored user, sign in again")),
    }
}

async fn sign_in(
    client: &ApiClient,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<()> {
    if gate::decide(gate::LOGIN_PATH, store.has_session_cookie())
        == GateDecision::RedirectToDashboard
    {
        println!(
            "already signed in, the app would redirect you to {}",
            gate::DASHBOARD_PATH
        );
        return Ok(());
    }

    let response = client.login(email, password).await?;
    if !response.success {
        return Err(eyre!(
            response.error.unwrap_or_else(|| "invalid email or password".to_string())
        ));
    }
    let user = response.user.ok_or_else(|| eyre!("backend returned no user record"))?;
    let name = user.display_name();
    store.login(user)?;

    println!("{}", format!("signed in as {}", name).green());
    Ok(())
}

async fn register(
    client: &ApiClient,
    store: &SessionStore,
    email: &str,
    password: &str,
    confirm_password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<()> {
    if gate::decide(gate::REGISTER_PATH, store.has_session_cookie())
        == GateDecision::RedirectToDashboard
    {
        println!(
            "already signed in, the app would redirect you to {}",
            gate::DASHBOARD_PATH
        );
        return Ok(());
    }

    // Checked before any network traffic, like the form does.
    if password != confirm_password {
        return Err(eyre!("passwords do not match"));
    }

    let response = client
        .register(&api::auth::RegisterRequest {
            email,
            password,
            first_name,
            last_name,
        })
        .await?;
    if !response.success {
        return Err(eyre!(
            response.error.unwrap_or_else(|| "registration failed".to_string())
        ));
    }
    let user = response.user.ok_or_else(|| eyre!("backend returned no user record"))?;
    let name = user.display_name();
    store.login(user)?;

    println!("{}", format!("account created, signed in as {}", name).green());
    Ok(())
}

async fn google_sign_in(
    client: &ApiClient,
    store: &SessionStore,
    storage: &Arc<dyn KeyValueStorage>,
    config: &Config,
) -> Result<()> {
    if gate::decide(gate::LOGIN_PATH, store.has_session_cookie())
        == GateDecision::RedirectToDashboard
    {
        println!(
            "already signed in, the app would redirect you to {}",
            gate::DASHBOARD_PATH
        );
        return Ok(());
    }

    // Where the web client would land after the round-trip.
    storage.set(GOOGLE_REDIRECT_KEY, gate::DASHBOARD_PATH)?;

    // The CSRF state is session-scoped: it must not outlive this run.
    let oauth = GoogleOauth::new(
        config.google.client_id.clone(),
        config.google.redirect_uri.clone(),
        Arc::new(MemoryStorage::new()),
    );

    let url = oauth.authorization_url()?;
    println!(
        "open this URL in your browser and approve access:\n\n  {}\n",
        url.cyan()
    );

    let pasted = prompt_line("paste the full redirect URL here: ")?;
    let code = oauth.handle_callback(pasted.trim())?;
    let user = oauth.exchange(client, &code).await?;
    let name = user.display_name();
    store.login(user)?;

    println!("{}", format!("signed in as {}", name).green());
    if let Some(destination) = storage.get(GOOGLE_REDIRECT_KEY) {
        storage.remove(GOOGLE_REDIRECT_KEY)?;
        println!("the app would now show you {}", destination);
    }
    Ok(())
}

fn whoami(store: &SessionStore) -> Result<()> {
    let user = authenticated(store, "/dashboard")?;

    println!("{} ({})", user.display_name().bold(), user.email);
    if let Some(location) = &user.profile.location {
        println!("  location: {}", location);
    }
    if !user.profile.skills.is_empty() {
        println!("  skills: {}", user.profile.skills.join(", "));
    }
    Ok(())
}

async fn jobs(client: &ApiClient, store: &SessionStore, command: JobsCommand) -> Result<()> {
    authenticated(store, "/jobSearch")?;

    match command {
        JobsCommand::List { page, per_page } => {
            let listings = client.jobs_from_database(page, per_page).await?;
            print_job_page(&listings)
        }
        JobsCommand::Search { query, location } => {
            let listings = client
                .search_jobs(query.as_deref(), location.as_deref())
                .await?;
            print_job_page(&listings)
        }
        JobsCommand::Stats => {
            let stats = client.job_statistics().await?;
            print_statistics(&stats)
        }
        JobsCommand::Scrape { force } => {
            let response = client.scrape_greenhouse(force).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "scrape failed".to_string())
                ));
            }
            println!(
                "{}",
                format!("scrape finished, {} new listings", response.jobs_found).green()
            );
            if let Some(message) = response.message {
                println!("{}", message);
            }
            Ok(())
        }
        JobsCommand::Export { output } => {
            let bytes = client.export_jobs_csv().await?;
            tokio::fs::write(&output, &bytes).await?;
            println!("saved {} bytes to {}", bytes.len(), output.display());
            Ok(())
        }
        JobsCommand::Import { input } => {
            let response = client.import_jobs_csv(&input).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "import failed".to_string())
                ));
            }
            println!("{}", format!("imported {} listings", response.imported).green());
            Ok(())
        }
    }
}

fn print_job_page(page: &JobPage) -> Result<()> {
    if !page.success {
        return Err(eyre!(
            page.error.clone().unwrap_or_else(|| "listing fetch failed".to_string())
        ));
    }

    for job in &page.jobs {
        println!(
            "{}  {} {} {}",
            job.id.dimmed(),
            job.title.bold(),
            "@".dimmed(),
            job.company.cyan()
        );
        let mut details = Vec::new();
        if let Some(location) = &job.location {
            details.push(location.clone());
        }
        if let Some(job_type) = &job.job_type {
            details.push(job_type.clone());
        }
        if let Some(salary) = &job.salary {
            details.push(salary.clone());
        }
        if let Some(posted) = &job.posted_date {
            details.push(format!("posted {}", posted));
        } else if let Some(scraped) = job.scraped_at {
            details.push(format!("scraped {}", scraped.format("%Y-%m-%d")));
        }
        if !details.is_empty() {
            println!("    {}", details.join(" | "));
        }
        if let Some(url) = &job.url {
            println!("    {}", url.underline());
        }
    }

    let pages = if page.per_page > 0 {
        (page.total as u32).div_ceil(page.per_page)
    } else {
        1
    };
    println!(
        "\npage {} of {} ({} listings total)",
        page.page.max(1),
        pages.max(1),
        page.total
    );
    Ok(())
}

fn print_statistics(stats: &JobStatistics) -> Result<()> {
    if !stats.success {
        return Err(eyre!("statistics fetch failed"));
    }

    println!("{} listings stored", stats.total_jobs.to_string().bold());
    if let Some(last) = stats.last_scraped {
        println!("last scraped {}", last);
    }

    let mut companies: Vec<_> = stats.companies.iter().collect();
    companies.sort_by(|a, b| b.1.cmp(a.1));
    for (company, count) in companies.into_iter().take(10) {
        println!("  {:>5}  {}", count, company);
    }

    let mut locations: Vec<_> = stats.locations.iter().collect();
    locations.sort_by(|a, b| b.1.cmp(a.1));
    for (location, count) in locations.into_iter().take(5) {
        println!("  {:>5}  {}", count, location.italic());
    }
    Ok(())
}

async fn run_auto_apply(
    client: &Arc<ApiClient>,
    config: &Config,
    user: &User,
    job_id: &str,
    legacy: bool,
) -> Result<()> {
    if !legacy {
        match client.enhanced_test().await {
            Ok(ack) if ack.success => {}
            _ => warn!("auto-apply service self-test failed, starting anyway"),
        }
    }

    let backend: Arc<dyn ProgressBackend> = if legacy {
        Arc::new(LegacyBackend::new(client.clone(), user.id.as_str(), job_id))
    } else {
        Arc::new(EnhancedBackend::new(client.clone(), user.id.as_str(), job_id))
    };

    let controller = AutoApplyController::new(
        backend,
        job_id,
        config.auto_apply.poll_interval(),
        config.auto_apply.poll_timeout(),
    );
    controller.start().await?;
    println!("{}", format!("auto-applying to {}", job_id).bold());

    let mut rx = controller.progress();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "cancelling...".yellow());
                controller.cancel().await;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = rx.borrow().clone() else {
                    continue;
                };
                render_progress(&snapshot);

                if snapshot.status == ApplyStatus::WaitingForInput {
                    prompt_security_code(&controller).await?;
                } else if snapshot.status.is_terminal() {
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn prompt_security_code(controller: &AutoApplyController) -> Result<()> {
    loop {
        let code = prompt_line("enter the 8-digit security code (blank to cancel): ")?;
        let code = code.trim();

        if code.is_empty() {
            controller.cancel().await;
            return Ok(());
        }

        match controller.submit_security_code(code).await {
            Ok(()) => {
                println!("{}", "code accepted, resuming".green());
                return Ok(());
            }
            Err(e) => println!("{}", e.to_string().red()),
        }
    }
}

fn render_progress(progress: &ApplyProgress) {
    let step = if progress.total_steps > 0 {
        format!("[{}/{}] ", progress.current_step, progress.total_steps)
    } else {
        String::new()
    };

    match progress.status {
        ApplyStatus::Queued => println!("{}{}", step, "queued...".cyan()),
        ApplyStatus::Running => println!("{}{}", step, progress.message),
        ApplyStatus::WaitingForInput => {
            println!("{}", "the backend is waiting for a security code".yellow().bold())
        }
        ApplyStatus::Completed => println!("{}", "application submitted".green().bold()),
        ApplyStatus::Error => {
            println!("{}", format!("auto-apply failed: {}", progress.message).red())
        }
        ApplyStatus::Cancelled => println!("{}", "auto-apply cancelled".yellow()),
    }
}

async fn applications(
    client: &ApiClient,
    store: &SessionStore,
    command: ApplicationsCommand,
) -> Result<()> {
    let user = authenticated(store, "/applications")?;

    match command {
        ApplicationsCommand::List => {
            let response = client.applications().await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "listing failed".to_string())
                ));
            }
            print_applications(&response.applications);
            Ok(())
        }
        ApplicationsCommand::Show { id } => {
            let response = client.application(&id).await?;
            let record = response
                .application
                .ok_or_else(|| eyre!("no application with id {}", id))?;
            print_applications(std::slice::from_ref(&record));
            Ok(())
        }
        ApplicationsCommand::Withdraw { id } => {
            let response = client.withdraw_application(&id).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "withdraw failed".to_string())
                ));
            }
            println!("{}", format!("application {} withdrawn", id).yellow());
            Ok(())
        }
        ApplicationsCommand::SetStatus { id, status } => {
            let response = client.set_application_status(&id, &status).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "status update failed".to_string())
                ));
            }
            println!("application {} is now {}", id, status.bold());
            Ok(())
        }
        ApplicationsCommand::History { legacy, job_id } => {
            if let Some(job_id) = job_id {
                let response = client.enhanced_application(&user.id, &job_id).await?;
                match response.progress {
                    Some(progress) => render_progress(&progress),
                    None => println!("no auto-apply run recorded for {}", job_id),
                }
                return Ok(());
            }

            let response = if legacy {
                client.auto_apply_history(&user.id).await?
            } else {
                client.enhanced_applications(&user.id).await?
            };
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "history fetch failed".to_string())
                ));
            }
            print_applications(&response.applications);
            Ok(())
        }
    }
}

fn print_applications(records: &[models::application::ApplicationRecord]) {
    if records.is_empty() {
        println!("nothing here yet");
        return;
    }

    for record in records {
        let title = record.job_title.as_deref().unwrap_or(&record.job_id);
        let company = record.company.as_deref().unwrap_or("unknown company");
        let when = record
            .applied_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}  {} {} {}  {}  {}",
            record.id.dimmed(),
            title.bold(),
            "@".dimmed(),
            company.cyan(),
            record.status,
            when.dimmed()
        );
    }
}

async fn profile(
    client: &ApiClient,
    store: &SessionStore,
    storage: &Arc<dyn KeyValueStorage>,
    command: ProfileCommand,
) -> Result<()> {
    let user = authenticated(store, "/dashboard")?;

    match command {
        ProfileCommand::Show => {
            let response = client.get_profile(&user.id).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "profile fetch failed".to_string())
                ));
            }
            let profile = response.profile.unwrap_or_default();
            storage.set(PROFILE_STORAGE_KEY, &serde_json::to_string(&profile)?)?;
            print_profile(&profile);
            Ok(())
        }
        ProfileCommand::Update { file } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let profile: Profile = serde_json::from_str(&raw)?;

            let response = client.update_profile(&user.id, &profile).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "profile update failed".to_string())
                ));
            }
            storage.set(PROFILE_STORAGE_KEY, &serde_json::to_string(&profile)?)?;
            println!("{}", "profile updated".green());
            Ok(())
        }
    }
}

fn print_profile(profile: &Profile) {
    if let Some(phone) = &profile.phone {
        println!("phone: {}", phone);
    }
    if let Some(location) = &profile.location {
        println!("location: {}", location);
    }
    for (label, link) in [
        ("linkedin", &profile.linkedin),
        ("github", &profile.github),
        ("portfolio", &profile.portfolio),
    ] {
        if let Some(link) = link {
            println!("{}: {}", label, link.underline());
        }
    }
    if !profile.skills.is_empty() {
        println!("skills: {}", profile.skills.join(", "));
    }
    for education in &profile.education {
        let degree = education.degree.as_deref().unwrap_or("studies");
        let field = education
            .field
            .as_deref()
            .map(|f| format!(" in {}", f))
            .unwrap_or_default();
        println!(
            "  {}{} at {}{}",
            degree,
            field,
            education.school,
            date_range(&education.start_date, &education.end_date)
        );
    }
    for job in &profile.employment {
        println!(
            "  {} at {}{}",
            job.title,
            job.company,
            date_range(&job.start_date, &job.end_date)
        );
        if let Some(description) = &job.description {
            println!("    {}", description.dimmed());
        }
    }
}

fn date_range(start: &Option<String>, end: &Option<String>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!(" ({} to {})", start, end),
        (Some(start), None) => format!(" (since {})", start),
        (None, Some(end)) => format!(" (until {})", end),
        (None, None) => String::new(),
    }
}

async fn resumes(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let user = authenticated(store, "/resumeGenerator")?;

    let response = client.user_resumes(&user.id).await?;
    if !response.success {
        return Err(eyre!(
            response.error.unwrap_or_else(|| "resume listing failed".to_string())
        ));
    }
    if response.resumes.is_empty() {
        println!("no resumes uploaded yet");
    }
    for resume in response.resumes {
        println!(
            "{}  {}  {}",
            resume.id.dimmed(),
            resume.filename.bold(),
            resume.uploaded_at.unwrap_or_default().dimmed()
        );
    }
    Ok(())
}

async fn greenhouse(
    client: &ApiClient,
    store: &SessionStore,
    storage: &Arc<dyn KeyValueStorage>,
    command: GreenhouseCommand,
) -> Result<()> {
    authenticated(store, "/jobSearch")?;

    match command {
        GreenhouseCommand::Login {
            email,
            password,
            auto_scrape,
        } => {
            let response = client.greenhouse_secure_login(&email, &password).await?;
            if !response.success {
                return Err(eyre!(
                    response.error.unwrap_or_else(|| "greenhouse login failed".to_string())
                ));
            }
            let session_id = response
                .session_id
                .ok_or_else(|| eyre!("backend returned no session id"))?;

            storage.set(
                GREENHOUSE_CREDENTIALS_KEY,
                &serde_json::to_string(&serde_json::json!({
                    "email": email,
                    "session_id": session_id,
                }))?,
            )?;
            if auto_scrape {
                storage.set(AUTO_START_GREENHOUSE_KEY, "true")?;
            }

            if response.verification_pending {
                println!(
                    "{}",
                    "check your inbox: Greenhouse wants the sign-in verified by email".yellow()
                );
                println!(
                    "run `swiftapply greenhouse session {}` once you have clicked the link",
                    session_id
                );
            } else {
                println!("{}", format!("greenhouse session {} ready", session_id).green());
            }
            Ok(())
        }
        GreenhouseCommand::Scrape => {
            let session_id = stored_greenhouse_session(storage.as_ref())?;
            let ack = client.greenhouse_secure_scrape(&session_id).await?;
            if !ack.success {
                return Err(eyre!(ack.error.unwrap_or_else(|| "scrape failed".to_string())));
            }
            println!("{}", ack.message.unwrap_or_else(|| "scrape started".to_string()));
            Ok(())
        }
        GreenhouseCommand::Sessions => {
            let response = client.greenhouse_active_sessions().await?;
            if !response.success {
                return Err(eyre!("session listing failed"));
            }
            if response.sessions.is_empty() {
                println!("no active sessions");
            }
            for session in response.sessions {
                println!("{}", session);
            }
            Ok(())
        }
        GreenhouseCommand::Session { id } => {
            let status = client.greenhouse_session_status(&id).await?;
            if !status.success {
                return Err(eyre!(
                    status.error.unwrap_or_else(|| "status fetch failed".to_string())
                ));
            }
            println!(
                "session {}: {} ({})",
                id,
                if status.verified {
                    "verified".green()
                } else {
                    "pending".yellow()
                },
                status.status.unwrap_or_else(|| "no detail".to_string())
            );

            // Honors the auto-start request recorded at login time.
            if status.verified && storage.get(AUTO_START_GREENHOUSE_KEY).is_some() {
                storage.remove(AUTO_START_GREENHOUSE_KEY)?;
                info!("auto-start was requested, kicking off scraping");
                let ack = client.greenhouse_secure_scrape(&id).await?;
                if ack.success {
                    println!("{}", "scraping started automatically".green());
                } else {
                    warn!(
                        "automatic scrape failed: {}",
                        ack.error.as_deref().unwrap_or("no reason given")
                    );
                }
            }
            Ok(())
        }
        GreenhouseCommand::Clear { id } => {
            let ack = client.greenhouse_clear_session(&id).await?;
            if !ack.success {
                return Err(eyre!(
                    ack.error.unwrap_or_else(|| "session clear failed".to_string())
                ));
            }
            if stored_greenhouse_session(storage.as_ref()).is_ok_and(|stored| stored == id) {
                storage.remove(GREENHOUSE_CREDENTIALS_KEY)?;
            }
            println!("session {} cleared", id);
            Ok(())
        }
        GreenhouseCommand::VerifyEmail { email } => {
            let ack = client.greenhouse_verify_email(&email).await?;
            if !ack.success {
                return Err(eyre!(
                    ack.error.unwrap_or_else(|| "verification request failed".to_string())
                ));
            }
            println!("verification email sent to {}", email);
            Ok(())
        }
        GreenhouseCommand::Status => {
            let ack = client.greenhouse_status().await?;
            println!(
                "{}: {}",
                if ack.success {
                    "healthy".green()
                } else {
                    "degraded".red()
                },
                ack.message.unwrap_or_default()
            );
            Ok(())
        }
        GreenhouseCommand::StartScraping => {
            let ack = client.greenhouse_start_scraping().await?;
            if !ack.success {
                return Err(eyre!(
                    ack.error.unwrap_or_else(|| "scrape start failed".to_string())
                ));
            }
            println!("{}", ack.message.unwrap_or_else(|| "scraping started".to_string()));
            Ok(())
        }
    }
}

fn stored_greenhouse_session(storage: &dyn KeyValueStorage) -> Result<String> {
    let raw = storage.get(GREENHOUSE_CREDENTIALS_KEY).ok_or_else(|| {
        eyre!("no stored Greenhouse session, run `swiftapply greenhouse login` first")
    })?;
    let credentials: serde_json::Value = serde_json::from_str(&raw)?;
    credentials["session_id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| eyre!("stored Greenhouse credentials are unreadable"))
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt.cyan());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}
