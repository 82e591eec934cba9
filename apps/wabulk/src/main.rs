//! wabulk - bulk messaging client
//!
//! Thin CLI over the workflow crate: the same operations the dashboard UI
//! drives, minus the dashboard.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wabulk::api::ImageUploader;
use wabulk::api::wire::{Template, TemplateComponents, TemplateLanguage, TemplateParameter};
use wabulk::dispatch::ComposeState;
use wabulk::model::{Attachment, AttachmentKind, Contact};
use wabulk::settings::SettingsUpdate;
use wabulk::template::RenderContext;
use wabulk::App;
use wabulk_core::{AppConfig, Result, WabulkError};

#[derive(Parser)]
#[command(name = "wabulk", about = "Bulk messaging client", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the remote contact list
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },
    /// Send a message to selected contacts
    Send {
        #[arg(long)]
        message: Option<String>,
        /// Recipient phone numbers; defaults to every contact
        #[arg(long = "to")]
        to: Vec<String>,
        /// Image files to upload and attach
        #[arg(long = "image")]
        images: Vec<String>,
        /// Documents to attach, as NAME=URL
        #[arg(long = "document")]
        documents: Vec<String>,
        /// Caption applied to every attachment
        #[arg(long, default_value = "")]
        caption: String,
        /// Send text and attachments in a single request
        #[arg(long)]
        turbo: bool,
        /// Schedule for later delivery (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(long)]
        schedule: Option<String>,
        /// Seconds between individual deliveries
        #[arg(long)]
        time_gap: Option<u64>,
        /// Shuffle the recipient order
        #[arg(long)]
        randomize: bool,
    },
    /// Send a pre-approved template
    Template {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "en_US")]
        language: String,
        /// Body parameters, in order
        #[arg(long = "param")]
        params: Vec<String>,
        #[arg(long = "to")]
        to: Vec<String>,
    },
    /// Render per-recipient previews of a message body
    Preview {
        message: String,
        #[arg(long = "to")]
        to: Vec<String>,
    },
    /// Show the send history
    History {
        /// Restrict to one contact's history
        #[arg(long)]
        contact: Option<String>,
    },
    /// Manage messages the backend is holding for later delivery
    Scheduled {
        #[command(subcommand)]
        action: ScheduledAction,
    },
}

#[derive(Subcommand)]
enum ContactsAction {
    /// List the remote contact list
    List,
    /// Add one contact
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        number: String,
    },
    /// Rename a contact (the number is the identity and cannot change)
    Rename {
        #[arg(long)]
        number: String,
        #[arg(long)]
        name: String,
    },
    /// Remove contacts by number
    Remove { numbers: Vec<String> },
    /// Import contacts from a CSV file (header: name,phoneNumber)
    Import { path: String },
    /// Export the full contact list to a CSV file
    Export { path: String },
}

#[derive(Subcommand)]
enum ScheduledAction {
    List,
    Cancel { id: String },
    Reschedule { id: String, due_date_utc: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error[{}]: {err}", err.code());
        std::process::exit(if err.is_validation() { 2 } else { 1 });
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let app = App::new(config);

    match cli.command {
        Command::Contacts { action } => contacts(&app, action).await,
        Command::Send {
            message,
            to,
            images,
            documents,
            caption,
            turbo,
            schedule,
            time_gap,
            randomize,
        } => {
            send(
                &app, message, to, images, documents, caption, turbo, schedule, time_gap,
                randomize,
            )
            .await
        }
        Command::Template {
            name,
            language,
            params,
            to,
        } => template(&app, name, language, params, to).await,
        Command::Preview { message, to } => preview(&app, &message, to).await,
        Command::History { contact } => history(&app, contact).await,
        Command::Scheduled { action } => scheduled(&app, action).await,
    }
}

async fn contacts(app: &App, action: ContactsAction) -> Result<()> {
    match action {
        ContactsAction::List => {
            let contacts = app.contacts.load().await?;
            for contact in &contacts {
                println!("{}\t{}", contact.phone_number, contact.name);
            }
            println!("{} contact(s)", contacts.len());
        }
        ContactsAction::Add { name, number } => {
            app.contacts.load().await?;
            app.contacts.add(Contact::new(name.clone(), number)).await?;
            println!("Added {name}");
        }
        ContactsAction::Rename { number, name } => {
            app.contacts.load().await?;
            app.contacts.rename(&number, name).await?;
            println!("Renamed {number}");
        }
        ContactsAction::Remove { numbers } => {
            app.contacts.load().await?;
            let removed = app.contacts.remove_many(&numbers).await?;
            println!("Removed {removed} contact(s)");
        }
        ContactsAction::Import { path } => {
            app.contacts.load().await?;
            let file = std::fs::File::open(&path)
                .map_err(|e| WabulkError::Validation(format!("Cannot read {path}: {e}")))?;
            let plan = app.contacts.import_csv(file).await?;
            for warning in &plan.skipped_invalid {
                println!("warning: {warning}");
            }
            if plan.skipped_duplicates > 0 {
                println!("{} duplicate number(s) skipped", plan.skipped_duplicates);
            }
            println!("{} contact(s) imported", plan.new_contacts.len());
        }
        ContactsAction::Export { path } => {
            app.contacts.load().await?;
            let file = std::fs::File::create(&path)
                .map_err(|e| WabulkError::Validation(format!("Cannot write {path}: {e}")))?;
            app.contacts.export_csv(file)?;
            println!("Exported to {path}");
        }
    }
    Ok(())
}

async fn select_recipients(app: &App, to: Vec<String>) -> Result<Vec<Contact>> {
    let contacts = app.contacts.load().await?;
    if to.is_empty() {
        return Ok(contacts);
    }
    Ok(to
        .into_iter()
        .map(|number| {
            contacts
                .iter()
                .find(|contact| contact.phone_number == number)
                .cloned()
                .unwrap_or_else(|| Contact::new(number.clone(), number))
        })
        .collect())
}

#[allow(clippy::too_many_arguments)]
async fn send(
    app: &App,
    message: Option<String>,
    to: Vec<String>,
    images: Vec<String>,
    documents: Vec<String>,
    caption: String,
    turbo: bool,
    schedule: Option<String>,
    time_gap: Option<u64>,
    randomize: bool,
) -> Result<()> {
    let recipients = select_recipients(app, to).await?;

    let mut attachments = Vec::new();
    if !images.is_empty() {
        let uploader = ImageUploader::from_config(&app.config)?;
        for path in images {
            let bytes = std::fs::read(&path)
                .map_err(|e| WabulkError::Validation(format!("Cannot read {path}: {e}")))?;
            let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
            let url = uploader.upload(&file_name, bytes).await?;
            attachments.push(
                Attachment::new(file_name, AttachmentKind::Image)
                    .with_caption(caption.clone())
                    .with_url(url),
            );
        }
    }
    for entry in documents {
        let (name, url) = entry.split_once('=').ok_or_else(|| {
            WabulkError::Validation(format!("Expected NAME=URL for --document, got {entry}"))
        })?;
        attachments.push(
            Attachment::new(name, AttachmentKind::Document)
                .with_caption(caption.clone())
                .with_url(url),
        );
    }

    app.settings.update(SettingsUpdate {
        time_gap_secs: time_gap,
        randomize_order: randomize.then_some(true),
    });

    let selected_attachments = attachments.iter().map(|a| a.id).collect();
    let mut state = ComposeState {
        message: message.unwrap_or_default(),
        attachments,
        selected_attachments,
        turbo_mode: turbo,
        scheduled_time: schedule,
    };

    let report = app.dispatcher.dispatch(&mut state, &recipients).await?;
    println!(
        "{} request(s) sent{}",
        report.requests_attempted,
        if report.aborted { ", aborted early" } else { "" }
    );
    print_log(app);
    Ok(())
}

async fn template(
    app: &App,
    name: String,
    language: String,
    params: Vec<String>,
    to: Vec<String>,
) -> Result<()> {
    let recipients = select_recipients(app, to).await?;
    let template = Template {
        name,
        language: TemplateLanguage::deterministic(language),
        components: TemplateComponents::body(
            params.into_iter().map(TemplateParameter::text).collect(),
        ),
    };
    app.dispatcher.dispatch_template(&recipients, template).await?;
    print_log(app);
    Ok(())
}

async fn preview(app: &App, message: &str, to: Vec<String>) -> Result<()> {
    let recipients = select_recipients(app, to).await?;
    for (number, rendered) in wabulk::template::preview(message, &recipients, &RenderContext::immediate()) {
        println!("--- {number}");
        println!("{rendered}");
    }
    Ok(())
}

async fn history(app: &App, contact: Option<String>) -> Result<()> {
    let messages = match contact {
        Some(number) => app.client.contact_history(&number).await?,
        None => app.client.user_history().await?,
    };
    for message in &messages {
        println!(
            "{}\t{}\t{}",
            message.phone_number,
            if message.is_successfull { "sent" } else { "failed" },
            if message.is_scheduled { "scheduled" } else { "immediate" },
        );
    }
    println!("{} message(s)", messages.len());
    Ok(())
}

async fn scheduled(app: &App, action: ScheduledAction) -> Result<()> {
    match action {
        ScheduledAction::List => {
            let messages = app.client.scheduled_messages().await?;
            for message in &messages {
                println!("{}\tdue {}", message.id, message.due_date_utc);
            }
            println!("{} scheduled message(s)", messages.len());
        }
        ScheduledAction::Cancel { id } => {
            app.client.cancel_scheduled_message(&id).await?;
            println!("Canceled {id}");
        }
        ScheduledAction::Reschedule { id, due_date_utc } => {
            app.client.update_scheduled_message(&id, &due_date_utc).await?;
            println!("Rescheduled {id} for {due_date_utc}");
        }
    }
    Ok(())
}

fn print_log(app: &App) {
    for entry in app.log.entries() {
        let details = entry
            .details
            .as_deref()
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        println!("[{}] {:?}: {}{}", entry.timestamp, entry.kind, entry.message, details);
    }
}
