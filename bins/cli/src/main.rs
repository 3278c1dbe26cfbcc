//! Cloudstash CLI
//!
//! Command-line entry point for the configured object container.

mod args;

use std::process::ExitCode;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cloudstash_core::{ObjectPayload, ObjectRepository};
use cloudstash_shared::{AppConfig, LogSettings, TrustBundleLocator};

use args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config.log, cli.json_logs);

    // Build the repository; nothing is sent to the backend yet
    let repo = ObjectRepository::from_settings(config.storage, &TrustBundleLocator::from_env())
        .context("failed to configure object storage")?;
    info!(
        backend = repo.settings().backend.name(),
        container = %repo.settings().container,
        "Object storage configured"
    );

    run(&repo, cli.command).await
}

fn init_tracing(settings: &LogSettings, json_override: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(settings.filter.as_deref().unwrap_or("cloudstash=info"))
    });
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json || json_override {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Exit status for a yes/no answer.
fn status(found: bool) -> ExitCode {
    if found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(repo: &ObjectRepository, command: Command) -> anyhow::Result<ExitCode> {
    debug!(?command, "running command");

    match command {
        Command::List { prefix } => {
            let objects = repo.list_objects(prefix.as_deref()).await?;
            for object in &objects {
                println!(
                    "{}\t{}\t{}",
                    object.size,
                    object.content_type.as_deref().unwrap_or("-"),
                    object.name
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Has { name } => {
            let found = repo.has_object(&name).await?;
            println!("{found}");
            Ok(status(found))
        }
        Command::Stat { name } => match repo.get_object(&name).await? {
            Some(object) => {
                println!("{}", serde_json::to_string_pretty(&object)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("{name}: not found");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Put {
            name,
            file,
            data,
            content_type,
        } => {
            let payload = ObjectPayload::from_parts(content_type, file, data.map(Bytes::from))?;
            let object = repo.save_object(&name, payload).await?;
            println!("{}\t{}", object.size, object.name);
            Ok(ExitCode::SUCCESS)
        }
        Command::Rm { name } => {
            let deleted = repo.delete_object(&name).await?;
            if !deleted {
                eprintln!("{name}: not found");
            }
            Ok(status(deleted))
        }
        Command::Purge { name } => Ok(status(repo.purge_object(&name))),
        Command::Url { name, url_type } => match repo.get_url(&name, url_type).await? {
            Some(url) => {
                println!("{url}");
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("{name}: not found");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::ContainerUrl { secure } => {
            println!("{}", repo.container_url(secure)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
