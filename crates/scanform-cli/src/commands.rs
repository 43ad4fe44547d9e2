//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Serialize;

use scanform::config::default_config_path;
use scanform::db::default_database_path;
use scanform::ocr::init_native;
use scanform::pipeline::LogProgress;
use scanform::{
    load_config, Config, ContentType, Database, DocumentService, FileStorage, PageRequest,
    ProcessingStatus, SqliteDocumentRepository,
};

use crate::cli::{Cli, Commands};

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    let service = open_service(&config)?;

    let result = dispatch(&service, cli.command);
    service.shutdown();
    result
}

fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    if let Some(path) = default_config_path().filter(|p| p.exists()) {
        tracing::debug!("Using config at {}", path.display());
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let uploads = dirs::home_dir()
        .map(|h| h.join(".scanform").join("uploads"))
        .unwrap_or_else(|| PathBuf::from("uploads"));
    tracing::debug!("No config file found, using defaults");
    Ok(Config::default_for(uploads.to_string_lossy()))
}

fn open_service(config: &Config) -> anyhow::Result<DocumentService> {
    init_native(config.ocr.tesseract.data_path.as_deref())
        .context("Failed to initialize Tesseract")?;

    let db_path = config
        .resolved_database_path()
        .or_else(default_database_path)
        .context("Could not determine a database path")?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let repo = Arc::new(SqliteDocumentRepository::new(db));
    let store = Arc::new(FileStorage::new(&config.upload_directory));

    let service = DocumentService::builder(repo, store)
        .config(config)
        .progress(Arc::new(LogProgress))
        .build()
        .context("Failed to start document service")?;
    Ok(service)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dispatch(service: &DocumentService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Upload {
            file,
            content_type,
            process,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = match content_type {
                Some(ct) => ct,
                None => ContentType::guess_from_filename(&filename)
                    .map(|ct| ct.as_mime().to_string())
                    .with_context(|| {
                        format!("Cannot guess content type of {}; pass --content-type", filename)
                    })?,
            };

            let document =
                service.upload_document(&bytes, &filename, &content_type, bytes.len() as u64)?;
            if process {
                let outcome = service.start_processing(&document.id)?.wait()?;
                tracing::info!(status = %outcome.status, "Processing finished");
                print_json(&service.get_document(&document.id)?)
            } else {
                print_json(&document)
            }
        }

        Commands::Process { id, engine } => {
            let outcome = service.start_processing_with(&id, engine)?.wait()?;
            if let Some(error) = &outcome.error {
                eprintln!("Processing failed: {}", error);
            }
            print_json(&service.get_document(&id)?)
        }

        Commands::Batch { ids } => {
            let results = service.process_batch(&ids).wait();
            let mut failures = 0usize;
            for result in &results {
                match &result.outcome {
                    Ok(outcome) if outcome.is_success() => {
                        println!("{}  {}", result.document_id, outcome.status);
                    }
                    Ok(outcome) => {
                        failures += 1;
                        println!(
                            "{}  {}  {}",
                            result.document_id,
                            outcome.status,
                            outcome.error.as_deref().unwrap_or_default()
                        );
                    }
                    Err(e) => {
                        failures += 1;
                        println!("{}  NOT STARTED  {}", result.document_id, e);
                    }
                }
            }
            if failures > 0 {
                bail!("{} of {} documents did not complete", failures, results.len());
            }
            Ok(())
        }

        Commands::Show { id, text } => {
            let mut document = service.get_document(&id)?;
            if !text {
                document.extracted_text = None;
            }
            let mappings = service.field_mappings(&id)?;
            print_json(&serde_json::json!({
                "document": document,
                "field_mappings": mappings,
            }))
        }

        Commands::List {
            status,
            page,
            size,
            sort,
            direction,
        } => match status {
            Some(status) => print_json(&service.list_by_status(status)?),
            None => {
                let request = PageRequest::new(page, size).sorted(sort, direction);
                let page = service.list_paged(&request)?;
                print_json(&serde_json::json!({
                    "items": page.items,
                    "total": page.total,
                    "page": page.page,
                    "size": page.size,
                    "total_pages": page.total_pages(),
                }))
            }
        },

        Commands::Search { fragment } => print_json(&service.search_by_filename(&fragment)?),

        Commands::Correct { id, json, file } => {
            let json = match (json, file) {
                (Some(json), _) => json,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => bail!("Provide corrected JSON or --file"),
            };
            print_json(&service.apply_correction(&id, &json)?)
        }

        Commands::Merged { id } => {
            match service.merged_json(&id)? {
                Some(json) => {
                    let value: serde_json::Value = serde_json::from_str(&json)?;
                    print_json(&value)?;
                }
                None => println!("{{}}"),
            }
            Ok(())
        }

        Commands::Engines => print_json(&serde_json::json!({
            "engines": service.engine_status(),
            "handwriting_recognition": service.is_handwriting_recognition_available(),
        })),

        Commands::Languages { set, also } => {
            let current = match set {
                Some(primary) => {
                    if !service.is_language_supported(&primary) {
                        tracing::warn!(
                            "'{}' is not a known language code; passing it to the engines as-is",
                            primary
                        );
                    }
                    service.set_language(&primary, &also)
                }
                None => service.current_languages(),
            };
            print_json(&serde_json::json!({
                "current": current,
                "supported": service.supported_languages(),
            }))
        }

        Commands::Stats => {
            let mut counts = serde_json::Map::new();
            for status in ProcessingStatus::ALL {
                counts.insert(
                    status.as_str().to_string(),
                    service.count_by_status(status)?.into(),
                );
            }
            print_json(&counts)
        }
    }
}
