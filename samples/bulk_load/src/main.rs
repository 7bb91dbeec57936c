mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use dataverse_bulk_load::auth::acquire_token;
use dataverse_bulk_load::config::ConnectionConfig;
use dataverse_bulk_load::dataverse::bulkload::BulkLoader;
use dataverse_bulk_load::dataverse::metadata::SchemaOptions;
use dataverse_bulk_load::dataverse::serviceclient::ServiceClient;
use dataverse_bulk_load::dataverse::store::FileCacheStore;
use dataverse_bulk_load::dataverse::uploader::UploadReport;
use dataverse_bulk_load::LogLevel;

use cli::Args;

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let log_level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Information
    };
    env_logger::Builder::new()
        .filter_level(log_level.into())
        .parse_default_env()
        .init();

    let config = ConnectionConfig::from_file(&args.config).map_err(|e| e.to_string())?;
    let store = match &args.cache_dir {
        Some(dir) => FileCacheStore::new(dir),
        None => FileCacheStore::default_location(),
    };
    log::debug!("Cache directory: {}", store.dir().display());

    let auth = config
        .auth(args.token.as_deref())
        .map_err(|e| e.to_string())?;
    let token = acquire_token(&auth, &store)
        .await
        .map_err(|e| e.to_string())?;

    let client = ServiceClient::new(config.environment(), &token, log_level);
    let options = SchemaOptions {
        prefix: args.prefix.clone(),
        ..SchemaOptions::default()
    };
    let loader = BulkLoader::connect(client, &store, &options)
        .await
        .map_err(|e| e.to_string())?;

    let report = loader
        .create_from_csv(&args.entity, &args.csv)
        .await
        .map_err(|e| e.to_string())?;

    let path = write_report(&args.output, &args.entity, &report)?;
    println!(
        "{} of {} records created, {} failures. Report: {}",
        report.summary.succeeded,
        report.summary.total(),
        report.summary.failed,
        path.display()
    );

    Ok(())
}

fn write_report(output: &Path, entity: &str, report: &UploadReport) -> Result<PathBuf, String> {
    let run_dir = output.join(chrono::Local::now().format("%Y%m%d%H%M%S").to_string());
    fs::create_dir_all(&run_dir)
        .map_err(|e| format!("Failed to create {}: {e}", run_dir.display()))?;

    let path = run_dir.join(format!("{}.json", entity));
    let json = serde_json::to_string(report).map_err(|e| e.to_string())?;
    fs::write(&path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;

    Ok(path)
}
