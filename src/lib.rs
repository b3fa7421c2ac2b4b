use crate::app_config::AppConfig;
use crate::commands::Console;
use crate::core::file_storage::FileStorage;
use dotenvy::dotenv;
use log::info;

pub mod core;
pub mod commands;
pub mod app_config;

pub fn initialize_environment() {
    dotenv().ok();
    pretty_env_logger::init();
}

/// Loads configuration, opens the storage file and hands both to a console.
pub fn initialize_system(storage_file: Option<String>) -> Result<(Console, AppConfig), Box<dyn std::error::Error>> {
    let config = AppConfig::new()?.with_storage_file(storage_file);
    let storage = FileStorage::open(&config.storage_file);
    info!("Opened {} with {} objects", config.storage_file, storage.len());
    let console = Console::new(storage, config.prompt.clone());
    Ok((console, config))
}
