pub mod chat;
pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod markdown;
pub mod models;
pub mod repl;

use chat::{ ChatController, Services };
use cli::Args;
use config::settings::FileSettingsRepository;
use history::create_saved_chat_store;
use llm::backend::BackendClient;
use log::{ info, warn };
use repl::Repl;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.backend_url);
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Markdown Hint: {}", !args.no_markdown_hint);
    info!("Data Directory: {}", args.data_dir.display());
    info!("Saved Chat Store Type: {}", args.store_type);
    info!("-------------------------");

    let backend = Arc::new(
        BackendClient::new(&args.backend_url, args.request_timeout(), !args.no_markdown_hint)?
    );
    let services = Services {
        completion: backend.clone(),
        directory: backend.clone(),
        keys: backend,
        saved_chats: create_saved_chat_store(&args.store_type, &args.data_dir)?,
        settings: Arc::new(FileSettingsRepository::new(args.data_dir.join("settings.json"))),
    };

    let mut controller = ChatController::new(services);
    match controller.load_defaults().await {
        Ok(true) => info!("Default settings applied"),
        Ok(false) => info!("No default settings found, using built-in defaults"),
        Err(e) => warn!("Ignoring unreadable default settings: {}", e),
    }

    if let Some(provider) = &args.provider {
        controller.select_provider(provider);
    }
    if let Some(model) = &args.model {
        controller.select_model(model);
    }
    if let Some(persona) = &args.persona {
        controller.settings_mut().persona = persona.clone();
    }

    let providers = controller.refresh_providers().await.len();
    let models = controller.refresh_models().await.len();
    info!("{} providers and {} models available", providers, models);

    let mut repl = Repl::new(controller, args.data_dir.join("exports"));
    repl.run().await
}
