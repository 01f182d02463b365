//! Welcomer - greets new group members on Telegram.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration and hot-swappable welcome settings
//! - `welcome` - Platform-neutral core: join classification, member-id
//!   resolution, template compilation, image resolution, plan assembly
//! - `events` - Telegram adapter feeding the core and delivering greetings
//! - `bot` - Dispatcher and runtime (with Throttle for API rate limiting)
//! - `utils` - Utility functions

mod bot;
mod config;
mod events;
mod utils;
mod welcome;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::AppState;
use config::{Config, SharedConfig, WelcomeConfig};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("welcomer=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting welcomer bot...");

    let config = Config::from_env()?;
    info!("Bot mode: {:?}", config.bot_mode);

    let welcome_dir = config::ensure_data_dir(&config.data_dir)?;
    let welcome = WelcomeConfig::load(&config.data_dir)?;
    info!(
        "Welcome handler initialised (template: {}, default image: {})",
        welcome.template,
        welcome.default_image_path.display()
    );
    if welcome.template.placeholder_count() == 0 {
        warn!("Welcome template has no {{at}} placeholder, new members will not be mentioned");
    }
    info!("Drop a welcome.jpg into {} to use it as the default image", welcome_dir.display());

    let shared = SharedConfig::new(welcome);
    config::spawn_sighup_reload(shared.clone(), config.data_dir.clone());

    // Telegram's rate limits are enforced by the Throttle adaptor
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    let dispatcher = bot::build_dispatcher(bot.clone(), AppState::new(shared));
    bot::run(&config, dispatcher, bot).await?;

    info!("Welcome handler unloaded");

    Ok(())
}
