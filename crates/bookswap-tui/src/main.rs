//! Bookswap TUI entry point.
//!
//! # Usage
//!
//! ```bash
//! # Chat as user 42 against a local relay
//! bookswap-tui --user-id 42
//!
//! # Open straight into a conversation with a book's uploader
//! bookswap-tui --user-id 42 --with-uploader-id 7 --with-uploader-name "Ada Lovelace"
//! ```

use std::{fs::File, path::PathBuf, sync::Arc};

use bookswap_app::Runtime;
use bookswap_client::NavigationContext;
use bookswap_proto::{MediaBase, UserId};
use bookswap_tui::TerminalDriver;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Bookswap terminal chat client
#[derive(Parser, Debug)]
#[command(name = "bookswap-tui")]
#[command(about = "Terminal chat client for the Bookswap marketplace")]
#[command(version)]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, env = "BOOKSWAP_RELAY", default_value = "ws://127.0.0.1:4000/chat")]
    relay: String,

    /// Local user id
    #[arg(long, env = "BOOKSWAP_USER_ID")]
    user_id: String,

    /// Base URL that image references resolve against
    #[arg(long, env = "BOOKSWAP_MEDIA_BASE", default_value = "http://127.0.0.1:4000")]
    media_base: String,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, env = "BOOKSWAP_LOG_FILE", default_value = "bookswap-tui.log")]
    log_file: PathBuf,

    /// Preselect the conversation with this book uploader
    #[arg(long)]
    with_uploader_id: Option<String>,

    /// Display name of the preselected uploader
    #[arg(long, requires = "with_uploader_id")]
    with_uploader_name: Option<String>,

    /// Email of the preselected uploader
    #[arg(long, requires = "with_uploader_id")]
    with_uploader_email: Option<String>,
}

impl Args {
    fn navigation(&self) -> Result<Option<NavigationContext>, bookswap_proto::ProtocolError> {
        let Some(id) = &self.with_uploader_id else {
            return Ok(None);
        };
        Ok(Some(NavigationContext {
            uploader_id: UserId::new(id.as_str())?,
            uploader_name: self.with_uploader_name.clone().unwrap_or_else(|| id.clone()),
            uploader_email: self.with_uploader_email.clone().unwrap_or_default(),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_file = File::create(&args.log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Arc::new(log_file)).with_ansi(false))
        .with(filter)
        .init();

    let self_id = UserId::new(args.user_id.as_str())?;
    let navigation = args.navigation()?;
    tracing::info!(user_id = %self_id, relay = %args.relay, "bookswap-tui starting");

    let driver = TerminalDriver::new()?;
    let mut runtime =
        Runtime::new(driver, self_id, args.relay.clone(), MediaBase::new(args.media_base.clone()));
    if let Some(context) = navigation {
        runtime = runtime.with_navigation(context);
    }

    Ok(runtime.run().await?)
}
