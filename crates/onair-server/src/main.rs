use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use onair_player::media::{MediaOutput, NullMedia};
use onair_player::{Backends, PlayerCore, PlayerEvent, PlayerSettings, PlayerUpdate};
use onair_proto::config::Config;
use onair_proto::protocol::Command;
use onair_server::chat::ChatStore;
use onair_server::http::{self, Services};
use onair_server::logging::{self, RecentLogs};
use onair_server::proxy::ProxyState;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "onair")]
#[command(about = "Internet radio player with stream failover and now-playing polling", long_about = None)]
struct Cli {
    /// Configuration file path (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll now-playing only; do not start an audio backend
    #[arg(long)]
    headless: bool,

    /// Override the HTTP port from the config
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let recent_logs = RecentLogs::default();
    let log_path = logging::init(&onair_proto::platform::data_dir(), recent_logs.clone())?;
    eprintln!("onair: logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!(
        "Config loaded from: {:?}",
        cli.config.clone().unwrap_or_else(Config::config_path)
    );
    if let Some(port) = cli.port {
        config.http.port = port;
    }

    // Event channel: HTTP commands and media signals funnel into PlayerCore
    let (event_tx, event_rx) = mpsc::channel::<PlayerEvent>(256);
    let (update_tx, _) = broadcast::channel::<PlayerUpdate>(100);

    let media = build_media(&config, cli.headless, event_tx.clone());
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    let core = PlayerCore::new(
        PlayerSettings::from_config(&config),
        Backends::http(client, media),
        update_tx.clone(),
    );
    let state_manager = core.state_manager();

    if config.http.enabled {
        let app = http::router(Services {
            state_manager: state_manager.clone(),
            event_tx: event_tx.clone(),
            logs: recent_logs,
            chat: Arc::new(ChatStore::new(
                config.chat.messages_file.clone(),
                config.player.locale,
            )),
            proxy: ProxyState::new(&config.proxy)?,
        });
        let _http_handle =
            http::start_server(config.http.bind_address.clone(), config.http.port, app);
    }

    if config.player.autoplay {
        event_tx.send(PlayerEvent::Command(Command::Connect)).await?;
    }

    let shutdown_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(PlayerEvent::Command(Command::Teardown)).await;
        }
    });

    info!("Player initialised, running event loop");
    core.run(event_rx).await;

    Ok(())
}

fn build_media(
    config: &Config,
    headless: bool,
    event_tx: mpsc::Sender<PlayerEvent>,
) -> Box<dyn MediaOutput> {
    if headless || !config.mpv.enabled {
        info!("Audio output disabled, polling only");
        return Box::new(NullMedia);
    }

    #[cfg(unix)]
    {
        if onair_proto::platform::find_mpv_binary().is_some() {
            return Box::new(onair_player::mpv::MpvMedia::new(
                event_tx,
                config.player.volume,
            ));
        }
        warn!("mpv not found, falling back to polling only");
    }
    #[cfg(not(unix))]
    {
        let _ = event_tx;
        warn!("mpv output is only supported on unix, polling only");
    }
    Box::new(NullMedia)
}
