use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const RECENT_LOG_CAPACITY: usize = 200;

/// The most recent WARN/ERROR lines, oldest first. Backs `GET /api/logs`.
#[derive(Clone, Default)]
pub struct RecentLogs {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl RecentLogs {
    pub fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() == RECENT_LOG_CAPACITY {
                lines.pop_front();
            }
            lines.push_back(line);
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Tracing layer that copies WARN and ERROR events into [`RecentLogs`].
pub struct RecentLogLayer {
    logs: RecentLogs,
}

impl RecentLogLayer {
    pub fn new(logs: RecentLogs) -> Self {
        Self { logs }
    }
}

impl<S> tracing_subscriber::Layer<S> for RecentLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        self.logs.push(message);
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

pub const DEFAULT_FILTER: &str = "info,onair=debug,onair_player=debug,onair_server=debug,hyper_util=warn,reqwest=warn";

/// Install the global subscriber: file writer under `data_dir`, `RUST_LOG`
/// filter and the recent-lines layer. Returns the log file path.
pub fn init(data_dir: &Path, logs: RecentLogs) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let log_path = data_dir.join("onair.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(RecentLogLayer::new(logs))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    Ok(log_path)
}
