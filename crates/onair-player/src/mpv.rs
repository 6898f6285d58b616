//! mpv-backed [`MediaOutput`].
//!
//! ```text
//!   MpvMedia::ensure_ipc()
//!         │  spawns `mpv --idle --no-video --input-ipc-server=<sock>`
//!         ├── writer task  ← IpcRequest via mpsc → JSON line on the socket
//!         └── reader task  ← JSON lines from the socket
//!                              ├── reply (request_id) → pending oneshot
//!                              └── event            → SignalMapper → PlayerEvent::Media
//! ```
//!
//! Unix only; mpv's IPC is a Unix domain socket there.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::core::PlayerEvent;
use crate::error::MediaError;
use crate::media::{MediaOutput, MediaSignal};

const OBS_CORE_IDLE: u64 = 1;
const OBS_PAUSE: u64 = 2;
const OBS_PAUSED_FOR_CACHE: u64 = 3;

const IPC_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, MediaError>>>>>;

struct IpcRequest {
    req_id: u64,
    line: String,
    reply: oneshot::Sender<Result<Value, MediaError>>,
}

// ── signal mapping ────────────────────────────────────────────────────────────

/// Turns raw mpv events into the element-style signals the core expects.
#[derive(Debug, Default)]
pub(crate) struct SignalMapper {
    loaded: bool,
    paused: bool,
    idle: Option<bool>,
}

impl SignalMapper {
    pub(crate) fn on_event(&mut self, raw: &Value) -> Option<MediaSignal> {
        let event = raw.get("event")?.as_str()?;
        match event {
            "start-file" => {
                self.loaded = true;
                self.idle = None;
                None
            }
            "end-file" => {
                self.loaded = false;
                self.idle = None;
                let reason = raw.get("reason").and_then(|v| v.as_str()).unwrap_or("");
                if matches!(reason, "error" | "network") {
                    let detail = raw
                        .get("file_error")
                        .and_then(|v| v.as_str())
                        .unwrap_or(reason);
                    Some(MediaSignal::Error(format!("mpv end-file: {}", detail)))
                } else {
                    None
                }
            }
            "property-change" => {
                let id = raw.get("id")?.as_u64()?;
                let data = raw.get("data").unwrap_or(&Value::Null);
                match id {
                    OBS_PAUSE => {
                        self.paused = data.as_bool().unwrap_or(false);
                        None
                    }
                    OBS_PAUSED_FOR_CACHE if data.as_bool() == Some(true) && self.loaded => {
                        Some(MediaSignal::Stalled)
                    }
                    OBS_CORE_IDLE => {
                        let idle = data.as_bool()?;
                        let previous = self.idle.replace(idle);
                        if !self.loaded || previous == Some(idle) {
                            return None;
                        }
                        if !idle {
                            Some(MediaSignal::CanPlay)
                        } else if !self.paused {
                            Some(MediaSignal::Waiting)
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

// ── IPC handle ────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct MpvIpc {
    tx: mpsc::Sender<IpcRequest>,
}

impl MpvIpc {
    fn start(stream: UnixStream, events: mpsc::Sender<PlayerEvent>) -> Self {
        let (read_half, write_half) = stream.into_split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = mpsc::channel::<IpcRequest>(64);

        tokio::spawn(writer_task(write_half, rx, pending.clone()));
        tokio::spawn(reader_task(BufReader::new(read_half), pending, events));

        Self { tx }
    }

    async fn send(&self, command: Value) -> Result<Value, MediaError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut line = json!({ "command": command, "request_id": req_id }).to_string();
        line.push('\n');

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(IpcRequest {
                req_id,
                line,
                reply,
            })
            .await
            .map_err(|_| MediaError::Command("mpv writer task gone".into()))?;

        tokio::time::timeout(IPC_REPLY_TIMEOUT, rx)
            .await
            .map_err(|_| MediaError::Command(format!("mpv IPC timeout for req={}", req_id)))?
            .map_err(|_| MediaError::Command(format!("mpv reply dropped req={}", req_id)))?
    }

    async fn observe_properties(&self) {
        let props = [
            (OBS_CORE_IDLE, "core-idle"),
            (OBS_PAUSE, "pause"),
            (OBS_PAUSED_FOR_CACHE, "paused-for-cache"),
        ];
        for (id, name) in props {
            if let Err(e) = self.send(json!(["observe_property", id, name])).await {
                warn!("mpv: observe_property {} failed: {}", name, e);
            }
        }
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: Pending,
    events: mpsc::Sender<PlayerEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut mapper = SignalMapper::default();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                break;
            }
            Ok(_) => {
                let val: Value = match serde_json::from_str(line.trim()) {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    if let Some(tx) = pending.lock().await.remove(&req_id) {
                        let result = match val["error"].as_str() {
                            Some("success") => Ok(val),
                            other => Err(MediaError::Command(format!(
                                "mpv error: {}",
                                other.unwrap_or("unknown")
                            ))),
                        };
                        let _ = tx.send(result);
                    }
                } else if let Some(signal) = mapper.on_event(&val) {
                    debug!("mpv: signal {:?}", signal);
                    if events.send(PlayerEvent::Media(signal)).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                break;
            }
        }
    }

    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(MediaError::Command("mpv IPC connection closed".into())));
    }
    let _ = events
        .send(PlayerEvent::Media(MediaSignal::Error(
            "mpv IPC connection closed".into(),
        )))
        .await;
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<IpcRequest>, pending: Pending)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can always match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        if let Err(e) = writer.write_all(req.line.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(MediaError::Command(format!("mpv write error: {}", e))));
            }
            break;
        }
    }
}

// ── MediaOutput ───────────────────────────────────────────────────────────────

pub struct MpvMedia {
    socket_path: PathBuf,
    process: Option<tokio::process::Child>,
    ipc: Option<MpvIpc>,
    events: mpsc::Sender<PlayerEvent>,
    volume: f32,
    muted: bool,
}

impl MpvMedia {
    pub fn new(events: mpsc::Sender<PlayerEvent>, volume: f32) -> Self {
        Self {
            socket_path: PathBuf::from(onair_proto::platform::mpv_socket_name()),
            process: None,
            ipc: None,
            events,
            volume,
            muted: false,
        }
    }

    fn process_alive(&mut self) -> bool {
        match self.process.as_mut() {
            Some(child) => child.try_wait().ok().flatten().is_none(),
            None => false,
        }
    }

    async fn spawn(&mut self) -> Result<MpvIpc, MediaError> {
        if let Some(mut old) = self.process.take() {
            let _ = old.kill().await;
        }
        let _ = tokio::fs::remove_file(&self.socket_path).await;

        let binary = onair_proto::platform::find_mpv_binary()
            .ok_or_else(|| MediaError::Unavailable("mpv binary not found".into()))?;
        info!("mpv: spawning {}", binary.display());

        let child = tokio::process::Command::new(binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--quiet")
            .arg(onair_proto::platform::mpv_socket_arg())
            .arg(format!("--volume={}", volume_percent(self.volume)))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::Unavailable(e.to_string()))?;
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.socket_path.exists() {
                break;
            }
        }
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| MediaError::Unavailable(format!("mpv IPC socket: {}", e)))?;
        info!("mpv: connected to IPC socket");

        let ipc = MpvIpc::start(stream, self.events.clone());
        ipc.observe_properties().await;
        Ok(ipc)
    }

    async fn ensure_ipc(&mut self) -> Result<MpvIpc, MediaError> {
        if self.ipc.is_some() && !self.process_alive() {
            warn!("mpv: process died, respawning");
            self.ipc = None;
        }
        if let Some(ipc) = &self.ipc {
            return Ok(ipc.clone());
        }
        let ipc = self.spawn().await?;
        self.ipc = Some(ipc.clone());
        Ok(ipc)
    }
}

fn volume_percent(volume: f32) -> i64 {
    (volume * 100.0).clamp(0.0, 100.0).round() as i64
}

#[async_trait]
impl MediaOutput for MpvMedia {
    async fn load(&mut self, url: &str) -> Result<(), MediaError> {
        let ipc = self.ensure_ipc().await?;
        ipc.send(json!(["loadfile", url])).await?;
        ipc.send(json!(["set_property", "volume", volume_percent(self.volume)]))
            .await?;
        ipc.send(json!(["set_property", "mute", self.muted])).await?;
        Ok(())
    }

    async fn play(&mut self) -> Result<(), MediaError> {
        let ipc = self.ensure_ipc().await?;
        ipc.send(json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), MediaError> {
        if let Some(ipc) = &self.ipc {
            ipc.send(json!(["set_property", "pause", true])).await?;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), MediaError> {
        if let Some(ipc) = self.ipc.take() {
            let _ = ipc.send(json!(["stop"])).await;
        }
        if let Some(mut child) = self.process.take() {
            let _ = child.kill().await;
        }
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), MediaError> {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(ipc) = &self.ipc {
            ipc.send(json!(["set_property", "volume", volume_percent(self.volume)]))
                .await?;
        }
        Ok(())
    }

    async fn set_muted(&mut self, muted: bool) -> Result<(), MediaError> {
        self.muted = muted;
        if let Some(ipc) = &self.ipc {
            ipc.send(json!(["set_property", "mute", muted])).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(id: u64, data: Value) -> Value {
        json!({ "event": "property-change", "id": id, "data": data })
    }

    #[test]
    fn core_idle_transitions_map_to_waiting_and_canplay() {
        let mut m = SignalMapper::default();
        assert_eq!(m.on_event(&prop(OBS_CORE_IDLE, json!(true))), None);
        assert_eq!(m.on_event(&json!({ "event": "start-file" })), None);
        assert_eq!(
            m.on_event(&prop(OBS_CORE_IDLE, json!(true))),
            Some(MediaSignal::Waiting)
        );
        assert_eq!(
            m.on_event(&prop(OBS_CORE_IDLE, json!(false))),
            Some(MediaSignal::CanPlay)
        );
        assert_eq!(m.on_event(&prop(OBS_CORE_IDLE, json!(false))), None);
        assert_eq!(
            m.on_event(&prop(OBS_CORE_IDLE, json!(true))),
            Some(MediaSignal::Waiting)
        );
    }

    #[test]
    fn paused_idle_is_not_waiting() {
        let mut m = SignalMapper::default();
        m.on_event(&json!({ "event": "start-file" }));
        m.on_event(&prop(OBS_CORE_IDLE, json!(false)));
        m.on_event(&prop(OBS_PAUSE, json!(true)));
        assert_eq!(m.on_event(&prop(OBS_CORE_IDLE, json!(true))), None);
    }

    #[test]
    fn cache_pause_is_stalled() {
        let mut m = SignalMapper::default();
        m.on_event(&json!({ "event": "start-file" }));
        assert_eq!(
            m.on_event(&prop(OBS_PAUSED_FOR_CACHE, json!(true))),
            Some(MediaSignal::Stalled)
        );
        assert_eq!(m.on_event(&prop(OBS_PAUSED_FOR_CACHE, json!(false))), None);
    }

    #[test]
    fn network_end_file_is_error() {
        let mut m = SignalMapper::default();
        m.on_event(&json!({ "event": "start-file" }));
        let sig = m.on_event(&json!({ "event": "end-file", "reason": "error", "file_error": "loading failed" }));
        assert_eq!(sig, Some(MediaSignal::Error("mpv end-file: loading failed".into())));
        assert_eq!(
            m.on_event(&json!({ "event": "end-file", "reason": "stop" })),
            None
        );
    }
}
