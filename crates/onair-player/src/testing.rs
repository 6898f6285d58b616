//! In-memory stand-ins for the network and the audio backend.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use onair_proto::protocol::NowPlaying;

use crate::error::{FetchError, MediaError};
use crate::fetch::NowPlayingSource;
use crate::media::MediaOutput;
use crate::prober::Prober;

#[derive(Clone, Default)]
pub struct FakeProber {
    reachable: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeProber {
    pub fn reachable(urls: &[&str]) -> Self {
        let p = Self::default();
        p.set_reachable(urls);
        p
    }

    pub fn set_reachable(&self, urls: &[&str]) {
        *self.reachable.lock().unwrap() = urls.iter().map(|u| u.to_string()).collect();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, url: &str, _timeout: Duration) -> bool {
        self.calls.lock().unwrap().push(url.to_string());
        self.reachable.lock().unwrap().contains(url)
    }
}

/// Replays queued results, then answers with an empty payload.
#[derive(Clone, Default)]
pub struct FakeSource {
    queued: Arc<Mutex<VecDeque<Result<NowPlaying, u16>>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub fn push_ok(&self, payload: NowPlaying) {
        self.queued.lock().unwrap().push_back(Ok(payload));
    }

    pub fn push_status(&self, status: u16) {
        self.queued.lock().unwrap().push_back(Err(status));
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl NowPlayingSource for FakeSource {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<NowPlaying, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.queued.lock().unwrap().pop_front() {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(status)) => Err(FetchError::Status(status)),
            None => Ok(NowPlaying::default()),
        }
    }
}

/// Records every call as a short string, e.g. `load http://a`, `volume 0.5`.
#[derive(Clone, Default)]
pub struct RecordingMedia {
    log: Arc<Mutex<Vec<String>>>,
    fail_load: Arc<Mutex<bool>>,
}

impl RecordingMedia {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn fail_load(&self, fail: bool) {
        *self.fail_load.lock().unwrap() = fail;
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl MediaOutput for RecordingMedia {
    async fn load(&mut self, url: &str) -> Result<(), MediaError> {
        self.record(format!("load {}", url));
        if *self.fail_load.lock().unwrap() {
            return Err(MediaError::Element("load refused".into()));
        }
        Ok(())
    }

    async fn play(&mut self) -> Result<(), MediaError> {
        self.record("play".into());
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), MediaError> {
        self.record("pause".into());
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), MediaError> {
        self.record("stop".into());
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), MediaError> {
        self.record(format!("volume {}", volume));
        Ok(())
    }

    async fn set_muted(&mut self, muted: bool) -> Result<(), MediaError> {
        self.record(format!("muted {}", muted));
        Ok(())
    }
}
