//! In-memory collaborators and fixture builders, shared by the unit tests and by the
//! integration tests under `tests/`.
//!
//! Fakes are cheap to clone and clones share state, so a test can hand one to a
//! `Pipeline` and still inspect it afterwards.

use async_trait::async_trait;
use descriptions_lib::tools::{ContentFetcher, Converter, Publisher, SourceControl};
use descriptions_lib::utils::hash::sha1_hex;
use descriptions_lib::{Result, SyncConfig, SyncError};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;

pub const BASE_URL: &str = "https://descriptions.test";

pub fn test_config(root: &Path) -> Arc<SyncConfig> {
    let mut config = SyncConfig::with_root(root);
    config.base_url = BASE_URL.to_string();
    Arc::new(config)
}

/// Zip archive bytes holding the given entries. Build once per fixture: entry
/// timestamps make repeated builds differ.
pub fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A server-style bundle jar embedding `inner` under `META-INF/versions/<inner_path>`
pub fn bundle_bytes(inner_path: &str, inner: &[u8]) -> Vec<u8> {
    let listing = format!("{}\t1.20.1\t{}", sha1_hex(inner), inner_path);
    let inner_name = format!("META-INF/versions/{inner_path}");
    let main_class: &[u8] = b"\xca\xfe\xba\xbe";
    jar_bytes(&[
        ("META-INF/versions.list", listing.as_bytes()),
        (inner_name.as_str(), inner),
        ("net/minecraft/bundler/Main.class", main_class),
    ])
}

pub fn descriptor_json(id: &str, release_time: &str, downloads: &[(&str, &str, &str)]) -> String {
    let downloads: serde_json::Map<String, serde_json::Value> = downloads
        .iter()
        .map(|(name, sha1, url)| {
            (
                name.to_string(),
                serde_json::json!({ "sha1": sha1, "size": 1, "url": url }),
            )
        })
        .collect();

    serde_json::json!({
        "id": id,
        "type": "release",
        "releaseTime": release_time,
        "downloads": downloads,
    })
    .to_string()
}

pub async fn write_descriptor(dir: &Path, file_id: &str, json: &str) {
    tokio::fs::create_dir_all(dir).await.expect("create descriptor dir");
    tokio::fs::write(dir.join(format!("{file_id}.json")), json)
        .await
        .expect("write descriptor");
}

/// Serves registered URLs from memory and records every request.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    responses: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    pub fn serve(&self, url: &str, bytes: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                SyncError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no fixture for {url}"),
                ))
            })
    }
}

/// Records conversions and writes a stub tiny file, or fails with `exit_code`.
#[derive(Clone, Default)]
pub struct FakeConverter {
    calls: Arc<Mutex<Vec<(PathBuf, PathBuf, String)>>>,
    exit_code: Option<i32>,
}

impl FakeConverter {
    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Converter for FakeConverter {
    async fn convert(&self, input: &Path, output: &Path, format: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf(), format.to_string()));

        if let Some(code) = self.exit_code {
            return Err(SyncError::Conversion {
                input: input.to_path_buf(),
                code: Some(code),
                stderr: "fake failure".to_string(),
            });
        }

        tokio::fs::write(output, b"tiny\t2\t0\tofficial\n").await?;
        Ok(())
    }
}

/// A descriptor mirror whose head only moves when told to.
#[derive(Clone)]
pub struct FakeSource {
    head: Arc<Mutex<String>>,
    pulls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn at(commit: &str) -> Self {
        Self {
            head: Arc::new(Mutex::new(commit.to_string())),
            pulls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn advance(&self, commit: &str) {
        *self.head.lock().unwrap() = commit.to_string();
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceControl for FakeSource {
    async fn pull(&self) -> Result<String> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head.lock().unwrap().clone())
    }
}

/// A working tree that is dirty until published, recording every commit message.
#[derive(Clone, Default)]
pub struct FakePublisher {
    dirty: Arc<AtomicBool>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl FakePublisher {
    pub fn dirty() -> Self {
        let publisher = Self::default();
        publisher.touch();
        publisher
    }

    pub fn touch(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, message: &str) -> Result<bool> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.messages.lock().unwrap().push(message.to_string());
        Ok(true)
    }
}
