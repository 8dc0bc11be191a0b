//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, ReadBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use fontpack::layout::{DirectoryLayout, StorageLayout};
use fontpack::pipeline::{DownloadService, PipelineConfig};
use fontpack::source::{BoxFuture, RemoteBody, RemoteSource, TransportError};
use fontpack::{DownloadTarget, PartIndex, TransferEvent};

/// How the fake server answers one request.
#[derive(Clone)]
pub enum Reply {
    /// Serve these bytes, declaring their length.
    Body(Vec<u8>),
    /// Answer 404.
    NotFound,
    /// Fail the request with a transport error before any body is sent.
    Broken,
    /// Declare `len` bytes, send the head, then fail the connection.
    Truncated(Vec<u8>, u64),
    /// Send these bytes, then stall forever.
    Stall(Vec<u8>),
}

/// A request the fake server received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Manifest(String),
    Part(String, u32),
}

/// In-memory [`RemoteSource`].
#[derive(Default)]
pub struct MemorySource {
    manifests: Mutex<HashMap<String, Reply>>,
    parts: Mutex<HashMap<(String, u32), Reply>>,
    requests: Mutex<Vec<Request>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manifest(self, target: &str, reply: Reply) -> Self {
        self.manifests.lock().insert(target.to_string(), reply);
        self
    }

    pub fn part(self, target: &str, part: u32, reply: Reply) -> Self {
        self.parts.lock().insert((target.to_string(), part), reply);
        self
    }

    /// Serve a manifest and `total_parts` zip parts of `items_per_part` fonts.
    pub fn font_set(self, target: &str, total_parts: u32, items_per_part: u32) -> Self {
        let mut source = self.manifest(target, Reply::Body(manifest_bytes(target)));
        for part in 1..=total_parts {
            let first = (part - 1) * items_per_part + 1;
            source = source.part(target, part, Reply::Body(zip_part(first, items_per_part)));
        }
        source
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn part_requests(&self, target: &str) -> Vec<u32> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| match r {
                Request::Part(t, n) if t == target => Some(*n),
                _ => None,
            })
            .collect()
    }

    fn answer(reply: Option<Reply>, url: String) -> Result<RemoteBody, TransportError> {
        match reply {
            Some(Reply::Body(bytes)) => {
                let len = bytes.len() as u64;
                Ok(RemoteBody::new(Cursor::new(bytes), len))
            }
            Some(Reply::Stall(head)) => {
                let len = head.len() as u64 * 10;
                Ok(RemoteBody::new(StallingReader::new(head), len))
            }
            Some(Reply::Truncated(head, len)) => {
                Ok(RemoteBody::new(TruncatedReader::new(head), len))
            }
            Some(Reply::Broken) => Err(TransportError::Other(format!("connection reset: {}", url))),
            Some(Reply::NotFound) | None => Err(TransportError::NotFound { url }),
        }
    }
}

impl RemoteSource for MemorySource {
    fn fetch_manifest<'a>(
        &'a self,
        target: &'a DownloadTarget,
    ) -> BoxFuture<'a, Result<RemoteBody, TransportError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .push(Request::Manifest(target.key().to_string()));
            let reply = self.manifests.lock().get(target.key()).cloned();
            Self::answer(reply, format!("mem://scripts/script_{}.json", target))
        })
    }

    fn fetch_part<'a>(
        &'a self,
        target: &'a DownloadTarget,
        part: PartIndex,
    ) -> BoxFuture<'a, Result<RemoteBody, TransportError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .push(Request::Part(target.key().to_string(), part.get()));
            let reply = self
                .parts
                .lock()
                .get(&(target.key().to_string(), part.get()))
                .cloned();
            Self::answer(reply, format!("mem://fonts/{0}/{0}-{1}.zip", target, part))
        })
    }
}

/// Yields its head once, then never becomes ready again.
pub struct StallingReader {
    head: Option<Vec<u8>>,
}

impl StallingReader {
    pub fn new(head: Vec<u8>) -> Self {
        Self { head: Some(head) }
    }
}

impl AsyncRead for StallingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.head.take() {
            Some(head) => {
                buf.put_slice(&head);
                Poll::Ready(Ok(()))
            }
            None => Poll::Pending,
        }
    }
}

/// Yields its head, then fails with a connection reset.
pub struct TruncatedReader {
    head: Vec<u8>,
    sent: usize,
}

impl TruncatedReader {
    pub fn new(head: Vec<u8>) -> Self {
        Self { head, sent: 0 }
    }
}

impl AsyncRead for TruncatedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let rest = &self.head[self.sent..];
        if rest.is_empty() {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset mid-body",
            )));
        }
        let n = rest.len().min(buf.remaining());
        buf.put_slice(&rest[..n]);
        self.sent += n;
        Poll::Ready(Ok(()))
    }
}

pub fn manifest_bytes(target: &str) -> Vec<u8> {
    format!("{{\"script\":\"{}\",\"pages\":604}}", target).into_bytes()
}

/// A zip holding `p<first>.ttf ..= p<first + count - 1>.ttf`.
pub fn zip_part(first: u32, count: u32) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for index in first..first + count {
        writer.start_file(format!("p{}.ttf", index), options).unwrap();
        writer
            .write_all(format!("font data for page {}", index).as_bytes())
            .unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Three parts of two fonts each.
pub fn small_config() -> PipelineConfig {
    PipelineConfig::new()
        .with_total_parts(3)
        .with_total_items(6)
        .with_items_per_part(2)
}

pub fn service(
    source: Arc<MemorySource>,
    root: &Path,
    config: PipelineConfig,
) -> (DownloadService, Arc<DirectoryLayout>) {
    let layout = Arc::new(DirectoryLayout::new(root));
    let service = DownloadService::new(source, layout.clone(), config);
    (service, layout)
}

pub fn target(key: &str) -> DownloadTarget {
    DownloadTarget::new(key).unwrap()
}

pub fn part(n: u32) -> Option<PartIndex> {
    Some(PartIndex::new(n).unwrap())
}

/// Events with `Progress` removed.
pub fn phases(events: &[TransferEvent]) -> Vec<TransferEvent> {
    events
        .iter()
        .copied()
        .filter(|e| !matches!(e, TransferEvent::Progress(..)))
        .collect()
}

/// Progress values reported for one phase.
pub fn progress_of(events: &[TransferEvent], phase: Option<PartIndex>) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match *e {
            TransferEvent::Progress(p, pct) if p == phase => Some(pct),
            _ => None,
        })
        .collect()
}

/// Pre-populate `count` extracted fonts, as a previous run would have left them.
pub fn seed_items(layout: &DirectoryLayout, target: &DownloadTarget, count: u32) {
    let dir = layout.output_dir(target);
    std::fs::create_dir_all(&dir).unwrap();
    for index in 1..=count {
        std::fs::write(dir.join(layout.item_file_name(index)), b"font").unwrap();
    }
}

pub fn seed_manifest(layout: &DirectoryLayout, target: &DownloadTarget) {
    let path = layout.manifest_path(target);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, manifest_bytes(target.key())).unwrap();
}

/// Files left in the scratch directory.
pub fn scratch_files(layout: &DirectoryLayout) -> Vec<String> {
    match std::fs::read_dir(layout.scratch_dir()) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
