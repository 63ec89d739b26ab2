use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::thread::{self, JoinHandle};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use crossbeam_channel::{Receiver, Sender};
use image::ImageReader;
use thiserror::Error;
use tracing::{debug, warn};

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Decoded RGBA8 image, row-major, `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl SpriteImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            rgba.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unsupported asset source scheme: {0}")]
    UnsupportedSource(String),
    #[error("data url is not base64 encoded")]
    NotBase64DataUrl,
    #[error("data url has no payload separator")]
    MalformedDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to open image file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub outcome: Result<SpriteImage, AssetError>,
}

/// Decodes an image from a `data:` URL or a local file path.
pub fn decode_source(source: &str) -> Result<SpriteImage, AssetError> {
    if let Some(rest) = source.strip_prefix(DATA_URL_PREFIX) {
        let bytes = decode_data_url_payload(rest)?;
        let decoded = image::load_from_memory(&bytes)?;
        return Ok(into_sprite(decoded));
    }
    if source.contains("://") {
        return Err(AssetError::UnsupportedSource(scheme_of(source).to_string()));
    }
    let reader = ImageReader::open(Path::new(source))?;
    let decoded = reader.with_guessed_format()?.decode()?;
    Ok(into_sprite(decoded))
}

fn decode_data_url_payload(rest: &str) -> Result<Vec<u8>, AssetError> {
    let (header, payload) = rest.split_once(',').ok_or(AssetError::MalformedDataUrl)?;
    if !header.ends_with(BASE64_MARKER) {
        return Err(AssetError::NotBase64DataUrl);
    }
    Ok(BASE64.decode(payload.trim())?)
}

fn scheme_of(source: &str) -> &str {
    source.split("://").next().unwrap_or(source)
}

fn into_sprite(decoded: image::DynamicImage) -> SpriteImage {
    let image = decoded.to_rgba8();
    SpriteImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    }
}

#[cfg(test)]
pub(crate) fn encode_png_data_url(sprite: &SpriteImage) -> Result<String, AssetError> {
    use std::io::Cursor;

    let buffer = image::RgbaImage::from_raw(sprite.width, sprite.height, sprite.rgba.clone())
        .ok_or(AssetError::MalformedDataUrl)?;
    let mut bytes = Cursor::new(Vec::new());
    buffer.write_to(&mut bytes, image::ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(bytes.into_inner())
    ))
}

/// Non-blocking image loading. Submissions return immediately; finished loads
/// are collected by the owner with `drain_completed` on its own thread.
pub trait AssetLoader {
    fn submit(&mut self, ticket: LoadTicket, source: String);
    fn drain_completed(&mut self, out: &mut Vec<LoadResult>);
}

/// Decodes at submit time. Completions are still only visible after a drain.
#[derive(Debug, Default)]
pub struct InlineAssetLoader {
    completed: VecDeque<LoadResult>,
}

impl InlineAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetLoader for InlineAssetLoader {
    fn submit(&mut self, ticket: LoadTicket, source: String) {
        let outcome = decode_source(&source);
        self.completed.push_back(LoadResult { ticket, outcome });
    }

    fn drain_completed(&mut self, out: &mut Vec<LoadResult>) {
        out.extend(self.completed.drain(..));
    }
}

struct LoadJob {
    ticket: LoadTicket,
    source: String,
}

pub struct ThreadedAssetLoader {
    jobs: Option<Sender<LoadJob>>,
    results: Receiver<LoadResult>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadedAssetLoader {
    pub fn spawn(name: &str, worker_count: usize) -> io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<LoadJob>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<LoadResult>();
        let mut workers = Vec::new();
        for index in 0..worker_count.max(1) {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || run_worker(&job_rx, &result_tx))?;
            workers.push(handle);
        }
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            workers,
        })
    }
}

fn run_worker(jobs: &Receiver<LoadJob>, results: &Sender<LoadResult>) {
    for job in jobs.iter() {
        let outcome = decode_source(&job.source);
        if results
            .send(LoadResult {
                ticket: job.ticket,
                outcome,
            })
            .is_err()
        {
            return;
        }
    }
}

impl AssetLoader for ThreadedAssetLoader {
    fn submit(&mut self, ticket: LoadTicket, source: String) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        if jobs.send(LoadJob { ticket, source }).is_err() {
            warn!(ticket = ticket.0, "asset_loader_workers_gone");
        }
    }

    fn drain_completed(&mut self, out: &mut Vec<LoadResult>) {
        out.extend(self.results.try_iter());
    }
}

impl Drop for ThreadedAssetLoader {
    fn drop(&mut self) {
        self.jobs = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                debug!("asset_loader_worker_panicked");
            }
        }
    }
}
