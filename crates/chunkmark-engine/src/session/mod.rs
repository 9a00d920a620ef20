//! # Render Pipeline & Streaming Session
//!
//! [`RenderPipeline`] is the synchronous `preprocess → parse → segment` pass.
//!
//! [`StreamingSession`] drives it from a growing document, as when text
//! arrives token by token. The document lives in a rope; each growth event
//! bumps a version counter and queues a job for a dedicated worker thread.
//! The worker:
//!
//! 1. coalesces queued jobs down to the newest,
//! 2. segments with a [`CancelToken`] checked between block nodes, so a newer
//!    version abandons the pass in flight,
//! 3. discards results that were superseded while rendering,
//! 4. diffs the surviving chunk list against the last one it published.
//!
//! The consumer polls for [`ChunkUpdate`]s and applies only the newest.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info};
use thiserror::Error;
use xi_rope::Rope;

use crate::cache::RenderCache;
use crate::chunk::{Chunk, ChunkDiff};
use crate::formula::{FormulaImage, FormulaRenderer};
use crate::parsing::parse;
use crate::preprocess::PreprocessorChain;
use crate::segment::{Segmenter, SegmenterConfig};
use crate::style::{StyleConfig, StyledText};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to spawn segmentation worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Segmentation worker stopped")]
    WorkerGone,
}

/// Version check handed to a segmentation pass.
#[derive(Debug, Clone)]
pub struct CancelToken {
    latest: Arc<AtomicU64>,
    version: u64,
}

impl CancelToken {
    pub fn new(latest: Arc<AtomicU64>, version: u64) -> Self {
        Self { latest, version }
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self::new(Arc::new(AtomicU64::new(0)), 0)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.version
    }
}

/// Caches a pipeline writes to, kept so a session can clear them after the
/// pipeline has moved onto its worker.
#[derive(Debug, Clone)]
pub struct CacheHandles {
    text: Arc<RenderCache<StyledText>>,
    formula: Option<Arc<RenderCache<FormulaImage>>>,
}

impl CacheHandles {
    pub fn clear(&self) {
        self.text.clear_all();
        if let Some(formula) = &self.formula {
            formula.clear_all();
        }
    }
}

pub struct RenderPipeline {
    preprocessors: PreprocessorChain,
    segmenter: Segmenter,
}

impl RenderPipeline {
    pub fn new(style: StyleConfig, config: SegmenterConfig) -> Self {
        Self::from_segmenter(Segmenter::new(style, config))
    }

    pub fn from_segmenter(segmenter: Segmenter) -> Self {
        Self {
            preprocessors: PreprocessorChain::default(),
            segmenter,
        }
    }

    pub fn with_formulas(mut self, formulas: FormulaRenderer) -> Self {
        self.segmenter = self.segmenter.with_formulas(formulas);
        self
    }

    pub fn with_preprocessors(mut self, preprocessors: PreprocessorChain) -> Self {
        self.preprocessors = preprocessors;
        self
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn caches(&self) -> CacheHandles {
        CacheHandles {
            text: Arc::clone(self.segmenter.text_cache()),
            formula: self.segmenter.formulas().map(|f| Arc::clone(f.cache())),
        }
    }

    pub fn render(&self, text: &str) -> Vec<Chunk> {
        self.segmenter.segment(&parse(&self.preprocessors.run(text)))
    }

    /// `None` when `token` is cancelled before the pass completes.
    pub fn render_cancellable(&self, text: &str, token: &CancelToken) -> Option<Vec<Chunk>> {
        if token.is_cancelled() {
            return None;
        }
        let nodes = parse(&self.preprocessors.run(text));
        self.segmenter.segment_until(&nodes, || token.is_cancelled())
    }

    pub fn clear_caches(&self) {
        self.caches().clear();
    }
}

/// A published segmentation result.
#[derive(Debug, Clone)]
pub struct ChunkUpdate {
    pub version: u64,
    pub chunks: Vec<Chunk>,
    /// Against the previously published update
    pub diff: ChunkDiff,
}

struct Job {
    version: u64,
    text: String,
    /// Forget the previously published chunks before diffing
    reset: bool,
}

pub struct StreamingSession {
    buffer: Rope,
    latest: Arc<AtomicU64>,
    jobs: Option<Sender<Job>>,
    updates: Receiver<ChunkUpdate>,
    worker: Option<JoinHandle<()>>,
    caches: CacheHandles,
}

impl StreamingSession {
    pub fn new(pipeline: RenderPipeline) -> Result<Self, SessionError> {
        let latest = Arc::new(AtomicU64::new(0));
        let caches = pipeline.caches();
        let (job_tx, job_rx) = mpsc::channel();
        let (update_tx, update_rx) = mpsc::channel();

        let worker_latest = Arc::clone(&latest);
        let worker = thread::Builder::new()
            .name("chunkmark-segmenter".into())
            .spawn(move || run_worker(pipeline, worker_latest, job_rx, update_tx))
            .map_err(SessionError::Spawn)?;

        Ok(Self {
            buffer: Rope::from(""),
            latest,
            jobs: Some(job_tx),
            updates: update_rx,
            worker: Some(worker),
            caches,
        })
    }

    /// Appends a token and queues a pass over the whole document.
    pub fn push_str(&mut self, token: &str) -> Result<u64, SessionError> {
        let end = self.buffer.len();
        self.buffer.edit(end..end, token);
        self.submit(false)
    }

    /// Replaces the whole document.
    pub fn replace(&mut self, text: &str) -> Result<u64, SessionError> {
        self.buffer = Rope::from(text);
        self.submit(false)
    }

    /// Empties the document and the caches; the next update diffs against
    /// nothing.
    pub fn restart(&mut self) -> Result<u64, SessionError> {
        self.buffer = Rope::from("");
        self.caches.clear();
        self.submit(true)
    }

    pub fn text(&self) -> String {
        self.slice(0..self.buffer.len())
    }

    pub fn version(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Newest update published since the last call, skipping older ones.
    pub fn poll(&self) -> Result<Option<ChunkUpdate>, SessionError> {
        let mut newest = None;
        loop {
            match self.updates.try_recv() {
                Ok(update) => newest = Some(update),
                Err(TryRecvError::Empty) => return Ok(newest),
                Err(TryRecvError::Disconnected) => {
                    return match newest {
                        Some(update) => Ok(Some(update)),
                        None => Err(SessionError::WorkerGone),
                    };
                }
            }
        }
    }

    /// Blocks until the update for the current version arrives.
    pub fn wait_latest(&self) -> Result<ChunkUpdate, SessionError> {
        loop {
            let update = self.updates.recv().map_err(|_| SessionError::WorkerGone)?;
            if update.version == self.version() {
                return Ok(update);
            }
        }
    }

    fn slice(&self, range: Range<usize>) -> String {
        self.buffer.slice_to_cow(range).into_owned()
    }

    fn submit(&mut self, reset: bool) -> Result<u64, SessionError> {
        let version = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let job = Job {
            version,
            text: self.text(),
            reset,
        };
        self.jobs
            .as_ref()
            .ok_or(SessionError::WorkerGone)?
            .send(job)
            .map_err(|_| SessionError::WorkerGone)?;
        Ok(version)
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        // Cancel the pass in flight, then close the queue so the worker exits.
        self.latest.fetch_add(1, Ordering::AcqRel);
        self.jobs.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            debug!("segmentation worker panicked");
        }
        self.caches.clear();
    }
}

fn run_worker(
    pipeline: RenderPipeline,
    latest: Arc<AtomicU64>,
    jobs: Receiver<Job>,
    updates: Sender<ChunkUpdate>,
) {
    let mut published: Vec<Chunk> = Vec::new();

    while let Ok(mut job) = jobs.recv() {
        let mut reset = job.reset;
        while let Ok(newer) = jobs.try_recv() {
            reset |= newer.reset;
            job = newer;
        }
        if reset {
            published.clear();
        }

        let token = CancelToken::new(Arc::clone(&latest), job.version);
        let Some(chunks) = pipeline.render_cancellable(&job.text, &token) else {
            debug!("version {} superseded mid-pass", job.version);
            continue;
        };
        if token.is_cancelled() {
            debug!("version {} superseded, dropping result", job.version);
            continue;
        }

        let diff = ChunkDiff::between(&published, &chunks);
        debug!(
            "version {}: {} chunks, {} reused, {} changed",
            job.version,
            chunks.len(),
            diff.reused.len(),
            diff.changed.len()
        );
        published = chunks.clone();
        let update = ChunkUpdate {
            version: job.version,
            chunks,
            diff,
        };
        if updates.send(update).is_err() {
            break;
        }
    }
    info!("segmentation worker stopped");
}
