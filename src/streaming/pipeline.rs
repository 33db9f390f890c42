//! Background LOD generation with bounded concurrency
//!
//! Columns submitted from the host are turned into records on a dedicated
//! runtime and inserted into the owning dimension cache. Each task carries
//! the world identity it was submitted under and is abandoned if the host
//! has moved on to another world by the time it finishes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};

use crate::core::{ChunkPos, DimensionId, Error, IVec3, Result};
use crate::lod::builder::LodBuilder;
use crate::lod::column::{ColorSource, ColumnVolume, HostWorld};
use crate::streaming::context::LodContext;
use crate::voxel::voxel::Voxel;

/// Column queued for generation
#[derive(Debug)]
struct GenerationRequest {
    column: ColumnVolume,
    dimension: DimensionId,
    /// Host world identity at submit time
    world_id: String,
}

/// What happened to a submitted column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Record built and stored
    Inserted,
    /// Record built but its region is outside the dimension window
    OutOfWindow,
    /// Column had no block data
    Skipped,
    /// The world changed or unloaded while the task ran
    Abandoned,
    /// Building or storing failed
    Failed(String),
}

/// Result of one generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub pos: ChunkPos,
    pub dimension: DimensionId,
    pub outcome: TaskOutcome,
}

/// Exposes a host world through the plain color lookup the builder takes
struct HostColors<'a>(&'a dyn HostWorld);

impl ColorSource for HostColors<'_> {
    fn face_color(&self, voxel: Voxel, pos: IVec3) -> u32 {
        self.0.face_color(voxel, pos)
    }
}

/// Concurrent LOD generator with its own runtime
pub struct GenerationPipeline {
    /// Channel for sending requests to the worker loop
    request_tx: mpsc::UnboundedSender<GenerationRequest>,
    /// Channel for receiving finished tasks
    result_rx: mpsc::UnboundedReceiver<GenerationResult>,
    /// Columns submitted and not yet reported back
    pending: HashSet<(DimensionId, ChunkPos)>,
    host: Arc<dyn HostWorld>,
    runtime: Option<Runtime>,
}

impl GenerationPipeline {
    /// Create a pipeline
    ///
    /// # Arguments
    /// * `context` - Cache records are inserted into
    /// * `host` - Live world providing colors and identity
    /// * `max_concurrent` - Maximum number of tasks building at once
    pub fn new(context: Arc<LodContext>, host: Arc<dyn HostWorld>, max_concurrent: usize) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<GenerationRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<GenerationResult>();

        let runtime = Runtime::new()?;
        let builder = context.config().builder();

        runtime.spawn(Self::worker_loop(
            context,
            host.clone(),
            builder,
            max_concurrent.max(1),
            request_rx,
            result_tx,
        ));

        Ok(Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            host,
            runtime: Some(runtime),
        })
    }

    /// Create a pipeline sized by `generation_workers` from the context config
    pub fn from_context(context: Arc<LodContext>, host: Arc<dyn HostWorld>) -> Result<Self> {
        let workers = context.config().generation_workers;
        Self::new(context, host, workers)
    }

    /// Worker loop that runs requests in submission order with concurrency control
    async fn worker_loop(
        context: Arc<LodContext>,
        host: Arc<dyn HostWorld>,
        builder: LodBuilder,
        max_concurrent: usize,
        mut request_rx: mpsc::UnboundedReceiver<GenerationRequest>,
        result_tx: mpsc::UnboundedSender<GenerationResult>,
    ) {
        let mut active_tasks = JoinSet::new();
        let mut in_flight: HashMap<Id, (DimensionId, ChunkPos)> = HashMap::new();
        let mut queued: VecDeque<GenerationRequest> = VecDeque::new();
        let mut open = true;

        loop {
            // Start new tasks while we have capacity
            while active_tasks.len() < max_concurrent {
                let Some(request) = queued.pop_front() else { break };
                let key = (request.dimension, request.column.pos);
                let context = context.clone();
                let host = host.clone();
                let handle = active_tasks
                    .spawn_blocking(move || Self::run_task(&context, host.as_ref(), &builder, request));
                in_flight.insert(handle.id(), key);
            }

            if !open && queued.is_empty() && active_tasks.is_empty() {
                break;
            }

            tokio::select! {
                request = request_rx.recv(), if open => match request {
                    Some(request) => queued.push_back(request),
                    None => open = false,
                },

                Some(joined) = active_tasks.join_next_with_id(), if !active_tasks.is_empty() => {
                    if let Some(result) = Self::finish_task(joined, &mut in_flight) {
                        let _ = result_tx.send(result);
                    }
                }
            }
        }
        log::debug!("Generation queue closed");
    }

    /// Turn a joined task into its result, including tasks that never returned
    fn finish_task(
        joined: std::result::Result<(Id, GenerationResult), JoinError>,
        in_flight: &mut HashMap<Id, (DimensionId, ChunkPos)>,
    ) -> Option<GenerationResult> {
        match joined {
            Ok((id, result)) => {
                in_flight.remove(&id);
                Some(result)
            }
            Err(e) => {
                log::error!("Generation task failed to join: {}", e);
                let (dimension, pos) = in_flight.remove(&e.id())?;
                let reason = if e.is_cancelled() { "generation task cancelled" } else { "generation task panicked" };
                Some(GenerationResult {
                    pos,
                    dimension,
                    outcome: TaskOutcome::Failed(reason.into()),
                })
            }
        }
    }

    /// Build and store one record
    fn run_task(
        context: &LodContext,
        host: &dyn HostWorld,
        builder: &LodBuilder,
        request: GenerationRequest,
    ) -> GenerationResult {
        let pos = request.column.pos;
        let dimension = request.dimension;

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| Self::generate(context, host, builder, request)))
            .unwrap_or_else(|_| TaskOutcome::Failed("generation task panicked".into()));

        match &outcome {
            TaskOutcome::Failed(reason) => {
                log::warn!("LOD generation for chunk ({}, {}) in {} failed: {}", pos.x, pos.z, dimension, reason)
            }
            other => log::debug!("LOD generation for chunk ({}, {}) in {}: {:?}", pos.x, pos.z, dimension, other),
        }

        GenerationResult { pos, dimension, outcome }
    }

    fn generate(
        context: &LodContext,
        host: &dyn HostWorld,
        builder: &LodBuilder,
        request: GenerationRequest,
    ) -> TaskOutcome {
        let GenerationRequest { column, dimension, world_id } = request;

        if !column.has_block_data() {
            return TaskOutcome::Skipped;
        }

        let colors = HostColors(host);
        let record = match builder.build(Some(&column), Some(&colors as &dyn ColorSource)) {
            Ok(record) => record,
            Err(e) => return TaskOutcome::Failed(e.to_string()),
        };

        // The host may have unloaded or switched worlds while we were building
        if host.world_id().as_deref() != Some(world_id.as_str()) {
            return TaskOutcome::Abandoned;
        }

        // Dropped handles still complete; the writer keeps running
        let _ = context.ensure_world(&world_id);

        match context.insert(&world_id, dimension, record) {
            Ok(true) => {
                context.request_redraw();
                TaskOutcome::Inserted
            }
            Ok(false) => TaskOutcome::OutOfWindow,
            Err(Error::StaleContext(_)) => TaskOutcome::Abandoned,
            Err(e) => TaskOutcome::Failed(e.to_string()),
        }
    }

    /// Queue a column for generation
    ///
    /// Returns `false` if the column is already pending, no world is loaded
    /// on the host, or the worker is gone.
    pub fn submit(&mut self, column: ColumnVolume, dimension: DimensionId) -> bool {
        let Some(world_id) = self.host.world_id() else {
            log::debug!("No host world loaded, ignoring chunk ({}, {})", column.pos.x, column.pos.z);
            return false;
        };

        let key = (dimension, column.pos);
        if !self.pending.insert(key) {
            return false;
        }

        let request = GenerationRequest { column, dimension, world_id };
        if self.request_tx.send(request).is_err() {
            log::warn!("Generation worker is gone");
            self.pending.remove(&key);
            return false;
        }
        true
    }

    /// Poll for finished tasks (non-blocking)
    ///
    /// Returns all currently available results.
    pub fn poll_results(&mut self) -> Vec<GenerationResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.pending.remove(&(result.dimension, result.pos));
            results.push(result);
        }
        results
    }

    /// Block until the next task finishes
    ///
    /// Returns `None` when nothing is pending. Must not be called from
    /// inside an async context.
    pub fn wait_result(&mut self) -> Option<GenerationResult> {
        if self.pending.is_empty() {
            return None;
        }
        let result = self.result_rx.blocking_recv()?;
        self.pending.remove(&(result.dimension, result.pos));
        Some(result)
    }

    /// Block until every pending task has finished
    pub fn wait_all(&mut self) -> Vec<GenerationResult> {
        std::iter::from_fn(|| self.wait_result()).collect()
    }

    /// Get the number of pending tasks
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a column is currently pending
    pub fn is_pending(&self, dimension: DimensionId, pos: ChunkPos) -> bool {
        self.pending.contains(&(dimension, pos))
    }
}

impl Drop for GenerationPipeline {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
