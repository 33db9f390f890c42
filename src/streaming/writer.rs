//! Background region writer
//!
//! A single worker drains save jobs in submission order, so at most one
//! save pass touches the disk at a time. Dirty regions are encoded under the
//! dimension's write lock and written after the lock is released. Every
//! outcome is reported back to the dimension so a failed write never loses
//! changes.

use std::sync::PoisonError;

use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::core::{Error, RegionPos, Result};
use crate::streaming::disk_io::{RegionStore, encode_region};
use crate::streaming::region::RegionGrid;
use crate::streaming::registry::SharedDimension;

/// Outcome of one save job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Regions written successfully
    pub written: usize,
    /// Regions whose write failed
    pub failed: Vec<RegionPos>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: SaveReport) {
        self.written += other.written;
        self.failed.extend(other.failed);
    }
}

/// Completion handle for a queued save job
#[derive(Debug)]
pub struct SaveHandle {
    rx: oneshot::Receiver<SaveReport>,
}

impl SaveHandle {
    /// Block until the job has finished
    ///
    /// Must not be called from inside an async context.
    pub fn wait(self) -> Result<SaveReport> {
        self.rx
            .blocking_recv()
            .map_err(|_| Error::Runtime("region writer shut down before finishing".into()))
    }

    /// Check for completion without blocking
    pub fn try_report(&mut self) -> Option<SaveReport> {
        self.rx.try_recv().ok()
    }
}

/// Wait for several handles and sum their reports
pub fn wait_all(handles: impl IntoIterator<Item = SaveHandle>) -> Result<SaveReport> {
    let mut total = SaveReport::default();
    for handle in handles {
        total.merge(handle.wait()?);
    }
    Ok(total)
}

enum SaveJob {
    /// Snapshot and write every dirty region of a live dimension
    Dirty {
        dimension: SharedDimension,
        reply: oneshot::Sender<SaveReport>,
    },
    /// Write regions that already left their dimension's window
    Regions {
        dimension: SharedDimension,
        store: RegionStore,
        regions: Vec<RegionGrid>,
        reply: oneshot::Sender<SaveReport>,
    },
}

/// One encoded region on its way to disk
struct PendingWrite {
    pos: RegionPos,
    contents: String,
    /// The evicted region this was encoded from, `None` for resident regions
    evicted: Option<RegionGrid>,
}

/// Single-worker region writer with its own runtime
pub struct RegionWriter {
    job_tx: mpsc::UnboundedSender<SaveJob>,
    runtime: Option<Runtime>,
}

impl RegionWriter {
    pub fn new() -> Result<Self> {
        let (job_tx, job_rx) = mpsc::unbounded_channel::<SaveJob>();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("lod-region-writer")
            .enable_all()
            .build()?;

        runtime.spawn(Self::worker_loop(job_rx));

        Ok(Self {
            job_tx,
            runtime: Some(runtime),
        })
    }

    /// Queue a save of every dirty region in `dimension`
    pub fn save_dirty(&self, dimension: SharedDimension) -> SaveHandle {
        let (reply, rx) = oneshot::channel();
        self.submit(SaveJob::Dirty { dimension, reply });
        SaveHandle { rx }
    }

    /// Queue a write of regions evicted from `dimension`'s window
    pub fn save_regions(&self, dimension: SharedDimension, store: RegionStore, regions: Vec<RegionGrid>) -> SaveHandle {
        let (reply, rx) = oneshot::channel();
        self.submit(SaveJob::Regions {
            dimension,
            store,
            regions,
            reply,
        });
        SaveHandle { rx }
    }

    fn submit(&self, job: SaveJob) {
        // A closed queue drops the reply sender, which surfaces in SaveHandle::wait
        if self.job_tx.send(job).is_err() {
            log::warn!("Region writer is gone, dropping save job");
        }
    }

    async fn worker_loop(mut job_rx: mpsc::UnboundedReceiver<SaveJob>) {
        while let Some(job) = job_rx.recv().await {
            match job {
                SaveJob::Dirty { dimension, reply } => {
                    let report = Self::save_dimension(&dimension).await;
                    let _ = reply.send(report);
                }
                SaveJob::Regions {
                    dimension,
                    store,
                    regions,
                    reply,
                } => {
                    let pending = regions
                        .into_iter()
                        .map(|region| PendingWrite {
                            pos: region.pos(),
                            contents: encode_region(&region),
                            evicted: Some(region),
                        })
                        .collect();
                    let report = Self::write_all(&store, pending, &dimension).await;
                    let _ = reply.send(report);
                }
            }
        }
        log::debug!("Region writer queue closed");
    }

    async fn save_dimension(dimension: &SharedDimension) -> SaveReport {
        let Some((store, pending)) = Self::snapshot_dirty(dimension) else {
            return SaveReport::default();
        };
        if pending.is_empty() {
            return SaveReport::default();
        }
        Self::write_all(&store, pending, dimension).await
    }

    /// Encode dirty and unflushed regions, clearing dirty flags in the same
    /// critical section
    fn snapshot_dirty(dimension: &SharedDimension) -> Option<(RegionStore, Vec<PendingWrite>)> {
        let mut cache = dimension.write().unwrap_or_else(PoisonError::into_inner);
        let store = cache.store()?.clone();
        let mut pending: Vec<PendingWrite> = cache
            .dirty_regions_mut()
            .map(|region| {
                region.clear_dirty();
                PendingWrite {
                    pos: region.pos(),
                    contents: encode_region(region),
                    evicted: None,
                }
            })
            .collect();
        pending.extend(cache.unflushed().map(|region| PendingWrite {
            pos: region.pos(),
            contents: encode_region(region),
            evicted: Some(region.clone()),
        }));
        Some((store, pending))
    }

    async fn write_all(store: &RegionStore, pending: Vec<PendingWrite>, dimension: &SharedDimension) -> SaveReport {
        let mut report = SaveReport::default();

        for PendingWrite { pos, contents, evicted } in pending {
            let written = match store.write_encoded(pos, contents).await {
                Ok(()) => {
                    report.written += 1;
                    true
                }
                Err(e) => {
                    log::warn!("Failed to write region {:?}: {}", store.region_path(pos), e);
                    report.failed.push(pos);
                    false
                }
            };

            let mut cache = dimension.write().unwrap_or_else(PoisonError::into_inner);
            match evicted {
                Some(region) => cache.finish_flush(region, written),
                None if !written => {
                    if let Some(region) = cache.region_mut(pos) {
                        region.mark_dirty();
                    }
                }
                None => {}
            }
        }

        if report.written > 0 || !report.failed.is_empty() {
            log::info!(
                "Saved {} regions to {:?} ({} failed)",
                report.written, store.dir(), report.failed.len()
            );
        }
        report
    }
}

impl Drop for RegionWriter {
    fn drop(&mut self) {
        // Pending jobs are abandoned; callers wait on their handles to flush
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for RegionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionWriter")
            .field("running", &!self.job_tx.is_closed())
            .finish()
    }
}
