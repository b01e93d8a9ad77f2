//! Batch orchestration: ingest → extract → aggregate / recompute.
//!
//! Stages run strictly in order. Extraction and per-user work fan out under
//! semaphores; a failing unit is logged, counted and never aborts its
//! siblings. Progress counters only move once a unit has been committed.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    stable_uuid, Config, Conversation, DatasetRecord, Signal, SignalSet,
};
use crate::domain::ports::{BehaviorStore, SignalExtractor, UnprocessedFilter};
use crate::services::profile_aggregator::ProfileAggregator;
use crate::services::profile_engine::ProfileEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingest,
    Extract,
    Aggregate,
    Recompute,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Extract => "extract",
            Self::Aggregate => "aggregate",
            Self::Recompute => "recompute",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Running,
    Completed,
    Cancelled,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Counters for one stage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineProgress {
    pub stage: PipelineStage,
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub status: PipelineStatus,
}

impl PipelineProgress {
    fn start(stage: PipelineStage, total: usize) -> Self {
        Self {
            stage,
            total,
            processed: 0,
            failed: 0,
            status: PipelineStatus::Running,
        }
    }

    fn finish(&mut self, cancelled: bool) {
        self.status = if cancelled {
            PipelineStatus::Cancelled
        } else {
            PipelineStatus::Completed
        };
    }
}

/// Event streamed while a stage runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Counters changed (stage start, each finished unit, stage end).
    Progress(PipelineProgress),
    /// One unit failed; the stage carries on.
    UnitFailed {
        stage: PipelineStage,
        unit: String,
        error: String,
    },
}

/// Cloneable handle that asks a running pipeline to stop between units.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

enum UnitOutcome {
    Done,
    Skipped,
    Failed(String, DomainError),
}

pub struct BatchPipeline<R: BehaviorStore + 'static> {
    repository: Arc<R>,
    extractor: Option<Arc<dyn SignalExtractor>>,
    config: Config,
    events: Option<mpsc::Sender<PipelineEvent>>,
    cancel: CancellationHandle,
}

impl<R: BehaviorStore + 'static> BatchPipeline<R> {
    pub fn new(repository: Arc<R>, config: Config) -> Self {
        Self {
            repository,
            extractor: None,
            config,
            events: None,
            cancel: CancellationHandle::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SignalExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    /// Events never hold up the pipeline: when the receiver lags and the
    /// channel is full the event is dropped, and later progress supersedes it.
    fn emit(&self, event: PipelineEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => trace!("event channel full, dropping pipeline event"),
        }
    }

    fn emit_progress(&self, progress: &PipelineProgress) {
        self.emit(PipelineEvent::Progress(progress.clone()));
    }

    /// Read a JSONL message dataset, group it into conversations and store
    /// them in chunks.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn run_ingest(&self, path: &Path) -> DomainResult<PipelineProgress> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(DomainError::DatasetNotFound(path.to_path_buf()));
        }

        let (conversations, bad_lines) = read_dataset(path).await?;
        let mut progress = PipelineProgress::start(PipelineStage::Ingest, conversations.len());
        progress.failed = bad_lines;
        self.emit_progress(&progress);

        let mut cancelled = false;
        for chunk in conversations.chunks(self.config.pipeline.batch_chunk_size.max(1)) {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match self.repository.insert_conversations(chunk).await {
                Ok(inserted) => {
                    progress.processed += chunk.len();
                    debug!(chunk = chunk.len(), inserted, "conversation chunk stored");
                }
                Err(err) => {
                    progress.failed += chunk.len();
                    error!(chunk = chunk.len(), error = %err, "failed to store conversation chunk");
                    self.emit(PipelineEvent::UnitFailed {
                        stage: PipelineStage::Ingest,
                        unit: format!("chunk of {}", chunk.len()),
                        error: err.to_string(),
                    });
                }
            }
            self.emit_progress(&progress);
        }

        progress.finish(cancelled);
        self.emit_progress(&progress);
        info!(
            total = progress.total,
            processed = progress.processed,
            failed = progress.failed,
            status = progress.status.as_str(),
            "ingest finished"
        );
        Ok(progress)
    }

    /// Extract signals from every unprocessed conversation matching `filter`.
    #[instrument(skip(self))]
    pub async fn run_extract(&self, filter: UnprocessedFilter) -> DomainResult<PipelineProgress> {
        let extractor = self.extractor.clone().ok_or_else(|| {
            DomainError::ValidationFailed("no signal extractor configured".to_string())
        })?;
        let pending = self.repository.list_unprocessed(filter).await?;
        let mut progress = PipelineProgress::start(PipelineStage::Extract, pending.len());
        self.emit_progress(&progress);

        let semaphore = Arc::new(Semaphore::new(
            self.config.pipeline.max_concurrent_extractions.max(1),
        ));
        let confidence = self.config.pipeline.default_signal_confidence;
        let mut running = FuturesUnordered::new();

        for conversation in pending {
            let semaphore = semaphore.clone();
            let repository = self.repository.clone();
            let extractor = extractor.clone();
            let cancel = self.cancel.clone();

            running.push(tokio::spawn(async move {
                let unit = conversation.conversation_id.to_string();
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return UnitOutcome::Failed(unit, DomainError::Cancelled);
                };
                if cancel.is_cancelled() {
                    return UnitOutcome::Skipped;
                }
                match extract_one(&*repository, &*extractor, &conversation, confidence).await {
                    Ok(()) => UnitOutcome::Done,
                    Err(err) => UnitOutcome::Failed(unit, err),
                }
            }));
        }

        self.drain(PipelineStage::Extract, &mut running, &mut progress)
            .await;
        progress.finish(self.cancel.is_cancelled());
        self.emit_progress(&progress);
        info!(
            total = progress.total,
            processed = progress.processed,
            failed = progress.failed,
            status = progress.status.as_str(),
            "extraction finished"
        );
        Ok(progress)
    }

    /// Rebuild profiles for one user, or for every known user.
    #[instrument(skip(self))]
    pub async fn run_aggregate(&self, user_id: Option<Uuid>) -> DomainResult<PipelineProgress> {
        let users = match user_id {
            Some(id) => vec![id],
            None => self.repository.list_user_ids().await?,
        };
        let aggregator = Arc::new(ProfileAggregator::new(self.repository.clone()));
        self.run_per_user(PipelineStage::Aggregate, users, move |user| {
            let aggregator = aggregator.clone();
            async move { aggregator.aggregate(user).await.map(|_| ()) }
        })
        .await
    }

    /// Full per-user recompute (profile, scores, arc, snapshot) for the
    /// given users, or for every known user.
    #[instrument(skip(self))]
    pub async fn run_recompute(
        &self,
        user_ids: Option<Vec<Uuid>>,
    ) -> DomainResult<PipelineProgress> {
        let users = match user_ids {
            Some(ids) => ids,
            None => self.repository.list_user_ids().await?,
        };
        let engine = Arc::new(ProfileEngine::with_config(
            self.repository.clone(),
            &self.config,
        ));
        self.run_per_user(PipelineStage::Recompute, users, move |user| {
            let engine = engine.clone();
            async move { engine.recompute_user(user).await.map(|_| ()) }
        })
        .await
    }

    /// Ingest the dataset, extract everything pending, then recompute every
    /// user. Stops after the first cancelled stage.
    pub async fn run_full(&self, path: &Path) -> DomainResult<Vec<PipelineProgress>> {
        let mut stages = Vec::with_capacity(3);

        let ingest = self.run_ingest(path).await?;
        let cancelled = ingest.status == PipelineStatus::Cancelled;
        stages.push(ingest);
        if cancelled {
            return Ok(stages);
        }

        let extract = self.run_extract(UnprocessedFilter::default()).await?;
        let cancelled = extract.status == PipelineStatus::Cancelled;
        stages.push(extract);
        if cancelled {
            return Ok(stages);
        }

        stages.push(self.run_recompute(None).await?);
        Ok(stages)
    }

    async fn run_per_user<F, Fut>(
        &self,
        stage: PipelineStage,
        users: Vec<Uuid>,
        work: F,
    ) -> DomainResult<PipelineProgress>
    where
        F: Fn(Uuid) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<()>> + Send + 'static,
    {
        let mut progress = PipelineProgress::start(stage, users.len());
        self.emit_progress(&progress);

        let semaphore = Arc::new(Semaphore::new(
            self.config.pipeline.max_concurrent_users.max(1),
        ));
        let work = Arc::new(work);
        let mut running = FuturesUnordered::new();

        for user in users {
            let semaphore = semaphore.clone();
            let work = work.clone();
            let cancel = self.cancel.clone();

            running.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return UnitOutcome::Failed(user.to_string(), DomainError::Cancelled);
                };
                if cancel.is_cancelled() {
                    return UnitOutcome::Skipped;
                }
                match (*work)(user).await {
                    Ok(()) => UnitOutcome::Done,
                    Err(err) => UnitOutcome::Failed(user.to_string(), err),
                }
            }));
        }

        self.drain(stage, &mut running, &mut progress).await;
        progress.finish(self.cancel.is_cancelled());
        self.emit_progress(&progress);
        info!(
            stage = %stage,
            total = progress.total,
            processed = progress.processed,
            failed = progress.failed,
            status = progress.status.as_str(),
            "stage finished"
        );
        Ok(progress)
    }

    async fn drain(
        &self,
        stage: PipelineStage,
        running: &mut FuturesUnordered<tokio::task::JoinHandle<UnitOutcome>>,
        progress: &mut PipelineProgress,
    ) {
        while let Some(joined) = running.next().await {
            match joined {
                Ok(UnitOutcome::Done) => progress.processed += 1,
                Ok(UnitOutcome::Skipped) => continue,
                Ok(UnitOutcome::Failed(unit, err)) => {
                    progress.failed += 1;
                    warn!(stage = %stage, unit = %unit, error = %err, "unit failed");
                    self.emit(PipelineEvent::UnitFailed {
                        stage,
                        unit,
                        error: err.to_string(),
                    });
                }
                Err(join_err) => {
                    progress.failed += 1;
                    error!(stage = %stage, error = %join_err, "unit task panicked");
                }
            }
            self.emit_progress(progress);
        }
    }
}

/// Extract one conversation and record its signals. Blank conversations
/// yield the empty signal set without calling the extractor.
async fn extract_one<R: BehaviorStore + ?Sized>(
    repository: &R,
    extractor: &dyn SignalExtractor,
    conversation: &Conversation,
    confidence: f64,
) -> DomainResult<()> {
    let set = if conversation.is_blank() {
        SignalSet::empty()
    } else {
        SignalSet::from_raw(extractor.extract(conversation).await?)
    };

    let now = Utc::now();
    let signals: Vec<Signal> = set
        .into_values()
        .into_iter()
        .map(|value| {
            Signal::new(conversation.user_id, value, confidence, now)
                .with_conversation(conversation.conversation_id)
        })
        .collect();

    let claimed = repository
        .record_extraction(conversation.conversation_id, &signals)
        .await?;
    if !claimed {
        debug!(
            conversation_id = %conversation.conversation_id,
            "conversation already processed elsewhere, signals discarded"
        );
    }
    Ok(())
}

/// Parse a JSONL dataset into conversations, returning them with the number
/// of lines that could not be used.
async fn read_dataset(path: &Path) -> DomainResult<(Vec<Conversation>, usize)> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<DatasetRecord>> = HashMap::new();
    let mut bad_lines = 0;
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: DatasetRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                bad_lines += 1;
                warn!(line = line_number, error = %err, "skipping undecodable dataset line");
                continue;
            }
        };
        let key = record.conversation_key();
        if key.is_empty() || record.user_key().is_empty() {
            bad_lines += 1;
            warn!(line = line_number, "skipping dataset line without conversation or user id");
            continue;
        }
        grouped
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record);
    }

    let now = Utc::now();
    let conversations = order
        .into_iter()
        .filter_map(|key| grouped.remove(&key).map(|records| (key, records)))
        .map(|(key, records)| build_conversation(&key, &records, now))
        .collect();
    Ok((conversations, bad_lines))
}

fn build_conversation(
    key: &str,
    records: &[DatasetRecord],
    now: chrono::DateTime<Utc>,
) -> Conversation {
    let user_key = records
        .first()
        .map(DatasetRecord::user_key)
        .unwrap_or_default();
    let mut messages: Vec<_> = records.iter().map(DatasetRecord::to_message).collect();
    messages.sort_by_key(|m| m.message_index);

    Conversation {
        conversation_id: stable_uuid(key),
        user_id: stable_uuid(&user_key),
        model: records.iter().find_map(|r| r.model.clone()),
        language: records.iter().find_map(|r| r.language.clone()),
        total_turns: records.iter().map(|r| r.conversation_turn).max().unwrap_or(0),
        messages,
        processed: false,
        created_at: now,
    }
}
