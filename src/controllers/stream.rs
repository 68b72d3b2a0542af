//! Stream Controller
//!
//! Reconciles Stream custom resources against the JetStream server. Watch
//! events pass through an update gate into a rate-limited work queue; workers
//! pull one key at a time and run the reconcile state machine against the
//! current cached copy of the resource.

use crate::conditions::{
    build_condition, set_condition, CONDITION_TRUE, STREAM_CONDITION_READY, STREAM_FINALIZER,
};
use crate::crd::Stream;
use crate::error::{OperatorError, Result};
use crate::events::{
    EventSink, Severity, REASON_CREATED, REASON_CREATING, REASON_DELETING, REASON_FAILED,
    REASON_INVALID_UPDATE, REASON_UPDATED, REASON_UPDATING,
};
use crate::jetstream::StreamClient;
use crate::queue::WorkQueue;
use crate::store::StreamStore;
use crate::validation::{validate_stream_update, UpdateCheck};
use crate::writer::StreamWriter;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::reflector::{self, store::Writer};
use kube::runtime::{watcher, WatchStreamExt};
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Capabilities the controller is built from.
pub struct Context {
    /// Cached view of Stream resources
    pub store: Arc<dyn StreamStore>,
    /// Persists finalizers and status
    pub writer: Arc<dyn StreamWriter>,
    /// Records Kubernetes events
    pub events: Arc<dyn EventSink>,
    /// Stream server client
    pub client: Arc<dyn StreamClient>,
}

impl Context {
    pub fn new(
        store: Arc<dyn StreamStore>,
        writer: Arc<dyn StreamWriter>,
        events: Arc<dyn EventSink>,
        client: Arc<dyn StreamClient>,
    ) -> Self {
        Self {
            store,
            writer,
            events,
            client,
        }
    }
}

/// Where a resource stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Nothing to do: the resource is gone, or is being deleted without our finalizer
    Absent,
    /// Deletion requested; the server-side stream must be removed first
    PendingDelete,
    /// Spec changes or a missing finalizer; create or update on the server
    PendingSync,
    /// Server already matches the current generation
    Reconciled,
}

/// Work item key for a stream: `<namespace>/<name>`.
pub fn stream_key(stream: &Stream) -> Result<String> {
    let name = stream
        .metadata
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| OperatorError::InvalidKey("stream has no name".to_string()))?;
    let namespace = stream
        .metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| OperatorError::InvalidKey(format!("stream {name} has no namespace")))?;
    Ok(format!("{namespace}/{name}"))
}

/// Split a work item key into namespace and name.
pub fn split_key(key: &str) -> Result<(&str, &str)> {
    let mut parts = key.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(namespace), Some(name), None) if !namespace.is_empty() && !name.is_empty() => {
            Ok((namespace, name))
        }
        _ => Err(OperatorError::InvalidKey(key.to_string())),
    }
}

/// Queue a stream for reconciliation.
pub fn enqueue_stream_work(queue: &WorkQueue<String>, stream: &Stream) -> Result<()> {
    let key = stream_key(stream)?;
    queue.add(key);
    Ok(())
}

fn has_finalizer(stream: &Stream) -> bool {
    stream.finalizers().iter().any(|f| f == STREAM_FINALIZER)
}

/// Classify a cached resource without contacting the server.
pub fn classify(stream: Option<&Stream>) -> ReconcileState {
    let Some(stream) = stream else {
        return ReconcileState::Absent;
    };

    let finalized = has_finalizer(stream);
    if stream.metadata.deletion_timestamp.is_some() {
        return if finalized {
            ReconcileState::PendingDelete
        } else {
            ReconcileState::Absent
        };
    }

    let observed = stream.status.as_ref().and_then(|s| s.observed_generation);
    if finalized && observed == stream.metadata.generation {
        ReconcileState::Reconciled
    } else {
        ReconcileState::PendingSync
    }
}

/// Name of the stream on the server: the one last applied, or the spec's
/// name if nothing has been applied yet.
fn applied_name(stream: &Stream) -> &str {
    stream
        .status
        .as_ref()
        .and_then(|s| s.stream_name.as_deref())
        .unwrap_or(&stream.spec.name)
}

/// Copy of `stream` marked as reconciled at its current generation.
fn reconciled(stream: &Stream, reason: &str, message: &str) -> Stream {
    let mut next = stream.clone();

    let finalizers = next.metadata.finalizers.get_or_insert_with(Vec::new);
    if !finalizers.iter().any(|f| f == STREAM_FINALIZER) {
        finalizers.push(STREAM_FINALIZER.to_string());
    }

    let status = next.status.get_or_insert_with(Default::default);
    status.observed_generation = stream.metadata.generation;
    status.stream_name = Some(stream.spec.name.clone());
    set_condition(
        &mut status.conditions,
        build_condition(STREAM_CONDITION_READY, CONDITION_TRUE, reason, message),
    );

    next
}

/// Controller for Stream resources
pub struct StreamController {
    ctx: Context,
    queue: WorkQueue<String>,
    max_retries: u32,
    /// Last accepted copy of each resource seen on the watch feed
    accepted: Mutex<HashMap<String, Stream>>,
}

impl StreamController {
    /// Create a new stream controller
    pub fn new(ctx: Context, queue: WorkQueue<String>, max_retries: u32) -> Self {
        Self {
            ctx,
            queue,
            max_retries,
            accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn queue(&self) -> &WorkQueue<String> {
        &self.queue
    }

    /// Feed watch events for `api` into the store and the queue until the
    /// watch ends or the queue shuts down.
    pub async fn watch(self: Arc<Self>, api: Api<Stream>, writer: Writer<Stream>) {
        info!("Starting Stream watch");

        let events = reflector::reflector(writer, watcher(api, watcher::Config::default()))
            .default_backoff();
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            if self.queue.is_shutting_down() {
                break;
            }
            match event {
                Ok(watcher::Event::Applied(stream)) => self.on_stream_applied(stream).await,
                Ok(watcher::Event::Deleted(stream)) => self.on_stream_deleted(&stream).await,
                Ok(watcher::Event::Restarted(streams)) => self.on_streams_restarted(streams).await,
                Err(e) => warn!(error = %e, "Stream watch error"),
            }
        }
    }

    /// Gate an added or changed resource before it reaches the queue.
    pub async fn on_stream_applied(&self, stream: Stream) {
        let key = match stream_key(&stream) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Ignoring Stream without a usable key");
                return;
            }
        };

        let mut accepted = self.accepted.lock().await;
        // A different uid is a new object reusing the name.
        let check = match accepted.get(&key) {
            Some(prev) if prev.metadata.uid == stream.metadata.uid => {
                validate_stream_update(prev, &stream)
            }
            _ => Ok(UpdateCheck::Proceed),
        };

        match check {
            Ok(UpdateCheck::Proceed) => {
                accepted.insert(key.clone(), stream);
                drop(accepted);
                self.queue.add(key);
            }
            Ok(UpdateCheck::NothingToUpdate) => {
                accepted.insert(key.clone(), stream);
                debug!(key = %key, "No spec changes, skipping");
            }
            Err(e) => {
                drop(accepted);
                warn!(key = %key, error = %e, "Rejected Stream update");
                self.ctx
                    .events
                    .record(&stream, Severity::Warning, REASON_INVALID_UPDATE, &e.to_string())
                    .await;
            }
        }
    }

    /// Forget a resource that left the cluster.
    pub async fn on_stream_deleted(&self, stream: &Stream) {
        if let Ok(key) = stream_key(stream) {
            self.accepted.lock().await.remove(&key);
            debug!(key = %key, "Stream removed from cluster");
        }
    }

    /// Replace the gate's memory with a fresh listing. Keys missing from the
    /// listing were deleted while the watch was down.
    pub async fn on_streams_restarted(&self, streams: Vec<Stream>) {
        debug!(count = streams.len(), "Stream watch restarted");

        let live: HashSet<String> = streams.iter().filter_map(|s| stream_key(s).ok()).collect();
        self.accepted.lock().await.retain(|key, _| live.contains(key));

        for stream in streams {
            self.on_stream_applied(stream).await;
        }
    }

    /// Run `workers` worker loops until the queue shuts down.
    pub async fn run(self: Arc<Self>, workers: usize) {
        info!(workers, "Starting Stream controller workers");

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let controller = Arc::clone(&self);
                tokio::spawn(async move {
                    while controller.process_next_queue_item().await {}
                    debug!(worker, "Stream worker stopped");
                })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Stream worker task failed: {}", e);
            }
        }
    }

    /// Stop handing out work. In-flight items finish; nothing new starts.
    pub fn shutdown(&self) {
        info!("Shutting down Stream controller queue");
        self.queue.shut_down();
    }

    /// Process one key from the queue. Returns `false` once the queue has
    /// shut down.
    pub async fn process_next_queue_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        match self.sync_key(&key).await {
            Ok(()) => self.queue.forget(&key),
            Err(OperatorError::InvalidKey(_)) => {
                error!(key = %key, "Failed to split work item key, this should never happen");
                self.queue.forget(&key);
            }
            Err(e) if !e.is_retryable() => {
                warn!(key = %key, error = %e, "Stream reconcile failed permanently");
                self.queue.forget(&key);
            }
            Err(e) => {
                let requeues = self.queue.num_requeues(&key);
                if requeues < self.max_retries {
                    warn!(
                        key = %key,
                        attempt = requeues + 1,
                        error = %e,
                        "Stream reconcile failed, requeueing"
                    );
                    self.queue.add_rate_limited(key.clone());
                } else {
                    warn!(
                        key = %key,
                        error = %e,
                        "Dropping Stream out of the queue after {} retries",
                        self.max_retries
                    );
                    self.queue.forget(&key);
                }
            }
        }

        self.queue.done(&key);
        true
    }

    async fn sync_key(&self, key: &str) -> Result<()> {
        let (namespace, name) = split_key(key)?;
        self.process_stream(namespace, name).await
    }

    /// Reconcile the cached Stream `namespace/name` against the server.
    #[instrument(skip(self))]
    pub async fn process_stream(&self, namespace: &str, name: &str) -> Result<()> {
        let Some(stream) = self.ctx.store.get(namespace, name) else {
            debug!("Stream {}/{} no longer exists", namespace, name);
            return Ok(());
        };

        let result = match classify(Some(&*stream)) {
            ReconcileState::Absent | ReconcileState::Reconciled => {
                debug!("Stream {}/{} needs no action", namespace, name);
                Ok(())
            }
            ReconcileState::PendingDelete => self.delete_stream(&stream).await,
            ReconcileState::PendingSync => self.sync_stream(&stream).await,
        };

        if let Err(e) = &result {
            let reason = match e {
                OperatorError::InvalidUpdate(_) => REASON_INVALID_UPDATE,
                _ => REASON_FAILED,
            };
            self.ctx
                .events
                .record(&stream, Severity::Warning, reason, &e.to_string())
                .await;
        }
        result
    }

    /// Remove the server-side stream, then release the finalizer.
    async fn delete_stream(&self, stream: &Stream) -> Result<()> {
        let stream_name = applied_name(stream);
        info!("Deleting Stream {}/{}", stream.namespace().unwrap_or_default(), stream.name_any());

        self.ctx.client.connect().await?;
        if self.ctx.client.exists(stream_name).await? {
            self.ctx.client.delete(stream_name).await?;
        } else {
            debug!(stream = %stream_name, "Stream already absent on server");
        }

        let mut next = stream.clone();
        if let Some(finalizers) = next.metadata.finalizers.as_mut() {
            finalizers.retain(|f| f != STREAM_FINALIZER);
        }
        self.ctx.writer.update(&next).await?;

        self.ctx
            .events
            .record(
                stream,
                Severity::Normal,
                REASON_DELETING,
                &format!("Deleting stream {stream_name:?}"),
            )
            .await;
        Ok(())
    }

    /// Create or update the server-side stream and record the new generation.
    async fn sync_stream(&self, stream: &Stream) -> Result<()> {
        let spec = &stream.spec;

        let applied = applied_name(stream);
        if applied != spec.name {
            return Err(OperatorError::InvalidUpdate(format!(
                "updating stream name from {applied:?} to {:?} is not allowed, please recreate",
                spec.name
            )));
        }

        self.ctx.client.connect().await?;
        let exists = self.ctx.client.exists(&spec.name).await?;

        let (done_reason, done_message) = if exists {
            self.ctx
                .events
                .record(
                    stream,
                    Severity::Normal,
                    REASON_UPDATING,
                    &format!("Updating stream {:?}", spec.name),
                )
                .await;
            self.ctx.client.update(spec).await?;
            (REASON_UPDATED, format!("Updated stream {:?}", spec.name))
        } else {
            self.ctx
                .events
                .record(
                    stream,
                    Severity::Normal,
                    REASON_CREATING,
                    &format!("Creating stream {:?}", spec.name),
                )
                .await;
            self.ctx.client.create(spec).await?;
            (REASON_CREATED, format!("Created stream {:?}", spec.name))
        };

        self.ctx
            .writer
            .update(&reconciled(stream, done_reason, &done_message))
            .await?;

        info!(
            "{} Stream {}/{} at generation {:?}",
            done_reason,
            stream.namespace().unwrap_or_default(),
            stream.name_any(),
            stream.metadata.generation
        );
        self.ctx
            .events
            .record(stream, Severity::Normal, done_reason, &done_message)
            .await;
        Ok(())
    }
}
