//! Pool manager
//!
//! The pool owns a fixed-size set of execution units and exposes the public
//! counting surface. All pool state lives inside a single actor task; the
//! [`TokenPool`] handle talks to it over a command channel, so no locking is
//! needed for the pool's own bookkeeping.
//!
//! Degradation policy: runtime failures (timeouts, dead units, encoder
//! errors, load shedding, termination races) never surface as errors.
//! Callers always get a count; approximate ones are tagged with the reason.
//! The only caller-visible failure is an oversized single-text input.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, warn};

use toksum_core::{
    FallbackReason, PoolConfig, PoolError, PoolHealth, PoolStats, Result, TokenCount,
};
use toksum_encoder::{FallbackEstimator, tiktoken_factory};

use crate::protocol::{CorrelationId, UnitEvent, UnitId, UnitRequest, UnitResponse};
use crate::queue::{BatchState, Job, JobQueue, JobReply};
use crate::transport::{SharedTransport, TransportStrategy};
use crate::unit::{EncoderUnitFactory, UnitFactory, UnitHandle, UnitLifecycle};

enum PoolCommand {
    Count {
        text: Arc<str>,
        reply: oneshot::Sender<TokenCount>,
    },
    CountBatch {
        texts: Vec<Arc<str>>,
        reply: oneshot::Sender<Vec<TokenCount>>,
    },
    Health {
        reply: oneshot::Sender<PoolHealth>,
    },
    Stats {
        reply: oneshot::Sender<PoolStats>,
    },
    Terminate {
        reply: oneshot::Sender<()>,
    },
}

/// State the handle keeps outside the actor, so calls made after
/// termination (or during shutdown races) resolve instead of hanging.
struct Shared {
    terminated: AtomicBool,
    fallback: FallbackEstimator,
    max_input_bytes: usize,
}

impl Shared {
    fn terminated_count(&self, text: &str) -> TokenCount {
        TokenCount::fallback(self.fallback.estimate(text), FallbackReason::Terminated)
    }
}

/// Handle to a running tokenization pool. Cheap to clone.
///
/// Lifecycle: [`TokenPool::create`] spawns the pool on the current tokio
/// runtime; [`TokenPool::terminate`] shuts it down. There is no ambient
/// global instance; inject the handle where counting is needed.
#[derive(Clone)]
pub struct TokenPool {
    cmd_tx: mpsc::UnboundedSender<PoolCommand>,
    shared: Arc<Shared>,
}

impl TokenPool {
    /// Create a pool with tiktoken-backed units on dedicated threads and
    /// shared-buffer transport for large texts.
    ///
    /// Must be called within a tokio runtime.
    pub fn create(config: PoolConfig) -> Result<Self> {
        let transport = Arc::new(SharedTransport {
            threshold_bytes: config.shared_payload_threshold_bytes,
        });
        let units = Arc::new(EncoderUnitFactory::new(tiktoken_factory()));
        Self::create_with(config, units, transport)
    }

    /// Create a pool with custom unit construction and payload transport.
    pub fn create_with(
        config: PoolConfig,
        unit_factory: Arc<dyn UnitFactory>,
        transport: Arc<dyn TransportStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        let fallback = FallbackEstimator::new(config.chars_per_token_fallback);
        let shared = Arc::new(Shared {
            terminated: AtomicBool::new(false),
            fallback,
            max_input_bytes: config.max_input_bytes,
        });

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let runtime = PoolRuntime {
            queue: JobQueue::new(config.job_queue_capacity),
            next_probe_at: Instant::now()
                + Duration::from_millis(config.health_probe_interval_ms),
            config,
            unit_factory,
            transport,
            fallback,
            cmd_rx,
            cmd_closed: false,
            events_tx,
            events_rx,
            units: HashMap::new(),
            ready: VecDeque::new(),
            in_flight: HashMap::new(),
            probes: HashMap::new(),
            next_unit_id: 0,
            draining: false,
            shutdown_replies: Vec::new(),
            stats: PoolStats::default(),
        };
        tokio::spawn(runtime.run());

        Ok(Self { cmd_tx, shared })
    }

    /// Count tokens in `text`.
    ///
    /// Never fails for runtime reasons; the only error is an input larger
    /// than the configured ceiling.
    pub async fn count_tokens(&self, text: &str) -> Result<TokenCount> {
        if text.len() > self.shared.max_input_bytes {
            return Err(PoolError::InputTooLarge {
                size: text.len(),
                limit: self.shared.max_input_bytes,
            });
        }
        if self.shared.terminated.load(Ordering::Acquire) {
            return Ok(self.shared.terminated_count(text));
        }

        let (reply, rx) = oneshot::channel();
        let cmd = PoolCommand::Count {
            text: Arc::from(text),
            reply,
        };
        if self.cmd_tx.send(cmd).is_err() {
            return Ok(self.shared.terminated_count(text));
        }
        match rx.await {
            Ok(result) => Ok(result),
            Err(_) => Ok(self.shared.terminated_count(text)),
        }
    }

    /// Count tokens in each text. The output always has the same length as
    /// the input and `result[i]` corresponds to `texts[i]`, whatever order
    /// members complete in. An oversized member degrades only itself.
    pub async fn count_tokens_batch<T: AsRef<str>>(&self, texts: &[T]) -> Vec<TokenCount> {
        if texts.is_empty() {
            return Vec::new();
        }
        if self.shared.terminated.load(Ordering::Acquire) {
            return texts
                .iter()
                .map(|t| self.shared.terminated_count(t.as_ref()))
                .collect();
        }

        let (reply, rx) = oneshot::channel();
        let cmd = PoolCommand::CountBatch {
            texts: texts.iter().map(|t| Arc::from(t.as_ref())).collect(),
            reply,
        };
        if self.cmd_tx.send(cmd).is_ok() {
            if let Ok(results) = rx.await {
                return results;
            }
        }
        texts
            .iter()
            .map(|t| self.shared.terminated_count(t.as_ref()))
            .collect()
    }

    /// Snapshot of pool capacity. No side effects.
    pub async fn health(&self) -> PoolHealth {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(PoolCommand::Health { reply }).is_ok() {
            if let Ok(health) = rx.await {
                return health;
            }
        }
        PoolHealth {
            ready_units: 0,
            degraded_units: 0,
            queue_depth: 0,
        }
    }

    /// Cumulative counters since creation.
    pub async fn stats(&self) -> PoolStats {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(PoolCommand::Stats { reply }).is_ok() {
            if let Ok(stats) = rx.await {
                return stats;
            }
        }
        PoolStats::default()
    }

    /// Stop accepting work and shut the units down. In-flight jobs drain or
    /// settle via fallback per `drain_on_terminate`. Idempotent; counting
    /// after termination resolves via fallback rather than hanging.
    pub async fn terminate(&self) {
        self.shared.terminated.store(true, Ordering::Release);
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(PoolCommand::Terminate { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

struct UnitState {
    handle: UnitHandle,
    lifecycle: UnitLifecycle,
    pending_job: Option<CorrelationId>,
    init_deadline: Option<Instant>,
    last_health_check: Option<Instant>,
}

struct InFlight {
    job: Job,
    unit: UnitId,
}

enum ProbeKind {
    Init,
    Health,
}

struct PoolRuntime {
    config: PoolConfig,
    unit_factory: Arc<dyn UnitFactory>,
    transport: Arc<dyn TransportStrategy>,
    fallback: FallbackEstimator,
    cmd_rx: mpsc::UnboundedReceiver<PoolCommand>,
    cmd_closed: bool,
    events_tx: mpsc::UnboundedSender<UnitEvent>,
    events_rx: mpsc::UnboundedReceiver<UnitEvent>,
    units: HashMap<UnitId, UnitState>,
    /// Idle ready units, in the order they became available.
    ready: VecDeque<UnitId>,
    queue: JobQueue,
    in_flight: HashMap<CorrelationId, InFlight>,
    /// Outstanding init/health probes: probe id -> (unit, deadline).
    probes: HashMap<CorrelationId, (UnitId, Instant)>,
    next_unit_id: u64,
    next_probe_at: Instant,
    draining: bool,
    shutdown_replies: Vec<oneshot::Sender<()>>,
    stats: PoolStats,
}

impl PoolRuntime {
    async fn run(mut self) {
        for _ in 0..self.config.pool_size {
            self.spawn_unit();
        }
        info!(pool_size = self.config.pool_size, "token pool started");

        loop {
            if self.draining && self.in_flight.is_empty() {
                break;
            }
            let wake = self.next_wake();
            tokio::select! {
                cmd = self.cmd_rx.recv(), if !self.cmd_closed => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        // Every handle is gone; nobody is waiting on anything.
                        self.cmd_closed = true;
                        self.begin_drain(true);
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                _ = sleep_until(wake) => self.handle_tick(Instant::now()),
            }
        }

        // Dropping the handles disconnects every unit
        self.units.clear();
        for reply in self.shutdown_replies.drain(..) {
            let _ = reply.send(());
        }
        info!(stats = ?self.stats, "token pool terminated");
    }

    fn handle_command(&mut self, cmd: PoolCommand) {
        match cmd {
            PoolCommand::Count { text, reply } => {
                if self.draining {
                    let result = self.fallback_count(text.chars().count(), FallbackReason::Terminated);
                    let _ = reply.send(result);
                    return;
                }
                self.submit(text, JobReply::Single(reply));
            }
            PoolCommand::CountBatch { texts, reply } => self.handle_batch(texts, reply),
            PoolCommand::Health { reply } => {
                let _ = reply.send(self.health_snapshot());
            }
            PoolCommand::Stats { reply } => {
                let _ = reply.send(self.stats);
            }
            PoolCommand::Terminate { reply } => {
                self.shutdown_replies.push(reply);
                self.begin_drain(!self.config.drain_on_terminate);
            }
        }
    }

    fn handle_batch(&mut self, texts: Vec<Arc<str>>, reply: oneshot::Sender<Vec<TokenCount>>) {
        if self.draining {
            let results = texts
                .iter()
                .map(|t| self.fallback_count(t.chars().count(), FallbackReason::Terminated))
                .collect();
            let _ = reply.send(results);
            return;
        }

        let batch = Arc::new(Mutex::new(BatchState::new(texts.len(), reply)));
        for (index, text) in texts.into_iter().enumerate() {
            let member = JobReply::BatchMember {
                batch: Arc::clone(&batch),
                index,
            };
            if text.len() > self.config.max_input_bytes {
                // Degrade only this member; the rest of the batch proceeds
                let result =
                    self.fallback_count(text.chars().count(), FallbackReason::InputTooLarge);
                member.resolve(result);
            } else {
                self.submit(text, member);
            }
        }
    }

    fn submit(&mut self, text: Arc<str>, reply: JobReply) {
        let now = Instant::now();
        let job = Job {
            id: CorrelationId::new(),
            chars: text.chars().count(),
            text,
            reply,
            submitted_at: now,
            deadline: now + Duration::from_millis(self.config.job_timeout_ms),
        };

        if !self.has_usable_units() {
            // Every unit degraded or dead with nothing initializing; waiting
            // would only end in a timeout.
            let result = self.fallback_count(job.chars, FallbackReason::EncoderUnavailable);
            job.reply.resolve(result);
            return;
        }
        self.dispatch_or_queue(job);
    }

    fn dispatch_or_queue(&mut self, job: Job) {
        while let Some(unit_id) = self.ready.pop_front() {
            let Some(unit) = self.units.get_mut(&unit_id) else {
                continue;
            };
            if unit.lifecycle != UnitLifecycle::Ready || unit.pending_job.is_some() {
                continue;
            }
            let payload = self.transport.pack(&job.text);
            if unit.handle.send(UnitRequest::Count {
                id: job.id,
                text: payload,
            }) {
                unit.pending_job = Some(job.id);
                self.in_flight.insert(job.id, InFlight { job, unit: unit_id });
                return;
            }
            warn!(unit = %unit_id, "unit channel closed at dispatch");
            self.fail_unit(unit_id);
        }

        match self.queue.push(job) {
            Ok(()) => {}
            Err(job) => {
                debug!("job queue at capacity; load-shedding to fallback");
                let result = self.fallback_count(job.chars, FallbackReason::QueueFull);
                job.reply.resolve(result);
            }
        }
    }

    fn handle_event(&mut self, event: UnitEvent) {
        let UnitEvent {
            unit: unit_id,
            response,
        } = event;
        match response {
            UnitResponse::Ready => match self.units.get_mut(&unit_id) {
                Some(unit)
                    if matches!(
                        unit.lifecycle,
                        UnitLifecycle::Uninitialized | UnitLifecycle::Initializing
                    ) =>
                {
                    unit.lifecycle = UnitLifecycle::Ready;
                    unit.init_deadline = None;
                    debug!(unit = %unit_id, "unit ready");
                    self.mark_ready(unit_id);
                }
                Some(_) => debug!(unit = %unit_id, "spurious ready; dropping"),
                None => debug!(unit = %unit_id, "ready from unknown unit; dropping"),
            },
            UnitResponse::Init { id, success } => {
                let Some((probe_unit, _)) = self.probes.remove(&id) else {
                    debug!(correlation = %id, "unmatched init response; dropping");
                    return;
                };
                let Some(unit) = self.units.get_mut(&probe_unit) else {
                    return;
                };
                if success
                    && matches!(
                        unit.lifecycle,
                        UnitLifecycle::Initializing | UnitLifecycle::Degraded
                    )
                {
                    unit.lifecycle = UnitLifecycle::Ready;
                    unit.init_deadline = None;
                    info!(unit = %probe_unit, "unit recovered");
                    self.mark_ready(probe_unit);
                } else if !success && unit.lifecycle == UnitLifecycle::Initializing {
                    unit.lifecycle = UnitLifecycle::Degraded;
                    unit.init_deadline = None;
                    self.shed_if_unusable();
                }
            }
            UnitResponse::Count { id, count } => self.resolve_success(unit_id, id, count),
            UnitResponse::CountBatch { id, .. } => {
                // The pool fans batches out as single jobs; a whole-batch
                // response here has no pending entry to match.
                debug!(unit = %unit_id, correlation = %id, "unmatched batch response; dropping");
            }
            UnitResponse::Health { id, healthy } => {
                if self.probes.remove(&id).is_none() {
                    debug!(correlation = %id, "unmatched health response; dropping");
                    return;
                }
                let Some(unit) = self.units.get_mut(&unit_id) else {
                    return;
                };
                unit.last_health_check = Some(Instant::now());
                match (unit.lifecycle, healthy) {
                    (UnitLifecycle::Ready, false) => {
                        warn!(unit = %unit_id, "ready unit reports unhealthy; degrading");
                        unit.lifecycle = UnitLifecycle::Degraded;
                        self.ready.retain(|u| *u != unit_id);
                        self.shed_if_unusable();
                    }
                    (UnitLifecycle::Degraded, true) => {
                        unit.lifecycle = UnitLifecycle::Ready;
                        self.mark_ready(unit_id);
                    }
                    _ => {}
                }
            }
            UnitResponse::Error { id: Some(id), reason } => {
                if let Some(in_flight) = self.in_flight.remove(&id) {
                    warn!(unit = %unit_id, error = %reason, "encoder error; degrading unit");
                    if let Some(unit) = self.units.get_mut(&unit_id) {
                        unit.pending_job = None;
                        unit.lifecycle = UnitLifecycle::Degraded;
                    }
                    self.ready.retain(|u| *u != unit_id);
                    let result = self.fallback_count(in_flight.job.chars, FallbackReason::EncoderError);
                    in_flight.job.reply.resolve(result);
                    self.stats.total_failed += 1;
                    self.shed_if_unusable();
                } else if let Some((probe_unit, _)) = self.probes.remove(&id) {
                    // Failed re-initialization; the unit stays degraded
                    debug!(unit = %probe_unit, error = %reason, "probe failed");
                } else {
                    debug!(unit = %unit_id, correlation = %id, "unmatched error response; dropping");
                }
            }
            UnitResponse::Error { id: None, reason } => match self.units.get_mut(&unit_id) {
                Some(unit)
                    if matches!(
                        unit.lifecycle,
                        UnitLifecycle::Uninitialized | UnitLifecycle::Initializing
                    ) =>
                {
                    warn!(unit = %unit_id, error = %reason, "unit initialization failed");
                    unit.lifecycle = UnitLifecycle::Degraded;
                    unit.init_deadline = None;
                    self.shed_if_unusable();
                }
                Some(_) => {
                    warn!(unit = %unit_id, error = %reason, "unit transport error");
                    self.fail_unit(unit_id);
                }
                None => debug!(unit = %unit_id, "error from unknown unit; dropping"),
            },
        }
    }

    fn resolve_success(&mut self, unit_id: UnitId, id: CorrelationId, count: usize) {
        let Some(in_flight) = self.in_flight.remove(&id) else {
            // Late response after a timeout already settled the job
            debug!(unit = %unit_id, correlation = %id, "late or unknown count response; dropping");
            return;
        };
        self.stats.total_processed += 1;
        self.stats.sum_latency_ms += in_flight.job.submitted_at.elapsed().as_millis() as u64;
        in_flight.job.reply.resolve(TokenCount::exact(count));

        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.pending_job = None;
            if unit.lifecycle == UnitLifecycle::Ready {
                self.mark_ready(unit_id);
            }
        }
    }

    fn handle_tick(&mut self, now: Instant) {
        for job in self.queue.remove_expired(now) {
            self.stats.total_failed += 1;
            let result = self.fallback_count(job.chars, FallbackReason::Timeout);
            job.reply.resolve(result);
        }

        let expired: Vec<CorrelationId> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.job.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            let Some(in_flight) = self.in_flight.remove(&id) else {
                continue;
            };
            warn!(unit = %in_flight.unit, correlation = %id, "job deadline expired");
            self.stats.total_failed += 1;
            let result = self.fallback_count(in_flight.job.chars, FallbackReason::Timeout);
            in_flight.job.reply.resolve(result);
            // The unit may still be mid-computation; its eventual response
            // is unmatched by then. Discard and replace it.
            self.fail_unit(in_flight.unit);
        }

        let stalled: Vec<UnitId> = self
            .units
            .iter()
            .filter(|(_, u)| {
                u.lifecycle == UnitLifecycle::Initializing
                    && u.init_deadline.is_some_and(|d| d <= now)
            })
            .map(|(id, _)| *id)
            .collect();
        let any_stalled = !stalled.is_empty();
        for unit_id in stalled {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                warn!(unit = %unit_id, "initialization deadline expired; degrading");
                unit.lifecycle = UnitLifecycle::Degraded;
                unit.init_deadline = None;
            }
        }
        if any_stalled {
            self.shed_if_unusable();
        }

        let unanswered: Vec<(CorrelationId, UnitId)> = self
            .probes
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(corr, (unit, _))| (*corr, *unit))
            .collect();
        for (corr, unit_id) in unanswered {
            self.probes.remove(&corr);
            warn!(unit = %unit_id, "probe unanswered; discarding unit");
            self.fail_unit(unit_id);
        }

        if now >= self.next_probe_at {
            self.send_probes(now);
            self.next_probe_at =
                now + Duration::from_millis(self.config.health_probe_interval_ms);
        }
    }

    fn send_probes(&mut self, now: Instant) {
        if self.draining {
            return;
        }
        let interval = Duration::from_millis(self.config.health_probe_interval_ms);
        let mut targets = Vec::new();
        for (id, unit) in &self.units {
            match unit.lifecycle {
                UnitLifecycle::Degraded => targets.push((*id, ProbeKind::Init)),
                UnitLifecycle::Ready
                    if unit.pending_job.is_none()
                        && unit
                            .last_health_check
                            .is_none_or(|t| now.duration_since(t) >= interval) =>
                {
                    targets.push((*id, ProbeKind::Health));
                }
                _ => {}
            }
        }

        for (unit_id, kind) in targets {
            let corr = CorrelationId::new();
            let (request, deadline) = match kind {
                ProbeKind::Init => (
                    UnitRequest::Init { id: corr },
                    now + Duration::from_millis(self.config.init_timeout_ms),
                ),
                ProbeKind::Health => (
                    UnitRequest::HealthCheck { id: corr },
                    now + Duration::from_millis(self.config.job_timeout_ms),
                ),
            };
            let sent = self
                .units
                .get(&unit_id)
                .map(|u| u.handle.send(request))
                .unwrap_or(false);
            if sent {
                self.probes.insert(corr, (unit_id, deadline));
            } else {
                self.fail_unit(unit_id);
            }
        }
    }

    fn spawn_unit(&mut self) {
        let unit_id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        let handle = self.unit_factory.spawn_unit(unit_id, self.events_tx.clone());
        self.units.insert(
            unit_id,
            UnitState {
                handle,
                lifecycle: UnitLifecycle::Initializing,
                pending_job: None,
                init_deadline: Some(
                    Instant::now() + Duration::from_millis(self.config.init_timeout_ms),
                ),
                last_health_check: None,
            },
        );
        debug!(unit = %unit_id, "spawned unit");
    }

    /// Transport-level failure: discard the unit, settle its in-flight job
    /// via fallback, and spawn a replacement up to the configured size.
    fn fail_unit(&mut self, unit_id: UnitId) {
        let Some(mut unit) = self.units.remove(&unit_id) else {
            return;
        };
        unit.lifecycle = UnitLifecycle::Dead;
        debug!(unit = %unit_id, state = ?unit.lifecycle, "unit discarded");
        self.ready.retain(|u| *u != unit_id);
        self.probes.retain(|_, (u, _)| *u != unit_id);

        if let Some(job_id) = unit.pending_job {
            if let Some(in_flight) = self.in_flight.remove(&job_id) {
                self.stats.total_failed += 1;
                let result = self.fallback_count(in_flight.job.chars, FallbackReason::UnitFailure);
                in_flight.job.reply.resolve(result);
            }
        }

        if !self.draining && self.units.len() < self.config.pool_size {
            self.spawn_unit();
        }
        self.shed_if_unusable();
    }

    fn mark_ready(&mut self, unit_id: UnitId) {
        self.ready.push_back(unit_id);
        // Dispatch immediately; no polling delay
        while !self.ready.is_empty() {
            let Some(job) = self.queue.pop() else { break };
            self.dispatch_or_queue(job);
        }
    }

    fn begin_drain(&mut self, force: bool) {
        if !self.draining {
            self.draining = true;
            info!(force, "token pool draining");
            for job in self.queue.drain() {
                let result = self.fallback_count(job.chars, FallbackReason::Terminated);
                job.reply.resolve(result);
            }
        }
        if force {
            let ids: Vec<CorrelationId> = self.in_flight.keys().copied().collect();
            for id in ids {
                if let Some(in_flight) = self.in_flight.remove(&id) {
                    let result =
                        self.fallback_count(in_flight.job.chars, FallbackReason::Terminated);
                    in_flight.job.reply.resolve(result);
                }
            }
        }
    }

    fn shed_if_unusable(&mut self) {
        if self.has_usable_units() || self.queue.is_empty() {
            return;
        }
        debug!("no usable units; shedding queued jobs to fallback");
        for job in self.queue.drain() {
            let result = self.fallback_count(job.chars, FallbackReason::EncoderUnavailable);
            job.reply.resolve(result);
        }
    }

    fn has_usable_units(&self) -> bool {
        self.units.values().any(|u| {
            matches!(
                u.lifecycle,
                UnitLifecycle::Initializing | UnitLifecycle::Ready
            )
        })
    }

    /// Build a fallback-tagged result and account for it.
    fn fallback_count(&mut self, chars: usize, reason: FallbackReason) -> TokenCount {
        self.stats.total_fallback += 1;
        TokenCount::fallback(self.fallback.estimate_chars(chars), reason)
    }

    fn health_snapshot(&self) -> PoolHealth {
        let mut ready_units = 0;
        let mut degraded_units = 0;
        for unit in self.units.values() {
            match unit.lifecycle {
                UnitLifecycle::Ready => ready_units += 1,
                UnitLifecycle::Degraded => degraded_units += 1,
                UnitLifecycle::Uninitialized
                | UnitLifecycle::Initializing
                | UnitLifecycle::Dead => {}
            }
        }
        PoolHealth {
            ready_units,
            degraded_units,
            queue_depth: self.queue.len(),
        }
    }

    fn next_wake(&self) -> Instant {
        let mut wake = self.next_probe_at;
        if let Some(deadline) = self.queue.earliest_deadline() {
            wake = wake.min(deadline);
        }
        for in_flight in self.in_flight.values() {
            wake = wake.min(in_flight.job.deadline);
        }
        for unit in self.units.values() {
            if let Some(deadline) = unit.init_deadline {
                wake = wake.min(deadline);
            }
        }
        for (_, deadline) in self.probes.values() {
            wake = wake.min(*deadline);
        }
        wake
    }
}
