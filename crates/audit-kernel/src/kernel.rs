//! The kernel: single-writer gateway for one run's audit log.

use std::time::{SystemTime, UNIX_EPOCH};

use audit_kernel_core::{
    Event, EventBuilder, EventId, EventMeta, EventPayload, Invariant, InvariantFailed, RunId,
    Severity,
};
use audit_kernel_store::EventStore;
use tracing::{info, warn};

use crate::error::{KernelError, Result};

/// Current Unix time in milliseconds. Clock failure degrades to epoch
/// rather than panicking; the audit trail is still internally consistent.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// Kernel policy knobs.
#[derive(Debug, Clone, Default)]
pub struct KernelConfig {
    /// Refuse further appends after a fatal invariant violation. Off by
    /// default: violations are recorded either way, and most callers want
    /// the record, not the stoppage.
    pub halt_on_fatal: bool,
}

/// Single-writer kernel for one run.
///
/// The kernel owns sequence assignment and causal linking for its run and
/// is the only component allowed to append. Every append persists before
/// it returns, then runs the registered invariants over the grown history;
/// failures are themselves recorded as `invariant.failed` events caused by
/// the event that triggered them. Those recording appends do not re-enter
/// enforcement, so one trigger produces at most one failure event per
/// registered invariant.
pub struct Kernel<S: EventStore> {
    run_id: RunId,
    config: KernelConfig,
    store: Option<S>,
    invariants: Vec<Box<dyn Invariant>>,
    history: Vec<Event>,
    halted: bool,
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl<S: EventStore> Kernel<S> {
    /// A detached kernel: full semantics, nothing persisted.
    pub fn detached(run_id: RunId) -> Self {
        Self {
            run_id,
            config: KernelConfig::default(),
            store: None,
            invariants: Vec::new(),
            history: Vec::new(),
            halted: false,
            clock: Box::new(now_millis),
        }
    }

    /// A kernel whose appends persist to `store` before returning.
    pub fn with_store(run_id: RunId, store: S) -> Self {
        Self {
            store: Some(store),
            ..Self::detached(run_id)
        }
    }

    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall clock, for deterministic tests and replays.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Enforce an invariant on every subsequent append.
    pub fn register_invariant(&mut self, invariant: impl Invariant + 'static) {
        info!(invariant = invariant.name(), "invariant registered");
        self.invariants.push(Box::new(invariant));
    }

    /// Append one event: assign its sequence number, stamp it, persist it,
    /// then run enforcement. Returns the sealed event.
    pub async fn log(
        &mut self,
        payload: &EventPayload,
        meta: Option<EventMeta>,
        causes: Vec<EventId>,
    ) -> Result<Event> {
        if self.halted {
            return Err(KernelError::Halted);
        }
        for cause in &causes {
            if !self.history.iter().any(|e| e.id == *cause) {
                return Err(KernelError::UnknownCause(cause.to_hex()));
            }
        }

        let event = self.append(payload, meta, causes).await?;
        self.enforce(&event).await?;
        Ok(event)
    }

    /// The append path shared by caller events and kernel-authored
    /// `invariant.failed` records. Persists before growing the in-memory
    /// history, so a returned event is always durable.
    async fn append(
        &mut self,
        payload: &EventPayload,
        meta: Option<EventMeta>,
        causes: Vec<EventId>,
    ) -> Result<Event> {
        let mut builder = EventBuilder::new(self.run_id.clone(), self.history.len() as u64)
            .timestamp((self.clock)())
            .causes(causes);
        if let Some(meta) = meta {
            builder = builder.meta(meta);
        }
        let event = builder.build(payload)?;

        if let Some(store) = &self.store {
            store.append(&event).await?;
        }
        self.history.push(event.clone());
        Ok(event)
    }

    async fn enforce(&mut self, trigger: &Event) -> Result<()> {
        let mut failures = Vec::new();
        for invariant in &self.invariants {
            let result = invariant.check(&self.history, &self.run_id).await;
            if !result.valid {
                failures.push((invariant.name().to_string(), result));
            }
        }

        let mut fatal = false;
        for (name, result) in failures {
            let message = result.message.unwrap_or_default();
            warn!(
                invariant = %name,
                severity = ?result.severity,
                %message,
                trigger_seq = trigger.seq,
                "invariant violated"
            );
            self.append(
                &EventPayload::InvariantFailed(InvariantFailed {
                    invariant: name,
                    message,
                    severity: result.severity,
                }),
                Some(EventMeta::agent("kernel")),
                vec![trigger.id],
            )
            .await?;
            fatal |= result.severity == Severity::Fatal;
        }

        if fatal && self.config.halt_on_fatal {
            warn!(run_id = %self.run_id, "kernel halted");
            self.halted = true;
        }
        Ok(())
    }

    /// The run's full history, in sequence order.
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Hand the store back, consuming the kernel.
    pub fn into_store(self) -> Option<S> {
        self.store
    }
}
