//! Synthesis orchestration.
//!
//! One [`SynthesisOrchestrator::start`] call drives one attempt on a spawned
//! task and returns a [`SynthesisHandle`]. Every state change goes through
//! a shared machine under a lock: the machine rejects anything after a
//! terminal state, and cancellation is itself a terminal transition taken
//! under the same lock. Whichever of "cancel" and "finish" takes the lock
//! first decides the outcome; the other becomes a no-op.
//!
//! States are delivered over a channel in the order they were accepted.
//! The channel closes right after the terminal state.
//!
//! Dropping a [`SynthesisHandle`] cancels its attempt, so an abandoned
//! attempt never keeps the generator leased.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use clinrag_search::{FusedResult, HighRiskAlert};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::config::SynthesisConfig;
use crate::error::{Result, SynthesisError};
use crate::generator::{GenerationRequest, Generator, GeneratorHandle};
use crate::guardrail::{GuardrailResult, GuardrailValidator};
use crate::prompts::synthesis_prompt;
use crate::state::{CANCELLED, NOT_AVAILABLE, RefusalReason, SynthesisState};

/// Final state of an attempt and the guardrail detail, if one ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub state: SynthesisState,
    pub guardrail: Option<GuardrailResult>,
}

impl SynthesisOutcome {
    pub fn summary(&self) -> Option<&str> {
        self.state.summary()
    }

    pub fn guardrail_passed(&self) -> Option<bool> {
        match self.state {
            SynthesisState::Success {
                guardrail_passed, ..
            } => guardrail_passed,
            _ => None,
        }
    }
}

/// Drives the generator through synthesis and guardrail validation.
#[derive(Debug, Clone)]
pub struct SynthesisOrchestrator {
    generator: GeneratorHandle,
    guardrail: GuardrailValidator,
    config: SynthesisConfig,
}

impl SynthesisOrchestrator {
    pub fn new(generator: GeneratorHandle, config: SynthesisConfig) -> Self {
        let guardrail = GuardrailValidator::new(generator.clone(), config.guardrail.clone());
        Self {
            generator,
            guardrail,
            config,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn generator(&self) -> &GeneratorHandle {
        &self.generator
    }

    /// Run one attempt to completion.
    pub async fn synthesize(
        &self,
        query: &str,
        results: &[FusedResult],
        alerts: &[HighRiskAlert],
    ) -> SynthesisOutcome {
        self.start(query, results.to_vec(), alerts.to_vec())
            .finish()
            .await
    }

    /// Start an attempt on a background task.
    pub fn start(
        &self,
        query: impl Into<String>,
        results: Vec<FusedResult>,
        alerts: Vec<HighRiskAlert>,
    ) -> SynthesisHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let machine = Arc::new(Mutex::new(Machine {
            current: SynthesisState::Idle,
            events: Some(tx),
        }));
        let token = CancellationToken::new();

        let attempt = Attempt {
            orchestrator: self.clone(),
            machine: SharedMachine(machine.clone()),
            token: token.clone(),
            query: query.into(),
            results,
            alerts,
        };
        let task = tokio::spawn(attempt.run());

        SynthesisHandle {
            machine: SharedMachine(machine),
            events: rx,
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            task,
        }
    }
}

/// Observer and controller for one running attempt.
pub struct SynthesisHandle {
    machine: SharedMachine,
    events: mpsc::UnboundedReceiver<SynthesisState>,
    token: CancellationToken,
    task: JoinHandle<Option<GuardrailResult>>,
    _cancel_on_drop: DropGuard,
}

impl SynthesisHandle {
    /// Next state in acceptance order; `None` after the terminal state.
    pub async fn next_state(&mut self) -> Option<SynthesisState> {
        self.events.recv().await
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> SynthesisState {
        self.machine.lock().current.clone()
    }

    /// Cancel the attempt.
    ///
    /// Returns `false` if the attempt had already reached a terminal state,
    /// in which case nothing changes. The attempt stops its generator call
    /// if it holds one.
    pub fn cancel(&self) -> bool {
        let cancelled = self.machine.advance(SynthesisState::error(CANCELLED));
        if cancelled {
            info!("Synthesis cancelled");
            self.token.cancel();
        }
        cancelled
    }

    /// Wait for the attempt to end.
    pub async fn finish(self) -> SynthesisOutcome {
        let guardrail = match self.task.await {
            Ok(guardrail) => guardrail,
            Err(e) => {
                warn!("Synthesis task failed: {e}");
                self.machine
                    .advance(SynthesisState::error(format!("synthesis task failed: {e}")));
                None
            }
        };

        if !self.machine.lock().current.is_terminal() {
            self.machine.advance(SynthesisState::error(CANCELLED));
        }

        let state = self.machine.lock().current.clone();
        let guardrail = match state {
            SynthesisState::Success { .. } => guardrail,
            _ => None,
        };
        SynthesisOutcome { state, guardrail }
    }
}

struct Machine {
    current: SynthesisState,
    events: Option<mpsc::UnboundedSender<SynthesisState>>,
}

#[derive(Clone)]
struct SharedMachine(Arc<Mutex<Machine>>);

impl SharedMachine {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept `next` if it is a legal transition. Emission happens under the
    /// lock so observers see states in acceptance order.
    fn advance(&self, next: SynthesisState) -> bool {
        let mut machine = self.lock();
        if !machine.current.can_transition_to(&next) {
            if !machine.current.is_terminal() {
                warn!(
                    "Rejected transition {} -> {}",
                    machine.current.name(),
                    next.name()
                );
            }
            return false;
        }

        debug!("Synthesis state: {}", next.name());
        let terminal = next.is_terminal();
        machine.current = next.clone();
        if let Some(events) = &machine.events {
            let _ = events.send(next);
        }
        if terminal {
            machine.events = None;
        }
        true
    }
}

struct Attempt {
    orchestrator: SynthesisOrchestrator,
    machine: SharedMachine,
    token: CancellationToken,
    query: String,
    results: Vec<FusedResult>,
    alerts: Vec<HighRiskAlert>,
}

impl Attempt {
    async fn run(self) -> Option<GuardrailResult> {
        let started = Instant::now();

        if self.results.is_empty() {
            self.machine.advance(SynthesisState::Refused {
                reason: RefusalReason::NoContent,
            });
            return None;
        }

        let lease = tokio::select! {
            () = self.token.cancelled() => return None,
            lease = self.orchestrator.generator.lease() => lease,
        };

        let ready = tokio::select! {
            () = self.token.cancelled() => {
                lease.cancel();
                return None;
            }
            ready = lease.is_ready() => ready,
        };
        if !ready {
            info!("Generator not ready, skipping synthesis");
            self.machine.advance(SynthesisState::error(NOT_AVAILABLE));
            return None;
        }

        if !self.machine.advance(SynthesisState::Generating) {
            return None;
        }

        let config = &self.orchestrator.config;
        let prompt = synthesis_prompt(
            &self.query,
            &self.results,
            &self.alerts,
            config.context_chars,
        );
        let request = GenerationRequest::new(prompt, config.max_tokens, config.temperature);

        let generated = if config.streaming {
            self.stream(&*lease, &request).await
        } else {
            tokio::select! {
                () = self.token.cancelled() => {
                    lease.cancel();
                    Err(SynthesisError::Cancelled)
                }
                text = lease.generate(&request) => text,
            }
        };

        let text = match generated {
            Ok(text) => text,
            Err(SynthesisError::Cancelled) => {
                self.machine.advance(SynthesisState::error(CANCELLED));
                return None;
            }
            Err(e) => {
                warn!("Synthesis failed: {e}");
                self.machine.advance(SynthesisState::error(e.to_string()));
                return None;
            }
        };

        let summary = text.trim();
        if summary.is_empty() {
            self.machine.advance(SynthesisState::Refused {
                reason: RefusalReason::EmptyResponse,
            });
            return None;
        }

        let guardrail = if config.run_guardrail {
            let result = tokio::select! {
                () = self.token.cancelled() => {
                    lease.cancel();
                    return None;
                }
                result = self.orchestrator.guardrail.validate_on(
                    &*lease,
                    &self.query,
                    summary,
                    &self.results,
                ) => result,
            };
            Some(result)
        } else {
            None
        };

        let accepted = self.machine.advance(SynthesisState::Success {
            summary: summary.to_string(),
            guardrail_passed: guardrail.as_ref().map(|g| g.passed),
        });
        debug!("Synthesis finished in {}ms", started.elapsed().as_millis());

        if accepted { guardrail } else { None }
    }

    /// Consume a delta stream, emitting throttled partial text. The final
    /// accumulated text is always emitted before returning.
    async fn stream(
        &self,
        generator: &dyn Generator,
        request: &GenerationRequest,
    ) -> Result<String> {
        let mut deltas = tokio::select! {
            () = self.token.cancelled() => {
                generator.cancel();
                return Err(SynthesisError::Cancelled);
            }
            stream = generator.generate_stream(request) => stream?,
        };

        let interval = self.orchestrator.config.min_emit_interval();
        let mut text = String::new();
        let mut emitted_len = 0;
        let mut last_emit: Option<Instant> = None;

        loop {
            let next = tokio::select! {
                biased;
                () = self.token.cancelled() => {
                    generator.cancel();
                    return Err(SynthesisError::Cancelled);
                }
                next = deltas.next() => next,
            };

            let delta = match next {
                Some(delta) => delta?,
                None => break,
            };
            if delta.is_empty() {
                continue;
            }
            text.push_str(&delta);

            if last_emit.is_none_or(|at| at.elapsed() >= interval) {
                if !self.machine.advance(SynthesisState::streaming(text.as_str())) {
                    return Err(SynthesisError::Cancelled);
                }
                emitted_len = text.len();
                last_emit = Some(Instant::now());
            }
        }

        if emitted_len != text.len()
            && !self.machine.advance(SynthesisState::streaming(text.as_str()))
        {
            return Err(SynthesisError::Cancelled);
        }

        Ok(text)
    }
}
