//! Session lifecycle state machine

use chrono::{DateTime, Local};
use sandlease_api::{EndReason, SessionSnapshot, SessionState, StartOutcome};
use sandlease_config::SessionConfig;
use sandlease_provider::{
    CreateOptions, ExecutionOutput, ProviderResult, SandboxHandle, SandboxProvider,
};
use sandlease_util::{remaining_whole_seconds, MonotonicInstant};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::{
    resolve_duration, NotificationHub, SessionError, SessionResult, TimerEvents, TimerFired,
    TimerScheduler,
};

/// Period of both countdown ticks
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long `Terminated` lingers before the machine returns to `Idle`
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Text returned by `execute_code` when the snippet produced nothing
pub const NO_OUTPUT: &str = "No output";

const CREATE_CONTEXT: &str = "Failed to initialize sandbox";
const CLOSE_CONTEXT: &str = "Failed to close sandbox";
const EXECUTE_CONTEXT: &str = "Error executing code";
const LIST_CONTEXT: &str = "Error listing files";

/// Timers owned by the session machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot: the active period is over, pause
    SessionExpiry,
    /// One-shot: nobody continued a paused session, terminate
    PauseGrace,
    /// Periodic: refresh `remaining_seconds` while active
    ActiveTick,
    /// Periodic: count `pause_countdown_seconds` down while paused
    PauseTick,
    /// One-shot: return from `Terminated` to `Idle`
    Settle,
}

/// The session lifecycle state machine
///
/// Owns the sandbox handle, every timer and the snapshot hub. All methods
/// take `&mut self`; callers serialize access, normally through
/// [`crate::SessionService`].
pub struct SessionMachine {
    config: SessionConfig,
    provider: Arc<dyn SandboxProvider>,
    timers: TimerScheduler<TimerKind>,
    hub: NotificationHub<SessionSnapshot>,

    state: SessionState,
    handle: Option<SandboxHandle>,
    start_time: Option<DateTime<Local>>,
    started_at: Option<MonotonicInstant>,
    duration: Duration,
    duration_minutes: u32,
    remaining_seconds: u64,
    pause_countdown_seconds: u64,
    error: Option<String>,
    end_reason: Option<EndReason>,
}

impl SessionMachine {
    /// Create an idle machine. Timer firings arrive on the returned
    /// receiver and must be fed back through [`Self::handle_timer`].
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn SandboxProvider>,
    ) -> (Self, TimerEvents<TimerKind>) {
        let (timers, events) = TimerScheduler::new();

        info!(
            provider = provider.name(),
            default_minutes = config.default_duration_minutes,
            max_minutes = config.max_duration_minutes,
            is_pro = config.is_pro,
            "Session machine initialized"
        );

        let machine = Self {
            config,
            provider,
            timers,
            hub: NotificationHub::new(SessionSnapshot::idle()),
            state: SessionState::Idle,
            handle: None,
            start_time: None,
            started_at: None,
            duration: Duration::ZERO,
            duration_minutes: 0,
            remaining_seconds: 0,
            pause_countdown_seconds: 0,
            error: None,
            end_reason: None,
        };
        (machine, events)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn hub(&self) -> &NotificationHub<SessionSnapshot> {
        &self.hub
    }

    /// Timers currently armed
    pub fn armed_timers(&self) -> Vec<TimerKind> {
        self.timers.armed()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sandbox_id: self.handle.as_ref().map(|h| h.id.clone()),
            state: self.state,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            remaining_seconds: self.remaining_seconds,
            pause_countdown_seconds: self.pause_countdown_seconds,
            error: self.error.clone(),
            end_reason: self.end_reason,
        }
    }

    /// Provision a sandbox and begin an active period.
    ///
    /// Legal from `Idle`, `Terminated` and `Error`.
    pub async fn start(&mut self, requested_minutes: Option<u32>) -> SessionResult<StartOutcome> {
        if !self.state.can_start() {
            return Err(self.reject("start", "an idle, terminated or failed session"));
        }

        let decision = resolve_duration(&self.config, requested_minutes);
        if let Some(notice) = &decision.clamp {
            warn!(
                requested = notice.requested(),
                allowed = notice.allowed(),
                "Requested duration clamped"
            );
        }

        self.timers.cancel(TimerKind::Settle);
        self.error = None;
        self.end_reason = None;
        self.start_time = None;
        self.started_at = None;
        self.duration_minutes = decision.minutes;
        self.duration = Duration::from_secs(u64::from(decision.minutes) * 60);
        self.remaining_seconds = 0;
        self.pause_countdown_seconds = 0;
        self.set_state(SessionState::Starting);

        let options = CreateOptions {
            api_key: self.config.api_key.clone(),
            time_budget: self.duration,
        };
        let created = bounded(
            self.config.provider_timeout,
            CREATE_CONTEXT,
            self.provider.create(options),
        )
        .await;

        let handle = match created {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Sandbox provisioning failed");
                self.fail(e.to_string());
                return Err(e);
            }
        };

        info!(
            sandbox_id = %handle.id,
            duration_minutes = decision.minutes,
            "Sandbox initialized"
        );

        self.handle = Some(handle);
        self.start_time = Some(sandlease_util::now());
        self.started_at = Some(MonotonicInstant::now());
        self.remaining_seconds = self.duration.as_secs();
        self.timers.arm_once(TimerKind::SessionExpiry, self.duration);
        self.timers.arm_periodic(TimerKind::ActiveTick, TICK_INTERVAL);
        self.set_state(SessionState::Active);

        Ok(StartOutcome {
            snapshot: self.snapshot(),
            clamp: decision.clamp,
        })
    }

    /// Replace a paused sandbox with a fresh one of the default duration.
    ///
    /// Returns `Ok(None)` without doing anything unless the session is
    /// paused.
    pub async fn continue_session(&mut self) -> SessionResult<Option<StartOutcome>> {
        if self.state != SessionState::Paused {
            debug!(state = %self.state, "Continue ignored outside a paused session");
            return Ok(None);
        }

        info!("Continuing session with a fresh sandbox");
        self.timers.cancel(TimerKind::PauseGrace);
        self.timers.cancel(TimerKind::PauseTick);
        self.set_state(SessionState::Resuming);

        self.terminate(EndReason::Restarted).await?;
        let outcome = self.start(Some(self.config.default_duration_minutes)).await?;
        Ok(Some(outcome))
    }

    /// Close the sandbox at the user's request.
    ///
    /// Returns `Ok(false)` when there was no sandbox to close.
    pub async fn terminate_session(&mut self) -> SessionResult<bool> {
        if self.handle.is_none() {
            debug!(state = %self.state, "Terminate ignored, no sandbox held");
            return Ok(false);
        }
        self.terminate(EndReason::UserClosed).await?;
        Ok(true)
    }

    /// Run a snippet in the active sandbox and render its output
    pub async fn execute_code(&mut self, code: &str) -> SessionResult<String> {
        let Some(handle) = self.active_handle() else {
            return Err(self.reject("execute_code", "an active session"));
        };

        let result = bounded(
            self.config.provider_timeout,
            EXECUTE_CONTEXT,
            self.provider.execute(handle, code),
        )
        .await;

        match result {
            Ok(output) => {
                debug!(
                    stdout_lines = output.stdout_lines.len(),
                    stderr_lines = output.stderr_lines.len(),
                    failed = output.error_detail.is_some(),
                    "Code executed"
                );
                Ok(render_output(&output))
            }
            Err(e) => {
                warn!(error = %e, "Code execution failed");
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// List entry names under `path` in the active sandbox
    pub async fn list_files(&mut self, path: &str) -> SessionResult<Vec<String>> {
        let Some(handle) = self.active_handle() else {
            return Err(self.reject("list_files", "an active session"));
        };

        let result = bounded(
            self.config.provider_timeout,
            LIST_CONTEXT,
            self.provider.list_files(handle, path),
        )
        .await;

        match result {
            Ok(entries) => {
                debug!(path, entries = entries.len(), "Files listed");
                Ok(entries)
            }
            Err(e) => {
                warn!(error = %e, path, "File listing failed");
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Dispatch a timer firing. Stale firings are dropped.
    pub async fn handle_timer(&mut self, fired: TimerFired<TimerKind>) {
        if !self.timers.accept(fired) {
            trace!(timer = ?fired.name, generation = fired.generation, "Stale timer firing dropped");
            return;
        }

        match fired.name {
            TimerKind::SessionExpiry => self.pause(),
            TimerKind::ActiveTick => self.active_tick(),
            TimerKind::PauseTick => self.pause_tick(),
            TimerKind::PauseGrace => self.grace_expired().await,
            TimerKind::Settle => self.settle(),
        }
    }

    /// Close any live sandbox, cancel every timer and drop all observers
    pub async fn shutdown(&mut self) {
        if self.handle.is_some() {
            info!("Closing sandbox on shutdown");
            if let Err(e) = self.terminate(EndReason::UserClosed).await {
                warn!(error = %e, "Sandbox close on shutdown failed");
            }
        }
        self.timers.cancel_all();
        self.hub.clear();
    }

    fn active_handle(&self) -> Option<&SandboxHandle> {
        match self.state {
            SessionState::Active => self.handle.as_ref(),
            _ => None,
        }
    }

    fn pause(&mut self) {
        if self.state != SessionState::Active || self.handle.is_none() {
            debug!(state = %self.state, "Expiry ignored outside an active session");
            return;
        }

        self.timers.cancel(TimerKind::ActiveTick);
        let remaining = self.compute_remaining();
        if remaining != self.remaining_seconds {
            self.remaining_seconds = remaining;
            self.publish();
        }

        info!(
            grace_seconds = self.config.pause_warning_seconds,
            "Session time expired, pausing"
        );

        self.pause_countdown_seconds = self.config.pause_warning_seconds;
        self.timers.arm_once(TimerKind::PauseGrace, self.config.pause_warning());
        self.timers.arm_periodic(TimerKind::PauseTick, TICK_INTERVAL);
        self.set_state(SessionState::Paused);
    }

    fn active_tick(&mut self) {
        if self.state != SessionState::Active {
            return;
        }

        self.remaining_seconds = self.compute_remaining();
        if self.remaining_seconds == 0 {
            self.timers.cancel(TimerKind::ActiveTick);
        }
        self.publish();
    }

    fn pause_tick(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }

        self.pause_countdown_seconds = self.pause_countdown_seconds.saturating_sub(1);
        if self.pause_countdown_seconds == 0 {
            self.timers.cancel(TimerKind::PauseTick);
        }
        self.publish();
    }

    async fn grace_expired(&mut self) {
        if self.state != SessionState::Paused || self.handle.is_none() {
            debug!(state = %self.state, "Grace expiry ignored outside a paused session");
            return;
        }

        if self.pause_countdown_seconds > 0 {
            self.pause_countdown_seconds = 0;
            self.publish();
        }

        info!("Grace period over without continuation, terminating");
        if let Err(e) = self.terminate(EndReason::GraceExpired).await {
            warn!(error = %e, "Automatic termination failed");
        }
    }

    fn settle(&mut self) {
        if self.state == SessionState::Terminated {
            self.set_state(SessionState::Idle);
        }
    }

    /// Close the held sandbox. The handle is released whether or not the
    /// provider succeeds.
    async fn terminate(&mut self, reason: EndReason) -> SessionResult<()> {
        if self.handle.is_none() {
            return Ok(());
        }

        self.timers.cancel_all();
        self.set_state(SessionState::Terminating);

        let closed = match self.handle.as_ref() {
            Some(handle) => {
                bounded(
                    self.config.provider_timeout,
                    CLOSE_CONTEXT,
                    self.provider.close(handle),
                )
                .await
            }
            None => Ok(()),
        };

        let sandbox_id = self.handle.take().map(|h| h.id);
        self.start_time = None;
        self.started_at = None;
        self.remaining_seconds = 0;
        self.pause_countdown_seconds = 0;

        match closed {
            Ok(()) => {
                info!(
                    sandbox_id = ?sandbox_id,
                    reason = ?reason,
                    "{}",
                    reason.message()
                );
                self.end_reason = Some(reason);
                self.set_state(SessionState::Terminated);
                self.timers.arm_once(TimerKind::Settle, SETTLE_DELAY);
                Ok(())
            }
            Err(e) => {
                error!(
                    sandbox_id = ?sandbox_id,
                    error = %e,
                    "Sandbox close failed; it may still be running remotely"
                );
                self.fail(e.to_string());
                Err(e)
            }
        }
    }

    fn compute_remaining(&self) -> u64 {
        match self.started_at {
            Some(started) => remaining_whole_seconds(self.duration, started.elapsed()),
            None => 0,
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Session state changed");
        }
        self.state = state;
        self.publish();
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.set_state(SessionState::Error);
    }

    fn record_error(&mut self, message: String) {
        self.error = Some(message);
        self.publish();
    }

    /// Build a precondition error and record it without changing state
    fn reject(&mut self, operation: &'static str, required: &'static str) -> SessionError {
        let err = SessionError::InvalidState {
            operation,
            required,
            state: self.state,
        };
        warn!(operation, state = %self.state, "Command rejected");
        self.record_error(err.to_string());
        err
    }

    fn publish(&self) {
        debug_assert_eq!(
            self.handle.is_some(),
            self.state.holds_sandbox(),
            "sandbox ownership out of step with state {}",
            self.state
        );
        self.hub.notify(self.snapshot());
    }
}

/// Bound a provider call by `limit`, attaching `context` to any failure
async fn bounded<T>(
    limit: Duration,
    context: &'static str,
    call: impl Future<Output = ProviderResult<T>>,
) -> SessionResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(SessionError::Provider { context, source }),
        Err(_) => Err(SessionError::Timeout {
            context,
            timeout: limit,
        }),
    }
}

/// Render captured output as shown to the user.
///
/// Stdout, stderr and the error detail each become one section, empty
/// sections are skipped.
pub fn render_output(output: &ExecutionOutput) -> String {
    if output.is_empty() {
        return NO_OUTPUT.to_string();
    }

    let mut sections = Vec::new();
    if !output.stdout_lines.is_empty() {
        sections.push(output.stdout_lines.join("\n"));
    }
    if !output.stderr_lines.is_empty() {
        sections.push(output.stderr_lines.join("\n"));
    }
    if let Some(detail) = &output.error_detail {
        sections.push(format!("Error: {}", detail));
    }

    sections.join("\n")
}
