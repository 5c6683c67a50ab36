//! Mock sandbox provider for testing

use async_trait::async_trait;
use sandlease_util::SandboxId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    CreateOptions, ExecutionOutput, HandlePayload, ProviderError, ProviderResult, SandboxHandle,
    SandboxProvider,
};

/// Mock sandbox state for testing
#[derive(Debug, Clone)]
pub struct MockSandbox {
    pub id: SandboxId,
    pub mock_id: u64,
    pub running: bool,
    pub time_budget: Duration,
}

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct MockCalls {
    pub create: AtomicUsize,
    pub execute: AtomicUsize,
    pub list: AtomicUsize,
    pub close: AtomicUsize,
}

/// In-memory provider for unit/integration testing
pub struct MockProvider {
    next_id: AtomicU64,
    sandboxes: Arc<Mutex<HashMap<u64, MockSandbox>>>,

    /// Call counters, incremented on entry to each operation
    pub calls: MockCalls,

    /// Configure create to fail
    pub fail_create: Arc<Mutex<bool>>,

    /// Configure execute to fail
    pub fail_execute: Arc<Mutex<bool>>,

    /// Configure list to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Configure close to fail
    pub fail_close: Arc<Mutex<bool>>,

    /// Delay applied before create/close complete (simulates a slow or hung backend)
    pub latency: Arc<Mutex<Option<Duration>>>,

    /// Output returned by the next executions
    pub output: Arc<Mutex<ExecutionOutput>>,

    /// Names returned by list
    pub files: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sandboxes: Arc::new(Mutex::new(HashMap::new())),
            calls: MockCalls::default(),
            fail_create: Arc::new(Mutex::new(false)),
            fail_execute: Arc::new(Mutex::new(false)),
            fail_list: Arc::new(Mutex::new(false)),
            fail_close: Arc::new(Mutex::new(false)),
            latency: Arc::new(Mutex::new(None)),
            output: Arc::new(Mutex::new(ExecutionOutput::default())),
            files: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.lock().unwrap() = fail;
    }

    pub fn set_fail_execute(&self, fail: bool) {
        *self.fail_execute.lock().unwrap() = fail;
    }

    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        *self.fail_close.lock().unwrap() = fail;
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn set_output(&self, output: ExecutionOutput) {
        *self.output.lock().unwrap() = output;
    }

    pub fn set_files(&self, files: &[&str]) {
        *self.files.lock().unwrap() = files.iter().map(|f| f.to_string()).collect();
    }

    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.calls.execute.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.calls.list.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.calls.close.load(Ordering::SeqCst)
    }

    /// Get list of sandboxes that have not been closed
    pub fn running_sandboxes(&self) -> Vec<SandboxId> {
        self.sandboxes
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.running)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Time budget the most recent sandbox was created with
    pub fn last_time_budget(&self) -> Option<Duration> {
        self.sandboxes
            .lock()
            .unwrap()
            .values()
            .max_by_key(|s| s.mock_id)
            .map(|s| s.time_budget)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }

    fn lookup(&self, handle: &SandboxHandle) -> ProviderResult<u64> {
        let mock_id = handle
            .payload()
            .mock_id()
            .ok_or_else(|| ProviderError::SandboxNotFound(handle.id.clone()))?;

        let sandboxes = self.sandboxes.lock().unwrap();
        match sandboxes.get(&mock_id) {
            Some(sandbox) if sandbox.running => Ok(mock_id),
            _ => Err(ProviderError::SandboxNotFound(handle.id.clone())),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create(&self, options: CreateOptions) -> ProviderResult<SandboxHandle> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if *self.fail_create.lock().unwrap() {
            return Err(ProviderError::CreateFailed("Mock create failure".into()));
        }

        let mock_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = SandboxId::new(format!("mock-{}", mock_id));

        self.sandboxes.lock().unwrap().insert(
            mock_id,
            MockSandbox {
                id: id.clone(),
                mock_id,
                running: true,
                time_budget: options.time_budget,
            },
        );

        Ok(SandboxHandle::new(id, HandlePayload::Mock { id: mock_id }))
    }

    async fn execute(&self, handle: &SandboxHandle, _code: &str) -> ProviderResult<ExecutionOutput> {
        self.calls.execute.fetch_add(1, Ordering::SeqCst);

        if *self.fail_execute.lock().unwrap() {
            return Err(ProviderError::ExecuteFailed("Mock execute failure".into()));
        }

        self.lookup(handle)?;
        Ok(self.output.lock().unwrap().clone())
    }

    async fn list_files(&self, handle: &SandboxHandle, _path: &str) -> ProviderResult<Vec<String>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);

        if *self.fail_list.lock().unwrap() {
            return Err(ProviderError::ListFailed("Mock list failure".into()));
        }

        self.lookup(handle)?;
        Ok(self.files.lock().unwrap().clone())
    }

    async fn close(&self, handle: &SandboxHandle) -> ProviderResult<()> {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if *self.fail_close.lock().unwrap() {
            return Err(ProviderError::CloseFailed("Mock close failure".into()));
        }

        let mock_id = self.lookup(handle)?;
        if let Some(sandbox) = self.sandboxes.lock().unwrap().get_mut(&mock_id) {
            sandbox.running = false;
        }
        Ok(())
    }
}
