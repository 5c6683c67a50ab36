//! Single-task event loop around the session machine
//!
//! Commands and timer firings are handled one at a time by the task that
//! owns the [`SessionMachine`], so no two transitions ever interleave.
//! Snapshots and subscriptions go straight to the shared hub and never
//! wait on the loop.

use sandlease_api::{SessionSnapshot, StartOutcome};
use sandlease_config::SessionConfig;
use sandlease_provider::SandboxProvider;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    NotificationHub, SessionError, SessionMachine, SessionResult, Subscription, TimerEvents,
    TimerKind,
};

const REQUEST_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<SessionResult<T>>;

enum Request {
    Start {
        minutes: Option<u32>,
        reply: Reply<StartOutcome>,
    },
    Continue {
        reply: Reply<Option<StartOutcome>>,
    },
    Terminate {
        reply: Reply<bool>,
    },
    Execute {
        code: String,
        reply: Reply<String>,
    },
    ListFiles {
        path: String,
        reply: Reply<Vec<String>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Owner of the event loop task
pub struct SessionService {
    task: JoinHandle<()>,
}

impl SessionService {
    /// Spawn the event loop and return a client for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: SessionConfig,
        provider: Arc<dyn SandboxProvider>,
    ) -> (SessionService, SessionClient) {
        let (machine, timers) = SessionMachine::new(config, provider);
        let hub = machine.hub().clone();
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);

        let task = tokio::spawn(run(machine, timers, rx));
        let client = SessionClient { requests: tx, hub };
        (SessionService { task }, client)
    }

    /// Wait for the event loop to exit
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

async fn run(
    mut machine: SessionMachine,
    mut timers: TimerEvents<TimerKind>,
    mut requests: mpsc::Receiver<Request>,
) {
    info!("Session service started");

    loop {
        tokio::select! {
            biased;

            Some(fired) = timers.recv() => {
                machine.handle_timer(fired).await;
            }

            request = requests.recv() => match request {
                Some(Request::Shutdown { reply }) => {
                    machine.shutdown().await;
                    let _ = reply.send(());
                    break;
                }
                Some(request) => dispatch(&mut machine, request).await,
                None => {
                    debug!("All clients dropped");
                    machine.shutdown().await;
                    break;
                }
            },
        }
    }

    info!("Session service stopped");
}

async fn dispatch(machine: &mut SessionMachine, request: Request) {
    match request {
        Request::Start { minutes, reply } => {
            let _ = reply.send(machine.start(minutes).await);
        }
        Request::Continue { reply } => {
            let _ = reply.send(machine.continue_session().await);
        }
        Request::Terminate { reply } => {
            let _ = reply.send(machine.terminate_session().await);
        }
        Request::Execute { code, reply } => {
            let _ = reply.send(machine.execute_code(&code).await);
        }
        Request::ListFiles { path, reply } => {
            let _ = reply.send(machine.list_files(&path).await);
        }
        Request::Shutdown { reply } => {
            let _ = reply.send(());
        }
    }
}

/// Cloneable handle for issuing commands to the session service
#[derive(Clone)]
pub struct SessionClient {
    requests: mpsc::Sender<Request>,
    hub: NotificationHub<SessionSnapshot>,
}

impl SessionClient {
    /// Start a session of `minutes` (default when `None` or zero)
    pub async fn start(&self, minutes: Option<u32>) -> SessionResult<StartOutcome> {
        self.call(|reply| Request::Start { minutes, reply }).await
    }

    /// Continue a paused session. `Ok(None)` when not paused.
    pub async fn continue_session(&self) -> SessionResult<Option<StartOutcome>> {
        self.call(|reply| Request::Continue { reply }).await
    }

    /// Close the sandbox. `Ok(false)` when there was none.
    pub async fn terminate_session(&self) -> SessionResult<bool> {
        self.call(|reply| Request::Terminate { reply }).await
    }

    pub async fn execute_code(&self, code: impl Into<String>) -> SessionResult<String> {
        let code = code.into();
        self.call(|reply| Request::Execute { code, reply }).await
    }

    pub async fn list_files(&self, path: impl Into<String>) -> SessionResult<Vec<String>> {
        let path = path.into();
        self.call(|reply| Request::ListFiles { path, reply }).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.hub.latest()
    }

    /// Observe every snapshot published from now on
    pub fn subscribe<F>(&self, observer: F) -> Subscription<SessionSnapshot>
    where
        F: Fn(&Arc<SessionSnapshot>) + Send + Sync + 'static,
    {
        self.hub.subscribe(observer)
    }

    /// Close any sandbox, cancel timers, drop observers and stop the loop.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.requests.send(Request::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> SessionResult<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(make(reply))
            .await
            .map_err(|_| SessionError::ServiceStopped)?;
        response.await.map_err(|_| SessionError::ServiceStopped)?
    }
}
