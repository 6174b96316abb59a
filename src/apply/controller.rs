use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, eyre};
use log::{debug, info, warn};
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::auto_apply::StartResponse;
use crate::api::client::{ApiClient, ApiError};
use crate::apply::progress::{ApplyProgress, ApplyStatus};

static SECURITY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8}$").unwrap());

/// Checked before any network call: exactly 8 decimal digits.
pub fn is_valid_security_code(code: &str) -> bool {
    SECURITY_CODE.is_match(code)
}

#[derive(Debug)]
pub enum StartOutcome {
    Accepted { key: String },
    Rejected { message: String },
}

/// The backend seam the controller drives. Implemented by both auto-apply
/// pipelines; tests install fakes.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    async fn start(&self) -> Result<StartOutcome, ApiError>;
    async fn status(&self, key: &str) -> Result<Option<ApplyProgress>, ApiError>;
    /// Returns whether the backend acknowledged the cancellation.
    async fn cancel(&self, key: &str) -> Result<bool, ApiError>;
    async fn submit_code(&self, code: &str) -> Result<StartOutcome, ApiError>;
}

/// Drives one auto-apply run: starts it, polls its status on a fixed
/// period, and publishes each snapshot over a watch channel. The loop stops
/// itself on `completed`/`error`, on cancellation, and on the optional
/// configured timeout; a failed poll is logged and retried on the next tick.
pub struct AutoApplyController {
    backend: Arc<dyn ProgressBackend>,
    job_id: String,
    poll_interval: Duration,
    poll_timeout: Option<Duration>,
    progress_tx: watch::Sender<Option<ApplyProgress>>,
    poll: Mutex<ActivePoll>,
}

struct ActivePoll {
    key: Option<String>,
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutoApplyController {
    pub fn new(
        backend: Arc<dyn ProgressBackend>,
        job_id: impl Into<String>,
        poll_interval: Duration,
        poll_timeout: Option<Duration>,
    ) -> Self {
        let (progress_tx, _) = watch::channel(None);
        Self {
            backend,
            job_id: job_id.into(),
            poll_interval,
            poll_timeout,
            progress_tx,
            poll: Mutex::new(ActivePoll {
                key: None,
                stop: CancellationToken::new(),
                task: None,
            }),
        }
    }

    /// Snapshot feed. The latest value is always the whole truth; no
    /// client-side merging happens anywhere.
    pub fn progress(&self) -> watch::Receiver<Option<ApplyProgress>> {
        self.progress_tx.subscribe()
    }

    /// Starts the run. A backend rejection surfaces its message and leaves
    /// the controller idle: no polling begins.
    pub async fn start(&self) -> Result<()> {
        match self.backend.start().await? {
            StartOutcome::Rejected { message } => Err(eyre!(message)),
            StartOutcome::Accepted { key } => {
                info!("auto-apply session {} started for job {}", key, self.job_id);
                self.spawn_poll(key);
                Ok(())
            }
        }
    }

    /// Validates locally, then submits the code. On success the loop is
    /// re-keyed to the fresh session and polling resumes.
    pub async fn submit_security_code(&self, code: &str) -> Result<()> {
        if !is_valid_security_code(code) {
            return Err(eyre!("the security code must be exactly 8 digits"));
        }

        match self.backend.submit_code(code).await? {
            StartOutcome::Rejected { message } => Err(eyre!(message)),
            StartOutcome::Accepted { key } => {
                info!("security code accepted, resuming as session {}", key);
                self.spawn_poll(key);
                Ok(())
            }
        }
    }

    /// Tells the backend to cancel, then forces the local snapshot to
    /// `cancelled` and stops polling whatever the backend said. The
    /// optimistic local transition is the contract: cancel never fails.
    pub async fn cancel(&self) {
        let key = {
            let mut poll = self.poll.lock().unwrap();
            poll.stop.cancel();
            poll.key.clone()
        };

        if let Some(key) = key {
            match self.backend.cancel(&key).await {
                Ok(true) => info!("backend acknowledged cancellation of {}", key),
                Ok(false) => {
                    warn!("backend refused to cancel {}, treating the run as cancelled anyway", key)
                }
                Err(e) => {
                    warn!("cancel request for {} failed, treating the run as cancelled anyway: {}", key, e)
                }
            }
        }

        let _ = self.progress_tx.send(Some(ApplyProgress::local(
            &self.job_id,
            ApplyStatus::Cancelled,
            "cancelled by user",
        )));
    }

    /// Stops polling without touching the backend, for consumer teardown.
    pub fn stop(&self) {
        self.poll.lock().unwrap().stop.cancel();
    }

    fn spawn_poll(&self, key: String) {
        let mut poll = self.poll.lock().unwrap();
        poll.stop.cancel();

        let stop = CancellationToken::new();
        poll.stop = stop.clone();
        poll.key = Some(key.clone());

        let backend = Arc::clone(&self.backend);
        let tx = self.progress_tx.clone();
        let interval = self.poll_interval;
        let timeout = self.poll_timeout;
        let job_id = self.job_id.clone();

        poll.task = Some(tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // Both select arms can be ready at once; a tick must never
                // outlive cancellation.
                if stop.is_cancelled() {
                    break;
                }

                if let Some(limit) = timeout {
                    if started.elapsed() >= limit {
                        warn!("auto-apply for {} exceeded the poll timeout", job_id);
                        let _ = tx.send(Some(ApplyProgress::local(
                            &job_id,
                            ApplyStatus::Error,
                            "timed out waiting for the backend to finish",
                        )));
                        break;
                    }
                }

                match backend.status(&key).await {
                    Ok(Some(snapshot)) => {
                        // The run may have been cancelled while this poll
                        // was in flight; its response must not win.
                        if stop.is_cancelled() {
                            break;
                        }
                        let status = snapshot.status;
                        let _ = tx.send(Some(snapshot));
                        if status.ends_polling() {
                            debug!("auto-apply for {} reached {:?}, polling stopped", job_id, status);
                            break;
                        }
                    }
                    Ok(None) => debug!("no progress recorded yet for {}", key),
                    Err(e) => warn!("progress poll failed, retrying on the next tick: {}", e),
                }
            }
        }));
    }
}

impl Drop for AutoApplyController {
    fn drop(&mut self) {
        if let Ok(poll) = self.poll.lock() {
            poll.stop.cancel();
        }
    }
}

fn outcome(response: StartResponse) -> StartOutcome {
    match (response.success, response.key) {
        (true, Some(key)) => StartOutcome::Accepted { key },
        (_, _) => StartOutcome::Rejected {
            message: response
                .error
                .unwrap_or_else(|| "the backend rejected the request".to_string()),
        },
    }
}

/// Production seam over the enhanced auto-apply endpoints.
pub struct EnhancedBackend {
    client: Arc<ApiClient>,
    user_id: String,
    job_id: String,
}

impl EnhancedBackend {
    pub fn new(client: Arc<ApiClient>, user_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            job_id: job_id.into(),
        }
    }
}

#[async_trait]
impl ProgressBackend for EnhancedBackend {
    async fn start(&self) -> Result<StartOutcome, ApiError> {
        Ok(outcome(self.client.enhanced_start(&self.user_id, &self.job_id).await?))
    }

    async fn status(&self, key: &str) -> Result<Option<ApplyProgress>, ApiError> {
        let response = self.client.enhanced_status(key).await?;
        if !response.success {
            debug!("status for {} reported failure: {:?}", key, response.error);
        }
        Ok(response.progress)
    }

    async fn cancel(&self, _key: &str) -> Result<bool, ApiError> {
        Ok(self.client.enhanced_cancel(&self.user_id, &self.job_id).await?.success)
    }

    async fn submit_code(&self, code: &str) -> Result<StartOutcome, ApiError> {
        Ok(outcome(
            self.client
                .submit_security_code(&self.user_id, &self.job_id, code)
                .await?,
        ))
    }
}

/// Seam over the original pipeline, which cancels by session key and has no
/// security-code step.
pub struct LegacyBackend {
    client: Arc<ApiClient>,
    user_id: String,
    job_id: String,
}

impl LegacyBackend {
    pub fn new(client: Arc<ApiClient>, user_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            job_id: job_id.into(),
        }
    }
}

#[async_trait]
impl ProgressBackend for LegacyBackend {
    async fn start(&self) -> Result<StartOutcome, ApiError> {
        Ok(outcome(self.client.auto_apply_start(&self.user_id, &self.job_id).await?))
    }

    async fn status(&self, key: &str) -> Result<Option<ApplyProgress>, ApiError> {
        let response = self.client.auto_apply_progress(key).await?;
        if !response.success {
            debug!("progress for {} reported failure: {:?}", key, response.error);
        }
        Ok(response.progress)
    }

    async fn cancel(&self, key: &str) -> Result<bool, ApiError> {
        Ok(self.client.auto_apply_cancel(key).await?.success)
    }

    async fn submit_code(&self, _code: &str) -> Result<StartOutcome, ApiError> {
        Ok(StartOutcome::Rejected {
            message: "the standard apply pipeline cannot take security codes".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    enum ScriptedPoll {
        Snapshot(ApplyStatus),
        Failure,
    }

    /// Scripted stand-in for the backend. Pops one scripted response per
    /// status call; when the script runs dry it repeats `idle_status`.
    #[derive(Default)]
    struct FakeBackend {
        script: Mutex<VecDeque<ScriptedPoll>>,
        idle_status: Option<ApplyStatus>,
        reject_start: Option<String>,
        refuse_cancel: bool,
        status_calls: AtomicUsize,
        submit_calls: AtomicUsize,
        cancel_calls: AtomicUsize,
        polled_keys: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn scripted(steps: Vec<ScriptedPoll>) -> Self {
            Self {
                script: Mutex::new(steps.into()),
                ..Self::default()
            }
        }

        fn endless(status: ApplyStatus) -> Self {
            Self {
                idle_status: Some(status),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ProgressBackend for FakeBackend {
        async fn start(&self) -> Result<StartOutcome, ApiError> {
            if let Some(message) = &self.reject_start {
                return Ok(StartOutcome::Rejected { message: message.clone() });
            }
            Ok(StartOutcome::Accepted { key: "key-1".to_string() })
        }

        async fn status(&self, key: &str) -> Result<Option<ApplyProgress>, ApiError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.polled_keys.lock().unwrap().push(key.to_string());

            match self.script.lock().unwrap().pop_front() {
                Some(ScriptedPoll::Snapshot(status)) => {
                    Ok(Some(ApplyProgress::local("j1", status, "step")))
                }
                Some(ScriptedPoll::Failure) => Err(ApiError::Status {
                    status: 500,
                    text: "Internal Server Error".to_string(),
                }),
                None => Ok(self
                    .idle_status
                    .map(|status| ApplyProgress::local("j1", status, "step"))),
            }
        }

        async fn cancel(&self, _key: &str) -> Result<bool, ApiError> {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            Ok(!self.refuse_cancel)
        }

        async fn submit_code(&self, _code: &str) -> Result<StartOutcome, ApiError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StartOutcome::Accepted { key: "key-2".to_string() })
        }
    }

    fn controller(backend: Arc<FakeBackend>) -> AutoApplyController {
        AutoApplyController::new(backend, "j1", Duration::from_millis(5), None)
    }

    async fn wait_for_status(
        rx: &mut watch::Receiver<Option<ApplyProgress>>,
        want: ApplyStatus,
    ) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if rx.borrow().as_ref().map(|p| p.status) == Some(want) {
                    break;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap_or_else(|_| panic!("never observed {:?}", want));
    }

    #[tokio::test]
    async fn polling_stops_at_terminal_status() {
        let backend = Arc::new(FakeBackend::scripted(vec![
            ScriptedPoll::Snapshot(ApplyStatus::Running),
            ScriptedPoll::Snapshot(ApplyStatus::Running),
            ScriptedPoll::Snapshot(ApplyStatus::Completed),
        ]));
        let controller = controller(backend.clone());
        controller.start().await.unwrap();

        let mut rx = controller.progress();
        wait_for_status(&mut rx, ApplyStatus::Completed).await;

        let calls = backend.status_calls.load(Ordering::SeqCst);
        assert_eq!(calls, 3);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.status_calls.load(Ordering::SeqCst), calls);
        assert_eq!(
            rx.borrow().as_ref().map(|p| p.status),
            Some(ApplyStatus::Completed)
        );
    }

    #[tokio::test]
    async fn failed_polls_are_tolerated_and_polling_continues() {
        let backend = Arc::new(FakeBackend::scripted(vec![
            ScriptedPoll::Failure,
            ScriptedPoll::Failure,
            ScriptedPoll::Snapshot(ApplyStatus::Completed),
        ]));
        let controller = controller(backend.clone());
        controller.start().await.unwrap();

        let mut rx = controller.progress();
        wait_for_status(&mut rx, ApplyStatus::Completed).await;

        assert_eq!(backend.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_start_stays_idle() {
        let backend = Arc::new(FakeBackend {
            reject_start: Some("no resume on file".to_string()),
            ..FakeBackend::default()
        });
        let controller = controller(backend.clone());

        let err = controller.start().await.unwrap_err();
        assert!(err.to_string().contains("no resume on file"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(backend.status_calls.load(Ordering::SeqCst), 0);
        assert!(controller.progress().borrow().is_none());
    }

    #[tokio::test]
    async fn cancel_is_terminal_even_when_backend_refuses() {
        let backend = Arc::new(FakeBackend {
            refuse_cancel: true,
            ..FakeBackend::endless(ApplyStatus::Running)
        });
        let controller = controller(backend.clone());
        controller.start().await.unwrap();

        let mut rx = controller.progress();
        wait_for_status(&mut rx, ApplyStatus::Running).await;

        controller.cancel().await;

        assert_eq!(backend.cancel_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            rx.borrow().as_ref().map(|p| p.status),
            Some(ApplyStatus::Cancelled)
        );

        let calls = backend.status_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.status_calls.load(Ordering::SeqCst), calls);
        assert_eq!(
            rx.borrow().as_ref().map(|p| p.status),
            Some(ApplyStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn security_code_is_validated_before_any_network_call() {
        let backend = Arc::new(FakeBackend::default());
        let controller = controller(backend.clone());

        for bad in ["1234567", "1234567a", "123456789", "1234 678", ""] {
            let err = controller.submit_security_code(bad).await.unwrap_err();
            assert!(err.to_string().contains("8 digits"));
        }
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 0);

        controller.submit_security_code("12345678").await.unwrap();
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accepted_security_code_rekeys_the_poll_loop() {
        let backend = Arc::new(FakeBackend::endless(ApplyStatus::WaitingForInput));
        let controller = controller(backend.clone());
        controller.start().await.unwrap();

        let mut rx = controller.progress();
        wait_for_status(&mut rx, ApplyStatus::WaitingForInput).await;
        assert!(backend.polled_keys.lock().unwrap().iter().all(|k| k == "key-1"));

        controller.submit_security_code("12345678").await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if backend.polled_keys.lock().unwrap().iter().any(|k| k == "key-2") {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("polling never resumed with the new session key");
    }

    #[tokio::test]
    async fn configured_timeout_stops_the_loop_with_an_error_snapshot() {
        let backend = Arc::new(FakeBackend::endless(ApplyStatus::Running));
        let controller = AutoApplyController::new(
            backend.clone(),
            "j1",
            Duration::from_millis(5),
            Some(Duration::from_millis(30)),
        );
        controller.start().await.unwrap();

        let mut rx = controller.progress();
        wait_for_status(&mut rx, ApplyStatus::Error).await;
        let snapshot = rx.borrow().clone().unwrap();
        assert!(snapshot.message.contains("timed out"));

        let calls = backend.status_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.status_calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn security_code_shape() {
        assert!(is_valid_security_code("12345678"));
        assert!(!is_valid_security_code("1234567"));
        assert!(!is_valid_security_code("1234567a"));
        assert!(!is_valid_security_code("١٢٣٤٥٦٧٨")); // non-ASCII digits
    }
}
