use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::ApiClientError;

/// Channel buffer size for dispatcher messages.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Work run on the dispatcher once a call settles: validation, decoding and delivery.
pub(in crate::client) type SettleJob = Box<dyn FnOnce() + Send>;

/// Messages sent to the dispatcher task.
pub(in crate::client) enum DispatchMessage {
    /// A call is about to reach the transport.
    CallStarted,

    /// A call has settled and its outcome must be delivered.
    CallSettled {
        job: SettleJob,
        /// Whether a matching `CallStarted` was sent.
        in_flight: bool,
    },
}

/// A point-in-time view of the calls of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    /// Calls handed to the transport and not yet settled.
    pub in_flight: usize,
    /// Calls whose outcome has been delivered, or is being delivered.
    pub settled: u64,
}

impl ActivitySnapshot {
    /// Whether at least one call is in flight.
    pub fn is_active(&self) -> bool {
        self.in_flight > 0
    }
}

/// Observes the network activity of an [`ApiClient`](super::ApiClient).
///
/// The counter is owned by the client's dispatcher: it is incremented before a call reaches
/// the transport and decremented when it settles, success or failure. Reading it never
/// blocks.
///
/// # Example
///
/// ```rust,no_run
/// use courier_core::ApiClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder().build()?;
/// let activity = client.activity();
///
/// let pending = tokio::spawn(client.get("/users").as_bytes());
/// activity.wait_until_active().await;
/// assert!(activity.is_active());
///
/// let _ = pending.await?;
/// activity.wait_until_idle().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ActivityIndicator {
    receiver: watch::Receiver<ActivitySnapshot>,
}

impl ActivityIndicator {
    /// The current state.
    pub fn snapshot(&self) -> ActivitySnapshot {
        *self.receiver.borrow()
    }

    /// The number of calls in flight.
    pub fn in_flight(&self) -> usize {
        self.snapshot().in_flight
    }

    /// Whether at least one call is in flight.
    pub fn is_active(&self) -> bool {
        self.snapshot().is_active()
    }

    /// The number of settled calls since the client was built.
    pub fn settled(&self) -> u64 {
        self.snapshot().settled
    }

    /// Waits until the activity flag matches `active`.
    ///
    /// Returns immediately when it already does. If the dispatcher stopped, the last
    /// known state is returned.
    pub async fn wait_for(&self, active: bool) -> ActivitySnapshot {
        self.wait_until(|snapshot| snapshot.is_active() == active).await
    }

    /// Waits until at least one call is in flight.
    pub async fn wait_until_active(&self) -> ActivitySnapshot {
        self.wait_for(true).await
    }

    /// Waits until no call is in flight.
    pub async fn wait_until_idle(&self) -> ActivitySnapshot {
        self.wait_for(false).await
    }

    /// Waits until `predicate` holds for the current state.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&ActivitySnapshot) -> bool,
    ) -> ActivitySnapshot {
        let mut receiver = self.receiver.clone();
        let reached = receiver
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map(|snapshot| *snapshot)
            .ok();
        reached.unwrap_or_else(|| *receiver.borrow())
    }

    /// A raw [`watch::Receiver`] on the state, for `select!` loops and the like.
    pub fn watch(&self) -> watch::Receiver<ActivitySnapshot> {
        self.receiver.clone()
    }
}

/// Sender for dispatcher messages, bound to the runtime the dispatcher lives on.
#[derive(Debug, Clone)]
pub(in crate::client) struct DispatchSender {
    inner: mpsc::Sender<DispatchMessage>,
    runtime: Handle,
}

impl DispatchSender {
    /// Sends a message to the dispatcher task.
    ///
    /// When the dispatcher is gone the message is dropped along with its job.
    pub(in crate::client) async fn send(&self, msg: DispatchMessage) {
        if self.inner.send(msg).await.is_err() {
            warn!("completion dispatcher stopped, message dropped");
        }
    }

    /// Spawns a task on the dispatcher runtime.
    pub(in crate::client) fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(task)
    }
}

/// Handle on the dispatcher task of a client.
#[derive(Debug, Clone)]
pub(in crate::client) struct DispatchHandle {
    sender: DispatchSender,
    activity: ActivityIndicator,
}

impl DispatchHandle {
    /// Spawns the dispatcher task on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::Custom`] when called outside of a tokio runtime.
    pub(in crate::client) fn spawn() -> Result<Self, ApiClientError> {
        let runtime = Handle::try_current().map_err(|error| {
            ApiClientError::custom(format!("a tokio runtime is required: {error}"))
        })?;

        let (sender, receiver) = mpsc::channel::<DispatchMessage>(CHANNEL_BUFFER_SIZE);
        let (state, watcher) = watch::channel(ActivitySnapshot::default());

        runtime.spawn(dispatch_task(receiver, state));

        Ok(Self {
            sender: DispatchSender {
                inner: sender,
                runtime,
            },
            activity: ActivityIndicator { receiver: watcher },
        })
    }

    /// Returns a clone of the sender for passing to `ApiCall`.
    pub(in crate::client) fn sender(&self) -> DispatchSender {
        self.sender.clone()
    }

    pub(in crate::client) fn activity(&self) -> ActivityIndicator {
        self.activity.clone()
    }
}

/// Background task owning the activity counter and running every settle job, in order.
///
/// Stops once every sender (client clones and pending calls) is dropped.
async fn dispatch_task(
    mut receiver: mpsc::Receiver<DispatchMessage>,
    state: watch::Sender<ActivitySnapshot>,
) {
    while let Some(msg) = receiver.recv().await {
        match msg {
            DispatchMessage::CallStarted => {
                state.send_modify(|snapshot| snapshot.in_flight += 1);
            }
            DispatchMessage::CallSettled { job, in_flight } => {
                state.send_modify(|snapshot| {
                    if in_flight {
                        decrement(snapshot);
                    }
                    snapshot.settled += 1;
                });
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("completion handler panicked");
                }
            }
        }
    }
    debug!("completion dispatcher stopped");
}

fn decrement(snapshot: &mut ActivitySnapshot) {
    match snapshot.in_flight.checked_sub(1) {
        Some(in_flight) => snapshot.in_flight = in_flight,
        None => warn!("unmatched activity decrement ignored"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::oneshot;

    use super::*;

    fn settle(job: impl FnOnce() + Send + 'static, in_flight: bool) -> DispatchMessage {
        DispatchMessage::CallSettled {
            job: Box::new(job),
            in_flight,
        }
    }

    #[test]
    fn test_spawn_requires_a_runtime() {
        let error = DispatchHandle::spawn().expect_err("no runtime");

        assert!(matches!(error, ApiClientError::Custom { .. }));
    }

    #[test]
    fn test_unmatched_decrement_is_ignored() {
        let mut snapshot = ActivitySnapshot::default();

        decrement(&mut snapshot);

        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test]
    async fn test_counter_follows_started_and_settled() {
        let handle = DispatchHandle::spawn().expect("runtime");
        let sender = handle.sender();
        let activity = handle.activity();

        sender.send(DispatchMessage::CallStarted).await;
        sender.send(DispatchMessage::CallStarted).await;
        let snapshot = activity.wait_until(|it| it.in_flight == 2).await;
        assert_eq!(snapshot.in_flight, 2);

        sender.send(settle(|| {}, true)).await;
        sender.send(settle(|| {}, true)).await;
        let snapshot = activity.wait_until_idle().await;

        assert_eq!(
            snapshot,
            ActivitySnapshot {
                in_flight: 0,
                settled: 2
            }
        );
    }

    #[tokio::test]
    async fn test_settle_without_start_keeps_counter_at_zero() {
        let handle = DispatchHandle::spawn().expect("runtime");
        let sender = handle.sender();
        let activity = handle.activity();

        sender.send(settle(|| {}, false)).await;
        sender.send(settle(|| {}, true)).await;
        let snapshot = activity.wait_until(|it| it.settled == 2).await;

        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let handle = DispatchHandle::spawn().expect("runtime");
        let sender = handle.sender();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for index in 0..10 {
            let seen = Arc::clone(&seen);
            sender
                .send(settle(
                    move || {
                        if let Ok(mut seen) = seen.lock() {
                            seen.push(index);
                        }
                    },
                    false,
                ))
                .await;
        }
        let (done, finished) = oneshot::channel();
        sender
            .send(settle(
                move || {
                    let _ = done.send(());
                },
                false,
            ))
            .await;
        finished.await.expect("dispatcher should run the job");

        let order = seen.lock().expect("lock").clone();
        assert_eq!(order, (0..10).collect::<Vec<usize>>());
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_the_dispatcher() {
        let handle = DispatchHandle::spawn().expect("runtime");
        let sender = handle.sender();

        sender.send(settle(|| panic!("boom"), false)).await;
        let (done, finished) = oneshot::channel();
        sender
            .send(settle(
                move || {
                    let _ = done.send(42);
                },
                false,
            ))
            .await;

        assert_eq!(finished.await.expect("dispatcher alive"), 42);
    }
}
