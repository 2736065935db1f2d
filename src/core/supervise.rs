//! # Supervising unit of one submission.
//!
//! Runs the inner work, arms the watchdog, classifies how the work ended and
//! resolves the submission's [`SafeResult`](crate::SafeResult).
//!
//! ## Flow
//! ```text
//! supervise()
//!   ├─► spawn_work()         inner outcome (JoinHandle) on the pool
//!   ├─► watch():
//!   │     select! (biased)
//!   │       ├─ inner joined        → Completed / Failed / Cancelled
//!   │       ├─ watchdog elapsed    → TimeoutHit, cancel token, abort → Cancelled
//!   │       └─ token cancelled     → abort → Cancelled (external)
//!   ├─► publish TaskCompleted / TaskFailed / TaskCancelled
//!   └─► Fallbacks::resolve(outcome) ──► Resolver::resolve(value)
//!             └─ fallback panicked → ContractViolated, panic re-raised
//!
//! dropped before resolving (pool torn down) ──► TaskCancelled("dropped") ──► on_cancel()
//! ```
//!
//! ## Rules
//! - Exactly one outcome per submission; when the work is already finished as
//!   the watchdog fires, the finished work wins (inner branch is polled first).
//! - An unbounded deadline registers no timer at all.
//! - Cancelling asks the work to stop through its token and aborts async work at
//!   its next await point. Blocking work cannot be aborted and keeps its pool
//!   slot (and its tracker token) until it returns.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::alive::AliveTracker;
use crate::core::safe_result::Resolver;
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Fallbacks, Outcome, Work};

/// Runner-wide collaborators every submission uses.
#[derive(Clone)]
pub(crate) struct Shared {
    pub bus: Bus,
    pub tracker: TaskTracker,
    pub handle: Handle,
    pub alive: Arc<AliveTracker>,
}

/// Identity and limits of one submission.
pub(crate) struct Submission {
    pub id: u64,
    pub name: Arc<str>,
    pub deadline: Option<Duration>,
    pub token: CancellationToken,
}

/// Registers the work as alive and publishes `TaskStarting` on creation;
/// unregisters it and publishes `WorkExited` on drop, so the exit is recorded
/// whether the work returns, panics or is aborted.
struct WorkGuard {
    bus: Bus,
    alive: Arc<AliveTracker>,
    id: u64,
    name: Arc<str>,
}

impl WorkGuard {
    fn start(shared: &Shared, id: u64, name: Arc<str>) -> Self {
        shared.alive.insert(id, name.clone());
        shared.bus.publish(
            Event::new(EventKind::TaskStarting)
                .with_id(id)
                .with_task(name.clone()),
        );
        Self {
            bus: shared.bus.clone(),
            alive: Arc::clone(&shared.alive),
            id,
            name,
        }
    }
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.alive.remove(self.id);
        self.bus.publish(
            Event::new(EventKind::WorkExited)
                .with_id(self.id)
                .with_task(self.name.clone()),
        );
    }
}

/// Write side of a submission together with its fallbacks.
///
/// Dropped while still pending (the pool was torn down before the supervising
/// unit finished, or before it was ever polled), it resolves through the
/// cancel fallback.
struct Resolution<T> {
    id: u64,
    name: Arc<str>,
    bus: Bus,
    pending: Option<(Fallbacks<T>, Resolver<T>)>,
}

impl<T> Resolution<T> {
    fn finish(&mut self, outcome: Outcome<T>) {
        let Some((fallbacks, resolver)) = self.pending.take() else {
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| fallbacks.resolve(outcome))) {
            Ok(value) => resolver.resolve(value),
            Err(payload) => {
                self.violated(&*payload);
                drop(resolver);
                panic::resume_unwind(payload);
            }
        }
    }

    fn violated(&self, payload: &(dyn std::any::Any + Send)) {
        let info = panic_message(payload);
        tracing::error!(task = %self.name, id = self.id, %info, "fallback panicked");
        self.bus.publish(
            Event::new(EventKind::ContractViolated)
                .with_id(self.id)
                .with_task(self.name.clone())
                .with_reason(info),
        );
    }
}

impl<T> Drop for Resolution<T> {
    fn drop(&mut self) {
        let Some((fallbacks, resolver)) = self.pending.take() else {
            return;
        };
        tracing::debug!(task = %self.name, id = self.id, "supervising unit dropped before resolving");
        self.bus.publish(
            Event::new(EventKind::TaskCancelled)
                .with_id(self.id)
                .with_task(self.name.clone())
                .with_reason(CancelCause::Dropped.as_str()),
        );
        // Never unwind out of drop.
        match panic::catch_unwind(AssertUnwindSafe(|| fallbacks.resolve(Outcome::Cancelled))) {
            Ok(value) => resolver.resolve(value),
            Err(payload) => self.violated(&*payload),
        }
    }
}

/// Builds the supervising unit that drives one submission to its value.
///
/// The resolver is owned by a guard created here, before the returned future
/// is first polled, so dropping the future at any point still resolves.
pub(crate) fn supervise<T>(
    sub: Submission,
    work: Work<T>,
    fallbacks: Fallbacks<T>,
    resolver: Resolver<T>,
    shared: Shared,
) -> impl Future<Output = ()> + Send + 'static
where
    T: Send + Sync + 'static,
{
    let mut resolution = Resolution {
        id: sub.id,
        name: sub.name.clone(),
        bus: shared.bus.clone(),
        pending: Some((fallbacks, resolver)),
    };

    async move {
        let inner = spawn_work(work, &sub, &shared);
        let (outcome, cause) = watch(inner, &sub, &shared.bus).await;
        publish_outcome(&shared.bus, &sub, &outcome, cause);
        resolution.finish(outcome);
    }
}

/// Starts the inner work on the pool, tracked so shutdown waits for it.
fn spawn_work<T>(work: Work<T>, sub: &Submission, shared: &Shared) -> JoinHandle<Result<T, TaskError>>
where
    T: Send + 'static,
{
    let ctx = sub.token.clone();
    let (id, name) = (sub.id, sub.name.clone());
    let guard_ctx = shared.clone();

    match work {
        Work::Async(f) => shared.tracker.spawn_on(
            async move {
                let _guard = WorkGuard::start(&guard_ctx, id, name);
                f(ctx).await
            },
            &shared.handle,
        ),
        Work::Blocking(f) => {
            let slot = shared.tracker.token();
            shared.handle.spawn_blocking(move || {
                let _slot = slot;
                let _guard = WorkGuard::start(&guard_ctx, id, name);
                f(ctx)
            })
        }
    }
}

/// Why a submission ended up cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CancelCause {
    /// Work returned `TaskError::Canceled` or was aborted by the pool.
    Cooperative,
    /// The watchdog fired.
    Deadline,
    /// `SafeResult::cancel` was called.
    External,
    /// The supervising unit was dropped with the pool.
    Dropped,
}

impl CancelCause {
    fn as_str(self) -> &'static str {
        match self {
            CancelCause::Cooperative => "cooperative",
            CancelCause::Deadline => "deadline",
            CancelCause::External => "external",
            CancelCause::Dropped => "dropped",
        }
    }
}

/// Waits for the first of: work finished, deadline elapsed, external cancel.
async fn watch<T>(
    mut inner: JoinHandle<Result<T, TaskError>>,
    sub: &Submission,
    bus: &Bus,
) -> (Outcome<T>, CancelCause) {
    let watchdog = async {
        match sub.deadline {
            Some(d) => time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        joined = &mut inner => (classify(joined), CancelCause::Cooperative),
        _ = watchdog => {
            if let Some(d) = sub.deadline {
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_id(sub.id)
                        .with_task(sub.name.clone())
                        .with_timeout(d),
                );
            }
            sub.token.cancel();
            inner.abort();
            (Outcome::Cancelled, CancelCause::Deadline)
        }
        _ = sub.token.cancelled() => {
            inner.abort();
            (Outcome::Cancelled, CancelCause::External)
        }
    }
}

/// Classifies how the inner work ended.
fn classify<T>(joined: Result<Result<T, TaskError>, JoinError>) -> Outcome<T> {
    match joined {
        Ok(res) => Outcome::from_result(res),
        Err(e) if e.is_panic() => Outcome::Failed(TaskError::from_panic(&*e.into_panic())),
        // Aborted from outside, e.g. the pool is shutting down.
        Err(_) => Outcome::Cancelled,
    }
}

fn publish_outcome<T>(bus: &Bus, sub: &Submission, outcome: &Outcome<T>, cause: CancelCause) {
    let ev = match outcome {
        Outcome::Completed(_) => Event::new(EventKind::TaskCompleted),
        Outcome::Failed(e) => Event::new(EventKind::TaskFailed).with_reason(e.to_string()),
        Outcome::Cancelled => Event::new(EventKind::TaskCancelled).with_reason(cause.as_str()),
    };
    bus.publish(ev.with_id(sub.id).with_task(sub.name.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::safe_result;

    fn shared() -> Shared {
        Shared {
            bus: Bus::new(8),
            tracker: TaskTracker::new(),
            handle: Handle::current(),
            alive: Arc::new(AliveTracker::new()),
        }
    }

    fn unit(id: u64, shared: Shared) -> (impl Future<Output = ()>, crate::SafeResult<i32>) {
        let token = CancellationToken::new();
        let (resolver, result) = safe_result::channel(id, token.clone());
        let sub = Submission {
            id,
            name: Arc::from("w"),
            deadline: None,
            token,
        };
        let work = Work::from_async(|_ctx| async { Ok::<_, TaskError>(1) });
        let fut = supervise(sub, work, Fallbacks::new(|_e| -1, || -2), resolver, shared);
        (fut, result)
    }

    #[tokio::test]
    async fn driven_unit_resolves_with_the_work_value() {
        let (fut, result) = unit(1, shared());
        fut.await;
        assert_eq!(result.try_get(), Some(1));
    }

    #[tokio::test]
    async fn dropped_unit_resolves_through_cancel_fallback() {
        let (fut, result) = unit(2, shared());
        drop(fut);
        assert_eq!(result.try_get(), Some(-2));
        assert_eq!(result.wait().await, -2);
    }

    #[tokio::test]
    async fn work_guard_tracks_alive_work() {
        let shared = shared();
        let guard = WorkGuard::start(&shared, 3, Arc::from("w"));
        assert_eq!(shared.alive.snapshot(), vec!["w#3"]);
        drop(guard);
        assert!(shared.alive.snapshot().is_empty());
    }

    #[tokio::test]
    async fn classify_maps_join_results() {
        let ok = tokio::spawn(async { Ok::<_, TaskError>(5) }).await;
        assert!(matches!(classify(ok), Outcome::Completed(5)));

        let canceled = tokio::spawn(async { Err::<u8, _>(TaskError::Canceled) }).await;
        assert!(matches!(classify(canceled), Outcome::Cancelled));

        let panicked = tokio::spawn(async { panic!("kaboom") }).await;
        match classify::<u8>(panicked) {
            Outcome::Failed(TaskError::Panic { error }) => assert!(error.contains("kaboom")),
            _ => panic!("expected a panic failure"),
        }

        let aborted = tokio::spawn(std::future::pending::<Result<u8, TaskError>>());
        aborted.abort();
        assert!(matches!(classify(aborted.await), Outcome::Cancelled));
    }

    #[tokio::test]
    async fn unbounded_watch_waits_for_the_work() {
        let bus = Bus::new(8);
        let sub = Submission {
            id: 1,
            name: Arc::from("w"),
            deadline: None,
            token: CancellationToken::new(),
        };
        let inner = tokio::spawn(async {
            time::sleep(Duration::from_millis(20)).await;
            Ok::<_, TaskError>("done")
        });
        let (outcome, cause) = watch(inner, &sub, &bus).await;
        assert!(matches!(outcome, Outcome::Completed("done")));
        assert_eq!(cause, CancelCause::Cooperative);
    }
}
