//! # TaskRunner: submits tasks, guards deadlines, drains on shutdown.
//!
//! The [`TaskRunner`] owns (or borrows) the worker pool, the event bus and the
//! submission tracker. Each submission becomes one supervising unit on the
//! pool; see `core::supervise`.
//!
//! ## High-level architecture
//! ```text
//! run(task) / timeout(task, d)
//!   ├─ hold a tracker token, then check closed (shutdown cannot slip between)
//!   ├─ closed? ──► TaskRejected, resolve via on_cancel (try_* → RuntimeError::Closed)
//!   ├─ publish TaskSubmitted
//!   ├─ SafeResult channel (Resolver ⇄ SafeResult)
//!   └─ tracker.spawn_on(supervise(...))  ──► returns SafeResult immediately
//!
//! Event flow:
//!   supervise / WorkGuard ── publish(Event) ──► Bus ──► event_listener ──► SubscriberSet::emit
//!   WorkGuard ── insert / remove ──► AliveTracker   (direct, never lossy)
//!
//! Shutdown path (quit_all / shutdown):
//!   tracker.close()  → ShutdownRequested (new submissions rejected)
//!   tracker.wait()   → every supervising unit and every inner work has exited
//!      ├─ grace = 0s      → wait without bound → AllStoppedWithin
//!      └─ grace > 0s      → Ok → AllStoppedWithin
//!                           timeout → GraceExceeded(stuck = AliveTracker.snapshot())
//! ```
//!
//! ## Example
//! ```rust
//! use safetask::{RunnerConfig, Task, TaskError, TaskRunner};
//!
//! let runner = TaskRunner::new(RunnerConfig::default()).unwrap();
//!
//! let result = runner.run(Task::new(
//!     |_ctx| async { Err::<String, _>(TaskError::fail("DivideByZero", "/ by zero")) },
//!     |e| format!("FAIL:{}", e.kind()),
//!     || "N/A".to_string(),
//! ));
//! assert_eq!(result.get(), "FAIL:DivideByZero");
//!
//! runner.quit_all().unwrap();
//! assert!(runner.try_run(Task::new(
//!     |_ctx| async { Ok::<_, TaskError>(1) },
//!     |_e| 0,
//!     || 0,
//! )).is_err());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tokio::sync::broadcast::error::RecvError;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::RunnerConfig;
use crate::core::alive::AliveTracker;
use crate::core::builder::RunnerBuilder;
use crate::core::safe_result::{self, SafeResult};
use crate::core::supervise::{Shared, Submission, supervise};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::tasks::{Outcome, Task};

/// Runs [`Task`]s on a worker pool and hands back [`SafeResult`]s.
pub struct TaskRunner {
    cfg: RunnerConfig,
    /// Present when the runner built its own pool.
    runtime: Option<Runtime>,
    shared: Shared,
    next_id: AtomicU64,
    /// Stops the event listener when the runner is dropped.
    listener_stop: CancellationToken,
}

impl TaskRunner {
    /// Creates a runner with its own worker pool and no subscribers.
    pub fn new(cfg: RunnerConfig) -> Result<Self, RuntimeError> {
        Self::builder(cfg).build()
    }

    /// Returns a builder for subscribers or a lent runtime.
    pub fn builder(cfg: RunnerConfig) -> RunnerBuilder {
        RunnerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: RunnerConfig,
        runtime: Option<Runtime>,
        handle: Handle,
        bus: Bus,
        subs: SubscriberSet,
    ) -> Self {
        let listener_stop = CancellationToken::new();
        if !subs.is_empty() {
            spawn_event_listener(&handle, &bus, subs, listener_stop.clone());
        }

        Self {
            cfg,
            runtime,
            shared: Shared {
                bus,
                tracker: TaskTracker::new(),
                handle,
                alive: Arc::new(AliveTracker::new()),
            },
            next_id: AtomicU64::new(1),
            listener_stop,
        }
    }

    /// Submits a task without a deadline. Returns immediately.
    ///
    /// After shutdown the task is not executed; it resolves through its cancel
    /// fallback (see [`try_run`](Self::try_run) for an error instead).
    pub fn run<T>(&self, task: Task<T>) -> SafeResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.submit(task, None)
            .unwrap_or_else(|task| self.reject(task))
    }

    /// Submits a task that is cancelled if it has not finished after `deadline`.
    /// Returns immediately.
    pub fn timeout<T>(&self, task: Task<T>, deadline: Duration) -> SafeResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.submit(task, Some(deadline))
            .unwrap_or_else(|task| self.reject(task))
    }

    /// Like [`run`](Self::run), but fails with [`RuntimeError::Closed`] after shutdown.
    pub fn try_run<T>(&self, task: Task<T>) -> Result<SafeResult<T>, RuntimeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.submit(task, None).map_err(|_task| RuntimeError::Closed)
    }

    /// Like [`timeout`](Self::timeout), but fails with [`RuntimeError::Closed`] after shutdown.
    pub fn try_timeout<T>(
        &self,
        task: Task<T>,
        deadline: Duration,
    ) -> Result<SafeResult<T>, RuntimeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.submit(task, Some(deadline))
            .map_err(|_task| RuntimeError::Closed)
    }

    /// Stops accepting submissions and blocks until all in-flight work has drained.
    ///
    /// Must be called from outside an async context; inside one, use
    /// [`shutdown`](Self::shutdown).
    pub fn quit_all(&self) -> Result<(), RuntimeError> {
        self.shared.handle.block_on(self.shutdown())
    }

    /// Async form of [`quit_all`](Self::quit_all).
    ///
    /// With a positive [`RunnerConfig::grace`] the wait is bounded and
    /// [`RuntimeError::GraceExceeded`] names the work still executing. That work
    /// is not stopped; calling again keeps waiting for it.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let Shared { bus, tracker, alive, .. } = &self.shared;
        if tracker.close() {
            tracing::info!(in_flight = tracker.len(), "shutdown requested");
            bus.publish(Event::new(EventKind::ShutdownRequested));
        }

        let drained = tracker.wait();
        match self.cfg.grace_limit() {
            None => drained.await,
            Some(grace) => {
                if time::timeout(grace, drained).await.is_err() {
                    bus.publish(Event::new(EventKind::GraceExceeded));
                    let stuck = alive.snapshot();
                    tracing::warn!(?grace, ?stuck, "shutdown grace exceeded");
                    return Err(RuntimeError::GraceExceeded { grace, stuck });
                }
            }
        }

        bus.publish(Event::new(EventKind::AllStoppedWithin));
        Ok(())
    }

    /// True once shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.shared.tracker.is_closed()
    }

    /// Returns `name#id` labels of work currently executing.
    ///
    /// Uncooperative blocking work stays listed after its submission resolved,
    /// until it actually returns.
    pub fn running(&self) -> Vec<String> {
        self.shared.alive.snapshot()
    }

    /// Handle of the worker pool, for spawning collaborators on it.
    pub fn handle(&self) -> &Handle {
        &self.shared.handle
    }

    /// Runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    fn submit<T>(&self, task: Task<T>, deadline: Option<Duration>) -> Result<SafeResult<T>, Task<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        // Taken before the closed check: a concurrent shutdown either sees this
        // submission in flight or makes the check below fail.
        let admission = self.shared.tracker.token();
        if self.shared.tracker.is_closed() {
            return Err(task);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (name, work, fallbacks) = task.into_parts();
        let name: Arc<str> = Arc::from(&*name);
        let token = CancellationToken::new();
        let (resolver, result) = safe_result::channel(id, token.clone());

        let mut ev = Event::new(EventKind::TaskSubmitted)
            .with_id(id)
            .with_task(name.clone());
        if let Some(d) = deadline {
            ev = ev.with_timeout(d);
        }
        self.shared.bus.publish(ev);

        let sub = Submission {
            id,
            name,
            deadline,
            token,
        };
        self.shared.tracker.spawn_on(
            supervise(sub, work, fallbacks, resolver, self.shared.clone()),
            &self.shared.handle,
        );
        drop(admission);
        Ok(result)
    }

    /// Resolves a post-shutdown submission through its cancel fallback.
    fn reject<T>(&self, task: Task<T>) -> SafeResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (name, _work, fallbacks) = task.into_parts();
        tracing::warn!(task = %name, id, "submission after shutdown; resolving via cancel fallback");
        self.shared.bus.publish(
            Event::new(EventKind::TaskRejected)
                .with_id(id)
                .with_task(&*name),
        );
        SafeResult::ready(id, fallbacks.resolve(Outcome::Cancelled))
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.listener_stop.cancel();
        if let Some(rt) = self.runtime.take() {
            rt.shutdown_background();
        }
    }
}

/// Forwards bus events to the subscribers.
///
/// Runs until `stop` is cancelled; dropping `subs` then closes the subscriber queues.
fn spawn_event_listener(handle: &Handle, bus: &Bus, subs: SubscriberSet, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    handle.spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Instant;

    use async_trait::async_trait;

    use crate::error::TaskError;
    use crate::subscribers::Subscribe;
    use crate::tasks::TaskFactory;

    fn runner() -> TaskRunner {
        TaskRunner::new(RunnerConfig::default()).unwrap()
    }

    fn sleepy(factory: &TaskFactory<String>, ms: u64) -> Task<String> {
        factory.new_task(move |_ctx| async move {
            time::sleep(Duration::from_millis(ms)).await;
            Ok("X".to_string())
        })
    }

    fn factory() -> TaskFactory<String> {
        TaskFactory::new(|e: TaskError| format!("FAIL:{}", e.kind()), || "TIMEOUT".to_string())
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(EventKind, Option<u64>)>>);

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.0.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push((ev.kind, ev.id));
        }
    }

    #[test]
    fn deadline_decides_between_value_and_cancel_fallback() {
        let runner = runner();
        let f = factory();

        let late = runner.timeout(sleepy(&f, 50), Duration::from_millis(10));
        let early = runner.timeout(sleepy(&f, 50), Duration::from_millis(500));
        let failed = runner.run(f.new_task(|_ctx| async {
            Err(TaskError::fail("DivideByZero", "/ by zero"))
        }));

        assert_eq!(late.get(), "TIMEOUT");
        assert_eq!(early.get(), "X");
        assert_eq!(failed.get(), "FAIL:DivideByZero");
        runner.quit_all().unwrap();
    }

    #[test]
    fn work_finishing_shortly_before_deadline_keeps_its_value() {
        let runner = runner();
        let r = runner.timeout(sleepy(&factory(), 40), Duration::from_millis(80));
        assert_eq!(r.get(), "X");
        runner.quit_all().unwrap();
    }

    #[test]
    fn deadline_boundary_resolves_each_submission_once() {
        let rec = Arc::new(Recorder::default());
        let runner = TaskRunner::builder(RunnerConfig::default())
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();

        let f = factory();
        let results: Vec<_> = (0..40)
            .map(|_| runner.timeout(sleepy(&f, 10), Duration::from_millis(10)))
            .collect();

        for r in &results {
            let first = r.get();
            assert!(first == "X" || first == "TIMEOUT", "unexpected {first}");
            assert_eq!(r.get(), first);
        }
        runner.quit_all().unwrap();
        thread::sleep(Duration::from_millis(100));

        let mut resolutions: HashMap<u64, usize> = HashMap::new();
        for (kind, id) in rec.0.lock().unwrap().iter() {
            if matches!(
                kind,
                EventKind::TaskCompleted | EventKind::TaskFailed | EventKind::TaskCancelled
            ) {
                *resolutions.entry(id.unwrap()).or_default() += 1;
            }
        }
        for r in &results {
            assert_eq!(resolutions.get(&r.id()), Some(&1), "submission #{}", r.id());
        }
    }

    #[test]
    fn result_reads_are_idempotent() {
        let runner = runner();
        let r = runner.run(sleepy(&factory(), 5));
        let clone = r.clone();

        assert_eq!(r.get(), "X");
        assert_eq!(r.get(), "X");
        assert_eq!(clone.try_get().as_deref(), Some("X"));
        assert!(clone.is_resolved());
        runner.quit_all().unwrap();
    }

    #[test]
    fn panicking_work_goes_through_failure_fallback() {
        let runner = runner();
        let r = runner.run(factory().new_task(|_ctx| async { panic!("boom") }));
        assert_eq!(r.get(), "FAIL:Panic");

        let r = runner.run(factory().new_blocking_task(|_ctx| panic!("boom")));
        assert_eq!(r.get(), "FAIL:Panic");
        runner.quit_all().unwrap();
    }

    #[test]
    fn uncooperative_async_work_is_aborted_at_deadline() {
        let runner = runner();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let r = runner.timeout(
            factory().new_task(move |_ctx| async move {
                time::sleep(Duration::from_secs(10)).await;
                flag.store(true, Ordering::SeqCst);
                Ok("X".to_string())
            }),
            Duration::from_millis(20),
        );
        assert_eq!(r.get(), "TIMEOUT");

        let started = Instant::now();
        runner.quit_all().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!finished.load(Ordering::SeqCst));
        assert!(runner.running().is_empty());
    }

    #[test]
    fn quit_all_drains_in_flight_async_work() {
        let runner = runner();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let r = runner.run(factory().new_task(move |_ctx| async move {
            time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            Ok("X".to_string())
        }));

        runner.quit_all().unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert!(r.is_resolved());
        assert_eq!(r.get(), "X");
    }

    #[test]
    fn blocking_work_observes_token_and_shutdown_waits_for_it() {
        let runner = runner();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);

        let r = runner.timeout(
            factory().new_blocking_task(move |ctx| {
                while !ctx.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                thread::sleep(Duration::from_millis(30));
                flag.store(true, Ordering::SeqCst);
                Err(TaskError::Canceled)
            }),
            Duration::from_millis(20),
        );

        assert_eq!(r.get(), "TIMEOUT");
        runner.quit_all().unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn submissions_after_shutdown_are_rejected() {
        let runner = runner();
        runner.quit_all().unwrap();
        assert!(runner.is_closed());

        let r = runner.run(sleepy(&factory(), 1));
        assert!(r.is_resolved());
        assert_eq!(r.get(), "TIMEOUT");

        let err = runner
            .try_timeout(sleepy(&factory(), 1), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Closed));

        // Idempotent.
        runner.quit_all().unwrap();
    }

    #[test]
    fn submissions_racing_shutdown_never_outlive_it() {
        for _ in 0..50 {
            let runner = Arc::new(runner());
            let ran_late = Arc::new(AtomicBool::new(false));
            let done = Arc::new(AtomicBool::new(false));

            let submitter = {
                let (runner, ran_late, done) =
                    (Arc::clone(&runner), Arc::clone(&ran_late), Arc::clone(&done));
                thread::spawn(move || {
                    runner.run(factory().new_blocking_task(move |_ctx| {
                        if done.load(Ordering::SeqCst) {
                            ran_late.store(true, Ordering::SeqCst);
                        }
                        Ok("X".to_string())
                    }))
                })
            };

            runner.quit_all().unwrap();
            done.store(true, Ordering::SeqCst);

            let r = submitter.join().unwrap();
            let value = r.get();
            assert!(value == "X" || value == "TIMEOUT");
            thread::sleep(Duration::from_millis(5));
            assert!(!ran_late.load(Ordering::SeqCst));
        }
    }

    #[test]
    fn grace_exceeded_names_stuck_work() {
        let cfg = RunnerConfig {
            grace: Duration::from_millis(100),
            ..RunnerConfig::default()
        };
        let runner = TaskRunner::new(cfg).unwrap();
        let r = runner.run(
            factory()
                .with_name("stuck")
                .new_blocking_task(|_ctx| {
                    thread::sleep(Duration::from_millis(500));
                    Ok("late".to_string())
                }),
        );
        thread::sleep(Duration::from_millis(50));

        match runner.quit_all() {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec![format!("stuck#{}", r.id())]);
            }
            other => panic!("expected grace exceeded, got {other:?}"),
        }

        assert_eq!(r.get(), "late");
        runner.quit_all().unwrap();
        assert!(runner.running().is_empty());
    }

    #[test]
    fn dropping_the_runner_resolves_in_flight_work_via_cancel_fallback() {
        let runner = runner();
        let r = runner.run(sleepy(&factory(), 100));
        drop(runner);
        assert_eq!(r.get(), "TIMEOUT");
    }

    #[test]
    #[should_panic(expected = "a fallback of its task panicked")]
    fn panicking_fallback_breaks_the_result() {
        let runner = runner();
        let r = runner.run(Task::new(
            |_ctx| async { Err::<u32, _>(TaskError::fail("Io", "eof")) },
            |_e| panic!("fallback exploded"),
            || 0,
        ));
        r.get();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn external_cancel_resolves_through_cancel_fallback() {
        let runner = TaskRunner::builder(RunnerConfig::default())
            .with_handle(Handle::current())
            .build()
            .unwrap();

        let r = runner.run(factory().new_task(|_ctx| async {
            std::future::pending::<()>().await;
            Ok("ignored".to_string())
        }));
        time::sleep(Duration::from_millis(10)).await;
        r.cancel();

        assert_eq!(r.wait().await, "TIMEOUT");
        runner.shutdown().await.unwrap();
        assert!(runner.running().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_events_reach_subscribers() {
        let rec = Arc::new(Recorder::default());
        let runner = TaskRunner::builder(RunnerConfig::default())
            .with_handle(Handle::current())
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();

        let r = runner.timeout(sleepy(&factory(), 200), Duration::from_millis(10));
        assert_eq!(r.wait().await, "TIMEOUT");
        runner.shutdown().await.unwrap();
        time::sleep(Duration::from_millis(50)).await;

        let kinds = rec.kinds();
        for kind in [
            EventKind::TaskSubmitted,
            EventKind::TaskStarting,
            EventKind::TimeoutHit,
            EventKind::TaskCancelled,
            EventKind::WorkExited,
            EventKind::ShutdownRequested,
            EventKind::AllStoppedWithin,
        ] {
            assert!(kinds.contains(&kind), "missing {kind:?} in {kinds:?}");
        }
    }
}
