use std::sync::Arc;
use std::sync::mpsc;
use std::thread::ThreadId;
use std::time::Duration;

use parking_lot::Mutex;
use postbus::{
    ClassMeta, Config, ErrorSink, Event, EventBus, EventBusError, EventType, Executor, Job,
    MainLoop, MainThreadSupport, Member, NoSubscriberEvent, ScheduleError, Subscribe,
    Subscriber, SubscriberExceptionEvent, ThreadMode, Visibility, event_type,
};

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Ping;
event_type!(Ping);

struct Notice;
event_type!(Notice);

struct Base {
    id: u32,
}
event_type!(Base);

struct Saved {
    base: Base,
}
event_type!(Saved: Base = base; impl Notice);

#[derive(Debug, PartialEq)]
struct Settings {
    v: u32,
}
event_type!(Settings);

/// Shared log of `(subscriber, detail)` entries.
type Journal = Arc<Mutex<Vec<String>>>;

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

macro_rules! ping_subscriber {
    ($name:ident, $priority:expr) => {
        struct $name(Journal);

        impl Subscriber for $name {
            fn class() -> ClassMeta {
                ClassMeta::builder::<Self>()
                    .subscribe(
                        "on_ping",
                        Subscribe::new().with_priority($priority),
                        |me: &Self, _: &Ping| {
                            me.0.lock().push(stringify!($name).to_owned());
                            Ok(())
                        },
                    )
                    .build()
            }
        }
    };
}

ping_subscriber!(Low, -5);
ping_subscriber!(MidA, 0);
ping_subscriber!(MidB, 0);
ping_subscriber!(High, 10);

#[test]
fn priority_order_with_ties_in_registration_order() {
    let bus = EventBus::new();
    let journal = Journal::default();
    bus.register(&Arc::new(MidA(journal.clone()))).unwrap();
    bus.register(&Arc::new(Low(journal.clone()))).unwrap();
    bus.register(&Arc::new(High(journal.clone()))).unwrap();
    bus.register(&Arc::new(MidB(journal.clone()))).unwrap();

    bus.post(Ping).unwrap();
    assert_eq!(entries(&journal), vec!["High", "MidA", "MidB", "Low"]);
}

#[test]
fn reregistration_leaves_no_duplicates() {
    init_tracing();
    let bus = EventBus::new();
    let journal = Journal::default();
    let sub = Arc::new(MidA(journal.clone()));

    bus.register(&sub).unwrap();
    bus.unregister(&sub);
    bus.register(&sub).unwrap();
    bus.post(Ping).unwrap();
    assert_eq!(entries(&journal), vec!["MidA"]);

    // unknown subscriber: no-op
    bus.unregister(&Arc::new(MidB(journal.clone())));
}

struct Config1(Journal);

impl Subscriber for Config1 {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_settings",
                Subscribe::new().with_sticky(true),
                |me: &Self, ev: &Settings| {
                    me.0.lock().push(format!("v{}", ev.v));
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn sticky_keeps_latest_and_replays_once() {
    let bus = EventBus::new();
    bus.post_sticky(Settings { v: 1 }).unwrap();
    bus.post_sticky(Settings { v: 2 }).unwrap();
    assert_eq!(
        bus.get_sticky_event::<Settings>().as_deref(),
        Some(&Settings { v: 2 })
    );

    let journal = Journal::default();
    bus.register(&Arc::new(Config1(journal.clone()))).unwrap();
    assert_eq!(entries(&journal), vec!["v2"]);

    bus.post_sticky(Settings { v: 3 }).unwrap();
    assert_eq!(entries(&journal), vec!["v2", "v3"]);

    let stored = bus.sticky_event(EventType::of::<Settings>()).unwrap();
    assert!(bus.remove_sticky_event_instance(&stored));
    assert!(bus.get_sticky_event::<Settings>().is_none());

    bus.post_sticky(Settings { v: 4 }).unwrap();
    assert_eq!(bus.remove_sticky_event::<Settings>().map(|s| s.v), Some(4));
    bus.post_sticky(Settings { v: 5 }).unwrap();
    bus.remove_all_sticky_events();
    assert!(bus.get_sticky_event::<Settings>().is_none());
}

struct SyncAndAsync {
    journal: Journal,
    async_done: Mutex<Option<mpsc::Sender<()>>>,
}

impl Subscriber for SyncAndAsync {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping_sync",
                Subscribe::new().with_priority(10),
                |me: &Self, _: &Ping| {
                    me.journal.lock().push("sync".to_owned());
                    Ok(())
                },
            )
            .subscribe(
                "on_ping_async",
                Subscribe::new().with_thread_mode(ThreadMode::Async),
                |me: &Self, _: &Ping| {
                    me.journal.lock().push("async".to_owned());
                    if let Some(tx) = me.async_done.lock().take() {
                        tx.send(()).ok();
                    }
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn sync_runs_inline_async_runs_later_once() {
    let bus = EventBus::new();
    let (tx, rx) = mpsc::channel();
    let sub = Arc::new(SyncAndAsync {
        journal: Journal::default(),
        async_done: Mutex::new(Some(tx)),
    });
    bus.register(&sub).unwrap();

    bus.post(Ping).unwrap();
    assert_eq!(entries(&sub.journal).first().map(String::as_str), Some("sync"));

    rx.recv_timeout(WAIT).expect("async delivery");
    std::thread::sleep(Duration::from_millis(50));
    let journal = entries(&sub.journal);
    assert_eq!(journal.iter().filter(|e| *e == "async").count(), 1);
    assert_eq!(journal.iter().filter(|e| *e == "sync").count(), 1);
}

struct Exploding;

impl Subscriber for Exploding {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping",
                Subscribe::new().with_priority(100),
                |_: &Self, _: &Ping| -> anyhow::Result<()> { panic!("exploded") },
            )
            .build()
    }
}

#[test]
fn failing_subscriber_does_not_stop_lower_priority_ones() {
    init_tracing();
    let bus = EventBus::new();
    let journal = Journal::default();
    bus.register(&Arc::new(Exploding)).unwrap();
    bus.register(&Arc::new(Low(journal.clone()))).unwrap();

    bus.post(Ping).unwrap();
    bus.post(Ping).unwrap();
    assert_eq!(entries(&journal), vec!["Low", "Low"]);
}

struct Hierarchical(Journal);

impl Subscriber for Hierarchical {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe("on_saved", Subscribe::new(), |me: &Self, _: &Saved| {
                me.0.lock().push("saved".to_owned());
                Ok(())
            })
            .subscribe("on_base", Subscribe::new(), |me: &Self, ev: &Base| {
                me.0.lock().push(format!("base {}", ev.id));
                Ok(())
            })
            .subscribe_dyn::<Notice, _>("on_notice", Subscribe::new(), |me: &Self, ev: &dyn Event| {
                me.0.lock().push(format!("notice {}", ev.is::<Saved>()));
                Ok(())
            })
            .build()
    }
}

#[test]
fn inheritance_reaches_supertypes_and_interfaces() {
    let bus = EventBus::new();
    let journal = Journal::default();
    bus.register(&Arc::new(Hierarchical(journal.clone()))).unwrap();

    bus.post(Saved { base: Base { id: 3 } }).unwrap();
    assert_eq!(
        entries(&journal),
        vec!["saved", "base 3", "notice true"]
    );
    assert!(bus.has_subscriber_for_event::<Saved>());
}

#[test]
fn inheritance_disabled_matches_exact_type_only() {
    let cfg = Config {
        event_inheritance: false,
        ..Config::default()
    };
    let bus = EventBus::builder(cfg).build();
    let journal = Journal::default();
    bus.register(&Arc::new(Hierarchical(journal.clone()))).unwrap();

    bus.post(Saved { base: Base { id: 3 } }).unwrap();
    assert_eq!(entries(&journal), vec!["saved"]);
}

struct OnMain {
    threads: Mutex<Vec<ThreadId>>,
    done: mpsc::Sender<()>,
}

impl Subscriber for OnMain {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping",
                Subscribe::new().with_thread_mode(ThreadMode::Main),
                |me: &Self, _: &Ping| {
                    me.threads.lock().push(std::thread::current().id());
                    me.done.send(()).ok();
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn main_mode_queues_from_other_threads_and_runs_inline_on_main() {
    init_tracing();
    let main = Arc::new(MainLoop::spawn("postbus-test-main").unwrap());
    let bus = EventBus::builder(Config::default())
        .with_main_loop(main.clone())
        .build();
    let (tx, rx) = mpsc::channel();
    let sub = Arc::new(OnMain {
        threads: Mutex::new(Vec::new()),
        done: tx,
    });
    bus.register(&sub).unwrap();

    bus.post(Ping).unwrap();
    rx.recv_timeout(WAIT).expect("delivered on main");
    assert_eq!(*sub.threads.lock(), vec![main.thread_id()]);

    // posted from the main context itself: delivered before post returns
    let (inline_tx, inline_rx) = mpsc::channel();
    let main_bus = bus.clone();
    let main_sub = sub.clone();
    main.schedule(Box::new(move || {
        main_bus.post(Ping).ok();
        inline_tx.send(main_sub.threads.lock().len()).ok();
    }))
    .unwrap();
    assert_eq!(inline_rx.recv_timeout(WAIT).unwrap(), 2);
}

struct Ordered {
    log: Mutex<Vec<&'static str>>,
    done: mpsc::Sender<()>,
}

impl Subscriber for Ordered {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping",
                Subscribe::new().with_thread_mode(ThreadMode::MainOrdered),
                |me: &Self, _: &Ping| {
                    me.log.lock().push("handler");
                    me.done.send(()).ok();
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn main_ordered_is_queued_even_on_main() {
    let main = Arc::new(MainLoop::spawn("postbus-test-ordered").unwrap());
    let bus = EventBus::builder(Config::default())
        .with_main_loop(main.clone())
        .build();
    let (tx, rx) = mpsc::channel();
    let sub = Arc::new(Ordered {
        log: Mutex::new(Vec::new()),
        done: tx,
    });
    bus.register(&sub).unwrap();

    let main_bus = bus.clone();
    let main_sub = sub.clone();
    main.schedule(Box::new(move || {
        main_bus.post(Ping).ok();
        main_sub.log.lock().push("after post");
    }))
    .unwrap();
    rx.recv_timeout(WAIT).expect("delivered");
    assert_eq!(*sub.log.lock(), vec!["after post", "handler"]);
}

struct Gatekeeper {
    bus: EventBus,
    journal: Journal,
}

impl Subscriber for Gatekeeper {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping",
                Subscribe::new().with_priority(50),
                |me: &Self, ev: &Ping| {
                    me.journal.lock().push("gatekeeper".to_owned());
                    me.bus.cancel_event_delivery(ev)?;
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn cancel_stops_lower_priority_delivery() {
    let bus = EventBus::new();
    let journal = Journal::default();
    bus.register(&Arc::new(Gatekeeper {
        bus: bus.clone(),
        journal: journal.clone(),
    }))
    .unwrap();
    bus.register(&Arc::new(Low(journal.clone()))).unwrap();

    bus.post(Ping).unwrap();
    assert_eq!(entries(&journal), vec!["gatekeeper"]);

    let err = bus.cancel_event_delivery(&Ping).unwrap_err();
    assert!(matches!(err, EventBusError::CancelRejected { .. }));
}

struct Chain(Journal);

impl Subscriber for Chain {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe("on_settings", Subscribe::new(), |me: &Self, ev: &Settings| {
                me.0.lock().push(format!("start {}", ev.v));
                if ev.v == 1 {
                    EventBus::global().post(Settings { v: 2 })?;
                }
                me.0.lock().push(format!("end {}", ev.v));
                Ok(())
            })
            .build()
    }
}

#[test]
fn nested_post_is_delivered_after_current_event() {
    let bus = EventBus::global();
    let journal = Journal::default();
    let chain = Arc::new(Chain(journal.clone()));
    bus.register(&chain).unwrap();

    bus.post(Settings { v: 1 }).unwrap();
    bus.unregister(&chain);
    assert_eq!(entries(&journal), vec!["start 1", "end 1", "start 2", "end 2"]);
}

/// Collects everything the bus could not return to a caller.
#[derive(Default)]
struct RecordingSink(Mutex<Vec<EventBusError>>);

impl RecordingSink {
    fn labels(&self) -> Vec<&'static str> {
        self.0.lock().iter().map(EventBusError::as_label).collect()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, error: &EventBusError) {
        self.0.lock().push(error.clone());
    }
}

struct Worker {
    bus: EventBus,
    log: Mutex<Vec<(&'static str, ThreadId)>>,
    done: Mutex<Option<mpsc::Sender<()>>>,
}

impl Subscriber for Worker {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping",
                Subscribe::new().with_thread_mode(ThreadMode::Background),
                |me: &Self, _: &Ping| {
                    me.log.lock().push(("ping", std::thread::current().id()));
                    me.bus.post(Notice)?;
                    me.log.lock().push(("after", std::thread::current().id()));
                    if let Some(tx) = me.done.lock().take() {
                        tx.send(()).ok();
                    }
                    Ok(())
                },
            )
            .subscribe(
                "on_notice",
                Subscribe::new().with_thread_mode(ThreadMode::Background),
                |me: &Self, _: &Notice| {
                    me.log.lock().push(("notice", std::thread::current().id()));
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn background_runs_off_thread_and_inline_on_the_worker() {
    let bus = EventBus::new();
    let (tx, rx) = mpsc::channel();
    let worker = Arc::new(Worker {
        bus: bus.clone(),
        log: Mutex::new(Vec::new()),
        done: Mutex::new(Some(tx)),
    });
    bus.register(&worker).unwrap();

    bus.post(Ping).unwrap();
    rx.recv_timeout(WAIT).expect("background delivery");

    let log = worker.log.lock().clone();
    let steps: Vec<_> = log.iter().map(|(step, _)| *step).collect();
    assert_eq!(steps, vec!["ping", "notice", "after"]);
    let worker_thread = log[0].1;
    assert_ne!(worker_thread, std::thread::current().id());
    assert!(log.iter().all(|(_, thread)| *thread == worker_thread));
}

#[test]
fn background_and_async_survive_a_shut_down_ambient_runtime() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let bus = runtime.block_on(async { EventBus::new() });
    drop(runtime);

    let (tx, rx) = mpsc::channel();
    let sub = Arc::new(SyncAndAsync {
        journal: Journal::default(),
        async_done: Mutex::new(Some(tx)),
    });
    bus.register(&sub).unwrap();
    let (worker_tx, worker_rx) = mpsc::channel();
    bus.register(&Arc::new(Worker {
        bus: bus.clone(),
        log: Mutex::new(Vec::new()),
        done: Mutex::new(Some(worker_tx)),
    }))
    .unwrap();

    bus.post(Ping).unwrap();
    rx.recv_timeout(WAIT).expect("async delivery");
    worker_rx.recv_timeout(WAIT).expect("background delivery");
}

/// Holds jobs until the test releases them, then runs them on the calling thread.
#[derive(Default)]
struct GatedExecutor {
    jobs: Mutex<Vec<Job>>,
}

impl GatedExecutor {
    fn release(&self) -> usize {
        let jobs: Vec<Job> = self.jobs.lock().drain(..).collect();
        let count = jobs.len();
        for job in jobs {
            job();
        }
        count
    }
}

impl Executor for GatedExecutor {
    fn execute(&self, job: Job) -> Result<(), ScheduleError> {
        self.jobs.lock().push(job);
        Ok(())
    }
}

struct Deferred(Journal);

impl Subscriber for Deferred {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping_background",
                Subscribe::new().with_thread_mode(ThreadMode::Background),
                |me: &Self, _: &Ping| {
                    me.0.lock().push("background".to_owned());
                    Ok(())
                },
            )
            .subscribe(
                "on_ping_async",
                Subscribe::new().with_thread_mode(ThreadMode::Async),
                |me: &Self, _: &Ping| {
                    me.0.lock().push("async".to_owned());
                    Ok(())
                },
            )
            .subscribe(
                "on_ping_main",
                Subscribe::new().with_thread_mode(ThreadMode::MainOrdered),
                |me: &Self, _: &Ping| {
                    me.0.lock().push("main".to_owned());
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn unregister_skips_queued_deliveries() {
    let cfg = Config {
        background_poll_timeout: Duration::from_millis(10),
        ..Config::default()
    };
    let executor = Arc::new(GatedExecutor::default());
    let main = Arc::new(MainLoop::spawn("postbus-test-unregister").unwrap());
    let bus = EventBus::builder(cfg)
        .with_executor(executor.clone())
        .with_main_loop(main.clone())
        .build();
    let journal = Journal::default();
    let deferred = Arc::new(Deferred(journal.clone()));
    bus.register(&deferred).unwrap();

    // keep the main context busy until the subscriber is gone
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    main.schedule(Box::new(move || {
        gate_rx.recv_timeout(WAIT).ok();
    }))
    .unwrap();

    bus.post(Ping).unwrap();
    bus.unregister(&deferred);
    gate_tx.send(()).unwrap();

    assert_eq!(executor.release(), 2);
    let (done_tx, done_rx) = mpsc::channel();
    main.schedule(Box::new(move || {
        done_tx.send(()).ok();
    }))
    .unwrap();
    done_rx.recv_timeout(WAIT).expect("main drained");
    assert!(entries(&journal).is_empty());
}

struct Watcher {
    failures: Mutex<usize>,
    unmatched: Mutex<usize>,
    explode_on_failure: bool,
}

impl Watcher {
    fn new(explode_on_failure: bool) -> Self {
        Self {
            failures: Mutex::new(0),
            unmatched: Mutex::new(0),
            explode_on_failure,
        }
    }
}

impl Subscriber for Watcher {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_failure",
                Subscribe::new(),
                |me: &Self, _: &SubscriberExceptionEvent| {
                    *me.failures.lock() += 1;
                    if me.explode_on_failure {
                        anyhow::bail!("failure handler failed too");
                    }
                    Ok(())
                },
            )
            .subscribe(
                "on_unmatched",
                Subscribe::new(),
                |me: &Self, _: &NoSubscriberEvent| {
                    *me.unmatched.lock() += 1;
                    Ok(())
                },
            )
            .build()
    }
}

#[test]
fn failure_goes_to_sink_when_exception_events_are_off() {
    let cfg = Config {
        send_subscriber_exception_event: false,
        log_subscriber_exceptions: false,
        ..Config::default()
    };
    let sink = Arc::new(RecordingSink::default());
    let bus = EventBus::builder(cfg).with_error_sink(sink.clone()).build();
    let watcher = Arc::new(Watcher::new(false));
    bus.register(&watcher).unwrap();
    bus.register(&Arc::new(Exploding)).unwrap();

    bus.post(Ping).unwrap();
    assert_eq!(*watcher.failures.lock(), 0);
    assert_eq!(sink.labels(), vec!["delivery_failed"]);
}

#[test]
fn failing_exception_handler_is_reported_once_without_recursion() {
    let cfg = Config {
        log_subscriber_exceptions: false,
        ..Config::default()
    };
    let sink = Arc::new(RecordingSink::default());
    let bus = EventBus::builder(cfg).with_error_sink(sink.clone()).build();
    let watcher = Arc::new(Watcher::new(true));
    bus.register(&watcher).unwrap();
    bus.register(&Arc::new(Exploding)).unwrap();

    bus.post(Ping).unwrap();
    assert_eq!(*watcher.failures.lock(), 1);
    let reported = sink.0.lock().clone();
    assert_eq!(reported.len(), 1);
    assert!(matches!(
        &reported[0],
        EventBusError::Delivery { event_type, .. }
            if *event_type == std::any::type_name::<SubscriberExceptionEvent>()
    ));
}

struct Orphan;
event_type!(Orphan);

#[test]
fn no_subscriber_event_can_be_switched_off() {
    let bus = EventBus::new();
    let watcher = Arc::new(Watcher::new(false));
    bus.register(&watcher).unwrap();
    bus.post(Orphan).unwrap();
    assert_eq!(*watcher.unmatched.lock(), 1);

    let cfg = Config {
        send_no_subscriber_event: false,
        ..Config::default()
    };
    let quiet = EventBus::builder(cfg).build();
    let watcher = Arc::new(Watcher::new(false));
    quiet.register(&watcher).unwrap();
    quiet.post(Orphan).unwrap();
    assert_eq!(*watcher.unmatched.lock(), 0);
}

struct Hidden;

impl Subscriber for Hidden {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .member(
                Member::handler("on_ping", |_: &Hidden, _: &Ping| Ok(()))
                    .marked(Subscribe::new())
                    .with_visibility(Visibility::Private),
            )
            .build()
    }
}

#[test]
fn private_marked_member_is_skipped_or_rejected_in_strict_mode() {
    let lenient = EventBus::new();
    let err = lenient.register(&Arc::new(Hidden)).unwrap_err();
    assert!(matches!(err, EventBusError::NoSubscriberMethods { .. }));

    let cfg = Config {
        strict_method_verification: true,
        ..Config::default()
    };
    let strict = EventBus::builder(cfg).build();
    let err = strict.register(&Arc::new(Hidden)).unwrap_err();
    assert!(matches!(err, EventBusError::InvalidSubscriberMethod { .. }));
}

struct Tagged {
    tag: u64,
    base: Base,
}
event_type!(Tagged: Base = base);

struct BaseGate {
    bus: EventBus,
    journal: Journal,
}

impl Subscriber for BaseGate {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_base",
                Subscribe::new().with_priority(10),
                |me: &Self, ev: &Base| {
                    let outcome = me.bus.cancel_event_delivery(ev);
                    me.journal
                        .lock()
                        .push(format!("gate {} {}", ev.id, outcome.is_ok()));
                    Ok(())
                },
            )
            .build()
    }
}

struct BaseTail(Journal);

impl Subscriber for BaseTail {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe("on_base", Subscribe::new(), |me: &Self, _: &Base| {
                me.0.lock().push("tail".to_owned());
                Ok(())
            })
            .build()
    }
}

#[test]
fn cancel_from_a_superclass_handler() {
    let bus = EventBus::new();
    let journal = Journal::default();
    bus.register(&Arc::new(BaseGate {
        bus: bus.clone(),
        journal: journal.clone(),
    }))
    .unwrap();
    bus.register(&Arc::new(BaseTail(journal.clone()))).unwrap();

    let event = Tagged {
        tag: 1,
        base: Base { id: 7 },
    };
    assert_eq!(event.tag, 1);
    bus.post(event).unwrap();
    assert_eq!(entries(&journal), vec!["gate 7 true"]);
}

/// A main context that went away.
struct ClosedMain;

impl MainThreadSupport for ClosedMain {
    fn is_main_thread(&self) -> bool {
        false
    }

    fn schedule(&self, _job: Job) -> Result<(), ScheduleError> {
        Err(ScheduleError::Closed)
    }
}

struct Relay {
    bus: EventBus,
    journal: Journal,
}

impl Subscriber for Relay {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_ping",
                Subscribe::new().with_priority(10),
                |me: &Self, _: &Ping| {
                    me.journal.lock().push("relay".to_owned());
                    me.bus.post(Notice)?;
                    Ok(())
                },
            )
            .subscribe(
                "on_ping_main",
                Subscribe::new().with_thread_mode(ThreadMode::Main),
                |me: &Self, _: &Ping| {
                    me.journal.lock().push("main".to_owned());
                    Ok(())
                },
            )
            .subscribe("on_notice", Subscribe::new(), |me: &Self, _: &Notice| {
                me.journal.lock().push("notice".to_owned());
                Ok(())
            })
            .build()
    }
}

#[test]
fn scheduler_failure_drops_events_queued_behind_it() {
    let bus = EventBus::builder(Config::default())
        .with_main_thread(Arc::new(ClosedMain))
        .build();
    let journal = Journal::default();
    bus.register(&Arc::new(Relay {
        bus: bus.clone(),
        journal: journal.clone(),
    }))
    .unwrap();

    let err = bus.post(Ping).unwrap_err();
    assert!(matches!(
        err,
        EventBusError::Scheduler {
            context: "main",
            source: ScheduleError::Closed,
        }
    ));
    assert_eq!(entries(&journal), vec!["relay"]);

    bus.post(Orphan).unwrap();
    assert_eq!(entries(&journal), vec!["relay"]);
}
