//=========================================================================
// Runtime Integration Tests
//=========================================================================
//
// End-to-end scenarios driven through the public API only: an engine
// built with `EngineBuilder`, objects registered in its injector, and
// frames advanced with `Engine::tick`.
//
//=========================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use aetheric_runtime::prelude::*;

const FRAME: Duration = Duration::from_millis(16);

type CallLog = Rc<RefCell<Vec<String>>>;

fn no_overrides() -> toml::Table {
    toml::Table::new()
}

//=== Fixtures ============================================================

struct ScoreChanged(Signal<u32>);

impl ScoreChanged {
    fn dispatch(&self, score: u32) {
        self.0.dispatch(score);
    }
}

impl SignalType for ScoreChanged {
    fn create(queue: &SignalQueue) -> Self {
        Self(Signal::new(queue))
    }

    fn destroy(&mut self) {
        self.0.remove_all();
    }
}

/// Subscribes to `ScoreChanged` in `setup()`.
struct Scoreboard {
    signal: Shared<ScoreChanged>,
    received: Rc<RefCell<Vec<u32>>>,
}

impl Manager for Scoreboard {
    fn setup(&mut self) -> Result<(), BoxError> {
        let received = self.received.clone();
        self.signal
            .borrow()
            .0
            .add(listener(move |score: &u32| received.borrow_mut().push(*score)))?;
        Ok(())
    }
}

struct Named {
    name: &'static str,
    log: CallLog,
}

impl Manager for Named {
    fn setup(&mut self) -> Result<(), BoxError> {
        self.log.borrow_mut().push(format!("{}.setup", self.name));
        Ok(())
    }

    fn update(&mut self, _frame: &FrameContext) -> PhaseResult {
        self.log.borrow_mut().push(format!("{}.update", self.name));
        Ok(())
    }
}

fn register_named(engine: &mut Engine, log: &CallLog, names: &[&'static str]) {
    for &name in names {
        let log = log.clone();
        engine
            .injector_mut()
            .register_manager(name, move |_: &Injector| -> Result<Named, BoxError> {
                Ok(Named { name, log: log.clone() })
            })
            .unwrap();
    }
}

fn updates(log: &CallLog) -> Vec<String> {
    log.borrow().iter().filter(|e| e.ends_with(".update")).cloned().collect()
}

//=========================================================================
// End-to-End Signal Delivery
//=========================================================================

#[test]
fn score_changed_is_delivered_on_the_next_tick() {
    let received = Rc::new(RefCell::new(Vec::new()));
    let captured = received.clone();

    let mut engine = EngineBuilder::new()
        .build()
        .init(|injector| {
            injector.register_signal::<ScoreChanged>("score_changed")?;
            injector.register_manager(
                "scoreboard",
                move |inj: &Injector| -> Result<Scoreboard, BoxError> {
                    Ok(Scoreboard {
                        signal: inj.resolve::<ScoreChanged>("score_changed")?,
                        received: captured.clone(),
                    })
                },
            )
        })
        .unwrap();

    engine.start(&no_overrides()).unwrap();

    let signal = engine.injector().resolve::<ScoreChanged>("score_changed").unwrap();
    signal.borrow().dispatch(10);
    assert!(received.borrow().is_empty(), "Dispatch must not deliver synchronously");

    engine.tick(FRAME).unwrap();
    assert_eq!(*received.borrow(), vec![10]);

    engine.tick(FRAME).unwrap();
    assert_eq!(*received.borrow(), vec![10], "Delivered exactly once");
}

#[test]
fn chained_signals_advance_one_hop_per_tick() {
    let mut engine = EngineBuilder::new()
        .build()
        .init(|injector| {
            injector.register_signal::<Signal<u8>>("first")?;
            injector.register_signal::<Signal<u8>>("second")
        })
        .unwrap();
    engine.start(&no_overrides()).unwrap();

    let first = engine.injector().resolve::<Signal<u8>>("first").unwrap().borrow().clone();
    let second = engine.injector().resolve::<Signal<u8>>("second").unwrap().borrow().clone();

    let relay = second.clone();
    first.add(listener(move |v: &u8| relay.dispatch(*v + 1))).unwrap();
    let seen = Rc::new(Cell::new(0u8));
    let sink = seen.clone();
    second.add(listener(move |v: &u8| sink.set(*v))).unwrap();

    first.dispatch(1);
    engine.tick(FRAME).unwrap();
    assert_eq!(seen.get(), 0, "Relayed emission waits for the next flush");

    engine.tick(FRAME).unwrap();
    assert_eq!(seen.get(), 2);
}

#[test]
fn once_listener_fires_on_first_flush_only() {
    let mut engine = EngineBuilder::new()
        .build()
        .init(|injector| injector.register_signal::<Signal<()>>("ping"))
        .unwrap();
    engine.start(&no_overrides()).unwrap();
    let ping = engine.injector().resolve::<Signal<()>>("ping").unwrap();

    let calls = Rc::new(Cell::new(0));
    let counted = calls.clone();
    ping.borrow().once(listener(move |_: &()| counted.set(counted.get() + 1))).unwrap();

    for _ in 0..2 {
        ping.borrow().dispatch(());
        engine.tick(FRAME).unwrap();
    }

    assert_eq!(calls.get(), 1);
}

//=========================================================================
// Scheduling Order
//=========================================================================

#[test]
fn managers_update_in_registration_order() {
    let log = CallLog::default();
    let mut engine = EngineBuilder::new().build();
    register_named(&mut engine, &log, &["m1", "m2", "m3"]);

    engine.start(&no_overrides()).unwrap();
    engine.tick(FRAME).unwrap();

    assert_eq!(updates(&log), vec!["m1.update", "m2.update", "m3.update"]);
}

#[test]
fn disabled_manager_is_skipped_and_re_enabled_without_reconstruction() {
    let log = CallLog::default();
    let mut engine = EngineBuilder::new().build();
    register_named(&mut engine, &log, &["m1", "m2", "m3"]);
    engine.start(&no_overrides()).unwrap();

    let m2 = engine.injector().manager("m2").unwrap();
    let before = engine.injector().resolve::<Named>("m2").unwrap();

    m2.set_enabled(false).unwrap();
    log.borrow_mut().clear();
    engine.tick(FRAME).unwrap();
    assert_eq!(updates(&log), vec!["m1.update", "m3.update"]);

    log.borrow_mut().clear();
    m2.set_enabled(true).unwrap();
    assert_eq!(*log.borrow(), vec!["m2.setup"]);

    engine.tick(FRAME).unwrap();
    assert_eq!(updates(&log), vec!["m1.update", "m2.update", "m3.update"]);

    let after = engine.injector().resolve::<Named>("m2").unwrap();
    assert!(Rc::ptr_eq(&before, &after));
}

//=========================================================================
// Injector Behavior Through the Engine
//=========================================================================

#[test]
fn duplicate_id_across_kinds_is_rejected() {
    struct Audio;
    impl Service for Audio {}

    let log = CallLog::default();
    let mut engine = EngineBuilder::new().build();
    register_named(&mut engine, &log, &["x"]);

    let err = engine.injector_mut().register_service("x", |_| Ok(Audio)).unwrap_err();

    assert!(matches!(err, InjectorError::Registration { .. }));
}

#[test]
fn reserved_signals_id_is_taken() {
    let mut engine = EngineBuilder::new().build();

    let err = engine
        .injector_mut()
        .register_instance(SignalsManager::ID, 0u8)
        .unwrap_err();

    assert!(matches!(err, InjectorError::Registration { .. }));
}

#[test]
fn cycle_fails_start_and_unrelated_ids_still_resolve() {
    let mut engine = EngineBuilder::new()
        .build()
        .init(|injector| {
            injector.register_factory(
                "A",
                |inj: &Injector| -> Result<u8, BoxError> {
                    inj.resolve::<u8>("B")?;
                    Ok(1)
                },
                false,
            )?;
            injector.register_factory(
                "B",
                |inj: &Injector| -> Result<u8, BoxError> {
                    inj.resolve::<u8>("A")?;
                    Ok(2)
                },
                false,
            )?;
            injector.register_instance("C", 3u8)
        })
        .unwrap();

    let err = engine.start(&no_overrides()).unwrap_err();

    assert!(matches!(err, EngineError::Injector(InjectorError::CyclicReference { .. })));
    assert!(engine.injector().resolving().is_empty());
    assert_eq!(*engine.injector().resolve::<u8>("C").unwrap().borrow(), 3);
}

#[test]
fn stateless_provider_yields_fresh_values() {
    let calls = Rc::new(Cell::new(0u32));
    let counted = calls.clone();
    let mut engine = EngineBuilder::new()
        .build()
        .init(|injector| {
            injector.register_provider(
                "nonce",
                move || -> Result<u32, BoxError> {
                    counted.set(counted.get() + 1);
                    Ok(counted.get())
                },
                true,
            )
        })
        .unwrap();

    engine.start(&no_overrides()).unwrap();
    let built_calls = calls.get();

    let a = engine.injector().resolve::<u32>("nonce").unwrap();
    let b = engine.injector().resolve::<u32>("nonce").unwrap();

    assert_eq!(calls.get(), built_calls + 2);
    assert_ne!(*a.borrow(), *b.borrow());
}

//=========================================================================
// Lifecycle Policies
//=========================================================================

#[test]
fn restart_after_destroy_is_ignored() {
    let log = CallLog::default();
    let mut engine = EngineBuilder::new().build();
    register_named(&mut engine, &log, &["m1"]);

    engine.start(&no_overrides()).unwrap();
    engine.destroy();
    log.borrow_mut().clear();

    engine.start(&no_overrides()).unwrap();
    engine.tick(FRAME).unwrap();

    assert_eq!(engine.state(), EngineState::Destroyed);
    assert!(log.borrow().is_empty());
}

struct Faulty {
    log: CallLog,
}

impl Manager for Faulty {
    fn update(&mut self, _frame: &FrameContext) -> PhaseResult {
        self.log.borrow_mut().push("faulty.update".to_string());
        Err("boom".into())
    }
}

fn engine_with_faulty(policy: FaultPolicy, log: &CallLog) -> Engine {
    let mut engine = EngineBuilder::new().with_fault_policy(policy).build();
    register_named(&mut engine, log, &["m1"]);
    let faulty_log = log.clone();
    engine
        .injector_mut()
        .register_manager("faulty", move |_: &Injector| -> Result<Faulty, BoxError> {
            Ok(Faulty { log: faulty_log.clone() })
        })
        .unwrap();
    register_named(&mut engine, log, &["m3"]);
    engine.start(&no_overrides()).unwrap();
    engine
}

#[test]
fn abort_policy_stops_the_tick_and_self_heals() {
    let log = CallLog::default();
    let mut engine = engine_with_faulty(FaultPolicy::Abort, &log);

    assert!(engine.tick(FRAME).is_err());
    assert_eq!(updates(&log), vec!["m1.update", "faulty.update"]);
    assert!(engine.is_running());

    log.borrow_mut().clear();
    assert!(engine.tick(FRAME).is_err());
    assert_eq!(updates(&log), vec!["m1.update", "faulty.update"]);
}

#[test]
fn isolate_policy_runs_remaining_managers() {
    let log = CallLog::default();
    let mut engine = engine_with_faulty(FaultPolicy::Isolate, &log);

    engine.tick(FRAME).unwrap();

    assert_eq!(updates(&log), vec!["m1.update", "faulty.update", "m3.update"]);
}

#[test]
fn fault_policy_can_come_from_overrides() {
    let log = CallLog::default();
    let mut engine = EngineBuilder::new().build();
    register_named(&mut engine, &log, &["m1"]);
    let overrides: toml::Table = toml::from_str("fault_policy = \"isolate\"").unwrap();

    engine.start(&overrides).unwrap();

    assert_eq!(engine.config().fault_policy, FaultPolicy::Isolate);
}
