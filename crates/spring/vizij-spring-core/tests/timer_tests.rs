use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use futures::executor::block_on;
use vizij_spring_core::{RunState, Spring, SpringConfig, SpringValue, TimerScheduler};

#[test]
fn default_scheduler_runs_to_rest() {
    let spring = Spring::new(0.0);
    spring.set_target(1.0);
    assert_eq!(spring.state().get(), RunState::Running);
    assert_eq!(block_on(spring.idle()), Ok(()));
    assert_eq!(spring.get(), SpringValue::Scalar(1.0));
}

#[test]
fn timer_pause_resume_round_trip() {
    let timer = TimerScheduler::new(120);
    let spring = Spring::with_scheduler(
        [0.0, 0.0, 0.0],
        SpringConfig::default(),
        Arc::new(timer.clone()),
    );
    spring.set_target([1.0, 2.0, 3.0]);
    assert_eq!(block_on(spring.pause()), Ok(()));
    assert_eq!(spring.state().get(), RunState::Paused);

    let frozen = spring.get();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(spring.get(), frozen);
    assert_eq!(timer.pending(), 0);

    assert_eq!(block_on(spring.resume()), Ok(()));
    assert_eq!(block_on(spring.idle()), Ok(()));
    assert_eq!(spring.get(), SpringValue::Vector(vec![1.0, 2.0, 3.0]));
}

#[test]
fn skip_completes_after_publication_on_a_busy_drain() {
    let timer = TimerScheduler::new(120);
    let spring = Spring::with_scheduler(0.0, SpringConfig::default(), Arc::new(timer));

    // The first moving frame blocks its publication on the timer thread.
    let (started_tx, started_rx) = mpsc::channel();
    let started_tx = Mutex::new(Some(started_tx));
    let blocked = AtomicBool::new(false);
    let _unsub = spring.subscribe(move |v| {
        if *v != SpringValue::Scalar(0.0) && !blocked.swap(true, Ordering::SeqCst) {
            if let Some(tx) = started_tx.lock().unwrap().take() {
                tx.send(()).unwrap();
            }
            std::thread::sleep(Duration::from_millis(300));
        }
    });

    spring.set_target(1000.0);
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert_eq!(block_on(spring.skip()), Ok(()));
    assert_eq!(spring.get(), SpringValue::Scalar(1000.0));
    assert_eq!(spring.state().get(), RunState::Idle);
    assert_eq!(block_on(spring.idle()), Ok(()));
    assert_eq!(spring.speed().get(), 0.0);
}

#[test]
fn idle_waits_for_a_busy_drain() {
    let timer = TimerScheduler::new(120);
    let spring = Spring::with_scheduler(0.0, SpringConfig::default(), Arc::new(timer));

    // Block inside the final `idle` publication, after the core itself is
    // already idle.
    let (started_tx, started_rx) = mpsc::channel();
    let started_tx = Mutex::new(Some(started_tx));
    let ran = AtomicBool::new(false);
    let delivered = Arc::new(AtomicBool::new(false));
    let done = Arc::clone(&delivered);
    let _unsub = spring.state().subscribe(move |state| match state {
        RunState::Running => ran.store(true, Ordering::SeqCst),
        RunState::Idle if ran.load(Ordering::SeqCst) => {
            if let Some(tx) = started_tx.lock().unwrap().take() {
                tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(300));
                done.store(true, Ordering::SeqCst);
            }
        }
        _ => {}
    });
    spring.set_target(1.0);
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert_eq!(block_on(spring.idle()), Ok(()));
    assert!(delivered.load(Ordering::SeqCst));
    assert_eq!(spring.get(), SpringValue::Scalar(1.0));
}
