//! Spring engine: run-state machine, frame loop and publication.
//!
//! All mutable state lives in `Core` behind one mutex. Operations (a new
//! target, pause, resume, skip, a frame arriving) mutate the core and queue
//! effects: cell publications, gate completions and scheduler calls. The
//! effects are applied outside the lock by whichever caller finds the queue
//! idle, strictly in the order they were queued. Observers therefore see run
//! states in transition order even when a subscriber re-enters the spring from
//! inside its callback. Wait completions travel through the same queue, so a
//! resolved wait never runs ahead of the publications before it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::SpringConfig;
use crate::error::SpringError;
use crate::gate::{Gate, Wait};
use crate::physics::{self, PhysicsState};
use crate::scheduler::{default_scheduler, FrameHandle, FrameScheduler};
use crate::state::RunState;
use crate::store::{Readable, Unsubscribe, Writable};
use crate::value::{SpringValue, ValueShape};
use crate::vecmath;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameSlot {
    Empty,
    /// Request queued as an effect, handle not known yet.
    Requesting(u64),
    Pending(u64, FrameHandle),
}

enum Effect {
    State(RunState),
    Motion {
        current: SpringValue,
        velocity: SpringValue,
        speed: f64,
    },
    RequestFrame(u64),
    CancelFrame(FrameHandle),
    Open(Gate, Result<(), SpringError>),
}

struct Core {
    config: SpringConfig,
    shape: ValueShape,
    target: Vec<f64>,
    physics: PhysicsState,
    previous: PhysicsState,
    interpolated: PhysicsState,
    state: RunState,
    last_timestamp: Option<f64>,
    frame: FrameSlot,
    next_ticket: u64,
    pause_gate: Option<Gate>,
    idle_gate: Option<Gate>,
    effects: VecDeque<Effect>,
    draining: bool,
}

impl Core {
    fn new(config: SpringConfig, shape: ValueShape, value: Vec<f64>) -> Self {
        let physics = PhysicsState::at_rest(value.clone());
        Self {
            config,
            shape,
            target: value,
            previous: physics.clone(),
            interpolated: physics.clone(),
            physics,
            state: RunState::Idle,
            last_timestamp: None,
            frame: FrameSlot::Empty,
            next_ticket: 0,
            pause_gate: None,
            idle_gate: None,
            effects: VecDeque::new(),
            draining: false,
        }
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("spring state {} -> {}", self.state, next);
        self.state = next;
        self.effects.push_back(Effect::State(next));
    }

    fn want_frame(&mut self) {
        if self.frame == FrameSlot::Empty {
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            self.frame = FrameSlot::Requesting(ticket);
            self.effects.push_back(Effect::RequestFrame(ticket));
        }
    }

    fn drop_frame(&mut self) {
        if let FrameSlot::Pending(_, handle) = self.frame {
            self.effects.push_back(Effect::CancelFrame(handle));
        }
        // A request still in flight sees the slot change and cancels itself.
        self.frame = FrameSlot::Empty;
    }

    fn publish_motion(&mut self) {
        let current = self.shape.from_buffer(&self.interpolated.value);
        let velocity = self.shape.from_buffer(&self.interpolated.velocity);
        let speed = vecmath::norm(&self.interpolated.velocity);
        self.effects.push_back(Effect::Motion {
            current,
            velocity,
            speed,
        });
    }

    fn settle(&mut self) {
        self.transition(RunState::Idle);
        self.last_timestamp = None;
        if let Some(gate) = self.idle_gate.take() {
            self.effects.push_back(Effect::Open(gate, Ok(())));
        }
    }

    fn enter_paused(&mut self) {
        self.transition(RunState::Paused);
        self.last_timestamp = None;
        if let Some(gate) = self.pause_gate.take() {
            self.effects.push_back(Effect::Open(gate, Ok(())));
        }
    }

    fn retarget(&mut self, value: &SpringValue) {
        self.shape.write_buffer(value, &mut self.target);
        log::debug!("spring target latched while {}", self.state);
        if self.state == RunState::Idle {
            self.transition(RunState::Running);
            self.last_timestamp = None;
            self.want_frame();
        }
    }

    fn pause(&mut self) -> Wait {
        if self.state.can_pause() {
            self.transition(RunState::Pausing);
            let gate = Gate::new();
            let wait = gate.wait();
            self.pause_gate = Some(gate);
            wait
        } else if let Some(gate) = &self.pause_gate {
            gate.wait()
        } else {
            self.after_publications()
        }
    }

    fn resume(&mut self) -> Wait {
        if self.state.can_resume() {
            self.transition(RunState::Running);
            self.last_timestamp = None;
            self.want_frame();
        }
        self.after_publications()
    }

    fn skip(&mut self) -> Wait {
        if self.state.can_skip() {
            self.transition(RunState::Skipping);
            self.drop_frame();
            if let Some(gate) = self.pause_gate.take() {
                self.effects.push_back(Effect::Open(gate, Err(SpringError::Skipped)));
            }
            self.physics.snap_to(&self.target);
            self.previous.copy_from(&self.physics);
            self.interpolated.copy_from(&self.physics);
            self.publish_motion();
            self.settle();
        }
        self.idle()
    }

    fn idle(&mut self) -> Wait {
        if self.state == RunState::Idle {
            self.after_publications()
        } else {
            self.idle_gate.get_or_insert_with(Gate::new).wait()
        }
    }

    /// Wait that completes once every publication queued so far has been
    /// delivered. Ready at once when nothing is queued or being delivered;
    /// otherwise another thread may still be draining, so it completes
    /// behind the queue.
    fn after_publications(&mut self) -> Wait {
        if self.effects.is_empty() && !self.draining {
            return Wait::ready(Ok(()));
        }
        let gate = Gate::new();
        let wait = gate.wait();
        self.effects.push_back(Effect::Open(gate, Ok(())));
        wait
    }

    fn on_frame(&mut self, ticket: u64, result: Result<f64, SpringError>) {
        match self.frame {
            FrameSlot::Requesting(t) | FrameSlot::Pending(t, _) if t == ticket => {
                self.frame = FrameSlot::Empty;
            }
            _ => return,
        }

        match result {
            Ok(timestamp) => match self.state {
                RunState::Running => self.advance(timestamp),
                RunState::Pausing => self.enter_paused(),
                _ => {}
            },
            Err(e) if e.is_interruption() => {
                log::warn!("spring frame wait interrupted: {e}");
                match self.state {
                    RunState::Pausing => self.enter_paused(),
                    RunState::Running => self.want_frame(),
                    _ => {}
                }
            }
            Err(e) => {
                log::error!("spring run aborted ({}): {e}", e.category());
                if let Some(gate) = self.pause_gate.take() {
                    self.effects.push_back(Effect::Open(gate, Err(e)));
                }
                self.settle();
            }
        }
    }

    fn advance(&mut self, timestamp: f64) {
        let interval = match self.last_timestamp {
            Some(previous) => timestamp - previous,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);

        let frame = physics::advance(
            &mut self.physics,
            &mut self.previous,
            &mut self.interpolated,
            &self.target,
            &self.config,
            interval,
        );
        log::trace!(
            "spring frame: interval={:.5}s substeps={} ratio={:.3}",
            frame.interval,
            frame.substeps,
            frame.ratio
        );

        if physics::is_settled(&self.physics, &self.target, self.config.precision) {
            self.physics.snap_to(&self.target);
            self.interpolated.copy_from(&self.physics);
            self.publish_motion();
            self.settle();
        } else {
            self.publish_motion();
            self.want_frame();
        }
    }
}

struct Inner {
    core: Mutex<Core>,
    scheduler: Arc<dyn FrameScheduler>,
    self_ref: Weak<Inner>,
    target: Writable<SpringValue>,
    current: Writable<SpringValue>,
    velocity: Writable<SpringValue>,
    speed: Writable<f64>,
    state: Writable<RunState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the core, then apply whatever effects it queued.
    fn with_core<R>(&self, f: impl FnOnce(&mut Core) -> R) -> R {
        let out = f(&mut self.lock());
        self.drain();
        out
    }

    fn drain(&self) {
        {
            let mut core = self.lock();
            if core.draining {
                return;
            }
            core.draining = true;
        }
        loop {
            let effect = {
                let mut core = self.lock();
                match core.effects.pop_front() {
                    Some(effect) => effect,
                    None => {
                        core.draining = false;
                        return;
                    }
                }
            };
            self.apply(effect);
        }
    }

    fn apply(&self, effect: Effect) {
        match effect {
            Effect::State(state) => self.state.set(state),
            Effect::Motion {
                current,
                velocity,
                speed,
            } => {
                self.current.set(current);
                self.velocity.set(velocity);
                self.speed.set(speed);
            }
            Effect::RequestFrame(ticket) => self.request_frame(ticket),
            Effect::CancelFrame(handle) => self.scheduler.cancel(handle),
            Effect::Open(gate, outcome) => gate.open(outcome),
        }
    }

    fn request_frame(&self, ticket: u64) {
        let weak = self.self_ref.clone();
        let handle = self.scheduler.request(Box::new(move |result| {
            if let Some(inner) = weak.upgrade() {
                inner.with_core(|core| core.on_frame(ticket, result));
            }
        }));

        let stale = {
            let mut core = self.lock();
            if core.frame == FrameSlot::Requesting(ticket) {
                core.frame = FrameSlot::Pending(ticket, handle);
                false
            } else {
                true
            }
        };
        if stale {
            self.scheduler.cancel(handle);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let FrameSlot::Pending(_, handle) = core.frame {
            self.scheduler.cancel(handle);
        }
    }
}

/// A value that follows its target with damped-spring motion.
///
/// `Spring` is a cheap handle; clones drive the same simulation. Setting the
/// [`target`](Self::target) starts the frame loop if it is idle. While running,
/// every frame publishes the interpolated value, velocity and speed, and the
/// loop stops by itself once displacement and velocity are both within
/// `precision` of rest, snapping exactly onto the target.
///
/// Targets must have the shape of the initial value (same vector length, same
/// record fields). This is not checked.
///
/// ```no_run
/// use vizij_spring_core::{Spring, SpringValue};
///
/// let spring = Spring::new(0.0);
/// let _unsub = spring.subscribe(|v| println!("{v:?}"));
/// spring.set_target(1.0);
/// futures::executor::block_on(spring.idle()).unwrap();
/// assert_eq!(spring.get(), SpringValue::Scalar(1.0));
/// ```
#[derive(Clone)]
pub struct Spring {
    inner: Arc<Inner>,
}

impl fmt::Debug for Spring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("Spring")
            .field("state", &core.state)
            .field("shape", &core.shape)
            .field("config", &core.config)
            .finish()
    }
}

impl Spring {
    /// Spring at rest at `initial`, default config and scheduler.
    pub fn new(initial: impl Into<SpringValue>) -> Self {
        Self::with_config(initial, SpringConfig::default())
    }

    pub fn with_config(initial: impl Into<SpringValue>, config: SpringConfig) -> Self {
        Self::with_scheduler(initial, config, default_scheduler())
    }

    pub fn with_scheduler(
        initial: impl Into<SpringValue>,
        config: SpringConfig,
        scheduler: Arc<dyn FrameScheduler>,
    ) -> Self {
        let initial = initial.into();
        let shape = ValueShape::of(&initial);
        let buffer = shape.to_buffer(&initial);
        let rest = shape.from_buffer(&vec![0.0; shape.len()]);

        let inner = Arc::new_cyclic(|weak| Inner {
            core: Mutex::new(Core::new(config, shape, buffer)),
            scheduler,
            self_ref: weak.clone(),
            target: Writable::new(initial.clone()),
            current: Writable::new(initial),
            velocity: Writable::new(rest),
            speed: Writable::new(0.0),
            state: Writable::new(RunState::Idle),
        });

        // The subscription lives as long as the target cell; it only holds a
        // weak reference back. The first call delivers the initial value.
        let weak = Arc::downgrade(&inner);
        let first = AtomicBool::new(true);
        let _target_subscription = inner.target.subscribe(move |value| {
            if first.swap(false, Ordering::SeqCst) {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                inner.with_core(|core| core.retarget(value));
            }
        });

        Self { inner }
    }

    /// Writable target. Setting it starts (or redirects) the motion.
    pub fn target(&self) -> &Writable<SpringValue> {
        &self.inner.target
    }

    pub fn set_target(&self, value: impl Into<SpringValue>) {
        self.inner.target.set(value.into());
    }

    /// Current (interpolated) value.
    pub fn get(&self) -> SpringValue {
        self.inner.current.get()
    }

    /// Observe the current value; `f` runs immediately and on every frame.
    pub fn subscribe(&self, f: impl Fn(&SpringValue) + Send + Sync + 'static) -> Unsubscribe {
        self.inner.current.subscribe(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.current.subscriber_count()
    }

    pub fn current(&self) -> Readable<SpringValue> {
        self.inner.current.readable()
    }

    pub fn velocity(&self) -> Readable<SpringValue> {
        self.inner.velocity.readable()
    }

    /// Euclidean norm of the velocity.
    pub fn speed(&self) -> Readable<f64> {
        self.inner.speed.readable()
    }

    pub fn state(&self) -> Readable<RunState> {
        self.inner.state.readable()
    }

    pub fn shape(&self) -> ValueShape {
        self.inner.lock().shape.clone()
    }

    /// Request a pause. Completes once the loop has actually paused, or at
    /// once when there is nothing to pause. A skip racing the pause wins and
    /// the wait fails with [`SpringError::Skipped`].
    pub fn pause(&self) -> Wait {
        self.inner.with_core(Core::pause)
    }

    /// Continue a paused loop. No-op unless paused.
    pub fn resume(&self) -> Wait {
        self.inner.with_core(Core::resume)
    }

    /// Jump straight to the target and stop. Completes when idle.
    pub fn skip(&self) -> Wait {
        self.inner.with_core(Core::skip)
    }

    /// Completes when the spring is (or next becomes) idle.
    pub fn idle(&self) -> Wait {
        self.inner.with_core(Core::idle)
    }

    pub fn config(&self) -> SpringConfig {
        self.inner.lock().config
    }

    /// Replace the whole config; returns it.
    pub fn set_config(&self, config: SpringConfig) -> SpringConfig {
        self.inner.lock().config = config;
        config
    }

    pub fn stiffness(&self) -> f64 {
        self.inner.lock().config.stiffness
    }

    pub fn set_stiffness(&self, stiffness: f64) -> f64 {
        self.inner.lock().config.stiffness = stiffness;
        stiffness
    }

    pub fn damping(&self) -> f64 {
        self.inner.lock().config.damping
    }

    pub fn set_damping(&self, damping: f64) -> f64 {
        self.inner.lock().config.damping = damping;
        damping
    }

    pub fn precision(&self) -> f64 {
        self.inner.lock().config.precision
    }

    pub fn set_precision(&self, precision: f64) -> f64 {
        self.inner.lock().config.precision = precision;
        precision
    }

    pub fn step_size(&self) -> f64 {
        self.inner.lock().config.step_size
    }

    pub fn set_step_size(&self, step_size: f64) -> f64 {
        self.inner.lock().config.step_size = step_size;
        step_size
    }

    pub fn max_frame_interval(&self) -> f64 {
        self.inner.lock().config.max_frame_interval
    }

    pub fn set_max_frame_interval(&self, max_frame_interval: f64) -> f64 {
        self.inner.lock().config.max_frame_interval = max_frame_interval;
        max_frame_interval
    }
}
