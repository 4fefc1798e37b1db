use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::animation::save_string::SavedAnimation;
use crate::foundation::config::{CanvasConfig, StepPolicy};
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::signal::Signal;
use crate::scene::graph::{SceneGraph, nearest_index};

const EVENT_QUEUE_DEPTH: usize = 64;

/// Stepping direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Self::Forward
    }

    fn from_forward(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

/// Control-changed notification. Never implies a geometry rebuild by itself.
#[derive(Clone, Debug, PartialEq)]
pub enum AnimationEvent {
    /// The displayed step changed.
    Current(usize),
    Direction(Direction),
    On(bool),
    /// Dwell times changed.
    Dwell,
    /// The sample set was replaced; carries the new step count.
    Samples(usize),
    ComputeSet(bool),
}

#[derive(Debug)]
struct Inner {
    current: usize,
    direction: Direction,
    on: bool,
    dwell_ms: Vec<u64>,
    samples: Vec<f64>,
    compute_set: bool,
    /// Last value given to `set_step`; refills dwell times when the step count changes.
    uniform_dwell: u64,
    subscribers: Vec<SyncSender<AnimationEvent>>,
}

impl Inner {
    fn step_count(&self) -> usize {
        self.samples.len()
    }

    fn clip(&self, index: i64) -> usize {
        let n = self.step_count();
        if n == 0 {
            0
        } else {
            index.clamp(0, n as i64 - 1) as usize
        }
    }

    fn emit(&mut self, ev: AnimationEvent) {
        self.subscribers
            .retain(|tx| !matches!(tx.try_send(ev.clone()), Err(TrySendError::Disconnected(_))));
    }

    /// `dwell[i] = dwells[i]` for `i < len`, else the last entry. All-or-nothing.
    fn fill_dwell(&mut self, dwells: &[i64]) -> CanvasResult<()> {
        let Some(&last) = dwells.last() else {
            return Err(CanvasError::invalid_argument("dwell list is empty"));
        };
        let filled: Vec<i64> = (0..self.dwell_ms.len())
            .map(|i| dwells.get(i).copied().unwrap_or(last))
            .collect();
        if let Some(bad) = filled.iter().find(|&&d| d <= 0) {
            return Err(CanvasError::invalid_argument(format!(
                "dwell times must be > 0, got {bad}"
            )));
        }
        self.dwell_ms = filled.into_iter().map(|d| d as u64).collect();
        Ok(())
    }
}

struct Shared {
    inner: Mutex<Inner>,
    policy: StepPolicy,
    default_dwell: u64,
    suppress: AtomicBool,
    /// Bumped on every sample-set replacement.
    samples_version: AtomicU64,
    step_wake: Signal,
    redraw: Arc<Signal>,
    loop_id: Mutex<Option<u64>>,
    next_loop_id: AtomicU64,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Animation step state machine with its autonomous stepping loop.
///
/// Cheap to clone; clones share state. `current` always lies in `[0, step_count)`, or is 0
/// without steps. Every displayed-state change requests a redraw through the signal shared
/// with the frame cache.
#[derive(Clone)]
pub struct AnimationState {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AnimationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationState")
            .field("inner", &*self.shared.inner.lock())
            .field("policy", &self.shared.policy)
            .finish()
    }
}

/// Pauses auto-stepping while alive.
pub(crate) struct SuppressGuard<'a>(&'a AtomicBool);

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AnimationState {
    /// No steps, forward, stopped.
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    current: 0,
                    direction: Direction::Forward,
                    on: false,
                    dwell_ms: vec![config.default_dwell_ms],
                    samples: Vec::new(),
                    compute_set: false,
                    uniform_dwell: config.default_dwell_ms,
                    subscribers: Vec::new(),
                }),
                policy: config.step_policy,
                default_dwell: config.default_dwell_ms,
                suppress: AtomicBool::new(false),
                samples_version: AtomicU64::new(0),
                step_wake: Signal::new(),
                redraw: Arc::new(Signal::new()),
                loop_id: Mutex::new(None),
                next_loop_id: AtomicU64::new(1),
                handle: Mutex::new(None),
            }),
        }
    }

    pub fn step_count(&self) -> usize {
        self.shared.inner.lock().step_count()
    }

    pub fn current(&self) -> usize {
        self.shared.inner.lock().current
    }

    pub fn direction(&self) -> Direction {
        self.shared.inner.lock().direction
    }

    pub fn is_on(&self) -> bool {
        self.shared.inner.lock().on
    }

    pub fn compute_set(&self) -> bool {
        self.shared.inner.lock().compute_set
    }

    pub fn policy(&self) -> StepPolicy {
        self.shared.policy
    }

    /// Dwell time per step; one entry when there are no steps.
    pub fn dwell_ms(&self) -> Vec<u64> {
        self.shared.inner.lock().dwell_ms.clone()
    }

    /// Dwell time of `index`, or the default when out of range.
    pub fn dwell_at(&self, index: usize) -> Duration {
        let inner = self.shared.inner.lock();
        Duration::from_millis(
            inner
                .dwell_ms
                .get(index)
                .copied()
                .unwrap_or(self.shared.default_dwell),
        )
    }

    pub fn samples(&self) -> Vec<f64> {
        self.shared.inner.lock().samples.clone()
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.shared.inner.lock().samples.get(index).copied()
    }

    /// Receive control changes from now on. Events past a small undrained backlog are dropped.
    pub fn subscribe(&self) -> Receiver<AnimationEvent> {
        let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
        self.shared.inner.lock().subscribers.push(tx);
        rx
    }

    /// Clip `index` into range and display it.
    pub fn set_current(&self, index: usize) {
        let mut inner = self.shared.inner.lock();
        let i64_index = i64::try_from(index).unwrap_or(i64::MAX);
        inner.current = inner.clip(i64_index);
        let cur = inner.current;
        inner.emit(AnimationEvent::Current(cur));
        drop(inner);
        self.shared.redraw.notify();
    }

    /// Display the step whose sample is nearest to `value`; ties go to the earlier sample.
    pub fn set_current_value(&self, value: f64) -> CanvasResult<()> {
        if !value.is_finite() {
            return Err(CanvasError::invalid_argument(format!(
                "animation value must be finite, got {value}"
            )));
        }
        let index = {
            let inner = self.shared.inner.lock();
            nearest_index(&inner.samples, value).unwrap_or(0)
        };
        self.set_current(index);
        Ok(())
    }

    pub fn set_direction(&self, direction: Direction) {
        let mut inner = self.shared.inner.lock();
        inner.direction = direction;
        inner.emit(AnimationEvent::Direction(direction));
    }

    pub fn set_on(&self, on: bool) {
        let mut inner = self.shared.inner.lock();
        inner.on = on;
        inner.emit(AnimationEvent::On(on));
        drop(inner);
        self.shared.step_wake.notify();
    }

    pub fn toggle(&self) {
        let mut inner = self.shared.inner.lock();
        inner.on = !inner.on;
        let on = inner.on;
        inner.emit(AnimationEvent::On(on));
        drop(inner);
        self.shared.step_wake.notify();
    }

    pub fn set_compute_set(&self, compute: bool) {
        let mut inner = self.shared.inner.lock();
        inner.compute_set = compute;
        inner.emit(AnimationEvent::ComputeSet(compute));
    }

    /// Set every dwell time to `dwell_ms`. Later step-count changes refill with this value.
    pub fn set_step(&self, dwell_ms: i64) -> CanvasResult<()> {
        let mut inner = self.shared.inner.lock();
        inner.fill_dwell(&[dwell_ms])?;
        inner.uniform_dwell = dwell_ms as u64;
        inner.emit(AnimationEvent::Dwell);
        drop(inner);
        self.shared.step_wake.notify();
        Ok(())
    }

    /// Set dwell times from `dwells`, repeating its last entry; rejects any value <= 0 and
    /// leaves the state unchanged in that case.
    pub fn set_steps(&self, dwells: &[i64]) -> CanvasResult<()> {
        let mut inner = self.shared.inner.lock();
        inner.fill_dwell(dwells)?;
        inner.emit(AnimationEvent::Dwell);
        drop(inner);
        self.shared.step_wake.notify();
        Ok(())
    }

    /// Advance one step in the current direction, clamping or wrapping at the ends.
    pub fn take_step(&self) {
        let mut inner = self.shared.inner.lock();
        let n = inner.step_count();
        let cur = inner.current;
        inner.current = match (n, self.shared.policy) {
            (0, _) => 0,
            (_, StepPolicy::Clamp) => {
                let delta = if inner.direction.is_forward() { 1 } else { -1 };
                inner.clip(cur as i64 + delta)
            }
            (_, StepPolicy::Wrap) => {
                if inner.direction.is_forward() {
                    (cur + 1) % n
                } else {
                    (cur + n - 1) % n
                }
            }
        };
        let cur = inner.current;
        inner.emit(AnimationEvent::Current(cur));
        drop(inner);
        self.shared.redraw.notify();
    }

    /// Replace the sample set. A length change refills dwell times with the last
    /// [`AnimationState::set_step`] value (the default if none) and re-clips `current`.
    pub fn set_samples(&self, samples: Vec<f64>) -> CanvasResult<()> {
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(CanvasError::invalid_argument("animation samples must be finite"));
        }
        if samples.windows(2).any(|w| w[1] < w[0]) {
            return Err(CanvasError::invalid_argument(
                "animation samples must be non-decreasing",
            ));
        }
        let mut inner = self.shared.inner.lock();
        let n = samples.len();
        if n != inner.samples.len() {
            inner.dwell_ms = vec![inner.uniform_dwell; n.max(1)];
        }
        inner.samples = samples;
        let cur = inner.current as i64;
        inner.current = inner.clip(cur);
        inner.emit(AnimationEvent::Samples(n));
        self.shared.samples_version.fetch_add(1, Ordering::AcqRel);
        drop(inner);
        tracing::debug!(steps = n, "animation samples replaced");
        self.shared.redraw.notify();
        Ok(())
    }

    /// Copy direction, running state, compute flag and dwell times from `other`.
    /// The current step is never copied.
    pub fn sync_from(&self, other: &AnimationState) {
        let (direction, on, compute_set, dwells) = {
            let o = other.shared.inner.lock();
            let dwells: Vec<i64> = o.dwell_ms.iter().map(|&d| d as i64).collect();
            (o.direction, o.on, o.compute_set, dwells)
        };
        let mut inner = self.shared.inner.lock();
        inner.direction = direction;
        inner.on = on;
        inner.compute_set = compute_set;
        // Source dwell times are all positive, so this cannot fail.
        let _ = inner.fill_dwell(&dwells);
        inner.emit(AnimationEvent::Direction(direction));
        inner.emit(AnimationEvent::On(on));
        inner.emit(AnimationEvent::Dwell);
        drop(inner);
        self.shared.step_wake.notify();
    }

    /// `on direction current step_count dwell.. compute_set`.
    pub fn save_string(&self) -> String {
        let inner = self.shared.inner.lock();
        SavedAnimation {
            on: inner.on,
            forward: inner.direction.is_forward(),
            current: inner.current as i64,
            dwell_ms: inner.dwell_ms.iter().map(|&d| d as i64).collect(),
            compute_set: Some(inner.compute_set),
        }
        .format()
    }

    /// Restore state from [`AnimationState::save_string`] output. Malformed input leaves the
    /// state unchanged.
    pub fn apply_save_string(&self, s: &str) -> CanvasResult<()> {
        let saved = SavedAnimation::parse(s)?;
        let mut inner = self.shared.inner.lock();
        inner.fill_dwell(&saved.dwell_ms)?;
        inner.on = saved.on;
        inner.direction = Direction::from_forward(saved.forward);
        inner.current = inner.clip(saved.current);
        if let Some(c) = saved.compute_set {
            inner.compute_set = c;
        }
        let (on, dir, cur, cs) = (inner.on, inner.direction, inner.current, inner.compute_set);
        inner.emit(AnimationEvent::On(on));
        inner.emit(AnimationEvent::Direction(dir));
        inner.emit(AnimationEvent::Dwell);
        inner.emit(AnimationEvent::Current(cur));
        inner.emit(AnimationEvent::ComputeSet(cs));
        drop(inner);
        self.shared.step_wake.notify();
        self.shared.redraw.notify();
        Ok(())
    }

    /// Point every animation switch in `graph` at the child for `step`.
    pub fn select_switches(&self, graph: &mut SceneGraph, step: usize) {
        let value = self.value_at(step);
        graph.select_animation_step(step, value);
    }

    /// Wake the stepping loop early.
    pub fn wake(&self) {
        self.shared.step_wake.notify();
    }

    pub fn is_running(&self) -> bool {
        self.shared.loop_id.lock().is_some()
    }

    /// Spawn the stepping loop. A no-op when already running.
    pub fn start(&self) -> CanvasResult<()> {
        let mut id_slot = self.shared.loop_id.lock();
        if id_slot.is_some() {
            return Ok(());
        }
        let id = self.shared.next_loop_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("scenecanvas-step".to_owned())
            .spawn(move || step_loop(shared, id))
            .map_err(|e| CanvasError::Other(anyhow::anyhow!("spawn step loop: {e}")))?;
        *id_slot = Some(id);
        *self.shared.handle.lock() = Some(handle);
        Ok(())
    }

    /// Clear the loop identity, wake the loop and wait for it to exit.
    pub fn stop(&self) {
        let was_running = self.shared.loop_id.lock().take().is_some();
        self.shared.step_wake.notify();
        let handle = self.shared.handle.lock().take();
        if let Some(h) = handle
            && h.thread().id() != std::thread::current().id()
        {
            let _ = h.join();
        }
        if was_running {
            tracing::debug!("animation loop stopped");
        }
    }

    pub(crate) fn suppress(&self) -> SuppressGuard<'_> {
        self.shared.suppress.store(true, Ordering::Release);
        SuppressGuard(&self.shared.suppress)
    }

    pub(crate) fn samples_version(&self) -> u64 {
        self.shared.samples_version.load(Ordering::Acquire)
    }

    pub(crate) fn redraw_signal(&self) -> Arc<Signal> {
        Arc::clone(&self.shared.redraw)
    }
}

fn step_loop(shared: Arc<Shared>, id: u64) {
    tracing::debug!(loop_id = id, "animation loop started");
    let state = AnimationState { shared };
    loop {
        if *state.shared.loop_id.lock() != Some(id) {
            break;
        }
        if state.is_on() && !state.shared.suppress.load(Ordering::Acquire) {
            state.take_step();
        }
        let wait = state.dwell_at(state.current());
        state.shared.step_wake.wait_timeout(wait);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/state.rs"]
mod tests;
