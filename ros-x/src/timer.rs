//! Wall timers.
//!
//! Timers are client-side entities: the middleware has no timer surface, so
//! scheduling state lives entirely here. An external scheduler polls
//! [`is_ready`](TimerImpl::is_ready) and invokes [`call`](TimerImpl::call).

use std::sync::Arc;
use std::time::{Duration, SystemTime, SystemTimeError};

use parking_lot::Mutex;
use tracing::debug;

use crate::Builder;
use crate::callback_group::CallbackGroup;
use crate::entity::{Entity, EntityKind};
use crate::node::XNode;

pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

struct TimerState {
    last_call_time: SystemTime,
    next_call_time: SystemTime,
    canceled: bool,
}

pub struct TimerImpl {
    id: usize,
    period: Duration,
    callback: TimerCallback,
    state: Mutex<TimerState>,
}

impl TimerImpl {
    pub(crate) fn new(id: usize, period: Duration, callback: TimerCallback) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            period,
            callback,
            state: Mutex::new(TimerState {
                last_call_time: now,
                next_call_time: now + period,
                canceled: false,
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_ready(&self) -> bool {
        let state = self.state.lock();
        !state.canceled && state.next_call_time <= SystemTime::now()
    }

    pub fn time_until_next_call(&self) -> Result<Duration, SystemTimeError> {
        self.state.lock().next_call_time.duration_since(SystemTime::now())
    }

    /// Fire the timer: advance the schedule and invoke the callback.
    ///
    /// If the timer has fallen more than one period behind, the next call
    /// time skips ahead past `now` instead of replaying missed ticks.
    /// Canceled timers are a no-op.
    pub fn call(&self) {
        let callback = {
            let mut state = self.state.lock();
            if state.canceled {
                return;
            }
            let now = SystemTime::now();
            state.last_call_time = now;
            if self.period.is_zero() {
                state.next_call_time = now;
            } else {
                state.next_call_time += self.period;
                if let Ok(ahead) = now.duration_since(state.next_call_time) {
                    state.next_call_time += self.period
                        * (1 + (ahead.as_nanos() as f64 / self.period.as_nanos() as f64) as u32);
                }
            }
            self.callback.clone()
        };
        // Invoked outside the lock.
        callback();
    }

    pub fn cancel(&self) {
        self.state.lock().canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.state.lock().canceled
    }

    /// Restart the schedule from now and clear any cancellation.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let now = SystemTime::now();
        state.last_call_time = now;
        state.next_call_time = now + self.period;
        state.canceled = false;
    }
}

/// Owner-side handle to a wall timer.
pub struct XTimer {
    pub(crate) inner: Arc<TimerImpl>,
}

impl std::fmt::Debug for XTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XTimer").finish_non_exhaustive()
    }
}

impl XTimer {
    pub fn id(&self) -> usize {
        self.inner.id()
    }

    pub fn period(&self) -> Duration {
        self.inner.period()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    pub fn time_until_next_call(&self) -> Result<Duration, SystemTimeError> {
        self.inner.time_until_next_call()
    }

    pub fn call(&self) {
        self.inner.call()
    }

    pub fn cancel(&self) {
        self.inner.cancel()
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.is_canceled()
    }

    pub fn reset(&self) {
        self.inner.reset()
    }

    pub fn as_entity(&self) -> Entity {
        Entity::Timer(self.inner.clone())
    }
}

pub struct XTimerBuilder<'a> {
    pub(crate) node: &'a XNode,
    pub(crate) id: usize,
    pub(crate) period: Duration,
    pub(crate) callback: TimerCallback,
    pub(crate) group: Option<Arc<CallbackGroup>>,
}

impl<'a> XTimerBuilder<'a> {
    /// Register the timer with `group` instead of the node's default
    /// callback group. The group must have been created by the same node.
    pub fn with_group(mut self, group: &Arc<CallbackGroup>) -> Self {
        self.group = Some(group.clone());
        self
    }
}

impl<'a> Builder for XTimerBuilder<'a> {
    type Output = XTimer;

    fn build(self) -> crate::Result<Self::Output> {
        // Fail fast on a foreign group: nothing is created, no counter moves.
        let group = self.node.target_group(self.group.as_ref(), EntityKind::Timer)?;
        let inner = Arc::new(TimerImpl::new(self.id, self.period, self.callback));
        group.add_entity(Entity::Timer(inner.clone()));
        self.node.counters().bump_timers();
        debug!(
            "[TMR] ready: period={:?} group={}",
            inner.period(),
            group.id()
        );
        Ok(XTimer { inner })
    }
}
