//! The authoritative frame clock and the availability machinery driven by it.
//!
//! The engine ticks [`TimeManager::update_time`] once per animation frame;
//! everything time-dependent (trajectory evaluation, material phases,
//! availability gating) reads the manager's current time instead of owning a
//! timer.

pub mod availability;
pub mod interval;

pub use self::availability::AvailabilityIndex;
pub use self::interval::TimeInterval;

use serde_json::json;

use crate::event::{EventHub, EventType, Lifecycle, Managed};
use crate::utils::time::Timestamp;

/// Clock states.
///
/// ```text
///          play()              pause()
///  Stopped ───────► Playing ────────► Paused
///     ▲               │                  │
///     │  stop()       │ stop()           │ play()
///     └───────────────┴──────────────────┘
/// ```
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// Owns the authoritative frame clock with play/pause/stop/seek plus the
/// availability index for time-windowed features.
pub struct TimeManager {
    events: EventHub,
    lifecycle: Lifecycle,

    state: PlayState,
    current: Timestamp,
    range: Option<TimeInterval>,
    multiplier: f64,
    loop_enabled: bool,

    // Wall-clock instant of the previous tick while playing.
    last_tick: Option<Timestamp>,
    availability: AvailabilityIndex,
}

impl Default for TimeManager {
    fn default() -> Self {
        TimeManager {
            events: EventHub::new(),
            lifecycle: Lifecycle::new(),
            state: PlayState::Stopped,
            current: Timestamp::default(),
            range: None,
            multiplier: 1.0,
            loop_enabled: false,
            last_tick: None,
            availability: AvailabilityIndex::new(),
        }
    }
}

impl Managed for TimeManager {
    fn event_hub(&mut self) -> &mut EventHub {
        &mut self.events
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

impl TimeManager {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn state(&self) -> PlayState {
        self.state
    }

    #[inline]
    pub fn current_time(&self) -> Timestamp {
        self.current
    }

    #[inline]
    pub fn time_range(&self) -> Option<TimeInterval> {
        self.range
    }

    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Sets the play rate. Negative values rewind; zero freezes the clock
    /// without leaving the Playing state.
    pub fn set_multiplier(&mut self, multiplier: f64) {
        if multiplier.is_finite() {
            self.multiplier = multiplier;
        }
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// Bounds the clock. The current time is clamped into the new range.
    pub fn set_time_range(&mut self, range: TimeInterval) {
        self.range = Some(range);
        let clamped = range.clamp(self.current);
        if clamped != self.current {
            self.set_current_time(clamped);
        }
    }

    pub fn clear_time_range(&mut self) {
        self.range = None;
    }

    /// Seeks the clock. Legal in any state; fires `currentTimeChanged`.
    pub fn set_current_time(&mut self, t: Timestamp) {
        self.current = match self.range {
            Some(range) => range.clamp(t),
            None => t,
        };
        let data = json!({ "currentTime": self.current.to_iso8601() });
        self.events.fire(EventType::CurrentTimeChanged, data);
    }

    /// `Stopped|Paused -> Playing`.
    pub fn play(&mut self) {
        match self.state {
            PlayState::Playing => {}
            PlayState::Stopped => {
                if let Some(range) = self.range {
                    self.current = range.clamp(self.current);
                }
                self.state = PlayState::Playing;
                self.last_tick = None;
                self.events.signal(EventType::Start);
            }
            PlayState::Paused => {
                self.state = PlayState::Playing;
                self.last_tick = None;
                self.events.signal(EventType::Resume);
            }
        }
    }

    /// `Playing -> Paused`. No-op in other states.
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
            self.last_tick = None;
            self.events.signal(EventType::Pause);
        }
    }

    /// Any state `-> Stopped`; additionally resets the clock to the start of
    /// the range (when one is set).
    pub fn stop(&mut self) {
        if self.state != PlayState::Stopped {
            self.state = PlayState::Stopped;
            self.last_tick = None;
            self.events.signal(EventType::Stop);
        }
        if let Some(range) = self.range {
            self.set_current_time(range.start);
        }
    }

    /// Advances the clock for one frame. `now` is the wall-clock instant of
    /// the tick; while Playing the current time moves by
    /// `elapsed * multiplier`, honoring loop/complete semantics at the end of
    /// the range.
    pub fn update_time(&mut self, now: Timestamp) {
        if self.state != PlayState::Playing {
            return;
        }

        let elapsed = match self.last_tick {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        self.last_tick = Some(now);

        if elapsed == 0.0 || self.multiplier == 0.0 {
            return;
        }

        let mut next = self.current + elapsed * self.multiplier;
        if let Some(range) = self.range {
            if self.multiplier > 0.0 && next > range.end {
                if self.loop_enabled {
                    next = range.start;
                    self.events.signal(EventType::Loop);
                } else {
                    next = range.end;
                    self.state = PlayState::Paused;
                    self.events.signal(EventType::Complete);
                }
            } else if self.multiplier < 0.0 && next < range.start {
                if self.loop_enabled {
                    next = range.end;
                    self.events.signal(EventType::Loop);
                } else {
                    next = range.start;
                    self.state = PlayState::Paused;
                    self.events.signal(EventType::Complete);
                }
            }
        }

        self.set_current_time(next);
    }

    /// Registers a feature's availability window.
    #[inline]
    pub fn register_availability(&mut self, id: &str, window: TimeInterval) {
        self.availability.insert(id, window);
    }

    #[inline]
    pub fn unregister_availability(&mut self, id: &str) {
        self.availability.remove(id);
    }

    /// Whether `id` is available at the current time. Features with no
    /// registered window are always available.
    #[inline]
    pub fn is_available(&self, id: &str) -> bool {
        self.availability.contains_at(id, self.current)
    }

    #[inline]
    pub fn availability(&self) -> &AvailabilityIndex {
        &self.availability
    }

    /// Finalizes the manager; empties the event tables.
    pub fn destroy(&mut self) {
        if self.lifecycle.mark_destroyed() {
            self.state = PlayState::Stopped;
            self.availability.clear();
            self.events.signal(EventType::Destroy);
            self.events.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: f64) -> Timestamp {
        Timestamp::from_seconds(secs)
    }

    #[test]
    fn state_machine() {
        let mut clock = TimeManager::new();
        assert_eq!(clock.state(), PlayState::Stopped);

        clock.play();
        assert_eq!(clock.state(), PlayState::Playing);
        clock.pause();
        assert_eq!(clock.state(), PlayState::Paused);
        clock.play();
        assert_eq!(clock.state(), PlayState::Playing);
        clock.stop();
        assert_eq!(clock.state(), PlayState::Stopped);

        // Seek is legal in any state.
        clock.set_current_time(t(42.0));
        assert_eq!(clock.current_time(), t(42.0));
    }

    #[test]
    fn advances_with_multiplier() {
        let mut clock = TimeManager::new();
        clock.set_current_time(t(100.0));
        clock.set_multiplier(2.0);
        clock.play();

        clock.update_time(t(1000.0));
        clock.update_time(t(1005.0));
        assert!((clock.current_time() - t(110.0)).abs() < 1e-9);

        // Paused clocks hold still.
        clock.pause();
        clock.update_time(t(1010.0));
        assert!((clock.current_time() - t(110.0)).abs() < 1e-9);
    }

    #[test]
    fn completes_at_range_end() {
        let mut clock = TimeManager::new();
        clock.set_time_range(TimeInterval::new(t(0.0), t(10.0)));
        clock.set_current_time(t(9.0));
        clock.play();

        clock.update_time(t(0.0));
        clock.update_time(t(5.0));
        assert_eq!(clock.current_time(), t(10.0));
        assert_eq!(clock.state(), PlayState::Paused);

        // With looping on, the clock wraps instead.
        clock.set_loop_enabled(true);
        clock.set_current_time(t(9.0));
        clock.play();
        clock.update_time(t(10.0));
        clock.update_time(t(12.0));
        assert_eq!(clock.current_time(), t(0.0));
        assert_eq!(clock.state(), PlayState::Playing);
    }
}
