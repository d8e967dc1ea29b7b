use std::cell::Cell;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, at: Duration) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    pub index: u64,
    /// Seconds since the previous frame, capped.
    pub dt: f32,
    pub time: f64,
}

/// Longest `dt` handed to the simulation after a stall.
const MAX_DT: Duration = Duration::from_millis(100);

pub struct Ticker<C: Clock> {
    clock: C,
    interval: Duration,
    start: Duration,
    next: Duration,
    last: Option<Duration>,
    index: u64,
    running: bool,
}

impl<C: Clock> Ticker<C> {
    pub fn new(clock: C, fps: u32) -> Self {
        let now = clock.now();
        Self {
            interval: interval_for(fps),
            start: now,
            next: now,
            last: None,
            index: 0,
            running: true,
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.interval = interval_for(fps);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A frame, if one is due. Late frames are not replayed.
    pub fn poll(&mut self) -> Option<FrameTick> {
        if !self.running {
            return None;
        }
        let now = self.clock.now();
        if now < self.next {
            return None;
        }
        let dt = match self.last {
            Some(last) => now.saturating_sub(last).min(MAX_DT),
            None => self.interval,
        };
        self.last = Some(now);
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        let tick = FrameTick {
            index: self.index,
            dt: dt.as_secs_f32(),
            time: now.saturating_sub(self.start).as_secs_f64(),
        };
        self.index += 1;
        Some(tick)
    }

    /// Time left until the next frame is due. `None` while suspended.
    pub fn until_next(&self) -> Option<Duration> {
        self.running
            .then(|| self.next.saturating_sub(self.clock.now()))
    }

    pub fn suspend(&mut self) {
        self.running = false;
    }

    /// Produce frames again, starting immediately and without a catch-up `dt`.
    pub fn resume(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.restart();
    }

    pub fn restart(&mut self) {
        self.next = self.clock.now();
        self.last = None;
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}
