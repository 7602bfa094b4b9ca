use core::sync::atomic::{AtomicU16, Ordering};

/// The activity leds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Red,
    Green,
}

/// Access to the indicator lines. Polarity is up to the implementation, `on` means lit.
pub trait IndicatorPins {
    fn set_indicator(&mut self, indicator: Indicator, on: bool);
}

/// The countdowns driven by the supervisor tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Bus activity that isn't plain data (poll answers).
    RedActivity,
    /// Console commands on the controller, changed channel value on the device.
    GreenActivity,
    /// Time since the last data frame (device only).
    NoData,
}

impl Timeout {
    pub const ALL: [Timeout; 3] = [Timeout::RedActivity, Timeout::GreenActivity, Timeout::NoData];

    fn index(self) -> usize {
        match self {
            Timeout::RedActivity => 0,
            Timeout::GreenActivity => 1,
            Timeout::NoData => 2,
        }
    }
}

/// Timeouts that reached zero during one tick.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ExpiredTimeouts([bool; 3]);

impl ExpiredTimeouts {
    pub fn contains(&self, timeout: Timeout) -> bool {
        self.0[timeout.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|expired| *expired)
    }

    pub fn iter(&self) -> impl Iterator<Item = Timeout> + '_ {
        Timeout::ALL
            .into_iter()
            .filter(|timeout| self.contains(*timeout))
    }
}

/// Countdown counters shared between the protocol code, which arms them, and the tick
/// interrupt, which counts them down.
///
/// Arming stores an absolute value, the last write wins. An arm racing with a tick can lose
/// one tick or get overwritten by the decrement, which only shifts led timing.
pub struct TimeoutCounters {
    counters: [AtomicU16; 3],
}

impl Default for TimeoutCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutCounters {
    pub const fn new() -> Self {
        Self {
            counters: [const { AtomicU16::new(0) }; 3],
        }
    }

    pub fn arm(&self, timeout: Timeout, ticks: u16) {
        self.counters[timeout.index()].store(ticks, Ordering::Relaxed);
    }

    pub fn remaining(&self, timeout: Timeout) -> u16 {
        self.counters[timeout.index()].load(Ordering::Relaxed)
    }

    pub fn is_running(&self, timeout: Timeout) -> bool {
        self.remaining(timeout) > 0
    }

    /// Counts every running counter down by one. A counter that reaches zero is reported
    /// exactly once and then stays at zero until it's armed again.
    pub fn tick(&self) -> ExpiredTimeouts {
        let mut expired = ExpiredTimeouts::default();

        for timeout in Timeout::ALL {
            let counter = &self.counters[timeout.index()];
            let remaining = counter.load(Ordering::Relaxed);
            if remaining == 0 {
                continue;
            }

            counter.store(remaining - 1, Ordering::Relaxed);
            expired.0[timeout.index()] = remaining == 1;
        }

        expired
    }
}

/// What happens to the leds when a timeout runs out.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeoutAction {
    pub indicator: Indicator,
    pub on: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndicatorConfig {
    pub red_activity: Option<TimeoutAction>,
    pub green_activity: Option<TimeoutAction>,
    pub no_data: Option<TimeoutAction>,
}

impl IndicatorConfig {
    /// Both leds are flashes that go dark again.
    pub const CONTROLLER: IndicatorConfig = IndicatorConfig {
        red_activity: Some(TimeoutAction {
            indicator: Indicator::Red,
            on: false,
        }),
        green_activity: Some(TimeoutAction {
            indicator: Indicator::Green,
            on: false,
        }),
        no_data: None,
    };

    /// Green is solid while data arrives. A changed value darkens it for the green activity
    /// window, missing data for longer than the no data timeout turns it off.
    pub const DEVICE: IndicatorConfig = IndicatorConfig {
        red_activity: Some(TimeoutAction {
            indicator: Indicator::Red,
            on: false,
        }),
        green_activity: Some(TimeoutAction {
            indicator: Indicator::Green,
            on: true,
        }),
        no_data: Some(TimeoutAction {
            indicator: Indicator::Green,
            on: false,
        }),
    };

    pub fn action(&self, timeout: Timeout) -> Option<TimeoutAction> {
        match timeout {
            Timeout::RedActivity => self.red_activity,
            Timeout::GreenActivity => self.green_activity,
            Timeout::NoData => self.no_data,
        }
    }
}

/// Drives the leds from the periodic tick. Call [IndicatorSupervisor::tick] from a 1ms timer
/// interrupt.
pub struct IndicatorSupervisor<'a, P: IndicatorPins> {
    counters: &'a TimeoutCounters,
    pins: P,
    config: IndicatorConfig,
}

impl<'a, P: IndicatorPins> IndicatorSupervisor<'a, P> {
    pub fn new(counters: &'a TimeoutCounters, pins: P, config: IndicatorConfig) -> Self {
        Self {
            counters,
            pins,
            config,
        }
    }

    pub fn tick(&mut self) -> ExpiredTimeouts {
        let expired = self.counters.tick();

        for timeout in expired.iter() {
            if let Some(action) = self.config.action(timeout) {
                self.pins.set_indicator(action.indicator, action.on);
            }
        }

        expired
    }

    pub fn get_pins(&mut self) -> &mut P {
        &mut self.pins
    }
}

/// Lights an indicator and arms the timeout that will take care of it.
pub(crate) fn flash_indicator(
    counters: &TimeoutCounters,
    pins: &mut impl IndicatorPins,
    timeout: Timeout,
    indicator: Indicator,
    ticks: u16,
) {
    counters.arm(timeout, ticks);
    pins.set_indicator(indicator, true);
}
