use crate::consts::{
    ACTIVITY_HOLD_TICKS, BOOT_BLINK_TICKS, DMX_MAX_ADDRESS, DMX_NULL_START, NO_DATA_TIMEOUT_TICKS,
    SC_POLL,
};
use crate::dmx_driver::{BusByte, DmxError, DmxReceiver, DmxTransmitter};
use crate::indicator::{flash_indicator, Indicator, IndicatorPins, Timeout, TimeoutCounters};
use crate::types::{decode_address_switch, DmxAddress};

/// The address selector of a device. Returns the raw port with the inverted address in the
/// lower 9 bits, see [decode_address_switch].
pub trait AddressSwitch {
    fn read_address_pins(&mut self) -> u16;
}

/// Whatever the captured channel value drives, usually a pwm.
pub trait DutyCycleOutput {
    fn set_duty_cycle(&mut self, duty_cycle: u8);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameSyncState {
    /// Waiting for a break.
    Idle,
    /// Inside a data frame. `slot` is the slot number of the next data byte.
    Synced { slot: u16 },
}

/// What a call to [DmxDevice::poll] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncEvent {
    /// Nothing was received.
    NoData,
    /// A break with the null start code was received.
    DataFrameStarted,
    /// The slot at the own address was received.
    SlotCaptured { value: u8, changed: bool },
    /// A slot for another device passed by.
    SlotSkipped,
    /// A complete poll frame was received. `answered` is true if the own address was part of
    /// it.
    PollReceived { answered: bool },
    /// A break followed by a start code this device doesn't handle. The frame gets ignored.
    UnknownStartCode(u8),
    /// A byte outside of any frame or a stray byte.
    Discarded,
}

#[derive(Debug)]
pub struct DmxDeviceConfig {
    /// How long the changed value and poll answer indications last, in supervisor ticks.
    pub activity_hold_ticks: u16,
    /// Ticks without a data frame after which the green led goes dark.
    pub no_data_timeout_ticks: u16,
}

impl Default for DmxDeviceConfig {
    fn default() -> Self {
        Self {
            activity_hold_ticks: ACTIVITY_HOLD_TICKS,
            no_data_timeout_ticks: NO_DATA_TIMEOUT_TICKS,
        }
    }
}

enum PollFrame {
    Complete(u8),
    /// A break arrived before the frame was complete.
    Interrupted,
}

/// A dmx device that follows one channel and answers polls for its address.
///
/// The address is read from the [AddressSwitch] on every poll, so changing it takes effect
/// with the next frame.
pub struct DmxDevice<'a, D, S, O, P>
where
    D: DmxTransmitter + DmxReceiver,
    S: AddressSwitch,
    O: DutyCycleOutput,
    P: IndicatorPins,
{
    driver: D,
    switch: S,
    output: O,
    pins: P,
    timeouts: &'a TimeoutCounters,
    config: DmxDeviceConfig,
    state: FrameSyncState,
    address: DmxAddress,
    value: u8,
}

impl<'a, D, S, O, P> DmxDevice<'a, D, S, O, P>
where
    D: DmxTransmitter + DmxReceiver,
    S: AddressSwitch,
    O: DutyCycleOutput,
    P: IndicatorPins,
{
    pub fn new(
        driver: D,
        mut switch: S,
        output: O,
        pins: P,
        timeouts: &'a TimeoutCounters,
        config: DmxDeviceConfig,
    ) -> Self {
        let address = decode_address_switch(switch.read_address_pins());

        Self {
            driver,
            switch,
            output,
            pins,
            timeouts,
            config,
            state: FrameSyncState::Idle,
            address,
            value: 0,
        }
    }

    /// Releases the bus and blinks the green led once.
    pub fn start(&mut self) -> Result<(), DmxError<D::DriverError>> {
        self.driver.release_bus()?;
        flash_indicator(
            self.timeouts,
            &mut self.pins,
            Timeout::NoData,
            Indicator::Green,
            BOOT_BLINK_TICKS,
        );

        Ok(())
    }

    /// Handles at most one received byte. A poll frame is read completely and answered in
    /// the same call.
    pub fn poll(&mut self) -> Result<SyncEvent, DmxError<D::DriverError>> {
        self.address = decode_address_switch(self.switch.read_address_pins());

        let Some(byte) = self.driver.try_receive()? else {
            return Ok(SyncEvent::NoData);
        };

        match (byte, self.state) {
            (BusByte::Break, _) => self.handle_break(),
            (BusByte::Data(value), FrameSyncState::Synced { slot }) => {
                Ok(self.handle_slot(slot, value))
            },
            (BusByte::Data(_), FrameSyncState::Idle) | (BusByte::Stray(_), _) => {
                Ok(SyncEvent::Discarded)
            },
        }
    }

    fn handle_break(&mut self) -> Result<SyncEvent, DmxError<D::DriverError>> {
        loop {
            self.state = FrameSyncState::Idle;

            match self.driver.receive()? {
                BusByte::Data(DMX_NULL_START) => {
                    self.state = FrameSyncState::Synced { slot: 1 };
                    self.timeouts
                        .arm(Timeout::NoData, self.config.no_data_timeout_ticks);
                    if !self.timeouts.is_running(Timeout::GreenActivity) {
                        self.pins.set_indicator(Indicator::Green, true);
                    }

                    return Ok(SyncEvent::DataFrameStarted);
                },
                BusByte::Data(SC_POLL) => match self.read_poll_frame()? {
                    PollFrame::Complete(requested) => {
                        let answered = requested != 0;
                        if answered {
                            self.answer_poll()?;
                        }

                        return Ok(SyncEvent::PollReceived { answered });
                    },
                    PollFrame::Interrupted => continue,
                },
                BusByte::Break => continue,
                BusByte::Data(start_code) | BusByte::Stray(start_code) => {
                    log::trace!("ignoring frame with start code {:#04x}", start_code);

                    return Ok(SyncEvent::UnknownStartCode(start_code));
                },
            }
        }
    }

    fn read_poll_frame(&mut self) -> Result<PollFrame, DmxError<D::DriverError>> {
        let mut requested = 0;

        for slot in 1..=DMX_MAX_ADDRESS {
            let value = match self.driver.receive()? {
                BusByte::Break => return Ok(PollFrame::Interrupted),
                BusByte::Data(value) | BusByte::Stray(value) => value,
            };

            if slot == self.address.as_u16() {
                requested = value;
            }
        }

        Ok(PollFrame::Complete(requested))
    }

    fn answer_poll(&mut self) -> Result<(), DmxError<D::DriverError>> {
        log::debug!("answering poll for {}", self.address);

        self.driver.send_bare_break()?;
        flash_indicator(
            self.timeouts,
            &mut self.pins,
            Timeout::RedActivity,
            Indicator::Red,
            self.config.activity_hold_ticks,
        );
        self.driver.release_bus()
    }

    fn handle_slot(&mut self, slot: u16, value: u8) -> SyncEvent {
        if slot != self.address.as_u16() {
            let next = slot + 1;
            self.state = FrameSyncState::Synced {
                slot: if next > DMX_MAX_ADDRESS { 0 } else { next },
            };

            return SyncEvent::SlotSkipped;
        }

        let changed = value != self.value;
        if changed {
            self.timeouts
                .arm(Timeout::GreenActivity, self.config.activity_hold_ticks);
            self.pins.set_indicator(Indicator::Green, false);
        }

        self.value = value;
        self.output.set_duty_cycle(value);
        self.state = FrameSyncState::Idle;

        SyncEvent::SlotCaptured { value, changed }
    }

    pub fn get_state(&self) -> FrameSyncState {
        self.state
    }

    /// The address as of the last poll.
    pub fn get_address(&self) -> DmxAddress {
        self.address
    }

    /// The last captured value.
    pub fn get_value(&self) -> u8 {
        self.value
    }

    /// Get a reference to the underlying driver.
    pub fn get_driver(&mut self) -> &mut D {
        &mut self.driver
    }
}
