use crate::consts::{BREAK_BAUD, DMX_BAUD};
use crate::dmx_uart_driver::{
    busy_wait, DmxRecvUartDriver, DmxRespUartDriver, DmxUartDriver, DmxUartDriverError, UartByte,
};

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxError<E> {
    /// The uart didn't reach the expected state in time.
    /// **Important:** If you implement a driver make sure this error gets raised instead
    /// of a driver specific error.
    TimeoutError,
    /// An error raised by the uart driver.
    DriverError(E),
}

impl<E: core::fmt::Display> core::fmt::Display for DmxError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DmxError::TimeoutError => write!(f, "uart timed out"),
            DmxError::DriverError(error) => error.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Display + core::fmt::Debug> std::error::Error for DmxError<E> {}

impl<E> From<DmxUartDriverError<E>> for DmxError<E> {
    fn from(value: DmxUartDriverError<E>) -> Self {
        match value {
            DmxUartDriverError::TimeoutError => Self::TimeoutError,
            DmxUartDriverError::DriverError(driver_error) => Self::DriverError(driver_error),
        }
    }
}

/// What a received byte means on the dmx line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusByte {
    /// A zero byte with framing error. The only thing that (re)starts a frame.
    Break,
    /// A regularly framed byte.
    Data(u8),
    /// A byte with framing error that isn't a break (noise, baud mismatch). It carries no
    /// meaning and gets dropped.
    Stray(u8),
}

impl From<UartByte> for BusByte {
    fn from(value: UartByte) -> Self {
        match (value.framing_error, value.data) {
            (true, 0) => Self::Break,
            (true, data) => Self::Stray(data),
            (false, data) => Self::Data(data),
        }
    }
}

/// Trait for putting frames onto the bus.
pub trait DmxTransmitter: DmxUartDriver {
    /// Waits until the line is quiet, takes the bus and sends break, mark after break and
    /// the start code. The caller has to send exactly the agreed amount of slots afterward.
    fn send_break(&mut self, start_code: u8) -> Result<(), DmxError<Self::DriverError>>;

    /// Sends a break without start code. Devices use it to answer a poll.
    fn send_bare_break(&mut self) -> Result<(), DmxError<Self::DriverError>>;

    /// Sends a single slot.
    fn send_slot(&mut self, value: u8) -> Result<(), DmxError<Self::DriverError>>;

    /// Waits until the last byte is on the wire and releases the bus for receiving.
    fn release_bus(&mut self) -> Result<(), DmxError<Self::DriverError>>;

    /// Sends a complete frame. The bus stays taken.
    fn send_package(
        &mut self,
        start_code: u8,
        slots: &[u8],
    ) -> Result<(), DmxError<Self::DriverError>> {
        self.send_break(start_code)?;
        for slot in slots {
            self.send_slot(*slot)?;
        }

        Ok(())
    }
}

/// Trait for taking bytes from the bus.
pub trait DmxReceiver: DmxUartDriver {
    /// Returns the next byte if one has been received, without blocking.
    fn try_receive(&mut self) -> Result<Option<BusByte>, DmxError<Self::DriverError>>;

    /// Blocks until the next byte was received.
    fn receive(&mut self) -> Result<BusByte, DmxError<Self::DriverError>>;

    /// Samples the line once per microsecond for `window_us` microseconds and returns true as
    /// soon as a break arrives. Everything else gets drained to avoid receiver overruns.
    fn wait_for_break(&mut self, window_us: u32) -> Result<bool, DmxError<Self::DriverError>>;
}

fn write_break<D: DmxRespUartDriver>(driver: &mut D) -> Result<(), DmxError<D::DriverError>> {
    driver.set_transmit_enable(true)?;
    driver.set_baud_rate(BREAK_BAUD)?;
    // The slowed down zero byte is the break, its stop bits are the mark after break.
    driver.write_byte(0)?;
    busy_wait(|| driver.is_transmit_empty())?;
    driver.set_baud_rate(DMX_BAUD)?;

    Ok(())
}

impl<D: DmxRespUartDriver + DmxRecvUartDriver> DmxTransmitter for D {
    fn send_break(&mut self, start_code: u8) -> Result<(), DmxError<Self::DriverError>> {
        busy_wait(|| self.is_transmit_empty())?;
        busy_wait(|| self.is_receiver_idle())?;

        write_break(self)?;
        self.write_byte(start_code)?;

        Ok(())
    }

    fn send_bare_break(&mut self) -> Result<(), DmxError<Self::DriverError>> {
        busy_wait(|| self.is_transmit_empty())?;
        write_break(self)
    }

    fn send_slot(&mut self, value: u8) -> Result<(), DmxError<Self::DriverError>> {
        self.write_byte(value)?;

        Ok(())
    }

    fn release_bus(&mut self) -> Result<(), DmxError<Self::DriverError>> {
        busy_wait(|| self.is_transmit_empty())?;
        self.set_transmit_enable(false)?;

        Ok(())
    }
}

impl<D: DmxRecvUartDriver> DmxReceiver for D {
    fn try_receive(&mut self) -> Result<Option<BusByte>, DmxError<Self::DriverError>> {
        if !self.is_byte_available()? {
            return Ok(None);
        }

        Ok(Some(self.read_byte()?.into()))
    }

    fn receive(&mut self) -> Result<BusByte, DmxError<Self::DriverError>> {
        Ok(self.read_byte()?.into())
    }

    fn wait_for_break(&mut self, window_us: u32) -> Result<bool, DmxError<Self::DriverError>> {
        for _ in 0..window_us {
            match self.try_receive()? {
                Some(BusByte::Break) => return Ok(true),
                Some(other) => log::trace!("dropped {:?} while waiting for break", other),
                None => {},
            }

            self.wait_us(1);
        }

        Ok(false)
    }
}
