use crate::consts::BUSY_WAIT_LIMIT;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxUartDriverError<E> {
    /// The request timed time out.
    /// IMPORTANT: If you implement a driver make sure this error gets raised instead
    /// of a driver specific error.
    TimeoutError,
    /// A driver specific error.
    DriverError(E),
}

impl<E: core::fmt::Display> core::fmt::Display for DmxUartDriverError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DmxUartDriverError::TimeoutError => write!(f, "timeout error occurred"),
            DmxUartDriverError::DriverError(error) => error.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Display + core::fmt::Debug> std::error::Error for DmxUartDriverError<E> {}

impl<E> From<E> for DmxUartDriverError<E> {
    fn from(value: E) -> Self {
        Self::DriverError(value)
    }
}

/// One byte taken from the receive register together with the line status it arrived with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartByte {
    pub data: u8,
    /// The stop bit was missing, i.e. the line was still low after the data bits.
    pub framing_error: bool,
}

impl UartByte {
    pub fn data(data: u8) -> Self {
        Self {
            data,
            framing_error: false,
        }
    }

    /// How a break looks like to a uart: a zero byte without stop bit.
    pub fn break_condition() -> Self {
        Self {
            data: 0,
            framing_error: true,
        }
    }

    pub fn is_break(&self) -> bool {
        self.framing_error && self.data == 0
    }
}

pub trait DmxUartDriver {
    type DriverError;
}

/// Object to implement access to the uart.
/// It can read frames.
/// It has to communicate at 250000 baud.
pub trait DmxRecvUartDriver: DmxUartDriver {
    /// Returns true if the receive register holds a byte.
    fn is_byte_available(&mut self) -> Result<bool, DmxUartDriverError<Self::DriverError>>;

    /// Blocks until a byte was received. Receiver overrun conditions have to be cleared by the
    /// driver. Drivers that can't block (mockups) return a timeout error instead.
    fn read_byte(&mut self) -> Result<UartByte, DmxUartDriverError<Self::DriverError>>;

    /// Returns true if the receive line is idle.
    fn is_receiver_idle(&mut self) -> Result<bool, DmxUartDriverError<Self::DriverError>>;

    /// Busy waits for the given amount of microseconds.
    fn wait_us(&mut self, micros: u32);
}

/// Object to implement access to the uart.
/// It can write frames.
/// It has to communicate at 250000 baud.
pub trait DmxRespUartDriver: DmxUartDriver {
    /// Blocks until the byte was put into the transmit register.
    fn write_byte(&mut self, byte: u8) -> Result<(), DmxUartDriverError<Self::DriverError>>;

    /// Returns true if the transmit shift register is empty, i.e. every written byte is
    /// completely on the wire.
    fn is_transmit_empty(&mut self) -> Result<bool, DmxUartDriverError<Self::DriverError>>;

    /// Reconfigures the baud rate. Used to generate break and mark after break.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), DmxUartDriverError<Self::DriverError>>;

    /// Drives the driver enable line of the RS485 transceiver.
    fn set_transmit_enable(
        &mut self,
        enabled: bool,
    ) -> Result<(), DmxUartDriverError<Self::DriverError>>;
}

/// Spins on a status flag until it becomes true. Gives up after [BUSY_WAIT_LIMIT] polls.
pub(crate) fn busy_wait<E>(
    mut flag: impl FnMut() -> Result<bool, DmxUartDriverError<E>>,
) -> Result<(), DmxUartDriverError<E>> {
    for _ in 0..BUSY_WAIT_LIMIT {
        if flag()? {
            return Ok(());
        }
    }

    Err(DmxUartDriverError::TimeoutError)
}
