pub const DMX_NULL_START: u8 = 0x00;
/// Start code of a poll (discovery) frame.
pub const SC_POLL: u8 = 0xF0;
/// start code + 512 byte package
pub const DMX_MAX_PACKAGE_SIZE: usize = 513;
pub const DMX_MAX_ADDRESS: u16 = 512;
pub const DMX_MIN_ADDRESS: u16 = 1;

pub const DMX_BAUD: u32 = 250_000;
/// Sending `0x00` at this rate holds the line low for ~93us (break) followed by ~20us of stop
/// bits (mark after break).
pub const BREAK_BAUD: u32 = 96_153;

/// Time a responding device has to answer a poll frame with a break.
pub const POLL_RESPONSE_WINDOW_US: u32 = 60;
/// Upper bound for every busy wait on a uart status flag. At 250k baud a byte takes 44us,
/// a break byte at [BREAK_BAUD] ~115us, so this is several orders of magnitude of headroom.
pub const BUSY_WAIT_LIMIT: u32 = 1_000_000;

pub const MAX_DISCOVERED_DEVICES: usize = 10;

pub const CONSOLE_TX_BUFFER_SIZE: usize = 256;
pub const CONSOLE_MAX_LINE_LENGTH: usize = 20;
pub const CONSOLE_MAX_FIELDS: usize = 5;

pub const ACTIVITY_HOLD_TICKS: u16 = 250;
pub const NO_DATA_TIMEOUT_TICKS: u16 = 1000;
pub const BOOT_BLINK_TICKS: u16 = 500;
