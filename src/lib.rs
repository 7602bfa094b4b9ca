//! Rust library for building DMX512 (ANSI E1.11) controllers and devices that talk over a RS485
//! bus by using interchangeable drivers. On top of plain dmx streaming it features a simple
//! break-response discovery: the controller sends a poll frame (start code `0xF0`) with one
//! byte per address and every device whose byte is set answers with a bare break.
//!
//! The library features no-std as well as no-alloc support (no heap allocation) to target
//! embedded as well as os platforms. Buffers that are shared with interrupt handlers are
//! lock-free and can live in statics.
//!
//! # Usage
//! These examples show the basic usage with a placeholder uart. Replace it with the uart of
//! your platform by implementing [dmx_uart_driver::DmxRecvUartDriver] and
//! [dmx_uart_driver::DmxRespUartDriver].
//!
//! ## Controller
//!
//! ```rust,no_run
//! use dmx_poll::console_buffer::{ConsoleBuffer, ConsoleUart};
//! use dmx_poll::dmx_controller::{DmxController, DmxControllerConfig};
//! use dmx_poll::indicator::{
//!     Indicator, IndicatorConfig, IndicatorPins, IndicatorSupervisor, TimeoutCounters,
//! };
//! # use dmx_poll::dmx_uart_driver::*;
//! # struct Rs485;
//! # impl DmxUartDriver for Rs485 { type DriverError = (); }
//! # impl DmxRecvUartDriver for Rs485 {
//! #     fn is_byte_available(&mut self) -> Result<bool, DmxUartDriverError<()>> { Ok(false) }
//! #     fn read_byte(&mut self) -> Result<UartByte, DmxUartDriverError<()>> { Err(DmxUartDriverError::TimeoutError) }
//! #     fn is_receiver_idle(&mut self) -> Result<bool, DmxUartDriverError<()>> { Ok(true) }
//! #     fn wait_us(&mut self, _: u32) {}
//! # }
//! # impl DmxRespUartDriver for Rs485 {
//! #     fn write_byte(&mut self, _: u8) -> Result<(), DmxUartDriverError<()>> { Ok(()) }
//! #     fn is_transmit_empty(&mut self) -> Result<bool, DmxUartDriverError<()>> { Ok(true) }
//! #     fn set_baud_rate(&mut self, _: u32) -> Result<(), DmxUartDriverError<()>> { Ok(()) }
//! #     fn set_transmit_enable(&mut self, _: bool) -> Result<(), DmxUartDriverError<()>> { Ok(()) }
//! # }
//! # struct Terminal;
//! # impl ConsoleUart for Terminal {
//! #     fn read_byte(&mut self) -> Option<u8> { None }
//! #     fn is_transmit_fifo_empty(&mut self) -> bool { true }
//! #     fn write_transmit_fifo(&mut self, _: u8) {}
//! # }
//! # #[derive(Clone, Copy)]
//! # struct Leds;
//! # impl IndicatorPins for Leds {
//! #     fn set_indicator(&mut self, _: Indicator, _: bool) {}
//! # }
//!
//! // Shared with the interrupt handlers.
//! static CONSOLE_BUFFER: ConsoleBuffer = ConsoleBuffer::new();
//! static TIMEOUTS: TimeoutCounters = TimeoutCounters::new();
//!
//! // Call this every millisecond from a timer interrupt.
//! let mut supervisor = IndicatorSupervisor::new(&TIMEOUTS, Leds, IndicatorConfig::CONTROLLER);
//! supervisor.tick();
//!
//! // Call this from the console transmit interrupt.
//! CONSOLE_BUFFER.service_transmit_interrupt(&mut Terminal);
//!
//! let mut dmx_controller = DmxController::new(
//!     Rs485,
//!     Terminal,
//!     Leds,
//!     &CONSOLE_BUFFER,
//!     &TIMEOUTS,
//!     &DmxControllerConfig::default(),
//! );
//!
//! dmx_controller.start();
//!
//! loop {
//!     // Streams one frame and serves the console in between the slots.
//!     if let Err(error) = dmx_controller.run_cycle() {
//!         println!("'{error:?}' during frame");
//!     }
//! }
//! ```
//!
//! ## Device
//!
//! ```rust,no_run
//! use dmx_poll::dmx_receiver::{
//!     AddressSwitch, DmxDevice, DmxDeviceConfig, DutyCycleOutput, SyncEvent,
//! };
//! use dmx_poll::indicator::{Indicator, IndicatorPins, TimeoutCounters};
//! # use dmx_poll::dmx_uart_driver::*;
//! # struct Rs485;
//! # impl DmxUartDriver for Rs485 { type DriverError = (); }
//! # impl DmxRecvUartDriver for Rs485 {
//! #     fn is_byte_available(&mut self) -> Result<bool, DmxUartDriverError<()>> { Ok(false) }
//! #     fn read_byte(&mut self) -> Result<UartByte, DmxUartDriverError<()>> { Err(DmxUartDriverError::TimeoutError) }
//! #     fn is_receiver_idle(&mut self) -> Result<bool, DmxUartDriverError<()>> { Ok(true) }
//! #     fn wait_us(&mut self, _: u32) {}
//! # }
//! # impl DmxRespUartDriver for Rs485 {
//! #     fn write_byte(&mut self, _: u8) -> Result<(), DmxUartDriverError<()>> { Ok(()) }
//! #     fn is_transmit_empty(&mut self) -> Result<bool, DmxUartDriverError<()>> { Ok(true) }
//! #     fn set_baud_rate(&mut self, _: u32) -> Result<(), DmxUartDriverError<()>> { Ok(()) }
//! #     fn set_transmit_enable(&mut self, _: bool) -> Result<(), DmxUartDriverError<()>> { Ok(()) }
//! # }
//! # struct Leds;
//! # impl IndicatorPins for Leds {
//! #     fn set_indicator(&mut self, _: Indicator, _: bool) {}
//! # }
//!
//! struct DipSwitch;
//!
//! impl AddressSwitch for DipSwitch {
//!     fn read_address_pins(&mut self) -> u16 {
//!         // All switches open, inverted address 0x1FF is address 1.
//!         0x01FF
//!     }
//! }
//!
//! struct Dimmer;
//!
//! impl DutyCycleOutput for Dimmer {
//!     fn set_duty_cycle(&mut self, duty_cycle: u8) {
//!         println!("dimming to {duty_cycle}");
//!     }
//! }
//!
//! static TIMEOUTS: TimeoutCounters = TimeoutCounters::new();
//!
//! let mut dmx_device = DmxDevice::new(
//!     Rs485,
//!     DipSwitch,
//!     Dimmer,
//!     Leds,
//!     &TIMEOUTS,
//!     DmxDeviceConfig::default(),
//! );
//!
//! dmx_device.start().unwrap();
//!
//! loop {
//!     match dmx_device.poll() {
//!         Ok(SyncEvent::PollReceived { answered: true }) => println!("answered a poll"),
//!         Ok(_) => (),
//!         Err(error) => println!("'{error:?}' during polling"),
//!     }
//! }
//! ```
//!

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(all(test, not(feature = "std")))]
extern crate std;

/// Line editing and command parsing for the controller's text console.
pub mod console;
/// Lock-free transmit queue between the main loop and the console transmit interrupt.
pub mod console_buffer;
pub mod consts;
/// Break-response discovery of the devices on the bus.
pub mod discovery;
/// Module for building dmx controllers.
pub mod dmx_controller;
/// Module for framing dmx on top of a uart: breaks, slots and bus turnaround.
pub mod dmx_driver;
/// Module for building dmx devices.
pub mod dmx_receiver;
/// Module for simplifying the implementation of new drivers/hardware that behave like direct uart devices.
pub mod dmx_uart_driver;
/// Activity leds and the timeouts that drive them.
pub mod indicator;
mod layouts;
#[cfg(test)]
mod mock;
pub mod types;
