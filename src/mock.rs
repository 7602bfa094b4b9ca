//! Host side stand-ins for the hardware, shared by the unit tests.

use crate::console_buffer::ConsoleUart;
use crate::consts::{BREAK_BAUD, DMX_BAUD, DMX_MAX_PACKAGE_SIZE, SC_POLL};
use crate::dmx_receiver::{AddressSwitch, DutyCycleOutput};
use crate::dmx_uart_driver::{
    DmxRecvUartDriver, DmxRespUartDriver, DmxUartDriver, DmxUartDriverError, UartByte,
};
use crate::indicator::{Indicator, IndicatorPins};
use crate::types::{encode_address_switch, DmxAddress};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WireEvent {
    Break,
    Byte(u8),
}

/// A bus with a controller side uart and a set of simulated devices that answer polls.
#[derive(Default)]
pub struct SimulatedBus {
    /// Everything that went onto the wire.
    pub wire: Vec<WireEvent>,
    /// Everything the uart is going to receive.
    pub received: VecDeque<UartByte>,
    /// Addresses of the devices that answer poll frames.
    pub responders: Vec<u16>,
    pub transmit_enabled: bool,
    pub waited_us: u64,
    pub polls_answered: usize,
    baud: u32,
    frame_start: usize,
}

impl SimulatedBus {
    pub fn with_responders(responders: &[u16]) -> Self {
        Self {
            responders: responders.to_vec(),
            baud: DMX_BAUD,
            ..Default::default()
        }
    }

    /// Splits the wire into frames. Each frame starts with its start code.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let mut frames: Vec<Vec<u8>> = Vec::new();

        for event in &self.wire {
            match event {
                WireEvent::Break => frames.push(Vec::new()),
                WireEvent::Byte(byte) => frames
                    .last_mut()
                    .expect("byte before first break")
                    .push(*byte),
            }
        }

        frames
    }

    /// What a device listening on the line would receive.
    pub fn wire_as_received(&self) -> Vec<UartByte> {
        self.wire
            .iter()
            .map(|event| match event {
                WireEvent::Break => UartByte::break_condition(),
                WireEvent::Byte(byte) => UartByte::data(*byte),
            })
            .collect()
    }

    fn answer_poll(&mut self) {
        let frame: Vec<u8> = self.wire[self.frame_start..]
            .iter()
            .filter_map(|event| match event {
                WireEvent::Byte(byte) => Some(*byte),
                WireEvent::Break => None,
            })
            .collect();

        if frame.len() != DMX_MAX_PACKAGE_SIZE || frame[0] != SC_POLL {
            return;
        }

        let answered = self
            .responders
            .iter()
            .any(|address| frame[*address as usize] != 0);

        // someone else keeps talking while answers are pending
        self.received.push_back(UartByte::data(0x55));
        self.received.push_back(UartByte {
            data: 0x13,
            framing_error: true,
        });
        if answered {
            self.polls_answered += 1;
            self.received.push_back(UartByte::break_condition());
        }
    }
}

impl DmxUartDriver for SimulatedBus {
    type DriverError = core::convert::Infallible;
}

impl DmxRespUartDriver for SimulatedBus {
    fn write_byte(&mut self, byte: u8) -> Result<(), DmxUartDriverError<Self::DriverError>> {
        assert!(self.transmit_enabled, "wrote to the bus without owning it");

        match self.baud {
            BREAK_BAUD => {
                assert_eq!(byte, 0, "only zero makes a break");
                self.frame_start = self.wire.len();
                self.wire.push(WireEvent::Break);
            },
            DMX_BAUD => self.wire.push(WireEvent::Byte(byte)),
            baud => panic!("unexpected baud rate {baud}"),
        }

        Ok(())
    }

    fn is_transmit_empty(&mut self) -> Result<bool, DmxUartDriverError<Self::DriverError>> {
        Ok(true)
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), DmxUartDriverError<Self::DriverError>> {
        self.baud = baud;

        Ok(())
    }

    fn set_transmit_enable(
        &mut self,
        enabled: bool,
    ) -> Result<(), DmxUartDriverError<Self::DriverError>> {
        if self.transmit_enabled && !enabled {
            self.answer_poll();
        }
        self.transmit_enabled = enabled;

        Ok(())
    }
}

impl DmxRecvUartDriver for SimulatedBus {
    fn is_byte_available(&mut self) -> Result<bool, DmxUartDriverError<Self::DriverError>> {
        Ok(!self.received.is_empty())
    }

    fn read_byte(&mut self) -> Result<UartByte, DmxUartDriverError<Self::DriverError>> {
        self.received
            .pop_front()
            .ok_or(DmxUartDriverError::TimeoutError)
    }

    fn is_receiver_idle(&mut self) -> Result<bool, DmxUartDriverError<Self::DriverError>> {
        Ok(true)
    }

    fn wait_us(&mut self, micros: u32) {
        self.waited_us += micros as u64;
    }
}

/// Indicator lines that can be cloned into a supervisor and still be inspected.
#[derive(Clone, Default)]
pub struct MockPins(Rc<Cell<[bool; 2]>>);

impl MockPins {
    pub fn is_on(&self, indicator: Indicator) -> bool {
        self.0.get()[indicator as usize]
    }
}

impl IndicatorPins for MockPins {
    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        let mut state = self.0.get();
        state[indicator as usize] = on;
        self.0.set(state);
    }
}

/// Console port with an unlimited fifo.
#[derive(Default)]
pub struct MockConsole {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl MockConsole {
    pub fn type_line(&mut self, line: &str) {
        self.input.extend(line.bytes());
        self.input.push_back(b'\r');
    }

    pub fn take_output(&mut self) -> std::string::String {
        let output = std::string::String::from_utf8(self.output.clone()).unwrap();
        self.output.clear();

        output
    }
}

impl ConsoleUart for MockConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn is_transmit_fifo_empty(&mut self) -> bool {
        true
    }

    fn write_transmit_fifo(&mut self, byte: u8) {
        self.output.push(byte);
    }
}

#[derive(Clone, Default)]
pub struct MockDutyCycle(Rc<RefCell<Vec<u8>>>);

impl MockDutyCycle {
    pub fn history(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl DutyCycleOutput for MockDutyCycle {
    fn set_duty_cycle(&mut self, duty_cycle: u8) {
        self.0.borrow_mut().push(duty_cycle);
    }
}

/// Dip switch set to an address.
pub struct MockSwitch(pub Rc<Cell<u16>>);

impl MockSwitch {
    pub fn set_to(address: u16) -> Self {
        let switch = Self(Rc::new(Cell::new(0)));
        switch.set_address(address);

        switch
    }

    pub fn set_address(&self, address: u16) {
        self.0.set(encode_address_switch(DmxAddress::new(address).unwrap()));
    }
}

impl AddressSwitch for MockSwitch {
    fn read_address_pins(&mut self) -> u16 {
        self.0.get()
    }
}
