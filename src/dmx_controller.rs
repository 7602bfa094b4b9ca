use crate::console::{
    parse_command, Command, LineEditor, DEVICE_LIMIT_MESSAGE, ERROR_MESSAGE, HELP_MESSAGE,
    NO_DEVICE_MESSAGE, READY_MESSAGE, WELCOME_MESSAGE,
};
use crate::console_buffer::{ConsoleBuffer, ConsoleUart};
use crate::consts::{ACTIVITY_HOLD_TICKS, BOOT_BLINK_TICKS, DMX_MAX_PACKAGE_SIZE, DMX_NULL_START};
use crate::discovery::{run_full_discovery, DiscoveryReport, DiscoveryStatus};
use crate::dmx_driver::{DmxError, DmxReceiver, DmxTransmitter};
use crate::indicator::{flash_indicator, Indicator, IndicatorPins, Timeout, TimeoutCounters};
use crate::layouts::dmx_frame_layout;
use crate::types::{DiscoveredDevices, DmxAddress};
use core::fmt::Write;

/// The 513 slots of a dmx frame. Slot 0 is the start code.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelFrame {
    data: [u8; DMX_MAX_PACKAGE_SIZE],
}

impl Default for ChannelFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelFrame {
    /// Creates a data frame with all channels at zero.
    pub fn new() -> Self {
        Self {
            data: [0u8; DMX_MAX_PACKAGE_SIZE],
        }
    }

    pub fn start_code(&self) -> u8 {
        dmx_frame_layout::View::new(&self.data[..])
            .start_code()
            .read()
    }

    pub fn get(&self, address: DmxAddress) -> u8 {
        dmx_frame_layout::View::new(&self.data[..]).slots()[address.slot_index()]
    }

    pub fn set(&mut self, address: DmxAddress, value: u8) {
        dmx_frame_layout::View::new(&mut self.data[..]).slots_mut()[address.slot_index()] = value;
    }

    /// Sets every channel back to zero.
    pub fn clear(&mut self) {
        let mut view = dmx_frame_layout::View::new(&mut self.data[..]);
        view.start_code_mut().write(DMX_NULL_START);
        view.slots_mut().fill(0);
    }

    /// The whole frame including the start code.
    pub fn as_bytes(&self) -> &[u8; DMX_MAX_PACKAGE_SIZE] {
        &self.data
    }
}

#[derive(Debug)]
pub struct DmxControllerConfig {
    /// Highest channel that gets streamed.
    pub max_address: DmxAddress,
    /// Stream data frames right after start.
    pub output_enabled: bool,
    /// How long activity leds stay lit, in supervisor ticks.
    pub activity_hold_ticks: u16,
}

impl Default for DmxControllerConfig {
    fn default() -> Self {
        Self {
            max_address: DmxAddress::MAX,
            output_enabled: true,
            activity_hold_ticks: ACTIVITY_HOLD_TICKS,
        }
    }
}

/// A dmx controller that streams the channel frame, runs discoveries and is operated through
/// a text console.
///
/// The console buffer and the timeout counters are shared with the console transmit
/// interrupt and the tick interrupt, see [ConsoleBuffer::service_transmit_interrupt] and
/// [crate::indicator::IndicatorSupervisor::tick].
pub struct DmxController<'a, D, C, P>
where
    D: DmxTransmitter + DmxReceiver,
    C: ConsoleUart,
    P: IndicatorPins,
{
    driver: D,
    console: C,
    pins: P,
    console_buffer: &'a ConsoleBuffer,
    timeouts: &'a TimeoutCounters,
    frame: ChannelFrame,
    max_address: DmxAddress,
    output_enabled: bool,
    poll_pending: bool,
    line_editor: LineEditor,
    discovered: DiscoveredDevices,
    activity_hold_ticks: u16,
}

impl<'a, D, C, P> DmxController<'a, D, C, P>
where
    D: DmxTransmitter + DmxReceiver,
    C: ConsoleUart,
    P: IndicatorPins,
{
    /// Creates a new DmxController instance.
    pub fn new(
        driver: D,
        console: C,
        pins: P,
        console_buffer: &'a ConsoleBuffer,
        timeouts: &'a TimeoutCounters,
        config: &DmxControllerConfig,
    ) -> Self {
        Self {
            driver,
            console,
            pins,
            console_buffer,
            timeouts,
            frame: ChannelFrame::new(),
            max_address: config.max_address,
            output_enabled: config.output_enabled,
            poll_pending: false,
            line_editor: LineEditor::new(),
            discovered: DiscoveredDevices::new(),
            activity_hold_ticks: config.activity_hold_ticks,
        }
    }

    /// Blinks the green led and greets on the console.
    pub fn start(&mut self) {
        flash_indicator(
            self.timeouts,
            &mut self.pins,
            Timeout::GreenActivity,
            Indicator::Green,
            BOOT_BLINK_TICKS,
        );
        self.write_console(WELCOME_MESSAGE);
    }

    /// Runs one bus cycle: a complete data frame with console input served between the slots,
    /// followed by a complete discovery if one was requested. Frames and discoveries never
    /// interleave.
    ///
    /// While the output is off only the console is served and a requested discovery waits
    /// until the output is switched on again.
    pub fn run_cycle(&mut self) -> Result<(), DmxError<D::DriverError>> {
        if !self.output_enabled {
            self.service_console();
            return Ok(());
        }

        self.send_data_frame()?;

        if self.poll_pending {
            self.poll_pending = false;
            self.discover()?;
        }

        Ok(())
    }

    fn send_data_frame(&mut self) -> Result<(), DmxError<D::DriverError>> {
        self.driver.send_break(DMX_NULL_START)?;

        for slot in 1..=self.max_address.as_u16() as usize {
            let value = self.frame.as_bytes()[slot];
            self.driver.send_slot(value)?;

            // only ever touches the frame and the console, never the bus
            self.service_console();
        }

        Ok(())
    }

    /// Takes at most one character from the console and executes the line it completes.
    pub fn service_console(&mut self) {
        let Some(byte) = self.console.read_byte() else {
            return;
        };

        if let Some(line) = self.line_editor.push(byte) {
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, line: &str) {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(error) => {
                log::debug!("rejected console line {:?}: {}", line, error);
                self.write_console(ERROR_MESSAGE);
                return;
            },
        };

        log::debug!("console command {:?}", command);
        self.execute(command);

        flash_indicator(
            self.timeouts,
            &mut self.pins,
            Timeout::GreenActivity,
            Indicator::Green,
            self.activity_hold_ticks,
        );

        // a poll answers after the discovery
        if command != Command::Poll {
            self.write_console(READY_MESSAGE);
        }
    }

    /// Applies a console command to the controller state. Never touches the bus, a poll only
    /// gets scheduled for the end of the next data frame.
    pub fn execute(&mut self, command: Command) {
        match command {
            Command::Set { address, value } => self.frame.set(address, value),
            Command::Get(address) => {
                let mut text: heapless::String<8> = heapless::String::new();
                // "\r\n255" always fits
                let _ = write!(text, "\r\n{}", self.frame.get(address));
                self.write_console(&text);
            },
            Command::Max(address) => self.max_address = address,
            Command::On => self.output_enabled = true,
            Command::Off => self.output_enabled = false,
            Command::Poll => self.poll_pending = true,
            Command::Clear => self.frame.clear(),
            Command::Help => self.write_console(HELP_MESSAGE),
        }
    }

    /// Runs a full discovery right away and reports the result on the console.
    pub fn discover(&mut self) -> Result<DiscoveryReport, DmxError<D::DriverError>> {
        let hold_ticks = self.activity_hold_ticks;
        let timeouts = self.timeouts;
        let pins = &mut self.pins;

        let report = run_full_discovery(&mut self.driver, &mut self.discovered, || {
            flash_indicator(timeouts, &mut *pins, Timeout::RedActivity, Indicator::Red, hold_ticks)
        })?;
        log::debug!(
            "discovery finished with {:?} after {} polls, {} devices",
            report.status,
            report.polls,
            self.discovered.len()
        );

        if self.discovered.is_empty() {
            self.write_console(NO_DEVICE_MESSAGE);
        }

        for index in 0..self.discovered.len() {
            let mut text: heapless::String<8> = heapless::String::new();
            // "\r\n512" always fits
            let _ = write!(text, "\r\n{}", self.discovered[index]);
            self.write_console(&text);
        }

        if report.status == DiscoveryStatus::CapacityExceeded {
            self.write_console(DEVICE_LIMIT_MESSAGE);
        }
        self.write_console(READY_MESSAGE);

        Ok(report)
    }

    fn write_console(&mut self, text: &str) {
        self.console_buffer.enqueue(text.as_bytes());
        self.console_buffer.kick(&mut self.console);
    }

    pub fn get_channel(&self, address: DmxAddress) -> u8 {
        self.frame.get(address)
    }

    pub fn set_channel(&mut self, address: DmxAddress, value: u8) {
        self.frame.set(address, value);
    }

    pub fn get_frame(&self) -> &ChannelFrame {
        &self.frame
    }

    pub fn get_max_address(&self) -> DmxAddress {
        self.max_address
    }

    pub fn is_output_enabled(&self) -> bool {
        self.output_enabled
    }

    pub fn is_poll_pending(&self) -> bool {
        self.poll_pending
    }

    /// The devices found by the last discovery, in the order they were found.
    pub fn get_discovered_devices(&self) -> &DiscoveredDevices {
        &self.discovered
    }

    /// Get a reference to the underlying driver.
    pub fn get_driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Get a reference to the console port.
    pub fn get_console(&mut self) -> &mut C {
        &mut self.console
    }
}

#[cfg(test)]
mod tests {
    use crate::console::{ERROR_MESSAGE, NO_DEVICE_MESSAGE, READY_MESSAGE, WELCOME_MESSAGE};
    use crate::console_buffer::ConsoleBuffer;
    use crate::consts::DMX_NULL_START;
    use crate::dmx_controller::{DmxController, DmxControllerConfig};
    use crate::indicator::{Indicator, Timeout, TimeoutCounters};
    use crate::mock::{MockConsole, MockPins, SimulatedBus};
    use crate::types::DmxAddress;
    use proptest::prelude::*;
    use std::string::String;

    type TestController<'a> = DmxController<'a, SimulatedBus, MockConsole, MockPins>;

    fn controller<'a>(
        responders: &[u16],
        console_buffer: &'a ConsoleBuffer,
        timeouts: &'a TimeoutCounters,
    ) -> TestController<'a> {
        DmxController::new(
            SimulatedBus::with_responders(responders),
            MockConsole::default(),
            MockPins::default(),
            console_buffer,
            timeouts,
            &DmxControllerConfig::default(),
        )
    }

    /// Plays the transmit interrupt until the console buffer is empty.
    fn console_output(controller: &mut TestController, console_buffer: &ConsoleBuffer) -> String {
        while !console_buffer.is_empty() {
            console_buffer.service_transmit_interrupt(controller.get_console());
        }

        controller.get_console().take_output()
    }

    /// Types a line and runs cycles until the console input is used up.
    fn command(
        controller: &mut TestController,
        console_buffer: &ConsoleBuffer,
        line: &str,
    ) -> String {
        controller.get_console().type_line(line);
        while !controller.get_console().input.is_empty() {
            controller.run_cycle().unwrap();
        }

        console_output(controller, console_buffer)
    }

    fn address(address: u16) -> DmxAddress {
        DmxAddress::new(address).unwrap()
    }

    #[test]
    fn test_start() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        controller.start();

        assert_eq!(console_output(&mut controller, &console_buffer), WELCOME_MESSAGE);
        assert!(timeouts.is_running(Timeout::GreenActivity));
        assert!(controller.get_frame().as_bytes().iter().all(|slot| *slot == 0));
    }

    #[test]
    fn test_set_get() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        assert_eq!(command(&mut controller, &console_buffer, "set 5 10"), READY_MESSAGE);
        assert_eq!(
            command(&mut controller, &console_buffer, "GET 5"),
            std::format!("\r\n10{READY_MESSAGE}")
        );
        assert_eq!(controller.get_channel(address(5)), 10);
        assert!(timeouts.is_running(Timeout::GreenActivity));
        assert!(controller.get_driver().frames().len() > 0);
    }

    #[test]
    fn test_malformed_command() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        let output = command(&mut controller, &console_buffer, "se 5 10");
        assert_eq!(output, ERROR_MESSAGE);
        assert!(!output.contains("Ready"));
        assert_eq!(controller.get_channel(address(5)), 0);
        assert!(!timeouts.is_running(Timeout::GreenActivity));
    }

    #[test]
    fn test_clear() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        for channel in [1, 77, 512] {
            controller.set_channel(address(channel), 200);
        }
        assert_eq!(command(&mut controller, &console_buffer, "clear"), READY_MESSAGE);

        for channel in 1..=512 {
            assert_eq!(controller.get_channel(address(channel)), 0);
        }
        assert_eq!(controller.get_frame().start_code(), DMX_NULL_START);
    }

    #[test]
    fn test_max_limits_frame() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        controller.set_channel(address(3), 33);
        controller.set_channel(address(4), 44);
        command(&mut controller, &console_buffer, "max 3");
        controller.get_driver().wire.clear();

        controller.run_cycle().unwrap();

        let frames = controller.get_driver().frames();
        assert_eq!(frames, [[DMX_NULL_START, 0, 0, 33]]);
        assert_eq!(controller.get_max_address(), address(3));
    }

    #[test]
    fn test_full_frame() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        controller.set_channel(address(512), 255);
        controller.run_cycle().unwrap();

        let frames = controller.get_driver().frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 513);
        assert_eq!(frames[0][512], 255);
    }

    #[test]
    fn test_off_stops_streaming() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        command(&mut controller, &console_buffer, "off");
        assert!(!controller.is_output_enabled());
        controller.get_driver().wire.clear();

        for _ in 0..3 {
            controller.run_cycle().unwrap();
        }
        assert!(controller.get_driver().wire.is_empty());

        // the console is still served
        assert_eq!(command(&mut controller, &console_buffer, "on"), READY_MESSAGE);
        assert!(controller.is_output_enabled());
    }

    #[test]
    fn test_poll_waits_for_output() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[5], &console_buffer, &timeouts);

        command(&mut controller, &console_buffer, "off");
        controller.get_driver().wire.clear();

        assert_eq!(command(&mut controller, &console_buffer, "poll"), "");
        for _ in 0..10 {
            controller.run_cycle().unwrap();
        }
        assert!(controller.is_poll_pending());
        assert!(controller.get_driver().wire.is_empty());
        assert!(controller.get_discovered_devices().is_empty());

        assert_eq!(command(&mut controller, &console_buffer, "on"), READY_MESSAGE);
        controller.run_cycle().unwrap();

        assert!(!controller.is_poll_pending());
        let frames = controller.get_driver().frames();
        assert_eq!(frames[0][0], DMX_NULL_START);
        assert!(frames[1..].iter().all(|frame| frame[0] == 0xF0));
        assert_eq!(
            controller.get_discovered_devices().as_slice(),
            &[address(5)]
        );
        assert!(console_output(&mut controller, &console_buffer).ends_with(READY_MESSAGE));
    }

    #[test]
    fn test_poll_reports_devices() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[300, 5], &console_buffer, &timeouts);

        let output = command(&mut controller, &console_buffer, "poll");

        assert!(!controller.is_poll_pending());
        let mut found: std::vec::Vec<u16> = controller
            .get_discovered_devices()
            .iter()
            .map(DmxAddress::as_u16)
            .collect();
        found.sort();
        assert_eq!(found, [5, 300]);

        assert!(output.contains("\r\n5"));
        assert!(output.contains("\r\n300"));
        assert!(output.ends_with(READY_MESSAGE));
        assert_eq!(output.matches("Ready").count(), 1);
        assert!(timeouts.is_running(Timeout::RedActivity));
    }

    #[test]
    fn test_poll_without_devices() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[], &console_buffer, &timeouts);

        let output = command(&mut controller, &console_buffer, "poll");

        assert_eq!(output, std::format!("{NO_DEVICE_MESSAGE}{READY_MESSAGE}"));
        assert!(controller.get_discovered_devices().is_empty());
        assert!(!timeouts.is_running(Timeout::RedActivity));
    }

    #[test]
    fn test_poll_runs_after_frame() {
        let console_buffer = ConsoleBuffer::new();
        let timeouts = TimeoutCounters::new();
        let mut controller = controller(&[9], &console_buffer, &timeouts);
        let pins = controller.pins.clone();

        controller.get_console().type_line("poll");
        controller.run_cycle().unwrap();

        // the data frame was completed before the first poll frame went out
        let frames = controller.get_driver().frames();
        assert_eq!(frames[0][0], DMX_NULL_START);
        assert_eq!(frames[0].len(), 513);
        assert!(frames[1..].iter().all(|frame| frame[0] == 0xF0));
        assert!(pins.is_on(Indicator::Red));
    }

    proptest! {
        #[test]
        fn test_set_then_get(channel in 1u16..=512, value in 0u8..=255) {
            let console_buffer = ConsoleBuffer::new();
            let timeouts = TimeoutCounters::new();
            let mut controller = controller(&[], &console_buffer, &timeouts);
            controller.execute(crate::console::Command::Max(address(1)));

            let set = std::format!("set {channel} {value}");
            prop_assert_eq!(command(&mut controller, &console_buffer, &set), READY_MESSAGE);

            let get = std::format!("get {channel}");
            prop_assert_eq!(
                command(&mut controller, &console_buffer, &get),
                std::format!("\r\n{value}{READY_MESSAGE}")
            );
        }
    }
}
