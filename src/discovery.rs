use crate::consts::{DMX_MAX_ADDRESS, DMX_MIN_ADDRESS, POLL_RESPONSE_WINDOW_US, SC_POLL};
use crate::dmx_driver::{DmxError, DmxReceiver, DmxTransmitter};
use crate::types::{DiscoveredDevices, DmxAddress};

/// One byte per address, 1 if the address is asked to answer.
pub type PollBitmap = [u8; DMX_MAX_ADDRESS as usize];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryStatus {
    /// Every device on the bus was found.
    Complete,
    /// More devices answered than fit into [DiscoveredDevices]. The run stopped after the list
    /// was full.
    CapacityExceeded,
    /// A range answered but none of its halves did, e.g. because a device was unplugged
    /// during the search. The run stopped with what it found up to then.
    LostResponder,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveryReport {
    pub status: DiscoveryStatus,
    /// Amount of poll frames sent.
    pub polls: u32,
}

/// Builds the poll bitmap for `min..=max`, leaving out devices that were already found so
/// they don't answer anymore.
pub fn build_poll_bitmap(min: u16, max: u16, discovered: &[DmxAddress]) -> PollBitmap {
    let mut bitmap = [0u8; DMX_MAX_ADDRESS as usize];

    for address in min.max(DMX_MIN_ADDRESS)..=max.min(DMX_MAX_ADDRESS) {
        bitmap[address as usize - 1] = 1;
    }

    for address in discovered {
        bitmap[address.slot_index()] = 0;
    }

    bitmap
}

/// Sends one poll frame for `min..=max` and listens for a break answer.
///
/// Costs a full 513 byte frame plus up to [POLL_RESPONSE_WINDOW_US] of bus dead time, so it
/// must only run between complete data frames.
pub fn poll_range<D: DmxTransmitter + DmxReceiver>(
    driver: &mut D,
    min: u16,
    max: u16,
    discovered: &[DmxAddress],
) -> Result<bool, DmxError<D::DriverError>> {
    let bitmap = build_poll_bitmap(min, max, discovered);

    driver.send_package(SC_POLL, &bitmap)?;
    driver.release_bus()?;

    let answered = driver.wait_for_break(POLL_RESPONSE_WINDOW_US)?;
    log::trace!("poll {}..={} answered: {}", min, max, answered);

    Ok(answered)
}

/// Blocking binary search census over all dmx addresses.
///
/// While anybody answers a poll of the whole address space, the search starts at
/// `1..=512`. A range that answers is narrowed to its lower half until a single address
/// answers, which gets recorded before starting over. A range that stays silent moves on to
/// the upper half next to it. Found devices are left out of later polls, so each restart
/// finds a new device.
///
/// `on_answer` gets called for every poll that was answered.
///
/// This takes O(log 512) polls per device on a sparse bus and runs to completion, so call it
/// between data frames only.
pub fn run_full_discovery<D: DmxTransmitter + DmxReceiver>(
    driver: &mut D,
    devices: &mut DiscoveredDevices,
    mut on_answer: impl FnMut(),
) -> Result<DiscoveryReport, DmxError<D::DriverError>> {
    devices.clear();
    let mut polls = 0u32;

    let mut poll = |driver: &mut D,
                    min: u16,
                    max: u16,
                    devices: &DiscoveredDevices|
     -> Result<bool, DmxError<D::DriverError>> {
        polls += 1;
        let answered = poll_range(driver, min, max, devices)?;
        if answered {
            on_answer();
        }

        Ok(answered)
    };

    let status = 'census: loop {
        if !poll(driver, DMX_MIN_ADDRESS, DMX_MAX_ADDRESS, devices)? {
            break DiscoveryStatus::Complete;
        }

        let mut min = DMX_MIN_ADDRESS;
        let mut max = DMX_MAX_ADDRESS;

        loop {
            if poll(driver, min, max, devices)? {
                if min == max {
                    // min is inside 1..=512 here
                    let Ok(address) = DmxAddress::new(min) else {
                        break 'census DiscoveryStatus::LostResponder;
                    };

                    if devices.push(address).is_err() {
                        log::warn!("discovery stopped, more than {} devices", devices.len());
                        break 'census DiscoveryStatus::CapacityExceeded;
                    }

                    log::debug!("found device at {}", address);
                    continue 'census;
                }

                max = (min + max - 1) / 2;
            } else {
                let width = max - min;
                min = max + 1;
                max = min + width;

                if min > DMX_MAX_ADDRESS {
                    log::warn!("discovery lost its responder");
                    break 'census DiscoveryStatus::LostResponder;
                }
                max = max.min(DMX_MAX_ADDRESS);
            }
        }
    };

    Ok(DiscoveryReport { status, polls })
}
