use crate::consts::{DMX_MAX_ADDRESS, DMX_MIN_ADDRESS, MAX_DISCOVERED_DEVICES};
use modular_bitfield::bitfield;
use modular_bitfield::prelude::{B7, B9};

/// Raised when a value can't be used as a dmx address.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressOutOfRange(pub u16);

impl core::fmt::Display for AddressOutOfRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "address {} is outside of {}..={}",
            self.0, DMX_MIN_ADDRESS, DMX_MAX_ADDRESS
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AddressOutOfRange {}

/// A dmx slot address. Always between 1 and 512.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmxAddress(u16);

impl DmxAddress {
    pub const MIN: DmxAddress = DmxAddress(DMX_MIN_ADDRESS);
    pub const MAX: DmxAddress = DmxAddress(DMX_MAX_ADDRESS);

    pub fn new(address: u16) -> Result<Self, AddressOutOfRange> {
        if !(DMX_MIN_ADDRESS..=DMX_MAX_ADDRESS).contains(&address) {
            return Err(AddressOutOfRange(address));
        }

        Ok(Self(address))
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Position of the slot inside a frame without start code.
    pub fn slot_index(&self) -> usize {
        self.0 as usize - 1
    }
}

impl TryFrom<u16> for DmxAddress {
    type Error = AddressOutOfRange;

    fn try_from(address: u16) -> Result<Self, Self::Error> {
        Self::new(address)
    }
}

impl From<DmxAddress> for u16 {
    fn from(value: DmxAddress) -> Self {
        value.0
    }
}

impl core::fmt::Display for DmxAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses found by a discovery run in the order they were found.
pub type DiscoveredDevices = heapless::Vec<DmxAddress, MAX_DISCOVERED_DEVICES>;

/// Port word of the 9 pin address dip switch. The switches pull to ground, so a closed
/// switch reads as 0.
#[bitfield]
struct AddressSwitchPort {
    inverted_address: B9,
    #[skip]
    reserved: B7,
}

/// Decodes the raw, active low switch word into the 1-based device address.
pub fn decode_address_switch(raw: u16) -> DmxAddress {
    let port = AddressSwitchPort::from_bytes(raw.to_le_bytes());
    let address = (!port.inverted_address() & 0x01FF) + 1;

    // 9 bit value + 1 can't leave 1..=512
    DmxAddress(address)
}

/// The raw switch word that selects `address`. Bits above the switch read as 0.
pub fn encode_address_switch(address: DmxAddress) -> u16 {
    let inverted_address = !(address.as_u16() - 1) & 0x01FF;
    let port = AddressSwitchPort::new().with_inverted_address(inverted_address);

    u16::from_le_bytes(port.into_bytes())
}
