//! Unit identity derived from the ESP32 factory MAC address.
//!
//! - `EM-XXYYZZ` serial label (last 3 MAC bytes, uppercase hex)
//! - `ember-xxyyzz` hostname
//! - a fleet number 0–8 used to tell siblings apart in telemetry

/// Fixed-size device ID string: "EM-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Number of distinct fleet slots.
pub const FLEET_SIZE: u8 = 9;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly six bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    use core::fmt::Write;
    let mut id = DeviceIdString::new();
    let _ = write!(id, "EM-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    use core::fmt::Write;
    let mut name = heapless::String::<24>::new();
    let _ = write!(name, "ember-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// Fleet number from the last MAC byte.
pub fn bot_id(mac: &MacAddress) -> u8 {
    mac[5] % FLEET_SIZE
}
