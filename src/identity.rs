//! Device identity records and the ODVA vendor / device-type tables.
//!
//! ListIdentity replies (UDP discovery and the TCP GetDeviceProperties
//! path) and GetAttributesAll replies on the Identity object both carry the
//! same attribute block at different fixed offsets; both land in a
//! [`Device`].

use crate::error::{LogixError, Result};

/// Identity record of one EtherNet/IP device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Address the record came from, when known.
    pub ip: Option<String>,
    pub vendor_id: u16,
    /// Vendor name from the ODVA registry, or "Unknown".
    pub vendor: String,
    pub device_type_id: u16,
    /// Device-type name from the ODVA registry, or "Unknown".
    pub device_type: String,
    pub product_code: u16,
    /// Firmware revision rendered as "major.minor".
    pub revision: String,
    pub status: u16,
    /// Serial number rendered as "0xNNNNNNNN".
    pub serial: String,
    pub product_name: String,
    /// Device state byte; only ListIdentity replies carry one.
    pub state: u8,
}

/// Byte offset of the identity attributes within a ListIdentity reply
/// frame: the 24-byte header, the item count, one item header and the
/// encapsulation version plus socket address precede them.
const LIST_IDENTITY_BASE: usize = 48;

/// Byte offset of the identity attributes within a GetAttributesAll reply
/// frame (unconnected messaging, after the 4-byte service header).
const ATTRIBUTES_ALL_BASE: usize = 44;

/// Parses the identity block of a ListIdentity reply frame.
///
/// The layout is fixed: vendor id at 48, device type at 50, product code at
/// 52, revision at 54, status at 56, serial at 58, product name length at
/// 62 with the name following, and the state as the final byte.
pub fn parse_list_identity(frame: &[u8], ip: Option<String>) -> Result<Device> {
    let device = parse_identity_block(frame, LIST_IDENTITY_BASE, ip)?;
    Ok(Device {
        state: *frame.last().unwrap_or(&0),
        ..device
    })
}

/// Parses the identity block of a GetAttributesAll reply frame.
pub fn parse_attributes_all(frame: &[u8], ip: Option<String>) -> Result<Device> {
    parse_identity_block(frame, ATTRIBUTES_ALL_BASE, ip)
}

fn parse_identity_block(frame: &[u8], base: usize, ip: Option<String>) -> Result<Device> {
    if frame.len() < base + 15 {
        return Err(LogixError::Protocol(format!(
            "identity reply too short: {} bytes",
            frame.len()
        )));
    }
    let vendor_id = u16::from_le_bytes([frame[base], frame[base + 1]]);
    let device_type_id = u16::from_le_bytes([frame[base + 2], frame[base + 3]]);
    let product_code = u16::from_le_bytes([frame[base + 4], frame[base + 5]]);
    let major = frame[base + 6];
    let minor = frame[base + 7];
    let status = u16::from_le_bytes([frame[base + 8], frame[base + 9]]);
    let serial = u32::from_le_bytes([
        frame[base + 10],
        frame[base + 11],
        frame[base + 12],
        frame[base + 13],
    ]);
    let name_len = frame[base + 14] as usize;
    let name_start = base + 15;
    if frame.len() < name_start + name_len {
        return Err(LogixError::Protocol("identity product name truncated".to_string()));
    }
    let product_name =
        String::from_utf8_lossy(&frame[name_start..name_start + name_len]).to_string();

    Ok(Device {
        ip,
        vendor_id,
        vendor: vendor_name(vendor_id).to_string(),
        device_type_id,
        device_type: device_type_name(device_type_id).to_string(),
        product_code,
        revision: format!("{}.{}", major, minor),
        status,
        serial: format!("0x{:08X}", serial),
        product_name,
        state: 0,
    })
}

/// ODVA-registered vendor names. Unknown ids render as "Unknown".
pub fn vendor_name(vendor_id: u16) -> &'static str {
    match vendor_id {
        0x0001 => "Rockwell Automation/Allen-Bradley",
        0x0002 => "Namco Controls Corp.",
        0x0003 => "Honeywell Inc.",
        0x0004 => "Parker Hannifin Corp.",
        0x0005 => "Rockwell Automation/Reliance Elec.",
        0x0007 => "SMC Corporation",
        0x000A => "Advanced Micro Controls Inc. (AMCI)",
        0x000B => "ASCO Pneumatic Controls",
        0x000E => "Hach Company",
        0x0010 => "Mettler-Toledo",
        0x0015 => "Carlo Gavazzi Inc.",
        0x001A => "Festo Corporation",
        0x0023 => "Molex Incorporated",
        0x0028 => "Turck",
        0x002D => "WAGO Corporation",
        0x0030 => "Cutler-Hammer",
        0x003E => "Weidmuller, Inc.",
        0x0044 => "Bussmann",
        0x0047 => "Prosoft Technology",
        0x004B => "Spectrum Controls, Inc.",
        0x0053 => "Pepperl + Fuchs",
        0x0058 => "Siemens AG",
        0x005A => "Phoenix Contact",
        0x0062 => "ifm efector, inc.",
        0x006C => "HMS Industrial Networks AB",
        0x007A => "Leuze electronic GmbH",
        0x0081 => "Banner Engineering Corporation",
        0x008A => "Bosch Rexroth",
        0x009E => "Balluff, Inc.",
        0x00A4 => "Danfoss Drives",
        0x00C8 => "Beckhoff Automation",
        0x00FB => "Yaskawa Electric America",
        0x0100 => "Schneider Automation, Inc.",
        0x010B => "Hilscher GmbH",
        0x0114 => "Toshiba International Corp.",
        0x011F => "Moeller GmbH",
        0x0143 => "Eaton Electrical",
        0x01A1 => "Kollmorgen Corporation",
        0x01EE => "Omron Corporation",
        0x024D => "SEW-Eurodrive GmbH",
        0x02CC => "Moxa Inc.",
        0x0356 => "Fanuc Robotics America",
        0x0529 => "Keyence Corporation",
        _ => "Unknown",
    }
}

/// ODVA-registered device-type profile names. Unknown ids render as
/// "Unknown".
pub fn device_type_name(device_type_id: u16) -> &'static str {
    match device_type_id {
        0x0000 => "Generic Device (deprecated)",
        0x0002 => "AC Drive",
        0x0003 => "Motor Overload",
        0x0004 => "Limit Switch",
        0x0005 => "Inductive Proximity Switch",
        0x0006 => "Photoelectric Sensor",
        0x0007 => "General Purpose Discrete I/O",
        0x0009 => "Resolver",
        0x000C => "Communications Adapter",
        0x000E => "Programmable Logic Controller",
        0x0010 => "Position Controller",
        0x0013 => "DC Drive",
        0x0015 => "Contactor",
        0x0016 => "Motor Starter",
        0x0017 => "Soft Start",
        0x0018 => "Human-Machine Interface",
        0x001A => "Mass Flow Controller",
        0x001B => "Pneumatic Valve",
        0x001C => "Vacuum Pressure Gauge",
        0x001D => "Process Control Value",
        0x001E => "Residual Gas Analyzer",
        0x001F => "DC Power Generator",
        0x0020 => "RF Power Generator",
        0x0021 => "Turbomolecular Vacuum Pump",
        0x0022 => "Encoder",
        0x0023 => "Safety Discrete I/O Device",
        0x0024 => "Fluid Flow Controller",
        0x0025 => "CIP Motion Drive",
        0x0026 => "CompoNet Repeater",
        0x0027 => "Mass Flow Controller, Enhanced",
        0x0028 => "CIP Modbus Device",
        0x0029 => "CIP Modbus Translator",
        0x002A => "Safety Analog I/O Device",
        0x002B => "Generic Device (keyable)",
        0x002C => "Managed Switch",
        0x0032 => "ControlNet Physical Layer Component",
        _ => "Unknown",
    }
}
