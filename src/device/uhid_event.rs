//! Wire format of `struct uhid_event` from `<linux/uhid.h>`.
//!
//! Every record starts with a native-endian `u32` type followed by a packed
//! union. Requests are written with only the bytes their payload needs; the
//! kernel zero-fills the rest. Events are read into a full-size buffer.

use crate::config::DeviceConfig;

/// `sizeof(struct uhid_event)`: 4-byte type plus the largest union member (`uhid_create2_req`).
pub const UHID_EVENT_SIZE: usize = 4376;

/// `HID_MAX_DESCRIPTOR_SIZE`, also the payload limit of input and output reports.
pub const UHID_DATA_MAX: usize = 4096;

const NAME_LEN: usize = 128;
const BUS_USB: u16 = 0x03;

// uhid_create2_req offsets, relative to the start of the event
const CREATE2_NAME: usize = 4;
const CREATE2_RD_SIZE: usize = 260;
const CREATE2_BUS: usize = 262;
const CREATE2_VENDOR: usize = 264;
const CREATE2_PRODUCT: usize = 268;
const CREATE2_RD_DATA: usize = 280;

// uhid_output_req trailer
const OUTPUT_SIZE: usize = 4 + UHID_DATA_MAX;
const OUTPUT_RTYPE: usize = OUTPUT_SIZE + 2;

/// `enum uhid_event_type`; the legacy variants are never written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum UhidEventType {
    Destroy = 1,
    Start = 2,
    Stop = 3,
    Open = 4,
    Close = 5,
    Output = 6,
    GetReport = 9,
    GetReportReply = 10,
    Create2 = 11,
    Input2 = 12,
    SetReport = 13,
    SetReportReply = 14,
}

impl UhidEventType {
    fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::Destroy,
            2 => Self::Start,
            3 => Self::Stop,
            4 => Self::Open,
            5 => Self::Close,
            6 => Self::Output,
            9 => Self::GetReport,
            10 => Self::GetReportReply,
            11 => Self::Create2,
            12 => Self::Input2,
            13 => Self::SetReport,
            14 => Self::SetReportReply,
            _ => return None,
        })
    }
}

/// Records written to the kernel
#[derive(Debug)]
pub enum UhidRequest<'a> {
    Create2 {
        config: &'a DeviceConfig,
        descriptor: &'a [u8],
    },
    Input2 {
        data: &'a [u8],
    },
    Destroy,
    GetReportReply {
        id: u32,
        err: u16,
    },
    SetReportReply {
        id: u32,
        err: u16,
    },
}

impl UhidRequest<'_> {
    /// Serializes the request. Payloads longer than the kernel limits are truncated.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            UhidRequest::Create2 { config, descriptor } => {
                let rd_size = descriptor.len().min(UHID_DATA_MAX);
                let mut buf = header(UhidEventType::Create2, CREATE2_RD_DATA + rd_size);

                // NUL-terminated; the buffer is already zeroed.
                let name = config.device_name.as_bytes();
                let name_len = name.len().min(NAME_LEN - 1);
                buf[CREATE2_NAME..CREATE2_NAME + name_len].copy_from_slice(&name[..name_len]);

                put_u16(&mut buf, CREATE2_RD_SIZE, rd_size as u16);
                put_u16(&mut buf, CREATE2_BUS, BUS_USB);
                put_u32(&mut buf, CREATE2_VENDOR, u32::from(config.vendor_id));
                put_u32(&mut buf, CREATE2_PRODUCT, u32::from(config.product_id));
                // version and country stay zero
                buf[CREATE2_RD_DATA..].copy_from_slice(&descriptor[..rd_size]);
                buf
            }
            UhidRequest::Input2 { data } => {
                let size = data.len().min(UHID_DATA_MAX);
                let mut buf = header(UhidEventType::Input2, 6 + size);
                put_u16(&mut buf, 4, size as u16);
                buf[6..].copy_from_slice(&data[..size]);
                buf
            }
            UhidRequest::Destroy => header(UhidEventType::Destroy, 4),
            UhidRequest::GetReportReply { id, err } => {
                let mut buf = header(UhidEventType::GetReportReply, 12);
                put_u32(&mut buf, 4, *id);
                put_u16(&mut buf, 8, *err);
                // size = 0, no data
                buf
            }
            UhidRequest::SetReportReply { id, err } => {
                let mut buf = header(UhidEventType::SetReportReply, 10);
                put_u32(&mut buf, 4, *id);
                put_u16(&mut buf, 8, *err);
                buf
            }
        }
    }
}

/// Records read from the kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UhidEvent {
    Start { dev_flags: u64 },
    Stop,
    Open,
    Close,
    Output { rtype: u8, size: u16 },
    GetReport { id: u32, rnum: u8, rtype: u8 },
    SetReport { id: u32, rnum: u8, rtype: u8 },
    Unknown(u32),
}

impl UhidEvent {
    /// Parses one record. Returns `None` when the buffer is too short for its type.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let raw = get_u32(buf, 0)?;
        let event = match UhidEventType::from_raw(raw) {
            Some(UhidEventType::Start) => UhidEvent::Start {
                dev_flags: get_u64(buf, 4)?,
            },
            Some(UhidEventType::Stop) => UhidEvent::Stop,
            Some(UhidEventType::Open) => UhidEvent::Open,
            Some(UhidEventType::Close) => UhidEvent::Close,
            Some(UhidEventType::Output) => UhidEvent::Output {
                size: get_u16(buf, OUTPUT_SIZE)?,
                rtype: *buf.get(OUTPUT_RTYPE)?,
            },
            Some(UhidEventType::GetReport) => UhidEvent::GetReport {
                id: get_u32(buf, 4)?,
                rnum: *buf.get(8)?,
                rtype: *buf.get(9)?,
            },
            Some(UhidEventType::SetReport) => UhidEvent::SetReport {
                id: get_u32(buf, 4)?,
                rnum: *buf.get(8)?,
                rtype: *buf.get(9)?,
            },
            _ => UhidEvent::Unknown(raw),
        };
        Some(event)
    }
}

fn header(kind: UhidEventType, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    put_u32(&mut buf, 0, kind as u32);
    buf
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_ne_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

fn get_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + 2)?;
    Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
}

fn get_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn get_u64(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = buf.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_ne_bytes(bytes))
}
