//! Call to dispatching payload
//!
//! A device announces that it wants to be read out by sending a CALL
//! envelope. Its payload is a little-endian structure describing the device
//! and its modem. Only structure version 2 and newer carry the device serial
//! number, which the gateway needs to look up the readout settings.

use bytes::{BufMut, BytesMut};
use elgas_core::{ElgasError, ElgasResult};
use std::net::Ipv4Addr;

/// Length of the version 1 part of the structure (including the length field)
const V1_LENGTH: usize = 91;

/// Minimum length of a version 2 structure: serial number and IP address
const V2_MIN_LENGTH: usize = V1_LENGTH + 8;

/// Full version 2 structure including firmware string
const V2_FULL_LENGTH: usize = 140;

const STATION_ID_LENGTH: usize = 17;
const FIRMWARE_LENGTH: usize = 32;

/// Decoded call to dispatching payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub structure_version: u8,
    pub guid: [u8; 16],
    pub station_id: String,
    pub imsi: [u8; 10],
    pub modem_id: [u8; 8],
    pub protocol: u8,
    pub address_1: u16,
    pub address_2: u8,
    pub signal_strength: u8,
    pub gprs_connections: u32,
    pub last_gprs_connection: u32,
    pub gprs_errors: u32,
    pub last_gprs_error: u32,
    pub resets: u32,
    pub last_reset: u32,
    pub tcp_data: u32,
    pub all_data: u32,
    pub serial_number: u32,
    pub ip_address: Ipv4Addr,
    pub last_module_error: u32,
    pub last_modem_error: u8,
    pub battery_capacity: u16,
    pub battery_voltage: u16,
    pub firmware: Option<String>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N));
        out
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }
}

fn nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn nul_padded(value: &str, length: usize) -> Vec<u8> {
    let mut out = value.as_bytes().to_vec();
    out.truncate(length);
    out.resize(length, 0);
    out
}

impl CallRequest {
    /// Decode the payload of a CALL envelope
    ///
    /// # Errors
    /// Returns `InvalidData` if the payload is shorter than its structure
    /// version requires, or if it is a version 1 structure, which carries no
    /// serial number.
    pub fn decode(data: &[u8]) -> ElgasResult<Self> {
        if data.len() < 3 {
            return Err(ElgasError::InvalidData(format!(
                "Call payload too short: {} bytes",
                data.len()
            )));
        }
        let structure_version = data[2];
        if structure_version < 2 {
            return Err(ElgasError::InvalidData(format!(
                "Call structure version {} carries no serial number",
                structure_version
            )));
        }
        if data.len() < V2_MIN_LENGTH {
            return Err(ElgasError::InvalidData(format!(
                "Call payload too short for structure version {}: expected at least {}, got {}",
                structure_version,
                V2_MIN_LENGTH,
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let _structure_length = cursor.u16();
        let _version = cursor.u8();
        let guid = cursor.array();
        let station_id = nul_terminated(cursor.take(STATION_ID_LENGTH));
        let imsi = cursor.array();
        let modem_id = cursor.array();
        let protocol = cursor.u8();
        let address_1 = cursor.u16();
        let address_2 = cursor.u8();
        let signal_strength = cursor.u8();
        let gprs_connections = cursor.u32();
        let last_gprs_connection = cursor.u32();
        let gprs_errors = cursor.u32();
        let last_gprs_error = cursor.u32();
        let resets = cursor.u32();
        let last_reset = cursor.u32();
        let tcp_data = cursor.u32();
        let all_data = cursor.u32();
        let serial_number = cursor.u32();
        let ip: [u8; 4] = cursor.array();

        let (last_module_error, last_modem_error, battery_capacity, battery_voltage, firmware) =
            if data.len() >= V2_FULL_LENGTH {
                (
                    cursor.u32(),
                    cursor.u8(),
                    cursor.u16(),
                    cursor.u16(),
                    Some(nul_terminated(cursor.take(FIRMWARE_LENGTH))),
                )
            } else {
                (0, 0, 0, 0, None)
            };

        if cursor.remaining() > 0 {
            log::debug!("Ignoring {} trailing call payload bytes", cursor.remaining());
        }

        Ok(Self {
            structure_version,
            guid,
            station_id,
            imsi,
            modem_id,
            protocol,
            address_1,
            address_2,
            signal_strength,
            gprs_connections,
            last_gprs_connection,
            gprs_errors,
            last_gprs_error,
            resets,
            last_reset,
            tcp_data,
            all_data,
            serial_number,
            ip_address: Ipv4Addr::from(ip),
            last_module_error,
            last_modem_error,
            battery_capacity,
            battery_voltage,
            firmware,
        })
    }

    /// Encode the payload as a device would send it
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(V2_FULL_LENGTH);
        let length = if self.firmware.is_some() { V2_FULL_LENGTH } else { V2_MIN_LENGTH };
        buf.put_u16_le(length as u16);
        buf.put_u8(self.structure_version);
        buf.put_slice(&self.guid);
        buf.put_slice(&nul_padded(&self.station_id, STATION_ID_LENGTH));
        buf.put_slice(&self.imsi);
        buf.put_slice(&self.modem_id);
        buf.put_u8(self.protocol);
        buf.put_u16_le(self.address_1);
        buf.put_u8(self.address_2);
        buf.put_u8(self.signal_strength);
        buf.put_u32_le(self.gprs_connections);
        buf.put_u32_le(self.last_gprs_connection);
        buf.put_u32_le(self.gprs_errors);
        buf.put_u32_le(self.last_gprs_error);
        buf.put_u32_le(self.resets);
        buf.put_u32_le(self.last_reset);
        buf.put_u32_le(self.tcp_data);
        buf.put_u32_le(self.all_data);
        buf.put_u32_le(self.serial_number);
        buf.put_slice(&self.ip_address.octets());
        if let Some(firmware) = &self.firmware {
            buf.put_u32_le(self.last_module_error);
            buf.put_u8(self.last_modem_error);
            buf.put_u16_le(self.battery_capacity);
            buf.put_u16_le(self.battery_voltage);
            buf.put_slice(&nul_padded(firmware, FIRMWARE_LENGTH));
        }
        buf.to_vec()
    }

    /// IMSI of the modem SIM card as hex digits
    pub fn imsi_hex(&self) -> String {
        self.imsi.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Modem identifier as hex digits
    pub fn modem_id_hex(&self) -> String {
        self.modem_id.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Minimal version 2 call payload for a device serial number
    pub fn for_serial(serial_number: u32, station_id: &str) -> Self {
        Self {
            structure_version: 2,
            guid: [0; 16],
            station_id: station_id.to_string(),
            imsi: [0; 10],
            modem_id: [0; 8],
            protocol: 0,
            address_1: 0,
            address_2: 0,
            signal_strength: 0,
            gprs_connections: 0,
            last_gprs_connection: 0,
            gprs_errors: 0,
            last_gprs_error: 0,
            resets: 0,
            last_reset: 0,
            tcp_data: 0,
            all_data: 0,
            serial_number,
            ip_address: Ipv4Addr::UNSPECIFIED,
            last_module_error: 0,
            last_modem_error: 0,
            battery_capacity: 0,
            battery_voltage: 0,
            firmware: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Payload of a call frame captured from a field device (unescaped)
    fn captured_payload() -> Vec<u8> {
        [
            &b"\x8d\x00"[..],
            b"\x02",
            b"@\xa4\x94\xdd\x96\xce\x1b\xb7\x19Ad\xd5jo\x80\xa4",
            b"0000000000000001\x00",
            b"#\x82\x08p\x10cCx\x00\x00",
            b"\x03Y\x07s g\x06Q",
            b"\x00",
            b"\x01\x00",
            b"\x00",
            b"\x1f",
            b"\x06\x00\x00\x00",
            b"\x9e+b-",
            b"\x00\x00\x00\x00",
            b"\x00\x00\x00\x00",
            b"\x01\x00\x00\x00",
            b"\x91\xca\xaf,",
            b"\x98\x00\x00\x00",
            b"\x00\x00\x00\x00",
            b",@\x8c\x8c",
            b"\nGJK",
            b"\x1d*b-",
            b"\x01",
            b"z\xfe",
            b"\xcd\x01",
            b"01.000",
            &[0u8; 26],
        ]
        .concat()
    }

    #[test]
    fn test_decode_captured_call() {
        let call = CallRequest::decode(&captured_payload()).unwrap();
        assert_eq!(call.structure_version, 2);
        assert_eq!(call.station_id, "0000000000000001");
        assert_eq!(call.imsi_hex(), "23820870106343780000");
        assert_eq!(call.modem_id_hex(), "0359077320670651");
        assert_eq!(call.address_1, 1);
        assert_eq!(call.signal_strength, 31);
        assert_eq!(call.gprs_connections, 6);
        assert_eq!(call.resets, 1);
        assert_eq!(call.serial_number, 0x8c8c402c);
        assert_eq!(call.ip_address, Ipv4Addr::new(10, 71, 74, 75));
        assert_eq!(call.battery_voltage, 0x01cd);
        assert_eq!(call.firmware.as_deref(), Some("01.000"));
    }

    #[test]
    fn test_decode_minimal_version_2() {
        let call = CallRequest::for_serial(1, "0000000000000001");
        let decoded = CallRequest::decode(&call.encode()).unwrap();
        assert_eq!(decoded.serial_number, 1);
        assert_eq!(decoded.station_id, "0000000000000001");
        assert_eq!(decoded.firmware, None);
    }

    #[test]
    fn test_decode_rejects_version_1() {
        let mut payload = captured_payload();
        payload[2] = 1;
        assert!(matches!(CallRequest::decode(&payload), Err(ElgasError::InvalidData(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let payload = captured_payload();
        assert!(CallRequest::decode(&payload[..60]).is_err());
        assert!(CallRequest::decode(&payload[..2]).is_err());
    }
}
