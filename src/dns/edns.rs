//! EDNS0 (RFC 6891) and EDNS Client Subnet (RFC 7871) support
//!
//! Trimmed from the teacher's fuller EDNS0 module to the two things this
//! server actually needs off the OPT record: an extended UDP size, and the
//! client subnet used to geolocate the query. Cookies, padding, extended
//! errors and NSID have no counterpart here and are dropped.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::dns::errors::GslbError;
use crate::dns::protocol::DnsRecord;

const OPT_CODE_CLIENT_SUBNET: u16 = 8;

/// Client Subnet Option (RFC 7871)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSubnetOption {
    /// Address family (1 = IPv4, 2 = IPv6)
    pub family: u16,
    pub source_prefix_len: u8,
    pub scope_prefix_len: u8,
    pub address: IpAddr,
}

impl ClientSubnetOption {
    pub fn new(address: IpAddr, prefix_len: u8) -> Self {
        let family = match address {
            IpAddr::V4(_) => 1,
            IpAddr::V6(_) => 2,
        };

        Self {
            family,
            source_prefix_len: prefix_len,
            scope_prefix_len: 0,
            address,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::new();

        data.extend_from_slice(&self.family.to_be_bytes());
        data.push(self.source_prefix_len);
        data.push(self.scope_prefix_len);

        let byte_len = ((self.source_prefix_len as usize) + 7) / 8;
        match self.address {
            IpAddr::V4(addr) => data.extend_from_slice(&addr.octets()[..byte_len.min(4)]),
            IpAddr::V6(addr) => data.extend_from_slice(&addr.octets()[..byte_len.min(16)]),
        }

        data
    }

    pub fn parse(data: &[u8]) -> Result<Self, GslbError> {
        if data.len() < 4 {
            return Err(GslbError::FormatError);
        }

        let family = u16::from_be_bytes([data[0], data[1]]);
        let source_prefix_len = data[2];
        let scope_prefix_len = data[3];
        let byte_len = ((source_prefix_len as usize) + 7) / 8;

        let address = match family {
            1 => {
                let mut bytes = [0u8; 4];
                let avail = byte_len.min(4).min(data.len().saturating_sub(4));
                bytes[..avail].copy_from_slice(&data[4..4 + avail]);
                IpAddr::V4(Ipv4Addr::from(bytes))
            }
            2 => {
                let mut bytes = [0u8; 16];
                let avail = byte_len.min(16).min(data.len().saturating_sub(4));
                bytes[..avail].copy_from_slice(&data[4..4 + avail]);
                IpAddr::V6(Ipv6Addr::from(bytes))
            }
            _ => return Err(GslbError::FormatError),
        };

        Ok(Self {
            family,
            source_prefix_len,
            scope_prefix_len,
            address,
        })
    }
}

/// EDNS0 record (OPT pseudo-record)
#[derive(Debug, Clone)]
pub struct EdnsRecord {
    pub udp_size: u16,
    pub extended_rcode: u8,
    pub version: u8,
    pub dnssec_ok: bool,
    pub z: u16,
    pub client_subnet: Option<ClientSubnetOption>,
}

impl Default for EdnsRecord {
    fn default() -> Self {
        Self {
            udp_size: 4096,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
            z: 0,
            client_subnet: None,
        }
    }
}

impl EdnsRecord {
    pub fn new(udp_size: u16) -> Self {
        Self {
            udp_size,
            ..Default::default()
        }
    }

    pub fn add_client_subnet(&mut self, address: IpAddr, prefix_len: u8) {
        self.client_subnet = Some(ClientSubnetOption::new(address, prefix_len));
    }

    fn build_flags(&self) -> u32 {
        let mut flags = 0u32;
        flags |= (self.extended_rcode as u32) << 24;
        flags |= (self.version as u32) << 16;
        if self.dnssec_ok {
            flags |= 0x8000;
        }
        flags |= self.z as u32;
        flags
    }

    /// Convert to a DNS OPT record, ready to append to a packet's additional
    /// section
    pub fn to_opt_record(&self) -> DnsRecord {
        let mut rdata = Vec::new();

        if let Some(ref cs) = self.client_subnet {
            let data = cs.serialize();
            rdata.extend_from_slice(&OPT_CODE_CLIENT_SUBNET.to_be_bytes());
            rdata.extend_from_slice(&(data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(&data);
        }

        DnsRecord::Opt {
            packet_len: self.udp_size,
            flags: self.build_flags(),
            data: base64::encode(&rdata),
        }
    }

    /// Parse an EDNS record out of an OPT pseudo-record
    pub fn from_opt_record(record: &DnsRecord) -> Option<Self> {
        if let DnsRecord::Opt { packet_len, flags, data } = record {
            let data_bytes = base64::decode(data).unwrap_or_default();
            let mut edns = Self {
                udp_size: *packet_len,
                extended_rcode: ((flags >> 24) & 0xFF) as u8,
                version: ((flags >> 16) & 0xFF) as u8,
                dnssec_ok: (flags & 0x8000) != 0,
                z: (flags & 0x7FFF) as u16,
                client_subnet: None,
            };

            let mut offset = 0;
            while offset + 4 <= data_bytes.len() {
                let code = u16::from_be_bytes([data_bytes[offset], data_bytes[offset + 1]]);
                let len =
                    u16::from_be_bytes([data_bytes[offset + 2], data_bytes[offset + 3]]) as usize;
                offset += 4;

                if offset + len > data_bytes.len() {
                    break;
                }

                let option_data = &data_bytes[offset..offset + len];
                offset += len;

                if code == OPT_CODE_CLIENT_SUBNET {
                    if let Ok(cs) = ClientSubnetOption::parse(option_data) {
                        edns.client_subnet = Some(cs);
                    }
                }
            }

            Some(edns)
        } else {
            None
        }
    }
}

/// EDNS0-aware packet helpers
pub struct EdnsProcessor;

impl EdnsProcessor {
    /// Look for an OPT record in a request's additional section
    pub fn process_incoming(resources: &[DnsRecord]) -> Option<EdnsRecord> {
        resources.iter().find_map(EdnsRecord::from_opt_record)
    }

    /// Extract the client subnet address, if the client sent one
    pub fn handle_client_subnet(edns: &EdnsRecord) -> Option<IpAddr> {
        edns.client_subnet.as_ref().map(|cs| cs.address)
    }
}
