//! GeoIP database lookups
//!
//! Second stage of region resolution, consulted when no CIDR override
//! matches. Wraps `maxminddb` the way the teacher wraps external data
//! sources elsewhere in `dns::client` — a thin trait so the rest of the
//! crate doesn't depend on the `maxminddb` types directly, and so tests can
//! substitute a fake.

use std::net::IpAddr;
use std::path::Path;

use derive_more::{Display, Error, From};
use maxminddb::geoip2;

#[derive(Debug, Display, From, Error)]
pub enum GeoDatabaseError {
    #[display(fmt = "failed to open geoip database: {}", _0)]
    Open(#[error(not(source))] String),

    #[display(fmt = "geoip lookup failed: {}", _0)]
    Lookup(#[error(not(source))] String),
}

/// Read-only access to a GeoIP country/continent database
pub trait GeoDatabase: Send + Sync {
    /// ISO continent code, e.g. "NA", "EU", if the address resolves
    fn continent(&self, address: IpAddr) -> Option<String>;

    /// ISO country code, e.g. "US", "DE", if the address resolves
    fn country(&self, address: IpAddr) -> Option<String>;
}

/// `GeoDatabase` backed by a MaxMind GeoLite2/GeoIP2 Country database
pub struct MaxMindGeoDatabase {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindGeoDatabase {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeoDatabaseError> {
        let reader = maxminddb::Reader::open_readfile(path)
            .map_err(|e| GeoDatabaseError::Open(e.to_string()))?;
        Ok(MaxMindGeoDatabase { reader })
    }
}

impl GeoDatabase for MaxMindGeoDatabase {
    fn continent(&self, address: IpAddr) -> Option<String> {
        let record: geoip2::Country = self.reader.lookup(address).ok()?;
        record
            .continent
            .and_then(|c| c.code)
            .map(|code| code.to_string())
    }

    fn country(&self, address: IpAddr) -> Option<String> {
        let record: geoip2::Country = self.reader.lookup(address).ok()?;
        record
            .country
            .and_then(|c| c.iso_code)
            .map(|code| code.to_string())
    }
}
