//! IP-to-region resolution
//!
//! * `trie` - operator-configured CIDR overrides
//! * `database` - GeoIP country/continent lookups
//! * `region` - country/continent to region-name mapping
//! * `resolver` - combines the three with override > GeoIP > default precedence

pub mod database;
pub mod region;
pub mod resolver;
pub mod trie;

pub use database::{GeoDatabase, GeoDatabaseError, MaxMindGeoDatabase};
pub use region::RegionConfig;
pub use resolver::GeoResolver;
pub use trie::{CidrMapping, CidrTrie, MappingOrigin};
