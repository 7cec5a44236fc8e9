//! Region configuration: maps GeoIP country/continent codes to the region
//! names services are configured with.

use std::collections::HashMap;

/// Maps ISO country and continent codes onto operator-defined region names
#[derive(Debug, Clone, Default)]
pub struct RegionConfig {
    by_country: HashMap<String, String>,
    by_continent: HashMap<String, String>,
    pub default_region: Option<String>,
}

impl RegionConfig {
    pub fn new() -> Self {
        RegionConfig::default()
    }

    pub fn map_country(&mut self, country_code: impl Into<String>, region: impl Into<String>) {
        self.by_country.insert(country_code.into(), region.into());
    }

    pub fn map_continent(&mut self, continent_code: impl Into<String>, region: impl Into<String>) {
        self.by_continent
            .insert(continent_code.into(), region.into());
    }

    /// Resolve a region name from a country code, falling back to a
    /// continent code, then the configured default region.
    pub fn resolve(&self, country: Option<&str>, continent: Option<&str>) -> Option<String> {
        if let Some(country) = country {
            if let Some(region) = self.by_country.get(country) {
                return Some(region.clone());
            }
        }
        if let Some(continent) = continent {
            if let Some(region) = self.by_continent.get(continent) {
                return Some(region.clone());
            }
        }
        self.default_region.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_takes_precedence_over_continent() {
        let mut config = RegionConfig::new();
        config.map_country("US", "us-east");
        config.map_continent("NA", "north-america");

        assert_eq!(
            config.resolve(Some("US"), Some("NA")),
            Some("us-east".to_string())
        );
    }

    #[test]
    fn falls_back_to_continent_then_default() {
        let mut config = RegionConfig::new();
        config.map_continent("EU", "eu-west");
        config.default_region = Some("global".to_string());

        assert_eq!(
            config.resolve(Some("DE"), Some("EU")),
            Some("eu-west".to_string())
        );
        assert_eq!(config.resolve(Some("ZZ"), Some("AQ")), Some("global".to_string()));
    }
}
