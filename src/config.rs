use rusoto_signature::Region;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REGION: Region = Region::ApSoutheast1;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub region: Region,
}

#[derive(Debug)]
pub struct ConfigError(String);

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConfigError: {}", self.0)
    }
}

impl Config {
    /// Reads `EC2_REGION` from the environment (or `.env`), falling back to
    /// ap-southeast-1. Credentials are left to the profile provider.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_region(dotenvy::var("EC2_REGION").ok().as_deref())
    }

    fn from_region(region: Option<&str>) -> Result<Self, ConfigError> {
        let region = match region.map(str::trim) {
            None | Some("") => DEFAULT_REGION,
            Some(name) => Region::from_str(name)
                .map_err(|_| ConfigError(format!("Invalid region: {}", name)))?,
        };

        Ok(Config { region })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region() {
        let config = Config::from_region(None).unwrap();
        assert_eq!(config.region, Region::ApSoutheast1);

        let config = Config::from_region(Some("  ")).unwrap();
        assert_eq!(config.region, Region::ApSoutheast1);
    }

    #[test]
    fn test_region_override() {
        let config = Config::from_region(Some("us-east-1")).unwrap();
        assert_eq!(config.region, Region::UsEast1);
    }

    #[test]
    fn test_invalid_region() {
        let err = Config::from_region(Some("mars-north-1")).unwrap_err();
        assert_eq!(err.to_string(), "ConfigError: Invalid region: mars-north-1");
    }
}
