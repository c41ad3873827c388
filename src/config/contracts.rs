use super::{parse_var, ConfigError};
use crate::models::Address;

#[derive(Clone, Debug)]
pub struct ContractsConfig {
    pub app_address: Address,
    /// Enables the data contract event monitor when set
    pub data_address: Option<Address>,
}

impl ContractsConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_address = parse_var(lookup, "FLIGHT_SURETY_APP_ADDRESS")?
            .ok_or(ConfigError::Missing("FLIGHT_SURETY_APP_ADDRESS"))?;
        let data_address = parse_var(lookup, "FLIGHT_SURETY_DATA_ADDRESS")?;

        Ok(Self {
            app_address,
            data_address,
        })
    }
}
