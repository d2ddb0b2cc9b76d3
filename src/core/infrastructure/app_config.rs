use crate::model::config::{Config, ConfigTable, ScheduleEntry};
use crate::model::context::{OriginContext, ServiceEndpoint};
use crate::model::error::Error;
use crate::model::error::system::SystemError;
use std::collections::HashSet;
use std::fs;
use std::ops::Deref;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct AppConfig {
    config: Config,
    origin: OriginContext,
    endpoint: ServiceEndpoint,
    schedules: Vec<ScheduleEntry>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let toml_string = fs::read_to_string(path).map_err(SystemError::ConfigNotFound)?;
        Self::parse(&toml_string)
    }

    pub fn parse(toml_string: &str) -> Result<Self, Error> {
        let table = toml::from_str::<ConfigTable>(toml_string).map_err(SystemError::InvalidConfig)?;
        let app_config = Self {
            config: table.config,
            origin: table.origin,
            endpoint: table.server,
            schedules: table.schedules,
        };
        app_config.validate()?;
        app_config.validate_schedules()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), SystemError> {
        if !(1..=3600).contains(&self.config.tick_interval) {
            return Err(SystemError::InvalidConfigValue("tick_interval"));
        }
        if self.config.destination_sync_interval == 0 {
            return Err(SystemError::InvalidConfigValue("destination_sync_interval"));
        }
        if self.config.transfer_timeout == 0 {
            return Err(SystemError::InvalidConfigValue("transfer_timeout"));
        }
        if self.config.max_concurrency == 0 {
            return Err(SystemError::InvalidConfigValue("max_concurrency"));
        }
        if self.endpoint.url.trim().is_empty() {
            return Err(SystemError::InvalidConfigValue("url"));
        }
        if self.endpoint.request_timeout == 0 {
            return Err(SystemError::InvalidConfigValue("request_timeout"));
        }
        Ok(())
    }

    fn validate_schedules(&self) -> Result<(), Error> {
        let mut names = HashSet::new();
        for entry in &self.schedules {
            if entry.name.trim().is_empty() || !names.insert(entry.name.as_str()) {
                return Err(SystemError::InvalidConfigValue("Schedule.name").into());
            }
            entry.to_schedule()?;
        }
        Ok(())
    }

    pub fn origin(&self) -> &OriginContext {
        &self.origin
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub fn schedules(&self) -> &[ScheduleEntry] {
        &self.schedules
    }

    pub fn find_schedule(&self, name: &str) -> Option<&ScheduleEntry> {
        self.schedules.iter().find(|entry| entry.name == name)
    }
}

impl Deref for AppConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}
