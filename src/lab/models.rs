use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::common::{one_or_many, scalar, ConfigurationSnafu, Error};

pub(crate) const CONFIGURATION_KEY: &str = "Configuration";
pub(crate) const MACHINE_KEY: &str = "Machine";
pub(crate) const LIST_MACHINES_RESULT: &str = "ListMachinesResult";

/// Library configurations, as opposed to workspace configurations.
pub(crate) const LIBRARY_CONFIGURATION_TYPE: u32 = 2;

/// Remote operations of the Lab Manager service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Operation {
    GetConfiguration,
    GetConfigurationByName,
    ListConfigurations,
    ListMachines,
    ConfigurationClone,
    ConfigurationCheckout,
    ConfigurationDelete,
    ConfigurationUndeploy,
    ConfigurationPerformAction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetConfiguration => "GetConfiguration",
            Operation::GetConfigurationByName => "GetConfigurationByName",
            Operation::ListConfigurations => "ListConfigurations",
            Operation::ListMachines => "ListMachines",
            Operation::ConfigurationClone => "ConfigurationClone",
            Operation::ConfigurationCheckout => "ConfigurationCheckout",
            Operation::ConfigurationDelete => "ConfigurationDelete",
            Operation::ConfigurationUndeploy => "ConfigurationUndeploy",
            Operation::ConfigurationPerformAction => "ConfigurationPerformAction",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action codes accepted by `ConfigurationPerformAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationAction {
    PowerOn = 1,
    PowerOff = 2,
    Suspend = 3,
    Resume = 4,
    Reset = 5,
    Snapshot = 6,
    /// Back to the last snapshot.
    Revert = 7,
    Shutdown = 8,
}

impl ConfigurationAction {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl FromStr for ConfigurationAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "poweron" | "1" => Self::PowerOn,
            "poweroff" | "2" => Self::PowerOff,
            "suspend" | "3" => Self::Suspend,
            "resume" | "4" => Self::Resume,
            "reset" | "5" => Self::Reset,
            "snapshot" | "6" => Self::Snapshot,
            "revert" | "7" => Self::Revert,
            "shutdown" | "8" => Self::Shutdown,
            _ => {
                return ConfigurationSnafu {
                    message: format!("Unknown configuration action {s}"),
                }
                .fail()
            }
        })
    }
}

/// Strips the operation specific result wrapper, if present.
///
/// A mapping whose first key is `Configuration` is already unwrapped.
/// Otherwise the value of the first entry is used.
fn unwrap_result(data: &Value) -> &Value {
    match data.as_object().and_then(|m| m.iter().next()) {
        Some((key, _)) if key == CONFIGURATION_KEY => data,
        Some((_, inner)) => inner,
        None => data,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub id: Option<String>,
    pub name: Option<String>,
    pub deployed: bool,
}

impl Configuration {
    /// Never fails. Without a `Configuration` record the result is the
    /// default value.
    pub fn parse(data: &Value) -> Self {
        one_or_many(unwrap_result(data).get(CONFIGURATION_KEY))
            .first()
            .map(|record| Self::from_record(record))
            .unwrap_or_default()
    }

    /// Parses a listing, which holds zero, one or many records.
    pub fn parse_list(data: &Value) -> Vec<Self> {
        one_or_many(unwrap_result(data).get(CONFIGURATION_KEY))
            .into_iter()
            .map(Self::from_record)
            .collect()
    }

    fn from_record(record: &Value) -> Self {
        Self {
            id: scalar(record, "id"),
            name: scalar(record, "name"),
            deployed: record.get("isDeployed").and_then(Value::as_str) == Some("true"),
        }
    }

    pub fn is_found(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
    pub internal_ip: String,
    pub external_ip: String,
}

impl Machine {
    pub fn from_record(record: &Value) -> Self {
        Self {
            name: scalar(record, "name").unwrap_or_default(),
            internal_ip: scalar(record, "internalIP").unwrap_or_default(),
            external_ip: scalar(record, "externalIP").unwrap_or_default(),
        }
    }

    /// Reads a `ListMachines` response. Missing levels yield no machines.
    pub fn from_list(data: &Value) -> Vec<Self> {
        let machines = data
            .get(LIST_MACHINES_RESULT)
            .and_then(|result| result.get(MACHINE_KEY));
        one_or_many(machines)
            .into_iter()
            .map(Self::from_record)
            .collect()
    }

    pub fn to_csv(&self) -> String {
        format!("{},{},{}", self.name, self.internal_ip, self.external_ip)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MachinesOptions {
    /// Machine names to leave out.
    pub exclude: Vec<String>,
}

impl MachinesOptions {
    pub fn excluding<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Undeploy first if the configuration is deployed.
    pub force: bool,
}
