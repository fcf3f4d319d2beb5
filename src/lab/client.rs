use serde_json::Value;
use snafu::prelude::*;

use crate::common::{
    scalar, AlreadyDeployedSnafu, AuthenticationHeader, ResponseSnafu, Result, Transport,
    UnknownConfigurationSnafu,
};
use crate::credentials::Credentials;
use crate::soap::SoapTransport;

use super::models::{
    Configuration, ConfigurationAction, DeleteOptions, Machine, MachinesOptions, Operation,
    LIBRARY_CONFIGURATION_TYPE,
};

/// Client for a Lab Manager server.
///
/// Every method issues blocking remote calls in sequence. Configurations can
/// be addressed by name or, when the identifier is all digits, by id.
pub struct LabManager<T: Transport = SoapTransport> {
    transport: T,
    credentials: Credentials,
    organization: String,
    workspace: Option<String>,
}

impl LabManager<SoapTransport> {
    pub fn new(organization: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let transport = SoapTransport::new(credentials.url())?;
        Ok(Self::with_transport(organization, credentials, transport))
    }
}

fn is_configuration_id(name_or_id: &str) -> bool {
    !name_or_id.is_empty() && name_or_id.bytes().all(|b| b.is_ascii_digit())
}

impl<T: Transport> LabManager<T> {
    pub fn with_transport(
        organization: impl Into<String>,
        credentials: Credentials,
        transport: T,
    ) -> Self {
        Self {
            transport,
            credentials,
            organization: organization.into(),
            workspace: None,
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn set_workspace(&mut self, workspace: Option<String>) {
        self.workspace = workspace;
    }

    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn auth(&self) -> AuthenticationHeader<'_> {
        AuthenticationHeader {
            username: self.credentials.username(),
            password: self.credentials.password(),
            organization: &self.organization,
            workspace: self.workspace.as_deref(),
        }
    }

    fn call(&self, operation: Operation, params: &[(&str, String)]) -> Result<Value> {
        self.transport.call(&self.auth(), operation.as_str(), params)
    }

    /// Looks up a configuration and requires it to exist.
    fn resolve(&self, name_or_id: &str) -> Result<(String, Configuration)> {
        let configuration = self.configuration(name_or_id)?;
        let id = configuration
            .id
            .clone()
            .context(UnknownConfigurationSnafu { name: name_or_id })?;
        Ok((id, configuration))
    }

    /// Reads the id of a newly created configuration from `key`.
    fn created_id(operation: Operation, data: &Value, key: &str) -> Result<String> {
        scalar(data, key).context(ResponseSnafu {
            message: format!("{operation} response has no {key}"),
        })
    }

    pub fn configuration(&self, name_or_id: &str) -> Result<Configuration> {
        let data = if is_configuration_id(name_or_id) {
            self.call(
                Operation::GetConfiguration,
                &[("configurationId", name_or_id.to_string())],
            )?
        } else {
            self.call(
                Operation::GetConfigurationByName,
                &[("name", name_or_id.to_string())],
            )?
        };
        Ok(Configuration::parse(&data))
    }

    /// Lists the library configurations.
    pub fn configurations(&self) -> Result<Vec<Configuration>> {
        let data = self.call(
            Operation::ListConfigurations,
            &[("configurationType", LIBRARY_CONFIGURATION_TYPE.to_string())],
        )?;
        Ok(Configuration::parse_list(&data))
    }

    /// Lists the machines of a configuration, in server order.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use labmanager_rs::{Credentials, LabManager, MachinesOptions};
    /// # fn main() -> labmanager_rs::Result<()> {
    /// let lab = LabManager::new("POS", Credentials::resolve_default(Default::default())?)?;
    /// let machines = lab.machines("CONFIG NAME", &MachinesOptions::excluding(["router"]))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn machines(&self, configuration_name: &str, options: &MachinesOptions) -> Result<Vec<Machine>> {
        let (id, _) = self.resolve(configuration_name)?;

        let data = self.call(Operation::ListMachines, &[("configurationId", id)])?;

        let machines: Vec<Machine> = Machine::from_list(&data)
            .into_iter()
            .filter(|machine| !options.exclude.contains(&machine.name))
            .collect();

        tracing::debug!(
            configuration = configuration_name,
            machines = machines.len(),
            "Listed machines"
        );

        Ok(machines)
    }

    /// Finds a machine by exact name. Absent arguments yield `None` without
    /// contacting the server.
    pub fn machine(
        &self,
        configuration_name: Option<&str>,
        machine_name: Option<&str>,
    ) -> Result<Option<Machine>> {
        let (Some(configuration_name), Some(machine_name)) = (configuration_name, machine_name)
        else {
            return Ok(None);
        };

        Ok(self
            .machines(configuration_name, &MachinesOptions::default())?
            .into_iter()
            .find(|machine| machine.name == machine_name))
    }

    /// Copies a configuration and returns the id of the copy.
    pub fn clone(&self, configuration_name: &str, new_name: &str) -> Result<String> {
        let (id, _) = self.resolve(configuration_name)?;

        tracing::info!(
            configuration = configuration_name,
            new_name = new_name,
            "Cloning configuration"
        );

        let data = self.call(
            Operation::ConfigurationClone,
            &[("configurationId", id), ("newWorkspaceName", new_name.to_string())],
        )?;

        Self::created_id(Operation::ConfigurationClone, &data, "ConfigurationCloneResult")
    }

    /// Checks a library configuration out into the workspace and returns the
    /// id of the new configuration.
    pub fn checkout(&self, configuration_name: &str, new_name: &str) -> Result<String> {
        let (id, _) = self.resolve(configuration_name)?;

        tracing::info!(
            configuration = configuration_name,
            new_name = new_name,
            "Checking out configuration"
        );

        let data = self.call(
            Operation::ConfigurationCheckout,
            &[("configurationId", id), ("workspaceName", new_name.to_string())],
        )?;

        Self::created_id(Operation::ConfigurationCheckout, &data, "ConfigurationCheckoutResult")
    }

    pub fn undeploy(&self, configuration_name: &str) -> Result<()> {
        let (id, _) = self.resolve(configuration_name)?;
        self.undeploy_id(configuration_name, id)
    }

    fn undeploy_id(&self, configuration_name: &str, id: String) -> Result<()> {
        tracing::info!(
            configuration = configuration_name,
            configuration_id = %id,
            "Undeploying configuration"
        );
        self.call(Operation::ConfigurationUndeploy, &[("configurationId", id)])?;
        Ok(())
    }

    /// Deletes a configuration.
    ///
    /// A deployed configuration is only deleted with `force`, which undeploys
    /// it first. A failure part way leaves the configuration undeployed.
    pub fn delete(&self, configuration_name: &str, options: &DeleteOptions) -> Result<()> {
        let (id, configuration) = self.resolve(configuration_name)?;

        if configuration.deployed {
            ensure!(
                options.force,
                AlreadyDeployedSnafu {
                    name: configuration_name,
                }
            );
            self.undeploy_id(configuration_name, id.clone())?;
        }

        tracing::info!(
            configuration = configuration_name,
            configuration_id = %id,
            "Deleting configuration"
        );
        self.call(Operation::ConfigurationDelete, &[("configurationId", id)])?;
        Ok(())
    }

    /// Restores the configuration's machines to their last snapshot.
    pub fn revert(&self, configuration_name: &str) -> Result<()> {
        self.perform_action(configuration_name, ConfigurationAction::Revert)
    }

    pub fn perform_action(&self, configuration_name: &str, action: ConfigurationAction) -> Result<()> {
        let (id, _) = self.resolve(configuration_name)?;

        tracing::info!(
            configuration = configuration_name,
            action = ?action,
            "Performing configuration action"
        );

        self.call(
            Operation::ConfigurationPerformAction,
            &[("configurationId", id), ("action", action.code().to_string())],
        )?;
        Ok(())
    }
}
