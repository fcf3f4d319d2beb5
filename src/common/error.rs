use std::path::PathBuf;

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{message}"))]
    ConfigurationError { message: String },
    #[snafu(display("Failed to load {}: {source}", path.display()))]
    ConfigFileError {
        path: PathBuf,
        source: config::ConfigError,
    },
    #[snafu(display("{operation} request to {url} failed: {source}"))]
    RequestError {
        url: String,
        operation: String,
        source: ureq::Error,
    },
    #[snafu(display("{message}"))]
    ResponseError { message: String },
    #[snafu(display("{operation}: {message}: {source}"))]
    DecodeError {
        operation: String,
        message: String,
        source: Box<dyn std::error::Error>,
    },
    /// The server answered with a SOAP fault.
    #[snafu(display("{operation} failed: {fault} {detail}"))]
    RemoteOperationError {
        operation: String,
        fault: String,
        detail: String,
    },
    #[snafu(display("Configuration {name} is deployed"))]
    AlreadyDeployedError { name: String },
    #[snafu(display("No configuration found for {name}"))]
    UnknownConfigurationError { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
