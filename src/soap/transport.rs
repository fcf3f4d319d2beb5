use std::time::Duration;

use serde_json::Value;
use snafu::prelude::*;

use crate::common::{
    AuthenticationHeader, ConfigurationSnafu, DecodeSnafu, Error, RequestSnafu, ResponseSnafu,
    Result, Transport, NAMESPACE,
};

use super::envelope::{build_request, parse_response};

/// Clone and checkout can take several minutes to answer.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// SOAP over HTTP(S) using a blocking `ureq` agent.
pub struct SoapTransport {
    endpoint: url::Url,
    agent: ureq::Agent,
}

impl SoapTransport {
    pub fn new(endpoint: &str) -> Result<Self> {
        let agent = ureq::AgentBuilder::new()
            .timeout_read(RECEIVE_TIMEOUT)
            .build();
        Self::with_agent(endpoint, agent)
    }

    /// Uses a caller supplied agent, e.g. one with a custom TLS setup.
    pub fn with_agent(endpoint: &str, agent: ureq::Agent) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|err| {
            ConfigurationSnafu {
                message: format!("Invalid url {endpoint}: {err}"),
            }
            .build()
        })?;
        Ok(Self { endpoint, agent })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    fn read_body(operation: &str, response: ureq::Response) -> Result<String> {
        response
            .into_string()
            .boxed_local()
            .context(DecodeSnafu {
                operation,
                message: "Failed to read response body",
            })
    }
}

/// Faults are delivered with an error status, so look for one before
/// reporting the status itself.
fn status_error(operation: &str, status: u16, body: std::io::Result<String>) -> Error {
    if let Ok(text) = body {
        if let Err(err @ Error::RemoteOperationError { .. }) = parse_response(operation, &text) {
            return err;
        }
    }
    ResponseSnafu {
        message: format!("{operation} returned HTTP {status}"),
    }
    .build()
}

impl Transport for SoapTransport {
    fn call(
        &self,
        auth: &AuthenticationHeader<'_>,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let url = self.endpoint.as_str();
        let body = build_request(auth, operation, params);

        tracing::debug!(
            url = url,
            operation = operation,
            organization = auth.organization,
            workspace = auth.workspace,
            "Sending request"
        );

        let result = self
            .agent
            .post(url)
            .set("Content-Type", "text/xml; charset=utf-8")
            .set("SOAPAction", &format!("\"{NAMESPACE}/{operation}\""))
            .send_string(&body);

        match result {
            Ok(response) => parse_response(operation, &Self::read_body(operation, response)?),
            Err(ureq::Error::Status(status, response)) => {
                Err(status_error(operation, status, response.into_string()))
            }
            Err(err) => Err(err).context(RequestSnafu { url, operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_with_fault() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>
            <soap:Fault><faultcode>soap:Server</faultcode><faultstring>Access denied</faultstring></soap:Fault>
            </soap:Body></soap:Envelope>"#;

        let err = status_error("ListMachines", 500, Ok(body.to_string()));

        match err {
            Error::RemoteOperationError { fault, .. } => assert_eq!(fault, "Access denied"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn error_status_without_fault() {
        let err = status_error("ListMachines", 404, Ok("<html>Not Found</html>".to_string()));

        assert!(matches!(err, Error::ResponseError { .. }));
        assert_eq!(err.to_string(), "ListMachines returned HTTP 404");
    }

    #[test]
    fn error_status_with_unreadable_body() {
        let body = Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8"));

        let err = status_error("ConfigurationClone", 503, body);

        assert!(matches!(err, Error::ResponseError { .. }));
        assert_eq!(err.to_string(), "ConfigurationClone returned HTTP 503");
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = SoapTransport::new("not a url").err().unwrap();
        assert!(matches!(err, Error::ConfigurationError { .. }));
    }

    #[test]
    fn keeps_endpoint() {
        let transport =
            SoapTransport::new("https://lab.example.com/LabManager/SOAP/LabManager.asmx").unwrap();
        assert_eq!(transport.endpoint().host_str(), Some("lab.example.com"));
    }

    #[test]
    fn unreachable_server_is_a_request_error() {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(2))
            .build();
        let transport = SoapTransport::with_agent("http://127.0.0.1:9/", agent).unwrap();
        let auth = AuthenticationHeader {
            username: "u",
            password: "p",
            organization: "o",
            workspace: None,
        };

        let err = transport.call(&auth, "ListConfigurations", &[]).unwrap_err();

        assert!(matches!(err, Error::RequestError { .. }));
    }
}
