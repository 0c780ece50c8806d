use crate::api::RemoteCommand;
use crate::client::xml::{self, ParsedInput};
use crate::error::TransportError;
use std::time::Duration;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Boundary to the remote graphics system.
///
/// Implementations execute requests; they never retry or reorder.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Deliver a single command.
    async fn send(&self, command: &RemoteCommand) -> Result<(), TransportError>;
    /// Fetch the state document and return its inputs with their fields.
    async fn fetch_state(&self) -> Result<Vec<ParsedInput>, TransportError>;
    /// Point every later request at another remote system.
    fn set_base_url(&mut self, base_url: &str);
}

/// Talks to the remote control API over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

fn trim_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(&base_url.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn unreachable(e: reqwest::Error) -> TransportError {
    TransportError::Unreachable(e.to_string())
}

impl Transport for HttpTransport {
    async fn send(&self, command: &RemoteCommand) -> Result<(), TransportError> {
        let url = format!("{}/api/", self.base_url);
        log::debug!("Sending {}", command);
        match self
            .client
            .get(&url)
            .query(&command.query_params())
            .timeout(COMMAND_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                log::warn!("Remote rejected {}: HTTP {}", command, resp.status());
                Err(TransportError::Status(resp.status().as_u16()))
            }
            Err(e) => {
                log::warn!("Failed to send {}: {}", command, e);
                Err(unreachable(e))
            }
        }
    }

    async fn fetch_state(&self) -> Result<Vec<ParsedInput>, TransportError> {
        let url = format!("{}/api", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(STATE_TIMEOUT)
            .send()
            .await
            .map_err(unreachable)?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        if !body.contains("<vmix") && !body.contains("<inputs") {
            return Err(TransportError::InvalidResponse(
                "state document has no inputs element".to_string(),
            ));
        }
        Ok(xml::parse_inputs(&body))
    }

    fn set_base_url(&mut self, base_url: &str) {
        let base_url = trim_base_url(base_url);
        if base_url != self.base_url {
            log::info!("Retargeting remote API from {} to {}", self.base_url, base_url);
            self.base_url = base_url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let transport = HttpTransport::new("http://127.0.0.1:8088/");
        assert_eq!(transport.base_url(), "http://127.0.0.1:8088");
    }

    #[test]
    fn retargeting_replaces_base_url() {
        let mut transport = HttpTransport::new("http://127.0.0.1:8088");
        transport.set_base_url("http://10.0.0.7:8099/");
        assert_eq!(transport.base_url(), "http://10.0.0.7:8099");
    }

    #[tokio::test]
    async fn unreachable_host_is_reported() {
        // Port 9 (discard) on localhost is closed in test environments.
        let transport = HttpTransport::new("http://127.0.0.1:9");
        let err = transport.fetch_state().await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
        assert!(err.to_string().starts_with("could not reach remote system"));
    }
}
