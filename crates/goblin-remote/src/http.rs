use crate::{FetchConfig, RemoteError, ScriptFetcher};
use std::io::Read;
use std::time::Duration;

/// Fetches install scripts with plain HTTP(S) GET requests.
pub struct HttpFetcher {
    config: FetchConfig,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let req = self
            .agent
            .get(url)
            .header("User-Agent", &self.config.user_agent);
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(body)
    }
}

impl ScriptFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        tracing::debug!("GET {url}");
        let body = self.do_get(url)?;
        tracing::debug!("GET {url}: {} bytes", body.len());
        String::from_utf8(body).map_err(|_| RemoteError::InvalidBody {
            url: url.to_owned(),
        })
    }
}
