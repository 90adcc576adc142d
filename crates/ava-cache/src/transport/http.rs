// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::Transport;
use crate::error::TransportError;
use async_trait::async_trait;

/// A [`Transport`] over plain HTTP.
///
/// `put` issues `PUT {base_url}/{remote_path}` and takes the trimmed
/// response body as the distribution identifier, falling back to the remote
/// path when the body is empty. `get` issues `GET {base_url}/{identifier}`,
/// or fetches the identifier directly when it is already an absolute URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a transport that sends requests through `client`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

fn network_error(target: &str, error: reqwest::Error) -> TransportError {
    TransportError::Network {
        target: target.to_string(),
        reason: error.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put(&self, remote_path: &str, bytes: &[u8]) -> Result<String, TransportError> {
        let response = self
            .client
            .put(self.url_for(remote_path))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| network_error(remote_path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                target: remote_path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| network_error(remote_path, e))?;
        let identifier = body.trim();
        if identifier.is_empty() {
            Ok(remote_path.to_string())
        } else {
            Ok(identifier.to_string())
        }
    }

    async fn get(&self, identifier: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(self.url_for(identifier))
            .send()
            .await
            .map_err(|e| network_error(identifier, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(identifier.to_string()));
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                target: identifier.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| network_error(identifier, e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_and_passes_absolute_urls() {
        let transport = HttpTransport::new("https://cdn.example.com/ugc/");

        assert_eq!(
            transport.url_for("/outfits/a.bin"),
            "https://cdn.example.com/ugc/outfits/a.bin"
        );
        assert_eq!(
            transport.url_for("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }
}
