//! Request/response access to the authority's scene document.

use futures::FutureExt;
use futures::future::BoxFuture;
use overlay_proto::{SceneDocument, SceneWrite, WriteAck};

use crate::config::TransportConfig;
use crate::error::ClientError;

const SCENE_PATH: &str = "/api/scene";

/// Reads the full document; used by the polling fallback.
pub trait SceneSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<SceneDocument, ClientError>>;
}

/// Writes the full document; used by the moderator saver.
pub trait SceneWriter: Send + Sync {
    fn write(&self, body: SceneWrite) -> BoxFuture<'_, Result<WriteAck, ClientError>>;
}

#[derive(Debug, Clone)]
pub struct SceneApi {
    client: reqwest::Client,
    url: String,
}

impl SceneApi {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.api_url(SCENE_PATH),
        }
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                path: SCENE_PATH.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

impl SceneSource for SceneApi {
    fn fetch(&self) -> BoxFuture<'_, Result<SceneDocument, ClientError>> {
        async move {
            let response = self
                .client
                .get(&self.url)
                .header(reqwest::header::CACHE_CONTROL, "no-store")
                .send()
                .await?;
            Ok(Self::check(response)?.json::<SceneDocument>().await?)
        }
        .boxed()
    }
}

impl SceneWriter for SceneApi {
    fn write(&self, body: SceneWrite) -> BoxFuture<'_, Result<WriteAck, ClientError>> {
        async move {
            let response = self.client.put(&self.url).json(&body).send().await?;
            Ok(Self::check(response)?.json::<WriteAck>().await?)
        }
        .boxed()
    }
}
