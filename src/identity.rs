// Volume name -> UID resolution against the cluster API

use crate::config::ClusterConfig;
use crate::error::IdentityError;
use crate::models::VolumeIdentity;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// A persistent volume as listed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRef {
    pub name: String,
    pub uid: String,
}

/// Lists every persistent volume known to the cluster.
#[async_trait]
pub trait VolumeLister: Send + Sync {
    async fn list_volumes(&self) -> Result<Vec<VolumeRef>, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct PersistentVolumeList {
    #[serde(default)]
    items: Vec<PersistentVolumeItem>,
}

#[derive(Debug, Deserialize)]
struct PersistentVolumeItem {
    #[serde(default)]
    metadata: ObjectMeta,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    name: Option<String>,
    uid: Option<String>,
}

/// In-cluster client for `GET /api/v1/persistentvolumes`.
pub struct KubeClient {
    client: reqwest::Client,
    api_url: String,
    token_path: String,
}

impl KubeClient {
    pub fn from_config(config: &ClusterConfig) -> Result<Self, IdentityError> {
        let api_url = match &config.api_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => in_cluster_api_url()?,
        };

        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_millis(config.timeout_ms));
        match std::fs::read(&config.ca_path) {
            Ok(pem) => {
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| IdentityError::Config(format!("ca {}: {}", config.ca_path, e)))?;
                builder = builder.add_root_certificate(cert);
            }
            Err(e) => {
                tracing::debug!(path = %config.ca_path, error = %e, "cluster CA not loaded");
            }
        }

        Ok(Self {
            client: builder.build()?,
            api_url,
            token_path: config.token_path.clone(),
        })
    }
}

fn in_cluster_api_url() -> Result<String, IdentityError> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST")
        .map_err(|_| IdentityError::Config("KUBERNETES_SERVICE_HOST is not set".into()))?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".into());
    if host.contains(':') {
        Ok(format!("https://[{}]:{}", host, port))
    } else {
        Ok(format!("https://{}:{}", host, port))
    }
}

#[async_trait]
impl VolumeLister for KubeClient {
    #[instrument(skip(self), fields(client = "cluster", operation = "list_volumes"))]
    async fn list_volumes(&self) -> Result<Vec<VolumeRef>, IdentityError> {
        let mut request = self
            .client
            .get(format!("{}/api/v1/persistentvolumes", self.api_url));
        // Re-read every call: projected service-account tokens rotate.
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(token) => request = request.bearer_auth(token.trim()),
            Err(e) => tracing::debug!(path = %self.token_path, error = %e, "no service-account token"),
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(IdentityError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        parse_volume_list(&body)
    }
}

/// Items missing a name or UID are skipped.
pub fn parse_volume_list(body: &[u8]) -> Result<Vec<VolumeRef>, IdentityError> {
    let list: PersistentVolumeList = serde_json::from_slice(body)?;
    Ok(list
        .items
        .into_iter()
        .filter_map(|item| match (item.metadata.name, item.metadata.uid) {
            (Some(name), Some(uid)) if !name.is_empty() && !uid.is_empty() => {
                Some(VolumeRef { name, uid })
            }
            _ => None,
        })
        .collect())
}

/// The only component allowed to mint volume UIDs.
pub struct IdentityResolver {
    lister: std::sync::Arc<dyn VolumeLister>,
}

impl IdentityResolver {
    pub fn new(lister: std::sync::Arc<dyn VolumeLister>) -> Self {
        Self { lister }
    }

    /// Current mapping, or an empty one when listing fails.
    pub async fn resolve(&self) -> VolumeIdentity {
        match self.lister.list_volumes().await {
            Ok(volumes) => volumes.into_iter().map(|v| (v.name, v.uid)).collect(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "list_volumes",
                    "volume listing failed; no identities this cycle"
                );
                VolumeIdentity::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_volume_list_skips_incomplete_items() {
        let body = br#"{
            "kind": "PersistentVolumeList",
            "items": [
                {"metadata": {"name": "pv-a", "uid": "uid-a"}},
                {"metadata": {"name": "pv-b"}},
                {"metadata": {"uid": "uid-c"}},
                {}
            ]
        }"#;
        let volumes = parse_volume_list(body).unwrap();
        assert_eq!(
            volumes,
            vec![VolumeRef {
                name: "pv-a".into(),
                uid: "uid-a".into()
            }]
        );
    }

    #[test]
    fn parse_volume_list_rejects_garbage() {
        assert!(matches!(
            parse_volume_list(b"not json"),
            Err(IdentityError::Parse(_))
        ));
    }
}
