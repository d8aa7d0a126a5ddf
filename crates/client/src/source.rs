//! Remote resource source backed by the Lanhu API client.

use async_trait::async_trait;
use bytes::Bytes;

use lanhu_core::Error;
use lanhu_core::cache::{AssetManifest, ResourceSource};

use crate::api::{ApiError, LanhuClient, RawAssetManifest};
use crate::html::fix_markup;

/// Fetches snapshot files from the Lanhu CDN, fixing page markup on the way in.
///
/// Without a client (no cookie configured) every fetch fails, while the
/// snapshots already on disk can still be inspected and purged.
#[derive(Debug, Clone)]
pub struct LanhuSource {
    client: Option<LanhuClient>,
}

impl LanhuSource {
    pub fn new(client: Option<LanhuClient>) -> Self {
        Self { client }
    }

    fn client(&self) -> Result<&LanhuClient, ApiError> {
        self.client.as_ref().ok_or(ApiError::MissingCookie)
    }
}

#[async_trait]
impl ResourceSource for LanhuSource {
    async fn fetch_markup(&self, location: &str) -> Result<Bytes, Error> {
        let raw = self.client()?.get_bytes(location).await?;
        let fixed = fix_markup(&String::from_utf8_lossy(&raw));
        match fixed {
            Ok(fixed) => Ok(Bytes::from(fixed)),
            Err(e) => {
                tracing::warn!(location, error = %e, "markup fix-up failed, keeping original");
                Ok(raw)
            }
        }
    }

    async fn fetch_asset_manifest(&self, location: &str) -> Result<AssetManifest, Error> {
        let raw: RawAssetManifest = self.client()?.get_json(location).await?;
        Ok(raw.into())
    }

    async fn fetch_asset(&self, location: &str) -> Result<Bytes, Error> {
        Ok(self.client()?.get_bytes(location).await?)
    }
}
