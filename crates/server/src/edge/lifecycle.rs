//! Generation install and activation.
//!
//! Install prefetches the manifest into the new generation's static store.
//! Any failed asset aborts the install and removes the partial store, so the
//! previous generation keeps serving. Activation deletes every store whose
//! name does not carry the active tag and persists the tag.

use slidecache_core::cache::{GENERATION_KEY, is_generation};
use slidecache_core::{Error, ResourceRequest, StoreKind};

use super::EdgeCacheService;

impl EdgeCacheService {
    /// Prefetch the manifest for `version`.
    ///
    /// On success the generation is waiting, or active right away when no
    /// generation was active before or `version` is the active one. Returns the number of stored assets.
    pub async fn install(&self, version: &str) -> Result<usize, Error> {
        let store = self.store_name_for(StoreKind::Static, version);
        tracing::info!(version, store = %store, assets = self.inner.manifest.len(), "installing generation");

        if let Err(err) = self.prefetch_manifest(&store).await {
            if let Err(cleanup) = self.db().delete_store(&store).await {
                tracing::warn!(store = %store, error = %cleanup, "failed to remove partial store");
            }
            tracing::warn!(version, error = %err, "install aborted");
            return Err(Error::InstallFailed(format!("{version}: {err}")));
        }

        let promote = {
            let mut generations = self.inner.generations.write().await;
            generations.waiting = Some(version.to_string());
            generations.active.as_deref().is_none_or(|active| active == version)
        };
        if promote {
            self.activate().await?;
        }
        Ok(self.inner.manifest.len())
    }

    async fn prefetch_manifest(&self, store: &str) -> Result<(), Error> {
        self.db().open_store(store).await?;
        for path in &self.inner.manifest {
            let request = ResourceRequest::get(self.resolve(path)?);
            let response = self.network().fetch(&request).await?;
            if !response.is_success() {
                return Err(Error::HttpError(format!("{} returned {}", request.url, response.status)));
            }
            self.db().put_entry(store, &request.cache_key(), &request.method, &response).await?;
        }
        self.eviction().enforce(self.db(), store, StoreKind::Static).await?;
        Ok(())
    }

    /// Promote the waiting generation and delete stores of every other one.
    ///
    /// Returns the deleted store names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let version = {
            let mut generations = self.inner.generations.write().await;
            let version = generations.waiting.take().ok_or(Error::NoActiveGeneration)?;
            generations.active = Some(version.clone());
            version
        };

        let mut deleted = Vec::new();
        for name in self.db().store_names().await? {
            if !is_generation(&name, &version) && self.db().delete_store(&name).await? {
                deleted.push(name);
            }
        }
        self.db().set_value(GENERATION_KEY, &version).await?;

        tracing::info!(version = %version, deleted = deleted.len(), "generation activated");
        Ok(deleted)
    }

    /// Promote the waiting generation, if any. Returns whether one was promoted.
    pub async fn adopt_new_version(&self) -> Result<bool, Error> {
        if self.waiting_version().await.is_none() {
            tracing::debug!("no waiting generation to adopt");
            return Ok(false);
        }
        self.activate().await?;
        Ok(true)
    }

    /// Restore the adopted generation and install this build's one if needed.
    pub async fn startup(&self) -> Result<(), Error> {
        let target = self.target_version().to_string();
        let adopted = self.db().get_value(GENERATION_KEY).await?;

        if let Some(adopted) = &adopted {
            self.inner.generations.write().await.active = Some(adopted.clone());
            tracing::info!(version = %adopted, "restored adopted generation");
        }

        let installed = self.db().has_store(&self.store_name_for(StoreKind::Static, &target)).await?;
        match adopted {
            Some(adopted) if adopted == target && installed => Ok(()),
            _ => self.install(&target).await.map(|_| ()),
        }
    }
}
