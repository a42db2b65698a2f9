//! Install, update and remove operations.
//!
//! Every operation validates before touching anything. Downloads run outside
//! the session's commit lock so different plugins fetch concurrently; file
//! writes, manifest mutation, persistence and composition happen under it.

use std::path::PathBuf;
use std::sync::Arc;

use plugdeck_manifest::{Manifest, PluginRecord};
use plugdeck_registry::{
    ArtifactDownloader, DownloadError, FetchError, FetchedFile, Fetcher, HttpFetcher,
    SecureFetchError, SecureHttpClient, validate_relative_path,
};
use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::composer::{compose, main_template};
use crate::config::EngineConfig;
use crate::error::{EngineError, ManifestRole};
use crate::ops::{OperationGuard, OperationKind};
use crate::reconciler::{LoadOutcome, compute_editor_gate, reconcile_on_load};
use crate::session::SessionContext;
use crate::store::{FsStore, PluginStore};
use crate::validator::{dependents_blocking_removal, missing_for_install};

/// Called with `(relative file path, completed / total)` after each download.
pub type Progress<'a> = &'a (dyn Fn(&str, f32) + Send + Sync);

/// Runs plugin operations against a [`SessionContext`].
pub struct Engine<F, S> {
    fetcher: F,
    store: S,
    config: EngineConfig,
}

impl Engine<HttpFetcher, FsStore> {
    /// Engine using the secure HTTP client and the filesystem under
    /// `config.project_root`.
    pub fn from_config(config: EngineConfig) -> Result<Self, SecureFetchError> {
        let client = SecureHttpClient::builder()
            .timeout(config.timeout())
            .allow_local(config.allow_local_network)
            .max_size(config.max_download_size)
            .build()?;
        let store = FsStore::new(config.project_root.clone());
        Ok(Self::new(HttpFetcher::new(client), store, config))
    }
}

impl<F: Fetcher, S: PluginStore> Engine<F, S> {
    pub fn new(fetcher: F, store: S, config: EngineConfig) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the original and local manifests and reconciles them.
    ///
    /// A missing local manifest is created from the original and persisted
    /// right away. A malformed one is an error, never replaced.
    pub fn open_session(&self) -> Result<SessionContext, EngineError> {
        let original_path = &self.config.original_manifest;
        let original_text = self
            .store
            .read_text(original_path)?
            .ok_or_else(|| EngineError::OriginalMissing(original_path.clone()))?;
        let original = Manifest::from_json(&original_text)
            .map_err(|e| EngineError::malformed(ManifestRole::Original, e))?;

        let stored = match self.store.read_text(&self.config.local_manifest)? {
            Some(text) => Some(
                Manifest::from_json(&text)
                    .map_err(|e| EngineError::malformed(ManifestRole::Local, e))?,
            ),
            None => None,
        };

        let (local, outcome) = reconcile_on_load(&original, stored);
        if outcome == LoadOutcome::Created {
            self.persist(&local)?;
            info!(
                "Created local manifest {}",
                self.config.local_manifest.display()
            );
        }

        Ok(SessionContext::new(original, local, outcome))
    }

    /// Fetches the remote catalog into the session.
    pub async fn refresh_remote(&self, ctx: &SessionContext) -> Result<(), EngineError> {
        let source = self.config.remote_source();
        debug!("Loading remote catalog from {}", source);
        let remote = source.load(&self.fetcher).await.map_err(|e| match e {
            FetchError::InvalidManifest(e) => EngineError::malformed(ManifestRole::Remote, e),
            other => EngineError::Fetch {
                url: source.to_string(),
                message: other.to_string(),
            },
        })?;
        ctx.set_remote(remote);
        Ok(())
    }

    /// Replaces the session with freshly loaded manifests and re-fetches the
    /// remote catalog.
    pub async fn refresh(&self, ctx: &mut SessionContext) -> Result<(), EngineError> {
        *ctx = self.open_session()?;
        self.refresh_remote(ctx).await
    }

    /// Downloads `record` and adds it to the local manifest.
    pub async fn install(
        &self,
        ctx: &SessionContext,
        record: &PluginRecord,
        progress: Progress<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let remote = self.ensure_operational(ctx)?;
        ensure_versioned(record)?;
        let guard = self.begin(ctx, &record.name, OperationKind::Install)?;

        let missing = ctx.with_local(|local| missing_for_install(record, local));
        if !missing.is_empty() {
            return Err(EngineError::DependencyMissing(missing));
        }
        let paths = self.destinations(record)?;

        self.fetch_and_commit(ctx, record, &paths, &guard, progress, cancel, &remote)
            .await?;
        info!("Installed {} v{}", record.name, version_label(record));
        Ok(())
    }

    /// Deletes the installed files of `record` and drops it from the local
    /// manifest.
    pub async fn remove(&self, ctx: &SessionContext, record: &PluginRecord) -> Result<(), EngineError> {
        let remote = self.ensure_operational(ctx)?;
        let _guard = self.begin(ctx, &record.name, OperationKind::Remove)?;
        let _commit = ctx.commit_lock().lock().await;

        let installed = installed_record(ctx, &record.name)?;
        if !record.removable {
            return Err(EngineError::NotRemovable(record.name.clone()));
        }
        let dependents = ctx.with_local(|local| dependents_blocking_removal(&record.name, local));
        if !dependents.is_empty() {
            return Err(EngineError::DependentsExist(dependents));
        }

        self.commit_remove(ctx, &installed, &remote)?;
        info!("Removed {}", record.name);
        Ok(())
    }

    /// Removes the installed copy of `record`, then installs `record`.
    ///
    /// The removal is committed before downloading. If the install half fails
    /// the plugin stays uninstalled, unless `restore_on_failed_update` is set.
    pub async fn update(
        &self,
        ctx: &SessionContext,
        record: &PluginRecord,
        progress: Progress<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let remote = self.ensure_operational(ctx)?;
        ensure_versioned(record)?;
        let guard = self.begin(ctx, &record.name, OperationKind::Update)?;
        let paths = self.destinations(record)?;

        let previous = {
            let _commit = ctx.commit_lock().lock().await;
            let previous = installed_record(ctx, &record.name)?;

            let missing = ctx.with_local(|local| missing_for_install(record, local));
            if !missing.is_empty() {
                return Err(EngineError::DependencyMissing(missing));
            }
            let dependents =
                ctx.with_local(|local| dependents_blocking_removal(&record.name, local));
            if !dependents.is_empty() {
                return Err(EngineError::DependentsExist(dependents));
            }

            self.commit_remove(ctx, &previous, &remote)?;
            previous
        };

        match self
            .fetch_and_commit(ctx, record, &paths, &guard, progress, cancel, &remote)
            .await
        {
            Ok(()) => {
                info!(
                    "Updated {} v{} -> v{}",
                    record.name,
                    version_label(&previous),
                    version_label(record)
                );
                Ok(())
            }
            Err(err) => {
                if self.config.restore_on_failed_update {
                    match self.restore(ctx, previous, &remote).await {
                        Ok(()) => warn!(
                            "Update of {} failed; restored its manifest record, files were not restored",
                            record.name
                        ),
                        Err(restore_err) => {
                            warn!("Failed to restore {} after a failed update: {}", record.name, restore_err)
                        }
                    }
                } else {
                    warn!("Update of {} failed; the plugin is now uninstalled", record.name);
                }
                Err(err)
            }
        }
    }

    /// Rewrites the composed file from the current local manifest.
    pub async fn regenerate(&self, ctx: &SessionContext) -> Result<(), EngineError> {
        let remote = ctx.remote().ok_or(EngineError::RemoteUnavailable)?;
        let template = main_template(&remote, &self.config.main_plugin)?;
        let _commit = ctx.commit_lock().lock().await;
        let composed = ctx.with_local(|local| {
            compose(local, template, &self.config.compose_options())
        });
        self.store
            .write(&self.config.composed_output, composed.as_bytes())?;
        info!("Composed {}", self.config.composed_output.display());
        Ok(())
    }

    fn ensure_operational(&self, ctx: &SessionContext) -> Result<Arc<Manifest>, EngineError> {
        let remote = ctx.remote().ok_or(EngineError::RemoteUnavailable)?;
        let gate = ctx.with_local(|local| compute_editor_gate(ctx.original(), local, &remote));
        if !gate.allows_operations() {
            return Err(EngineError::EditorBlocked {
                current: gate.current_version,
                required: gate.required_version,
            });
        }
        Ok(remote)
    }

    fn begin<'c>(
        &self,
        ctx: &'c SessionContext,
        name: &str,
        kind: OperationKind,
    ) -> Result<OperationGuard<'c>, EngineError> {
        ctx.operations()
            .begin(name, kind)
            .ok_or_else(|| EngineError::OperationInProgress(name.to_string()))
    }

    /// Store paths of every download item, checked before anything is fetched.
    fn destinations(&self, record: &PluginRecord) -> Result<Vec<PathBuf>, EngineError> {
        record
            .download_items
            .iter()
            .map(|item| {
                let relative = validate_relative_path(&item.relative_path)?;
                Ok(self.config.plugin_root.join(relative))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch_and_commit(
        &self,
        ctx: &SessionContext,
        record: &PluginRecord,
        paths: &[PathBuf],
        guard: &OperationGuard<'_>,
        progress: Progress<'_>,
        cancel: &CancellationToken,
        remote: &Manifest,
    ) -> Result<(), EngineError> {
        let files = ArtifactDownloader::new(&self.fetcher)
            .download_all(&record.download_items, cancel, |item, fraction| {
                debug!("{}: {} ({:.0}%)", record.name, item.relative_path, fraction * 100.0);
                guard.set_progress(fraction);
                progress(&item.relative_path, fraction);
            })
            .await
            .map_err(|e| match e {
                DownloadError::Cancelled => EngineError::Cancelled,
                DownloadError::Fetch { url, source } => EngineError::Fetch {
                    url,
                    message: source.to_string(),
                },
            })?;

        let _commit = lock_or_cancel(ctx, cancel).await?;
        self.commit_install(ctx, record, &files, paths, remote)
    }

    /// Must be called with the commit lock held.
    fn commit_install(
        &self,
        ctx: &SessionContext,
        record: &PluginRecord,
        files: &[FetchedFile],
        paths: &[PathBuf],
        remote: &Manifest,
    ) -> Result<(), EngineError> {
        let missing = ctx.with_local(|local| missing_for_install(record, local));
        if !missing.is_empty() {
            return Err(EngineError::DependencyMissing(missing));
        }
        let template = main_template(remote, &self.config.main_plugin)?;

        for (file, path) in files.iter().zip(paths) {
            self.store.write(path, &file.bytes)?;
        }

        let mut next = ctx.local_manifest();
        next.upsert(record.clone());
        self.persist_and_compose(ctx, next, template)
    }

    /// Must be called with the commit lock held.
    fn commit_remove(
        &self,
        ctx: &SessionContext,
        installed: &PluginRecord,
        remote: &Manifest,
    ) -> Result<(), EngineError> {
        let paths = self.destinations(installed)?;
        let template = main_template(remote, &self.config.main_plugin)?;

        for path in &paths {
            if !self.store.delete(path)? {
                warn!("{} was already missing", path.display());
            }
        }

        let mut next = ctx.local_manifest();
        next.remove(&installed.name);
        self.persist_and_compose(ctx, next, template)
    }

    async fn restore(
        &self,
        ctx: &SessionContext,
        previous: PluginRecord,
        remote: &Manifest,
    ) -> Result<(), EngineError> {
        let template = main_template(remote, &self.config.main_plugin)?;
        let _commit = ctx.commit_lock().lock().await;
        let mut next = ctx.local_manifest();
        next.upsert(previous);
        self.persist_and_compose(ctx, next, template)
    }

    fn persist_and_compose(
        &self,
        ctx: &SessionContext,
        next: Manifest,
        template: &str,
    ) -> Result<(), EngineError> {
        let composed = compose(&next, template, &self.config.compose_options());
        self.persist(&next)?;
        ctx.replace_local(next);
        self.store
            .write(&self.config.composed_output, composed.as_bytes())?;
        Ok(())
    }

    fn persist(&self, local: &Manifest) -> Result<(), EngineError> {
        let json = local
            .to_json_pretty()
            .map_err(|e| EngineError::malformed(ManifestRole::Local, e))?;
        self.store
            .write(&self.config.local_manifest, json.as_bytes())?;
        Ok(())
    }
}

/// An unversioned record would be stored as "not installed", leaving its
/// files behind with nothing able to remove them.
fn ensure_versioned(record: &PluginRecord) -> Result<(), EngineError> {
    if record.is_installed() {
        Ok(())
    } else {
        Err(EngineError::MissingVersion(record.name.clone()))
    }
}

fn installed_record(ctx: &SessionContext, name: &str) -> Result<PluginRecord, EngineError> {
    ctx.with_local(|local| local.get(name).filter(|p| p.is_installed()).cloned())
        .ok_or_else(|| EngineError::NotInstalled(name.to_string()))
}

async fn lock_or_cancel<'c>(
    ctx: &'c SessionContext,
    cancel: &CancellationToken,
) -> Result<MutexGuard<'c, ()>, EngineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        guard = ctx.commit_lock().lock() => Ok(guard),
    }
}

fn version_label(record: &PluginRecord) -> String {
    record
        .version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}
