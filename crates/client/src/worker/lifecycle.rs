//! Install/activate lifecycle and store versioning.
//!
//! Install seeds the current version's static store with the critical
//! paths; a path that fails to fetch is logged and skipped, never fatal.
//! Activate deletes every store that doesn't belong to the current version
//! and then takes control of fetch handling. An update check re-installs
//! only when the recorded install no longer matches the running version.

use std::fmt;
use std::sync::atomic::Ordering;

use serde::Serialize;
use swcache_core::{Error, InstalledVersion, Request, RequestKey};
use url::Url;

use super::OfflineWorker;
use super::strategy::storable;
use crate::fetch::resolve;

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, never installed.
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
    /// Installation failed.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an install did.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub store: String,
    /// URLs now in the static store.
    pub precached: Vec<String>,
    /// URLs that could not be fetched or stored.
    pub failed: Vec<String>,
    pub skip_waiting: bool,
}

/// What an activation did.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
}

/// Result of registering the worker with the host.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct Registration {
    pub script_path: String,
    pub scope: String,
    pub install: InstallReport,
    /// Present when the worker activated right away.
    pub activate: Option<ActivateReport>,
}

/// Result of an update check.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum UpdateCheck {
    /// The running version is installed and active; nothing was fetched.
    UpToDate { installed: InstalledVersion },
    /// The worker re-registered.
    Updated { registration: Registration },
}

impl OfflineWorker {
    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions; the host reloads its pages on `Activated`.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Whether activation has claimed the open pages.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    /// Move to `next` if the current state is one of `allowed`.
    ///
    /// Returns the previous state so a failed phase can roll back.
    fn transition(&self, allowed: &[WorkerState], next: WorkerState) -> Result<WorkerState, Error> {
        let mut previous = None;
        self.state.send_if_modified(|state| {
            if allowed.contains(state) {
                previous = Some(*state);
                *state = next;
                true
            } else {
                false
            }
        });

        match previous {
            Some(from) => {
                tracing::info!(%from, to = %next, "worker state changed");
                Ok(from)
            }
            None => Err(Error::InvalidInput(format!("cannot move to {next} from {}", self.state()))),
        }
    }

    fn set_state(&self, next: WorkerState) {
        let from = self.state.send_replace(next);
        if from != next {
            tracing::info!(%from, to = %next, "worker state changed");
        }
    }

    /// Install: seed the static store, then signal skip-waiting.
    ///
    /// # Errors
    ///
    /// Fails only if the static store cannot be opened or the install cannot
    /// be recorded; fetch and store failures for individual paths end up in
    /// `InstallReport::failed`. A failed first install leaves the worker
    /// redundant. A failed re-install of an active worker leaves it active.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let previous = self.transition(
            &[WorkerState::Parsed, WorkerState::Installed, WorkerState::Activated, WorkerState::Redundant],
            WorkerState::Installing,
        )?;

        match self.populate_static_store().await {
            Ok(mut report) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                report.skip_waiting = true;
                self.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(err) if previous == WorkerState::Activated => {
                tracing::error!(error = %err, "re-install failed, keeping the active version");
                self.restore_quietly(previous);
                Err(err)
            }
            Err(err) => {
                tracing::error!(error = %err, "install failed");
                self.controlling.store(false, Ordering::SeqCst);
                self.set_state(WorkerState::Redundant);
                Err(err)
            }
        }
    }

    /// Roll back to `previous` without waking subscribers: the version they
    /// last saw activate is still the one in control.
    fn restore_quietly(&self, previous: WorkerState) {
        self.state.send_if_modified(|state| {
            *state = previous;
            false
        });
        tracing::info!(to = %previous, "worker state restored");
    }

    async fn populate_static_store(&self) -> Result<InstallReport, Error> {
        let store = self.config.static_store.clone();
        self.db.open_store(&store).await?;

        let mut failed = Vec::new();
        let mut urls = Vec::new();
        for path in &self.config.precache_urls {
            match resolve(&self.config.origin, path) {
                Ok(url) => urls.push(url),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "skipping unresolvable precache path");
                    failed.push(path.clone());
                }
            }
        }

        let precached = match self.add_all(&store, &urls).await {
            Ok(()) => urls.iter().map(|u| u.to_string()).collect(),
            Err(err) => {
                tracing::warn!(error = %err, "precache batch failed, retrying one at a time");
                let mut precached = Vec::new();
                for url in &urls {
                    match self.add(&store, url).await {
                        Ok(()) => precached.push(url.to_string()),
                        Err(err) => {
                            tracing::warn!(url = %url, error = %err, "precache failed");
                            failed.push(url.to_string());
                        }
                    }
                }
                precached
            }
        };

        tracing::info!(store = %store, precached = precached.len(), failed = failed.len(), "static store seeded");
        self.db.record_install(&self.config.script_path, &self.config.scope, &store).await?;

        Ok(InstallReport { store, precached, failed, skip_waiting: false })
    }

    /// Fetch one URL and store it; a non-2xx answer counts as a failure.
    async fn add(&self, store: &str, url: &Url) -> Result<(), Error> {
        let response = self.fetch_ok(url).await?;
        self.db.put_entry(store, &RequestKey::get(url.as_str()), &response).await
    }

    /// Fetch every URL first and store only if all of them succeeded.
    async fn add_all(&self, store: &str, urls: &[Url]) -> Result<(), Error> {
        let mut fetched = Vec::with_capacity(urls.len());
        for url in urls {
            fetched.push((RequestKey::get(url.as_str()), self.fetch_ok(url).await?));
        }
        for (key, response) in &fetched {
            self.db.put_entry(store, key, response).await?;
        }
        Ok(())
    }

    /// Fetch a URL for storage: a non-2xx answer or an oversized body is an error.
    pub(super) async fn fetch_ok(&self, url: &Url) -> Result<swcache_core::Response, Error> {
        let response = self.network.fetch(&Request::get(url.as_str())).await?;
        if !response.ok() {
            return Err(Error::Network(format!("{url} answered {}", response.status)));
        }
        storable(&response, self.config.max_entry_bytes)
    }

    /// Activate: prune stale stores, then claim the open pages.
    ///
    /// # Errors
    ///
    /// Fails if the worker isn't installed, or if listing or deleting
    /// stores fails; the worker then stays installed.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.transition(&[WorkerState::Installed], WorkerState::Activating)?;

        let names = match self.db.store_names().await {
            Ok(names) => names,
            Err(err) => {
                self.set_state(previous);
                return Err(err);
            }
        };

        let (kept, stale): (Vec<String>, Vec<String>) = names
            .into_iter()
            .partition(|name| *name == self.config.static_store || *name == self.config.runtime_store);

        for name in &stale {
            if let Err(err) = self.db.delete_store(name).await {
                self.set_state(previous);
                return Err(err);
            }
            tracing::info!(store = %name, "deleted stale cache store");
        }

        self.set_state(WorkerState::Activated);
        self.controlling.store(true, Ordering::SeqCst);

        Ok(ActivateReport { kept, deleted: stale, clients_claimed: true })
    }

    /// Supersede the running instance without waiting for pages to close.
    ///
    /// A worker that is already installed and waiting activates now.
    pub async fn skip_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        if self.state() == WorkerState::Installed {
            return self.activate().await.map(Some);
        }
        Ok(None)
    }

    /// Register with the host: install, then activate if skip-waiting was signalled.
    pub async fn register(&self) -> Result<Registration, Error> {
        let install = self.install().await?;
        let activate = if self.skip_waiting.load(Ordering::SeqCst) && self.state() == WorkerState::Installed {
            Some(self.activate().await?)
        } else {
            None
        };

        Ok(Registration {
            script_path: self.config.script_path.clone(),
            scope: self.config.scope.clone(),
            install,
            activate,
        })
    }

    /// Check for an update.
    ///
    /// When the active install matches the running script, scope and cache
    /// version this is a no-op: nothing is fetched and the state doesn't move.
    /// Otherwise the worker registers again, re-seeding the static store and
    /// pruning what an older version left behind.
    pub async fn update(&self) -> Result<UpdateCheck, Error> {
        tracing::debug!(script = %self.config.script_path, "checking for worker update");
        if let Some(installed) = self.current_install().await? {
            tracing::debug!(store = %installed.static_store, "worker is up to date");
            return Ok(UpdateCheck::UpToDate { installed });
        }
        let registration = self.register().await?;
        Ok(UpdateCheck::Updated { registration })
    }

    /// The recorded install, if it is this version's and still in control.
    async fn current_install(&self) -> Result<Option<InstalledVersion>, Error> {
        if self.state() != WorkerState::Activated {
            return Ok(None);
        }
        let Some(installed) = self.db.installed_version(&self.config.script_path).await? else {
            return Ok(None);
        };
        if installed.static_store != self.config.static_store || installed.scope != self.config.scope {
            return Ok(None);
        }
        if !self.db.has_store(&self.config.static_store).await? {
            return Ok(None);
        }
        Ok(Some(installed))
    }
}
