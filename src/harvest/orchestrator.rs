//! Harvest orchestration
//!
//! The harvester owns the engine's collaborators (result store, fetch
//! capability, scheduler) and drives the top-level sequence: fetch the
//! environment config, assemble the reference datasets under bounded
//! parallelism, seed the initial jobs from the platform config, and block
//! until the discovered job graph has fully drained.
//!
//! Job execution follows one contract everywhere: consult the store first
//! (a cache hit makes no external call), fetch at most once, check the
//! response shape before persisting, and fan out children from the value —
//! whether it was fetched just now or read back from the cache.

use crate::config::Config;
use crate::env::Environment;
use crate::harvest::scheduler::{Job, PriorityScheduler, SchedulerStats};
use crate::harvest::Fetcher;
use crate::jobs::{JobSpec, REFERENCE_CONFIGS};
use crate::store::ResultStore;
use crate::HarvestError;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;
use tokio::sync::Semaphore;

/// Top-level orchestrator for one harvest run
pub struct Harvester {
    store: Arc<dyn ResultStore>,
    fetcher: Arc<dyn Fetcher>,
    scheduler: PriorityScheduler,
    bootstrap_url: String,
    bootstrap_parallelism: usize,
    env: OnceLock<Arc<Environment>>,
    /// Back-reference for job actions, which must own an `Arc` to outlive
    /// the submitting call
    self_ref: Weak<Self>,
}

impl Harvester {
    /// Creates a harvester and its worker pool from the configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &Config,
        store: Arc<dyn ResultStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            store,
            fetcher,
            scheduler: PriorityScheduler::new(config.harvest.workers),
            bootstrap_url: config.harvest.bootstrap_url.clone(),
            bootstrap_parallelism: config.harvest.bootstrap_parallelism,
            env: OnceLock::new(),
            self_ref: weak.clone(),
        })
    }

    /// Creates a harvester around an already-assembled environment
    ///
    /// Callers that hold the environment (or tests driving specific jobs)
    /// can submit directly without running the bootstrap sequence.
    pub fn with_environment(
        workers: usize,
        store: Arc<dyn ResultStore>,
        fetcher: Arc<dyn Fetcher>,
        env: Environment,
    ) -> Arc<Self> {
        let bootstrap_url = env.bootstrap_url().to_string();
        let harvester = Arc::new_cyclic(|weak| Self {
            store,
            fetcher,
            scheduler: PriorityScheduler::new(workers),
            bootstrap_url,
            bootstrap_parallelism: 1,
            env: OnceLock::new(),
            self_ref: weak.clone(),
        });
        let _ = harvester.env.set(Arc::new(env));
        harvester
    }

    /// Runs the full harvest: bootstrap, seed, drain
    ///
    /// Returns only after every discovered job has completed. Individual job
    /// failures surface through logs and the returned counters, never as an
    /// early return from the drain.
    pub async fn run(&self) -> crate::Result<SchedulerStats> {
        let started = Instant::now();

        // The environment config is fetched with a stage-zero environment
        // that only knows the bootstrap URL.
        tracing::info!(url = %self.bootstrap_url, "fetching environment config");
        let boot_env = Environment::bootstrap_only(&self.bootstrap_url);
        let boot_spec = JobSpec::Config {
            config_type: "environment-config".to_string(),
        };
        let payload = self.resolve_required(&boot_spec, &boot_env).await?;
        let env = Arc::new(Environment::from_bootstrap(&self.bootstrap_url, &payload)?);
        self.env
            .set(Arc::clone(&env))
            .map_err(|_| HarvestError::Bootstrap("harvester has already run".to_string()))?;

        let configs = self.fetch_reference_configs(&env).await?;
        tracing::info!(datasets = configs.len(), "reference datasets assembled");

        let platform_config = configs.get("config").ok_or_else(|| {
            HarvestError::Bootstrap("reference dataset 'config' missing".to_string())
        })?;
        let seeds = seed_jobs(platform_config)?;
        tracing::info!(seeds = seeds.len(), "seeding harvest");
        for spec in seeds {
            self.submit(spec);
        }

        self.scheduler.await_drain().await;

        let stats = self.scheduler.stats();
        tracing::info!(
            submitted = stats.submitted,
            completed = stats.completed,
            duplicates = stats.duplicates,
            elapsed = ?started.elapsed(),
            "harvest drained"
        );
        Ok(stats)
    }

    /// Submits a job derived from its spec; duplicates are dropped by the
    /// scheduler's claim gate
    pub fn submit(&self, spec: JobSpec) {
        // Upgrading cannot fail while a borrow of the owning Arc exists.
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let key = spec.key();
        let priority = spec.priority();
        self.scheduler
            .submit(Job::new(key, priority, async move {
                this.execute(spec).await
            }));
    }

    /// Blocks until the queue is empty and no job is executing
    pub async fn drain(&self) {
        self.scheduler.await_drain().await;
    }

    /// Returns the scheduler's lifetime counters
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Executes one job and fans out its children
    async fn execute(self: Arc<Self>, spec: JobSpec) -> crate::Result<()> {
        let env = self.environment()?;
        let Some(value) = self.resolve(&spec, &env).await? else {
            // Transport failure already logged; no result, no children.
            return Ok(());
        };
        for child in spec.children(&value)? {
            self.submit(child);
        }
        Ok(())
    }

    /// Cache-or-fetch for one spec
    ///
    /// Returns `Ok(None)` when the external fetch failed at the transport
    /// level; the engine treats that as the job producing no result. Shape
    /// violations and store failures propagate, and a value that failed its
    /// shape check is never persisted.
    async fn resolve(
        &self,
        spec: &JobSpec,
        env: &Environment,
    ) -> crate::Result<Option<Value>> {
        let key = spec.key();

        if let Some(value) = self.store.get(&key)? {
            return Ok(Some(value));
        }

        let request = spec.request(env)?;
        let value = match self.fetcher.fetch(&request).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key = %key, %error, "fetch failed; job abandoned");
                return Ok(None);
            }
        };

        spec.validate(&value)?;
        self.store.put(&key, &value)?;
        Ok(Some(value))
    }

    /// Like `resolve`, but a transport failure is fatal — used for the
    /// bootstrap fetches the rest of the run depends on
    async fn resolve_required(
        &self,
        spec: &JobSpec,
        env: &Environment,
    ) -> crate::Result<Value> {
        self.resolve(spec, env).await?.ok_or_else(|| {
            HarvestError::Bootstrap(format!("required fetch failed: {}", spec.key()))
        })
    }

    /// Fetches the fixed set of reference datasets with bounded parallelism
    ///
    /// This fan-out is independent of the main worker pool; any failure here
    /// is fatal, since the seeds are derived from these datasets.
    async fn fetch_reference_configs(
        &self,
        env: &Arc<Environment>,
    ) -> crate::Result<HashMap<String, Value>> {
        let strong = self.self_ref.upgrade().ok_or_else(|| {
            HarvestError::Bootstrap("harvester dropped during bootstrap".to_string())
        })?;
        let semaphore = Arc::new(Semaphore::new(self.bootstrap_parallelism));
        let mut handles = Vec::with_capacity(REFERENCE_CONFIGS.len());

        for config_type in REFERENCE_CONFIGS {
            let this = Arc::clone(&strong);
            let env = Arc::clone(env);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| HarvestError::Bootstrap("bootstrap pool closed".to_string()))?;
                let spec = JobSpec::Config {
                    config_type: config_type.to_string(),
                };
                let value = this.resolve_required(&spec, &env).await?;
                Ok::<_, HarvestError>((config_type.to_string(), value))
            }));
        }

        let mut configs = HashMap::with_capacity(handles.len());
        for handle in handles {
            let (name, value) = handle.await??;
            configs.insert(name, value);
        }
        Ok(configs)
    }

    fn environment(&self) -> crate::Result<Arc<Environment>> {
        self.env
            .get()
            .cloned()
            .ok_or_else(|| HarvestError::Bootstrap("environment not loaded".to_string()))
    }
}

/// Derives the initial jobs from the platform config: every `proceso*`
/// entry's electoral process crossed with every known election type
fn seed_jobs(platform_config: &Value) -> crate::Result<Vec<JobSpec>> {
    let root = platform_config.as_object().ok_or_else(|| {
        HarvestError::Bootstrap("platform config is not an object".to_string())
    })?;

    let tipo_eleccion = root
        .get("tipoEleccion")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            HarvestError::Bootstrap("platform config has no 'tipoEleccion' object".to_string())
        })?;

    let tipos: BTreeSet<i64> = tipo_eleccion
        .values()
        .filter(|entry| !entry.is_null())
        .map(|entry| {
            entry
                .get("idTipoEleccion")
                .and_then(lenient_i64)
                .ok_or_else(|| {
                    HarvestError::Bootstrap(
                        "tipoEleccion entry without 'idTipoEleccion'".to_string(),
                    )
                })
        })
        .collect::<crate::Result<_>>()?;

    let mut seeds = Vec::new();
    for (name, entry) in root {
        if !name.starts_with("proceso") {
            continue;
        }
        let id_proceso_electoral = entry
            .get("idProcesoElectoral")
            .and_then(lenient_i64)
            .ok_or_else(|| {
                HarvestError::Bootstrap(format!(
                    "entry '{}' without 'idProcesoElectoral'",
                    name
                ))
            })?;
        for &id_tipo_eleccion in &tipos {
            seeds.push(JobSpec::ListasRegioMuni {
                id_proceso_electoral,
                id_tipo_eleccion,
            });
        }
    }
    Ok(seeds)
}

/// Accepts identifiers serialized as numbers or numeric strings
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
