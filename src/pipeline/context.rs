use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::config::RetrievalSync;
use crate::llm::TextGenerator;
use crate::pipeline::state::{PatientProfile, PipelineState};
use crate::trials::{ChartRenderer, TrialCatalog, TrialSearchResult};
use crate::types::{AppError, AppResult};

/// Side channel the stages write alongside the state they return.
///
/// One instance per run, so concurrent or repeated runs never see each
/// other's values.
#[derive(Clone, Default)]
pub struct SharedMemory {
    inner: Arc<RwLock<PipelineState>>,
}

impl SharedMemory {
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PipelineState),
    {
        let mut guard = self.inner.write().await;
        f(&mut *guard);
    }

    pub async fn snapshot(&self) -> PipelineState {
        self.inner.read().await.clone()
    }

    pub async fn patient_profile(&self) -> Option<PatientProfile> {
        self.inner.read().await.patient_profile.clone()
    }

    pub async fn tool_result(&self) -> Option<TrialSearchResult> {
        self.inner.read().await.tool_result.clone()
    }
}

/// The leaf services every run uses
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn TextGenerator>,
    pub catalog: Arc<TrialCatalog>,
    pub charts: Arc<dyn ChartRenderer>,
}

/// Per-run bundle handed to every stage
pub struct RunContext {
    run_id: Uuid,
    services: Services,
    memory: SharedMemory,
    profile_tx: watch::Sender<Option<PatientProfile>>,
    retrieval_sync: RetrievalSync,
    chart_path: PathBuf,
}

impl RunContext {
    pub fn new(run_id: Uuid, services: Services, retrieval_sync: RetrievalSync, chart_path: PathBuf) -> Self {
        let (profile_tx, _) = watch::channel(None);
        Self {
            run_id,
            services,
            memory: SharedMemory::default(),
            profile_tx,
            retrieval_sync,
            chart_path,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.services.generator.as_ref()
    }

    pub fn catalog(&self) -> &TrialCatalog {
        &self.services.catalog
    }

    pub fn catalog_handle(&self) -> Arc<TrialCatalog> {
        self.services.catalog.clone()
    }

    pub fn chart_renderer(&self) -> Arc<dyn ChartRenderer> {
        self.services.charts.clone()
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    pub fn retrieval_sync(&self) -> RetrievalSync {
        self.retrieval_sync
    }

    pub fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    /// Hand the extracted profile to whoever is waiting on it
    pub fn publish_profile(&self, profile: PatientProfile) {
        self.profile_tx.send_replace(Some(profile));
    }

    /// Wait until Intake has published a profile
    pub async fn await_profile(&self) -> AppResult<PatientProfile> {
        let mut rx = self.profile_tx.subscribe();
        let profile = {
            let guard = rx
                .wait_for(|p| p.is_some())
                .await
                .map_err(|_| AppError::Internal("Profile handoff closed before Intake finished".to_string()))?;
            guard.clone()
        };
        Ok(profile.unwrap_or_default())
    }
}
