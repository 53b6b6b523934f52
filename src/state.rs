use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::classifier::TextClassifier;
use crate::config::Config;
use crate::dataset::DrugDataset;
use crate::records::RecordStore;
use crate::services::llm_provider::LlmProvider;
use crate::store::Store;
use crate::vision::camera::CameraProvider;
use crate::vision::FrameProcessor;

/// Everything loaded at startup that handlers need.
pub struct Components {
    pub store: Arc<Store>,
    pub records: Arc<RecordStore>,
    pub dataset: Arc<DrugDataset>,
    pub sentiment: Arc<TextClassifier>,
    pub medicine: Arc<TextClassifier>,
    pub frames: Arc<FrameProcessor>,
    pub camera: Arc<dyn CameraProvider>,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    records: Arc<RecordStore>,
    dataset: Arc<DrugDataset>,
    sentiment: Arc<TextClassifier>,
    medicine: Arc<TextClassifier>,
    frames: Arc<FrameProcessor>,
    camera: Arc<dyn CameraProvider>,
    llm: Arc<LlmProvider>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(components: Components, config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            store: components.store,
            records: components.records,
            dataset: components.dataset,
            sentiment: components.sentiment,
            medicine: components.medicine,
            frames: components.frames,
            camera: components.camera,
            llm: Arc::new(LlmProvider::new(&config.llm)),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn dataset(&self) -> &DrugDataset {
        &self.dataset
    }

    pub fn sentiment(&self) -> &TextClassifier {
        &self.sentiment
    }

    pub fn medicine(&self) -> &TextClassifier {
        &self.medicine
    }

    pub fn frames(&self) -> &Arc<FrameProcessor> {
        &self.frames
    }

    pub fn camera(&self) -> &dyn CameraProvider {
        self.camera.as_ref()
    }

    pub fn llm(&self) -> &LlmProvider {
        &self.llm
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
