use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use virtual_doctor::classifier::{Padding, TextClassifier, Vocabulary};
use virtual_doctor::config::{
    AssetConfig, Config, InferenceConfig, LLMConfig, TextModelConfig, VisionConfig,
};
use virtual_doctor::constants::SENTIMENT_CLASSES;
use virtual_doctor::dataset::{DrugDataset, DrugReview};
use virtual_doctor::inference::SequenceClassifier;
use virtual_doctor::records::RecordStore;
use virtual_doctor::routes::build_router;
use virtual_doctor::state::{AppState, Components};
use virtual_doctor::store::Store;
use virtual_doctor::vision::annotate::Annotator;
use virtual_doctor::vision::camera::CameraProvider;
use virtual_doctor::vision::FrameProcessor;

use super::stubs::{CenterFaceDetector, FiniteCamera, FixedExpressionModel, FixedSequenceModel};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
    _temp_dir: TempDir,
}

pub struct TestOptions {
    pub llm: LLMConfig,
    pub camera: Arc<dyn CameraProvider>,
    pub sentiment_model: Arc<dyn SequenceClassifier>,
    pub medicine_model: Arc<dyn SequenceClassifier>,
    pub rows: Vec<DrugReview>,
}

pub fn mock_llm() -> LLMConfig {
    LLMConfig {
        enabled: true,
        mock: true,
        api_url: String::new(),
        api_key: String::new(),
        model: "llama2".to_string(),
        timeout_secs: 5,
    }
}

pub fn live_llm(url: &str) -> LLMConfig {
    LLMConfig {
        mock: false,
        api_url: url.to_string(),
        ..mock_llm()
    }
}

pub fn review(drug: &str, condition: &str, rating: f64) -> DrugReview {
    DrugReview {
        drug_name: drug.to_string(),
        condition: condition.to_string(),
        rating,
    }
}

pub fn sample_rows() -> Vec<DrugReview> {
    vec![
        review("Ibuprofen", "Back Pain", 7.0),
        review("Naproxen", "Back Pain", 9.0),
        review("Sertraline", "Depression", 8.0),
        review("Bupropion", "Depression", 8.0),
        review("Adapalene", "Acne", 6.0),
        review("Melatonin", "Insomnia", 10.0),
    ]
}

/// Labels the medicine stub model predicts over.
pub const MEDICINE_LABELS: [&str; 3] = ["Adapalene", "Naproxen", "Sertraline"];

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            llm: mock_llm(),
            camera: Arc::new(FiniteCamera { frames: 3 }),
            sentiment_model: Arc::new(FixedSequenceModel::new(vec![0.1, 0.2, 0.7])),
            medicine_model: Arc::new(FixedSequenceModel::new(vec![0.15, 0.8, 0.05])),
            rows: sample_rows(),
        }
    }
}

fn vocabulary() -> Vocabulary {
    let words = ["i", "love", "this", "hate", "pain", "back", "acne", "sad", "happy"];
    let map: HashMap<String, u32> = words
        .iter()
        .enumerate()
        .map(|(i, w)| (w.to_string(), i as u32 + 1))
        .collect();
    Vocabulary::new(map, Some(5000))
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(TestOptions::default()).await
}

pub async fn spawn_with(options: TestOptions) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let path = |name: &str| temp_dir.path().join(name).to_string_lossy().to_string();

    // 直接构造 Config，避免 set_var 造成多线程测试环境变量竞态
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 8000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: path("virtual-doctor-test.sled"),
        cors_origin: "http://localhost:5173".to_string(),
        assets: AssetConfig {
            dataset_path: path("drugs.csv"),
            emotion_records_path: path("emotion_results.json"),
            sentiment_vocab_path: path("sentiment_tokenizer.json"),
            medicine_vocab_path: path("medicine_tokenizer.json"),
            medicine_labels_path: path("medicine_labels.json"),
            overlay_font_path: None,
        },
        inference: InferenceConfig {
            model_server_url: "http://127.0.0.1:1".to_string(),
            emotion_model: "emotion_detection".to_string(),
            sentiment_model: "sentiment_lstm".to_string(),
            medicine_model: "medicine_recommendation".to_string(),
            face_detector_url: "http://127.0.0.1:1/detect".to_string(),
            timeout_secs: 1,
        },
        vision: VisionConfig {
            // 第二帧即确认，便于测试持久化
            dwell_secs: 0,
            ..VisionConfig::default()
        },
        text: TextModelConfig::default(),
        llm: options.llm,
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");
    let records = Arc::new(
        RecordStore::open(&config.assets.emotion_records_path)
            .await
            .expect("open record store"),
    );

    let sentiment = TextClassifier::new(
        vocabulary(),
        SENTIMENT_CLASSES.iter().map(|s| s.to_string()).collect(),
        options.sentiment_model,
        config.text.max_sequence_length,
        Padding::Pre,
    );
    let medicine = TextClassifier::new(
        vocabulary(),
        MEDICINE_LABELS.iter().map(|s| s.to_string()).collect(),
        options.medicine_model,
        config.text.max_sequence_length,
        Padding::Post,
    );
    let frames = FrameProcessor::new(
        Arc::new(CenterFaceDetector),
        Arc::new(FixedExpressionModel {
            class: 3,
            probability: 0.85,
        }),
        records.clone(),
        Annotator::default(),
        &config.vision,
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(
        Components {
            store,
            records,
            dataset: Arc::new(DrugDataset::from_rows(options.rows)),
            sentiment: Arc::new(sentiment),
            medicine: Arc::new(medicine),
            frames: Arc::new(frames),
            camera: options.camera,
        },
        &config,
        shutdown_tx.clone(),
    );

    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
        _temp_dir: temp_dir,
    }
}
