use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use std::fmt;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub assets: AssetConfig,
    pub inference: InferenceConfig,
    pub vision: VisionConfig,
    pub text: TextModelConfig,
    pub llm: LLMConfig,
}

/// 启动时加载的本地文件（缺失即启动失败）
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub dataset_path: String,
    pub emotion_records_path: String,
    pub sentiment_vocab_path: String,
    pub medicine_vocab_path: String,
    pub medicine_labels_path: String,
    pub overlay_font_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_server_url: String,
    pub emotion_model: String,
    pub sentiment_model: String,
    pub medicine_model: String,
    pub face_detector_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub camera_source: String,
    pub camera_fps: u32,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub probability_threshold: f32,
    pub dwell_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TextModelConfig {
    pub max_sequence_length: usize,
    pub num_words: Option<u32>,
    pub medicine_num_words: Option<u32>,
}

#[derive(Clone)]
pub struct LLMConfig {
    pub enabled: bool,
    pub mock: bool,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLMConfig")
            .field("enabled", &self.enabled)
            .field("mock", &self.mock)
            .field("api_url", &self.api_url)
            .field("api_key", &"***REDACTED***")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_source: "./data/camera".to_string(),
            camera_fps: 15,
            scale_factor: 1.3,
            min_neighbors: 5,
            probability_threshold: 40.0,
            dwell_secs: 5,
        }
    }
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: 100,
            num_words: Some(5000),
            medicine_num_words: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let num_words = env_or_parse("TOKENIZER_NUM_WORDS", 5000_u32);
        let medicine_num_words = env_or_parse("MEDICINE_TOKENIZER_NUM_WORDS", 0_u32);
        let font = env_or("OVERLAY_FONT_PATH", "");
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 8000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/virtual-doctor.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            assets: AssetConfig {
                dataset_path: env_or("DATASET_PATH", "./data/drugsComTest_raw.csv"),
                emotion_records_path: env_or(
                    "EMOTION_RECORDS_PATH",
                    "./data/emotion_results.json",
                ),
                sentiment_vocab_path: env_or(
                    "SENTIMENT_VOCAB_PATH",
                    "./models/sentiment_tokenizer.json",
                ),
                medicine_vocab_path: env_or(
                    "MEDICINE_VOCAB_PATH",
                    "./models/medicine_tokenizer.json",
                ),
                medicine_labels_path: env_or(
                    "MEDICINE_LABELS_PATH",
                    "./models/medicine_labels.json",
                ),
                overlay_font_path: (!font.trim().is_empty()).then_some(font),
            },
            inference: InferenceConfig {
                model_server_url: env_or("MODEL_SERVER_URL", "http://localhost:8501"),
                emotion_model: env_or("EMOTION_MODEL_NAME", "emotion_detection"),
                sentiment_model: env_or("SENTIMENT_MODEL_NAME", "sentiment_lstm"),
                medicine_model: env_or("MEDICINE_MODEL_NAME", "medicine_recommendation"),
                face_detector_url: env_or(
                    "FACE_DETECTOR_URL",
                    "http://localhost:8502/detect",
                ),
                timeout_secs: env_or_parse("INFERENCE_TIMEOUT_SECS", 10_u64),
            },
            vision: VisionConfig {
                camera_source: env_or("CAMERA_SOURCE", "./data/camera"),
                camera_fps: env_or_parse("CAMERA_FPS", 15_u32).clamp(1, 1000),
                scale_factor: env_or_parse("FACE_SCALE_FACTOR", 1.3_f64),
                min_neighbors: env_or_parse("FACE_MIN_NEIGHBORS", 5_u32),
                probability_threshold: env_or_parse("PROBABILITY_THRESHOLD", 40.0_f32),
                dwell_secs: env_or_parse("DWELL_SECS", 5_u64),
            },
            text: TextModelConfig {
                max_sequence_length: env_or_parse("MAX_SEQUENCE_LENGTH", 100_usize),
                // 0 表示不限制词表大小
                num_words: (num_words > 0).then_some(num_words),
                medicine_num_words: (medicine_num_words > 0).then_some(medicine_num_words),
            },
            llm: LLMConfig {
                enabled: env_or_bool("LLM_ENABLED", true),
                mock: env_or_bool("LLM_MOCK", false),
                api_url: env_or("LLM_API_URL", "http://localhost:11434"),
                api_key: env_or("LLM_API_KEY", ""),
                model: env_or("LLM_MODEL", "llama2"),
                timeout_secs: env_or_parse("LLM_TIMEOUT_SECS", 120_u64),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
