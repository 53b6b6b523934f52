use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use virtual_doctor::classifier::text::load_labels;
use virtual_doctor::classifier::{Padding, TextClassifier, Vocabulary};
use virtual_doctor::config::Config;
use virtual_doctor::constants::SENTIMENT_CLASSES;
use virtual_doctor::dataset::DrugDataset;
use virtual_doctor::inference::{http_client, DetectorParams, RemoteModels};
use virtual_doctor::logging::{init_tracing, LogConfig};
use virtual_doctor::records::RecordStore;
use virtual_doctor::routes::build_router;
use virtual_doctor::state::{AppState, Components};
use virtual_doctor::store::Store;
use virtual_doctor::vision::annotate::Annotator;
use virtual_doctor::vision::camera::ConfiguredCamera;
use virtual_doctor::vision::FrameProcessor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig::from(&config));
    tracing::info!("Starting virtual-doctor");
    tracing::debug!(?config, "Loaded configuration");

    let store = Arc::new(Store::open(&config.sled_path).expect("Failed to open sled database"));
    store.run_migrations().expect("Failed to run migrations");

    let records = Arc::new(
        RecordStore::open(&config.assets.emotion_records_path)
            .await
            .expect("Failed to open emotion record file"),
    );
    let dataset = Arc::new(
        DrugDataset::from_csv(&config.assets.dataset_path).expect("Failed to load drug dataset"),
    );

    let models = RemoteModels::from_config(
        &config.inference,
        DetectorParams {
            scale_factor: config.vision.scale_factor,
            min_neighbors: config.vision.min_neighbors,
        },
    );

    let sentiment = TextClassifier::new(
        Vocabulary::load(&config.assets.sentiment_vocab_path, config.text.num_words)
            .expect("Failed to load sentiment vocabulary"),
        SENTIMENT_CLASSES.iter().map(|s| s.to_string()).collect(),
        Arc::new(models.sentiment),
        config.text.max_sequence_length,
        Padding::Pre,
    );
    let medicine = TextClassifier::new(
        Vocabulary::load(&config.assets.medicine_vocab_path, config.text.medicine_num_words)
            .expect("Failed to load medicine vocabulary"),
        load_labels(&config.assets.medicine_labels_path).expect("Failed to load medicine labels"),
        Arc::new(models.medicine),
        config.text.max_sequence_length,
        Padding::Post,
    );

    let annotator = Annotator::load(config.assets.overlay_font_path.as_deref())
        .expect("Failed to load overlay font");
    let frames = FrameProcessor::new(
        Arc::new(models.face_detector),
        Arc::new(models.emotion),
        records.clone(),
        annotator,
        &config.vision,
    );
    let camera = ConfiguredCamera::new(&config.vision, http_client(config.inference.timeout_secs));

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(
        Components {
            store: store.clone(),
            records,
            dataset,
            sentiment: Arc::new(sentiment),
            medicine: Arc::new(medicine),
            frames: Arc::new(frames),
            camera: Arc::new(camera),
        },
        &config,
        shutdown_tx.clone(),
    );

    let app = build_router(state)
        .layer(build_cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
    {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any);
    }

    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any),
        Err(e) => {
            panic!(
                "FATAL: Invalid CORS_ORIGIN '{}': {}. \
                 Fix the CORS_ORIGIN environment variable.",
                config.cors_origin, e
            );
        }
    }
}

/// 收到信号后广播关闭，视频流随之结束，否则优雅关闭会一直等待长连接
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
