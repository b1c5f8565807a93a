use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use etag_guard_axum::{EtagConfig, EtagLayer};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[cfg(debug_assertions)]
const HOST: &str = "localhost";
#[cfg(not(debug_assertions))]
const HOST: &str = "0.0.0.0";

#[derive(Clone, Serialize, Deserialize)]
struct Setting {
    id: String,
    value: String,
}

#[derive(Deserialize)]
struct SettingPatch {
    value: Option<String>,
}

type Settings = Arc<RwLock<HashMap<String, Setting>>>;

async fn list(State(settings): State<Settings>) -> Json<Vec<Setting>> {
    let mut all: Vec<Setting> = settings.read().await.values().cloned().collect();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    Json(all)
}

async fn create(
    State(settings): State<Settings>,
    Json(setting): Json<Setting>,
) -> (StatusCode, Json<Setting>) {
    settings
        .write()
        .await
        .insert(setting.id.clone(), setting.clone());
    (StatusCode::CREATED, Json(setting))
}

async fn fetch(
    State(settings): State<Settings>,
    Path(id): Path<String>,
) -> Result<Json<Setting>, StatusCode> {
    settings
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn replace(
    State(settings): State<Settings>,
    Path(id): Path<String>,
    Json(setting): Json<Setting>,
) -> Json<Setting> {
    let setting = Setting { id: id.clone(), ..setting };
    settings.write().await.insert(id, setting.clone());
    Json(setting)
}

async fn update(
    State(settings): State<Settings>,
    Path(id): Path<String>,
    Json(patch): Json<SettingPatch>,
) -> Result<Json<Setting>, StatusCode> {
    let mut settings = settings.write().await;
    let setting = settings.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(value) = patch.value {
        setting.value = value;
    }
    Ok(Json(setting.clone()))
}

async fn remove(State(settings): State<Settings>, Path(id): Path<String>) -> StatusCode {
    match settings.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let etag_config = EtagConfig::from_env().unwrap_or_else(|err| {
        log::warn!("Invalid ETag configuration ({err}), using defaults");
        EtagConfig::default()
    });

    let settings: Settings = Arc::new(RwLock::new(HashMap::from([(
        "s_1".to_string(),
        Setting {
            id: "s_1".to_string(),
            value: "x".to_string(),
        },
    )])));

    let app = Router::new()
        .route("/settings", get(list).post(create))
        .route(
            "/settings/:id",
            get(fetch).put(replace).patch(update).delete(remove),
        )
        .with_state(settings)
        .layer(EtagLayer::new(etag_config));

    let listener = match tokio::net::TcpListener::bind(format!("{HOST}:3002")).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("Unable to bind {HOST}:3002: {err}");
            return;
        }
    };

    log::info!("Serving settings on http://{HOST}:3002");
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("Server error: {err}");
    }
}
