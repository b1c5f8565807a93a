use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use etag_guard_actix::{EtagConfig, EtagLayer};
use serde::{Deserialize, Serialize};

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

struct Settings(Mutex<HashMap<String, Setting>>);

impl Settings {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Setting>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn list(settings: web::Data<Settings>) -> impl Responder {
    let mut all: Vec<Setting> = settings.lock().values().cloned().collect();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    HttpResponse::Ok().json(all)
}

async fn create(settings: web::Data<Settings>, setting: web::Json<Setting>) -> impl Responder {
    let setting = setting.into_inner();
    settings.lock().insert(setting.id.clone(), setting.clone());
    HttpResponse::Created().json(setting)
}

async fn fetch(settings: web::Data<Settings>, id: web::Path<String>) -> impl Responder {
    match settings.lock().get(id.as_str()) {
        Some(setting) => HttpResponse::Ok().json(setting),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn replace(
    settings: web::Data<Settings>,
    id: web::Path<String>,
    setting: web::Json<Setting>,
) -> impl Responder {
    let id = id.into_inner();
    let setting = Setting {
        id: id.clone(),
        ..setting.into_inner()
    };
    settings.lock().insert(id, setting.clone());
    HttpResponse::Ok().json(setting)
}

async fn update(
    settings: web::Data<Settings>,
    id: web::Path<String>,
    patch: web::Json<SettingPatch>,
) -> impl Responder {
    let mut settings = settings.lock();
    let Some(setting) = settings.get_mut(id.as_str()) else {
        return HttpResponse::NotFound().finish();
    };
    if let Some(value) = patch.into_inner().value {
        setting.value = value;
    }
    HttpResponse::Ok().json(setting.clone())
}

async fn remove(settings: web::Data<Settings>, id: web::Path<String>) -> impl Responder {
    match settings.lock().remove(id.as_str()) {
        Some(_) => HttpResponse::NoContent().finish(),
        None => HttpResponse::NotFound().finish(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let etag_config = EtagConfig::from_env().unwrap_or_else(|err| {
        log::warn!("Invalid ETag configuration ({err}), using defaults");
        EtagConfig::default()
    });
    let etag_layer = EtagLayer::new(etag_config);

    let settings = web::Data::new(Settings(Mutex::new(HashMap::from([(
        "s_1".to_string(),
        Setting {
            id: "s_1".to_string(),
            value: "x".to_string(),
        },
    )]))));

    log::info!("Serving settings on http://{HOST}:3001");

    HttpServer::new(move || {
        App::new()
            .app_data(settings.clone())
            .wrap(etag_layer.clone())
            .route("/settings", web::get().to(list))
            .route("/settings", web::post().to(create))
            .route("/settings/{id}", web::get().to(fetch))
            .route("/settings/{id}", web::put().to(replace))
            .route("/settings/{id}", web::patch().to(update))
            .route("/settings/{id}", web::delete().to(remove))
    })
    .bind((HOST, 3001))?
    .run()
    .await
}
