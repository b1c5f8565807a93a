#[macro_use]
extern crate rocket;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use etag_guard_rocket::{EtagConfig, EtagFairing};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

#[cfg(debug_assertions)]
const HOST: &str = "127.0.0.1";
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

#[get("/settings")]
fn list(settings: &State<Settings>) -> Json<Vec<Setting>> {
    let mut all: Vec<Setting> = settings.lock().values().cloned().collect();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    Json(all)
}

#[post("/settings", data = "<setting>")]
fn create(settings: &State<Settings>, setting: Json<Setting>) -> (Status, Json<Setting>) {
    let setting = setting.into_inner();
    settings.lock().insert(setting.id.clone(), setting.clone());
    (Status::Created, Json(setting))
}

#[get("/settings/<id>")]
fn fetch(settings: &State<Settings>, id: &str) -> Option<Json<Setting>> {
    settings.lock().get(id).cloned().map(Json)
}

#[put("/settings/<id>", data = "<setting>")]
fn replace(settings: &State<Settings>, id: &str, setting: Json<Setting>) -> Json<Setting> {
    let setting = Setting {
        id: id.to_string(),
        ..setting.into_inner()
    };
    settings.lock().insert(id.to_string(), setting.clone());
    Json(setting)
}

#[patch("/settings/<id>", data = "<patch>")]
fn update(settings: &State<Settings>, id: &str, patch: Json<SettingPatch>) -> Option<Json<Setting>> {
    let mut settings = settings.lock();
    let setting = settings.get_mut(id)?;
    if let Some(value) = patch.into_inner().value {
        setting.value = value;
    }
    Some(Json(setting.clone()))
}

#[delete("/settings/<id>")]
fn remove(settings: &State<Settings>, id: &str) -> Status {
    match settings.lock().remove(id) {
        Some(_) => Status::NoContent,
        None => Status::NotFound,
    }
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let etag_config = EtagConfig::from_env().unwrap_or_else(|err| {
        log::warn!("Invalid ETag configuration ({err}), using defaults");
        EtagConfig::default()
    });

    let rocket_config = rocket::Config::figment()
        .merge(("address", HOST))
        .merge(("port", 3003))
        .merge(("log_level", "critical"));

    let settings = Settings(Mutex::new(HashMap::from([(
        "s_1".to_string(),
        Setting {
            id: "s_1".to_string(),
            value: "x".to_string(),
        },
    )])));

    rocket::custom(rocket_config)
        .manage(settings)
        .attach(EtagFairing::new(etag_config))
        .mount("/", routes![list, create, fetch, replace, update, remove])
}
