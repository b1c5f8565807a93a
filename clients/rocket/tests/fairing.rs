use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use rocket::http::{ContentType, Header, Status};
use rocket::futures::stream;
use rocket::local::asynchronous::Client;
use rocket::response::stream::ByteStream;
use rocket::{routes, Build, Rocket, State};
use sha2::{Digest, Sha512};

use etag_guard_rocket::{EtagConfig, EtagFairing, EtagGuard};

const SETTING: &str = r#"{"id":"s_1","value":"x"}"#;
const UPDATED: &str = r#"{"id":"s_1","value":"y"}"#;

struct Calls(AtomicUsize);

#[rocket::get("/settings/<_>")]
fn fetch(calls: &State<Calls>) -> (ContentType, &'static str) {
    calls.0.fetch_add(1, Ordering::SeqCst);
    (ContentType::JSON, SETTING)
}

#[rocket::put("/settings/<_>")]
fn replace(calls: &State<Calls>) -> (ContentType, &'static str) {
    calls.0.fetch_add(1, Ordering::SeqCst);
    (ContentType::JSON, UPDATED)
}

#[rocket::post("/settings/<_>")]
fn create(calls: &State<Calls>) -> (ContentType, &'static str) {
    calls.0.fetch_add(1, Ordering::SeqCst);
    (ContentType::JSON, SETTING)
}

#[rocket::delete("/settings/<_>")]
fn remove(calls: &State<Calls>) -> (ContentType, &'static str) {
    calls.0.fetch_add(1, Ordering::SeqCst);
    (ContentType::JSON, SETTING)
}

#[rocket::get("/stream")]
fn streamed() -> (ContentType, ByteStream![&'static [u8]]) {
    let (head, tail) = SETTING.as_bytes().split_at(SETTING.len() / 2);
    (ContentType::JSON, ByteStream(stream::iter([head, tail])))
}

#[rocket::get("/html")]
fn html() -> (ContentType, &'static str) {
    (ContentType::HTML, "<p>hello</p>")
}

fn sha512_hex(body: &[u8]) -> String {
    hex::encode_upper(Sha512::digest(body))
}

fn rocket(guard: EtagGuard) -> Rocket<Build> {
    rocket::build()
        .manage(Calls(AtomicUsize::new(0)))
        .attach(EtagFairing::from_guard(guard))
        .mount("/", routes![fetch, replace, create, remove, streamed, html])
}

fn calls(client: &Client) -> usize {
    client
        .rocket()
        .state::<Calls>()
        .map_or(0, |calls| calls.0.load(Ordering::SeqCst))
}

#[rocket::async_test]
async fn settings_round_trip_scenario() {
    let client = Client::tracked(rocket(EtagGuard::default())).await.unwrap();

    let first = client.get("/settings/s_1").dispatch().await;
    assert_eq!(first.status(), Status::Ok);
    let etag = first.headers().get_one("ETag").unwrap().to_string();
    assert_eq!(etag, format!("\"{}\"", sha512_hex(SETTING.as_bytes())));
    assert_eq!(first.into_string().await.as_deref(), Some(SETTING));

    let cached = client
        .get("/settings/s_1")
        .header(Header::new("If-None-Match", etag.clone()))
        .dispatch()
        .await;
    assert_eq!(cached.status(), Status::NotModified);
    assert_eq!(cached.headers().get_one("ETag"), Some(etag.as_str()));
    assert!(cached.into_bytes().await.unwrap_or_default().is_empty());

    let stale = client
        .put("/settings/s_1")
        .header(Header::new("If-Match", "\"stale-hash\""))
        .dispatch()
        .await;
    assert_eq!(stale.status(), Status::PreconditionFailed);
    assert!(stale.into_bytes().await.unwrap_or_default().is_empty());

    assert_eq!(calls(&client), 2);
}

#[rocket::async_test]
async fn matching_if_match_updates_fingerprint() {
    let guard = EtagGuard::default();
    guard.store().set("/settings/s_1", "CURRENT");
    let client = Client::tracked(rocket(guard.clone())).await.unwrap();

    let resp = client
        .put("/settings/s_1")
        .header(Header::new("If-Match", "\"CURRENT\""))
        .dispatch()
        .await;

    assert_eq!(resp.status(), Status::Ok);
    assert_eq!(
        guard.store().get("/settings/s_1"),
        Some(sha512_hex(UPDATED.as_bytes()))
    );
    assert_eq!(resp.into_string().await.as_deref(), Some(UPDATED));
}

#[rocket::async_test]
async fn stale_put_never_reaches_handler() {
    let guard = EtagGuard::default();
    guard.store().set("/settings/s_1", "CURRENT");
    let client = Client::tracked(rocket(guard.clone())).await.unwrap();

    let resp = client
        .put("/settings/s_1")
        .header(Header::new("If-Match", "\"OTHER\""))
        .dispatch()
        .await;

    assert_eq!(resp.status(), Status::PreconditionFailed);
    assert_eq!(calls(&client), 0);
    assert_eq!(guard.store().get("/settings/s_1").as_deref(), Some("CURRENT"));
}

#[rocket::async_test]
async fn post_and_delete_are_left_alone() {
    let guard = EtagGuard::default();
    guard.store().set("/settings/s_1", "CURRENT");
    let client = Client::tracked(rocket(guard.clone())).await.unwrap();

    let created = client
        .post("/settings/s_1")
        .header(Header::new("If-Match", "\"STALE\""))
        .dispatch()
        .await;
    assert_eq!(created.status(), Status::Ok);
    assert_eq!(created.headers().get_one("ETag"), None);

    let removed = client
        .delete("/settings/s_1")
        .header(Header::new("If-Match", "\"STALE\""))
        .dispatch()
        .await;
    assert_eq!(removed.status(), Status::Ok);
    assert_eq!(removed.headers().get_one("ETag"), None);

    assert_eq!(calls(&client), 2);
    assert_eq!(guard.store().get("/settings/s_1").as_deref(), Some("CURRENT"));
}

#[rocket::async_test]
async fn non_json_responses_are_not_tagged() {
    let guard = EtagGuard::default();
    let client = Client::tracked(rocket(guard.clone())).await.unwrap();

    let resp = client.get("/html").dispatch().await;

    assert_eq!(resp.status(), Status::Ok);
    assert_eq!(resp.headers().get_one("ETag"), None);
    assert!(guard.store().is_empty());
}

#[rocket::async_test]
async fn streamed_bodies_within_limit_are_tagged() {
    let guard = EtagGuard::default();
    let client = Client::tracked(rocket(guard.clone())).await.unwrap();

    let resp = client.get("/stream").dispatch().await;

    assert_eq!(resp.status(), Status::Ok);
    let expected = format!("\"{}\"", sha512_hex(SETTING.as_bytes()));
    assert_eq!(resp.headers().get_one("ETag"), Some(expected.as_str()));
    assert_eq!(resp.into_string().await.as_deref(), Some(SETTING));
}

#[rocket::async_test]
async fn oversized_streamed_bodies_pass_through_untagged() {
    let guard = EtagGuard::new(EtagConfig::default().with_max_body_bytes(8));
    let client = Client::tracked(rocket(guard.clone())).await.unwrap();

    let resp = client.get("/stream").dispatch().await;

    assert_eq!(resp.status(), Status::Ok);
    assert_eq!(resp.headers().get_one("ETag"), None);
    assert_eq!(resp.into_string().await.as_deref(), Some(SETTING));
    assert!(guard.store().is_empty());
}

#[rocket::async_test]
async fn rejection_route_is_not_reachable_directly() {
    let client = Client::tracked(rocket(EtagGuard::default())).await.unwrap();

    let resp = client
        .get("/__etag_guard/precondition-failed")
        .dispatch()
        .await;

    assert_eq!(resp.status(), Status::NotFound);
}
