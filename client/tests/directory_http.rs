use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use caelium_client::{ClientConfig, DirectoryApi, HttpDirectoryApi, ServerDirectory, ServerSelector};
use caelium_protocol::{ServerDescriptor, ServerErrorReport};

#[derive(Clone, Default)]
struct FakeDirectory {
    unavailable: Arc<AtomicBool>,
    listings: Arc<AtomicUsize>,
    reports: Arc<Mutex<Vec<u64>>>,
}

fn listing() -> Vec<ServerDescriptor> {
    serde_json::from_str(
        r#"[
            {"id":1,"name":"primary","url":"https://one.caelium.app","weight":3,
             "created_at":"2024-03-01T09:00:00Z","capacity":800,"active_status":true,
             "release_update":false,"updated_at":"2024-03-02T09:00:00Z"},
            {"id":2,"name":"standby","url":"https://two.caelium.app","weight":1,
             "created_at":"2024-03-01T09:00:00Z","capacity":200,"active_status":false,
             "release_update":true,"updated_at":"2024-03-02T09:00:00Z"}
        ]"#,
    )
    .unwrap()
}

async fn list_servers(
    State(fake): State<FakeDirectory>,
) -> Result<Json<Vec<ServerDescriptor>>, StatusCode> {
    fake.listings.fetch_add(1, Ordering::SeqCst);
    if fake.unavailable.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(listing()))
}

async fn report_error(
    State(fake): State<FakeDirectory>,
    Json(report): Json<ServerErrorReport>,
) -> StatusCode {
    fake.reports.lock().unwrap().push(report.server_id);
    StatusCode::OK
}

async fn start(fake: FakeDirectory) -> ClientConfig {
    let app = Router::new()
        .route("/api/core/servers/", get(list_servers))
        .route("/api/core/public_server_error_handler/", post(report_error))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ClientConfig {
        api_host: format!("http://{}", addr),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_servers_over_http() {
    let config = start(FakeDirectory::default()).await;
    let api = HttpDirectoryApi::new(&config).unwrap();

    let servers = api.fetch_servers().await.unwrap();

    assert_eq!(servers, listing());
    assert!(servers[0].is_selectable());
    assert!(!servers[1].is_selectable());
}

#[tokio::test]
async fn test_error_status_is_an_error() {
    let fake = FakeDirectory::default();
    fake.unavailable.store(true, Ordering::SeqCst);
    let config = start(fake).await;
    let api = HttpDirectoryApi::new(&config).unwrap();

    assert!(api.fetch_servers().await.is_err());
}

#[tokio::test]
async fn test_report_posts_server_id() {
    let fake = FakeDirectory::default();
    let config = start(fake.clone()).await;
    let api = HttpDirectoryApi::new(&config).unwrap();

    api.report_server_error(42).await.unwrap();

    assert_eq!(*fake.reports.lock().unwrap(), vec![42]);
}

#[tokio::test]
async fn test_directory_outage_serves_stale_list() {
    let fake = FakeDirectory::default();
    let config = start(fake.clone()).await;
    let directory = ServerDirectory::from_config(&config).unwrap();

    assert_eq!(directory.get_servers(false).await.len(), 2);

    fake.unavailable.store(true, Ordering::SeqCst);
    assert_eq!(directory.refresh().await.len(), 2);
    assert_eq!(fake.listings.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_selector_end_to_end() {
    let fake = FakeDirectory::default();
    let config = start(fake.clone()).await;
    let selector = ServerSelector::from_config(&config).unwrap();

    let picked = selector.select().await.unwrap();
    assert_eq!(picked.id, 1);

    assert!(selector.fail_over(&picked).await.is_none());
    assert_eq!(*fake.reports.lock().unwrap(), vec![1]);
    assert_eq!(fake.listings.load(Ordering::SeqCst), 2);
}
