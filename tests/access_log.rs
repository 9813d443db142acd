//! Runs in its own test binary because it installs a global logger.

mod common;

use common::{parse_logged_elapsed, property_quads, SlowStore, TestClient, TestServer};
use log::{Log, Metadata, Record};
use ogma_prime::api::access_log::ACCESS_LOG_TARGET;
use parking_lot::Mutex;
use std::sync::{Arc, Once};
use std::time::Duration;

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct Capture;

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.target() == ACCESS_LOG_TARGET {
            LINES.lock().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;
static INSTALL: Once = Once::new();

fn install_capture() {
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(log::LevelFilter::Info);
    });
}

/// Captured lines for one path, split into their five fields.
fn lines_for(path_suffix: &str) -> Vec<Vec<String>> {
    LINES
        .lock()
        .iter()
        .filter(|line| line.ends_with(path_suffix))
        .map(|line| line.split(' ').map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_one_access_line_per_request() {
    install_capture();

    let server = TestServer::start(property_quads()).await;
    let client = server.client();

    assert_eq!(client.get("/api/v1/properties/42").await.unwrap().status(), 200);
    assert_eq!(client.get("/api/v1/properties/4%222").await.unwrap().status(), 400);
    assert_eq!(client.post("/api/v1/properties/42").await.unwrap().status(), 405);
    let proxied = client
        .get_with_header("/api/v1/properties/43", "X-Real-IP", "203.0.113.5")
        .await
        .unwrap();
    assert_eq!(proxied.status(), 200);
    let forwarded = client
        .get_with_header("/api/v1/properties/43", "X-Forwarded-For", "198.51.100.20")
        .await
        .unwrap();
    assert_eq!(forwarded.status(), 200);

    server.shutdown().await;

    let fields: Vec<Vec<String>> = LINES
        .lock()
        .iter()
        .filter(|line| !line.ends_with("/slow"))
        .map(|line| line.split(' ').map(str::to_string).collect())
        .collect();
    assert_eq!(fields.len(), 5, "{:#?}", fields);
    for parts in &fields {
        assert_eq!(parts.len(), 5, "{:?}", parts);
        assert!(
            parse_logged_elapsed(&parts[3]).is_some(),
            "elapsed field {:?} is not a duration",
            parts[3]
        );
    }

    assert_eq!(fields[0][0], "GET");
    assert!(fields[0][1].starts_with("127.0.0.1:"));
    assert_eq!(fields[0][2], "200");
    assert_eq!(fields[0][4], "/api/v1/properties/42");

    assert_eq!(fields[1][2], "400");
    assert_eq!(fields[1][4], "/api/v1/properties/4%222");

    assert_eq!(fields[2][0], "POST");
    assert_eq!(fields[2][2], "405");

    assert_eq!(fields[3][1], "203.0.113.5");
    assert_eq!(fields[4][1], "198.51.100.20");
}

#[tokio::test]
async fn test_abandoned_request_is_logged_once() {
    install_capture();

    let store = Arc::new(SlowStore::new(
        vec![ogma_prime::Quad::new("/properties/slow", "/name", "x")],
        Duration::from_secs(2),
    ));
    let server = TestServer::with_store(store.clone()).await;
    let client = TestClient::impatient(server.base_url(), Duration::from_millis(200));

    let result = client.get("/api/v1/properties/slow").await;
    assert!(result.unwrap_err().is_timeout());

    // Longer than the store delay, so a surviving handler would have finished.
    tokio::time::sleep(Duration::from_secs(3)).await;

    let fields = lines_for("/slow");
    assert_eq!(fields.len(), 1, "{:?}", fields);
    assert_eq!(fields[0][0], "GET");
    assert_eq!(fields[0][2], "499");
    let elapsed = parse_logged_elapsed(&fields[0][3]).unwrap();
    assert!(elapsed >= Duration::from_millis(150), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);
    assert_eq!(store.finished(), 0);

    server.shutdown().await;
}
