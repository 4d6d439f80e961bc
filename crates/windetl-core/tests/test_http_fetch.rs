use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::json;
use windetl_core::config::FetchConfig;
use windetl_core::error::FetchError;
use windetl_core::{
    FetchStop, HttpPageSource, Pipeline, PipelineConfig, PipelineOutcome, fetch_geojson, paginate,
};

/// Answers one connection per canned response, in order, then exits.
struct CannedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl CannedServer {
    fn start(responses: Vec<(u16, String)>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => raw.extend_from_slice(&buf[..n]),
                    }
                }
                let request_line = String::from_utf8_lossy(&raw)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push(request_line);

                thread::sleep(delay);
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "http://{}/arcgis/rest/services/PORTAL/WFS/MapServer/0/query",
            self.addr
        )
    }

    fn finish(self) -> Vec<String> {
        self.handle.join().unwrap();
        Arc::try_unwrap(self.requests).unwrap().into_inner().unwrap()
    }
}

fn page(names: &[&str]) -> (u16, String) {
    let features: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-37.0 - i as f64 * 0.1, -4.5]},
                "properties": {"NOME_EOL": name, "UF": "CE", "X": -37.0, "Y": -4.5}
            })
        })
        .collect();
    let body = json!({"type": "FeatureCollection", "features": features});
    (200, body.to_string())
}

fn fetch_config(endpoint: String, page_size: usize) -> FetchConfig {
    FetchConfig {
        endpoint,
        page_size,
        timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_fetch_pages_until_empty() {
    let server = CannedServer::start(
        vec![page(&["Taíba", "Icaraí"]), page(&["Trairi"]), page(&[])],
        Duration::ZERO,
    );

    let collection = fetch_geojson(&fetch_config(server.endpoint(), 2)).expect("features");
    assert_eq!(collection.features.len(), 3);
    assert_eq!(
        collection.features[0]
            .property("NOME_EOL")
            .and_then(|v| v.as_str()),
        Some("Taíba")
    );

    let requests = server.finish();
    assert_eq!(requests.len(), 3);
    for (request, offset) in requests.iter().zip([0, 2, 4]) {
        assert!(request.starts_with("GET /arcgis/rest/services/PORTAL/WFS/MapServer/0/query?"));
        assert!(request.contains(&format!("resultOffset={offset}")), "{request}");
        assert!(request.contains("resultRecordCount=2"), "{request}");
        assert!(request.contains("f=geojson"), "{request}");
        assert!(request.contains("outFields="), "{request}");
    }
}

#[test]
fn test_server_error_keeps_earlier_pages() {
    let server = CannedServer::start(
        vec![page(&["Taíba", "Icaraí"]), (500, "{}".to_string())],
        Duration::ZERO,
    );

    let source = HttpPageSource::new(&fetch_config(server.endpoint(), 2)).unwrap();
    let report = paginate(&source, 2);
    assert_eq!(report.features.len(), 2);
    assert_eq!(report.pages, 1);
    assert!(matches!(
        report.stop,
        FetchStop::Failed(FetchError::Status {
            offset: 2,
            status: 500
        })
    ));
    assert_eq!(server.finish().len(), 2);
}

#[test]
fn test_first_page_failure_is_no_data() {
    let server = CannedServer::start(vec![(503, "busy".to_string())], Duration::ZERO);

    assert!(fetch_geojson(&fetch_config(server.endpoint(), 1000)).is_none());
    server.finish();
}

#[test]
fn test_error_payload_is_no_data() {
    let body = json!({"error": {"code": 400, "message": "Invalid or missing input parameters."}});
    let server = CannedServer::start(vec![(200, body.to_string())], Duration::ZERO);

    assert!(fetch_geojson(&fetch_config(server.endpoint(), 1000)).is_none());
    server.finish();
}

#[test]
fn test_timeout_stops_pagination() {
    let server = CannedServer::start(vec![page(&["Taíba"])], Duration::from_secs(2));
    let config = FetchConfig {
        timeout: Duration::from_millis(200),
        ..fetch_config(server.endpoint(), 1000)
    };

    let source = HttpPageSource::new(&config).unwrap();
    let report = paginate(&source, config.page_size);
    assert!(report.features.is_empty());
    assert!(matches!(
        report.stop,
        FetchStop::Failed(FetchError::Request { offset: 0, .. })
    ));
    server.finish();
}

#[test]
fn test_pipeline_over_http() {
    let server = CannedServer::start(
        vec![page(&["Taíba", "Icaraí"]), page(&["Taíba"]), page(&[])],
        Duration::ZERO,
    );
    let temp_dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new()
        .with_endpoint(server.endpoint())
        .with_page_size(2)
        .with_data_root(temp_dir.path());

    let outcome = Pipeline::new(config.clone()).unwrap().run().unwrap();
    let PipelineOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    // the third feature repeats the first one's attributes and geometry
    assert_eq!(summary.fetched, Some(3));
    assert_eq!(summary.cleaned, 2);

    let raw = std::fs::read_to_string(&config.raw_path).unwrap();
    assert!(raw.contains("Taíba"), "non-ASCII text is written literally");
    assert!(raw.contains("\n  \""), "two-space indentation");

    let csv = std::fs::read_to_string(&config.processed_path).unwrap();
    assert!(csv.starts_with("NOME_EOL,UF,LATITUDE,LONGITUDE\n"));
    assert_eq!(csv.lines().count(), 3);
    server.finish();
}
