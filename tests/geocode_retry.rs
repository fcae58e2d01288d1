//! Reverse-geocoding retry behavior against a local endpoint: one retry
//! after a fixed backoff, then the failure propagates.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use track_annotator::{AnnotateError, ReverseGeocoder, TrackPoint};

/// Minimal geocoding endpoint that fails the first `fail_first` requests
/// with a 500 and answers the rest with a fixed display name. Returns the
/// bound address and a request counter.
async fn spawn_geocode_server(fail_first: u32) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&requests);

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let attempt = counter.fetch_add(1, Ordering::SeqCst);

            // Drain the request headers before answering
            let mut buf = [0u8; 1024];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if buf[..n].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }

            let response = if attempt < fail_first {
                "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    .to_string()
            } else {
                let body = r#"{"display_name":"Haidian, Beijing, China"}"#;
                format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
            };
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, requests)
}

fn geocoder_for(addr: SocketAddr) -> ReverseGeocoder {
    ReverseGeocoder::new("track-annotator-tests")
        .unwrap()
        .with_base_url(&format!("http://{addr}"))
        .with_retry_backoff(Duration::from_millis(10))
}

#[tokio::test]
async fn immediate_success_does_not_retry() {
    let (addr, requests) = spawn_geocode_server(0).await;
    let geocoder = geocoder_for(addr);

    let name = geocoder
        .reverse(&TrackPoint::new(39.98, 116.30))
        .await
        .unwrap();
    assert_eq!(name, "Haidian, Beijing, China");
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_failure_recovers_on_the_retry() {
    let (addr, requests) = spawn_geocode_server(1).await;
    let geocoder = geocoder_for(addr);

    let name = geocoder
        .reverse(&TrackPoint::new(39.98, 116.30))
        .await
        .unwrap();
    assert_eq!(name, "Haidian, Beijing, China");
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn second_failure_propagates_after_exactly_one_retry() {
    let (addr, requests) = spawn_geocode_server(u32::MAX).await;
    let geocoder = geocoder_for(addr);

    let err = geocoder
        .reverse(&TrackPoint::new(39.98, 116.30))
        .await
        .unwrap_err();
    assert!(matches!(err, AnnotateError::Geocode { .. }));
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}
