use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use region_caption_core::{AppError, CaptionClient, Config, ImageLoader, ImageSource};

/// One HTTP request as seen by the stub server.
struct Recorded {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Accepts a single connection, records the request and answers with a
/// canned response.
async fn serve_once(status: &'static str, content_type: &'static str, body: Vec<u8>) -> (String, JoinHandle<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut request_body = buf[header_end + 4..].to_vec();
        while request_body.len() < content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body was complete");
            request_body.extend_from_slice(&chunk[..n]);
        }

        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.ok();

        Recorded {
            request_line,
            headers,
            body: request_body,
        }
    });

    (base, handle)
}

fn caption_client(endpoint: String) -> CaptionClient {
    let config = Config::builder().with_endpoint(endpoint).build().unwrap();
    CaptionClient::new(&config).unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_caption_request_is_json_post() {
    let (base, server) = serve_once(
        "200 OK",
        "application/json",
        br#"{"captions":["A red boat on water","boat, water, red"]}"#.to_vec(),
    )
    .await;

    let client = caption_client(format!("{}/caption", base));
    let captions = client.caption("data:image/png;base64,iVBORw0KGgo=").await.unwrap();
    assert_eq!(captions, vec!["A red boat on water", "boat, water, red"]);

    let recorded = server.await.unwrap();
    assert!(recorded.request_line.starts_with("POST /caption "));
    assert_eq!(recorded.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&recorded.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "image_data": "data:image/png;base64,iVBORw0KGgo=" })
    );
}

#[tokio::test]
async fn test_caption_server_error_message_is_surfaced() {
    let (base, server) = serve_once(
        "500 Internal Server Error",
        "application/json",
        br#"{"error":"model unavailable"}"#.to_vec(),
    )
    .await;

    let err = caption_client(format!("{}/caption", base))
        .caption("data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CaptionService(_)));
    assert_eq!(err.to_string(), "model unavailable");
    server.await.unwrap();
}

#[tokio::test]
async fn test_caption_server_error_without_message() {
    let (base, server) = serve_once("502 Bad Gateway", "text/html", b"<h1>bad gateway</h1>".to_vec()).await;

    let err = caption_client(format!("{}/caption", base))
        .caption("data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Server error");
    server.await.unwrap();
}

#[tokio::test]
async fn test_image_fetch_sends_cache_bust_query() {
    let (base, server) = serve_once("200 OK", "image/png", png_bytes(24, 16)).await;

    let loader = ImageLoader::new(&Config::builder().build().unwrap()).unwrap();
    let url = Url::parse(&format!("{}/tomo/slice.png?size=big", base)).unwrap();
    let image = loader.load(&ImageSource::Url(url)).await.unwrap();
    assert_eq!((image.width(), image.height()), (24, 16));

    let recorded = server.await.unwrap();
    assert!(recorded.request_line.starts_with("GET /tomo/slice.png?size=big&t="));
    let target = recorded.request_line.split(' ').nth(1).unwrap();
    let stamp = target.rsplit("t=").next().unwrap();
    assert!(!stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_image_fetch_not_found_is_reported() {
    let (base, server) = serve_once("404 Not Found", "text/plain", b"missing".to_vec()).await;

    let loader = ImageLoader::new(&Config::builder().build().unwrap()).unwrap();
    let url = Url::parse(&format!("{}/gone.png", base)).unwrap();
    let err = loader.load(&ImageSource::Url(url)).await.unwrap_err();

    assert!(matches!(err, AppError::Network(_)));
    assert!(err.to_string().contains("404"));
    server.await.unwrap();
}
