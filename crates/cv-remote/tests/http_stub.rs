//! Integration tests: effect and persistence adapters against a local
//! stub server.

use cv_remote::*;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the stub saw.
#[derive(Debug)]
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serve exactly one request, answering with `status` and `reply`.
async fn stub(status: u16, reply: &'static [u8]) -> (RemoteConfig, oneshot::Receiver<Captured>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let mut lines = head.lines();
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = buf[head_end..].to_vec();

        let response_head = format!(
            "HTTP/1.1 {status} Stub\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            reply.len()
        );
        socket.write_all(response_head.as_bytes()).await.unwrap();
        socket.write_all(reply).await.unwrap();
        socket.shutdown().await.unwrap();
        let _ = tx.send(Captured { request_line, headers, body });
    });
    (RemoteConfig::new(base), rx)
}

#[tokio::test]
async fn remove_background_posts_png_and_returns_reply() {
    let (mut config, seen) = stub(200, b"\x89PNG-result").await;
    config.token = Some("t0ken".into());
    let client = HttpEffectsClient::new(config).unwrap();

    let out = client
        .apply(Effect::RemoveBackground, b"\x89PNG-input".to_vec())
        .await
        .unwrap();
    assert_eq!(out, b"\x89PNG-result".to_vec());

    let seen = seen.await.unwrap();
    assert_eq!(seen.request_line, "POST /image/remove-background HTTP/1.1");
    assert_eq!(seen.header("content-type"), Some("image/png"));
    assert_eq!(seen.header("authorization"), Some("Bearer t0ken"));
    assert_eq!(seen.body, b"\x89PNG-input".to_vec());
}

#[tokio::test]
async fn backend_error_status_is_reported() {
    let (config, _seen) = stub(500, b"model crashed").await;
    let client = HttpEffectsClient::new(config).unwrap();

    let err = client.apply(Effect::RemoveText, vec![1, 2, 3]).await.unwrap_err();
    match err {
        RemoteError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_reply_is_an_error() {
    let (config, _seen) = stub(200, b"").await;
    let client = HttpEffectsClient::new(config).unwrap();
    let err = client.apply(Effect::RemoveText, vec![1]).await.unwrap_err();
    assert!(matches!(err, RemoteError::EmptyBody));
}

#[tokio::test]
async fn save_patches_canvas_and_preview() {
    let (config, seen) = stub(204, b"").await;
    let client = SlideClient::new(config).unwrap();
    let canvas = SavedCanvas {
        canvas_json: r#"{"version":1,"width":800,"height":600,"objects":[]}"#.into(),
        rendered_image: "data:image/png;base64,AAAA".into(),
    };

    client.save("slides/42", &canvas).await.unwrap();

    let seen = seen.await.unwrap();
    assert_eq!(seen.request_line, "PATCH /slides/42 HTTP/1.1");
    assert!(seen.header("authorization").is_none());
    let sent: SavedCanvas = serde_json::from_slice(&seen.body).unwrap();
    assert_eq!(sent, canvas);
}
