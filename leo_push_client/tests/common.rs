use std::collections::VecDeque;

use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};

/// A request received by the [`MockServer`].
#[derive(Debug)]
pub struct ReceivedRequest {
    pub request_line: String,
    pub body: Value,
}

/// A minimal HTTP/1.1 server answering with canned responses, one per connection.
pub struct MockServer {
    pub base_url: String,
    pub requests: mpsc::UnboundedReceiver<ReceivedRequest>,
    pub task: JoinHandle<()>,
}

pub async fn start_mock_server(responses: Vec<(u16, String)>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut responses = VecDeque::from(responses);
        while let Some((status, body)) = responses.pop_front() {
            let (stream, _) = listener.accept().await.expect("accept");
            let request = serve_one(stream, status, &body).await;
            let _ = tx.send(request);
        }
    });

    MockServer {
        base_url: format!("http://{addr}"),
        requests: rx,
        task,
    }
}

async fn serve_one(mut stream: TcpStream, status: u16, body: &str) -> ReceivedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.expect("read request");
        assert!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.expect("read body");
        assert!(n > 0, "connection closed before body");
        buf.extend_from_slice(&chunk[..n]);
    }

    let response = format!(
        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream
        .write_all(response.as_bytes())
        .await
        .expect("write response");
    let _ = stream.shutdown().await;

    let request_line = headers.lines().next().unwrap_or_default().to_string();
    let body = serde_json::from_slice(&buf[header_end..header_end + content_length])
        .unwrap_or(Value::Null);

    ReceivedRequest { request_line, body }
}
