//! In-process fake CDP endpoint for tests.
//!
//! Accepts one WebSocket connection and answers each command through a
//! caller-supplied handler, echoing `id` and `sessionId` the way a real
//! browser does. Lets protocol-dependent code run without a browser.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

/// Spawn a fake CDP WebSocket server. The handler maps a (method, params)
/// pair to either a result object or a CDP error message.
pub async fn spawn_fake_cdp<F>(mut handler: F) -> String
where
    F: FnMut(&str, &Value) -> Result<Value, String> + Send + 'static,
{
    spawn_stallable_cdp(move |method, params| Some(handler(method, params))).await
}

/// Like [`spawn_fake_cdp`], but the handler may withhold a response
/// entirely (`None`), simulating a browser that never answers a command.
pub async fn spawn_stallable_cdp<F>(handler: F) -> String
where
    F: FnMut(&str, &Value) -> Option<Result<Value, String>> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut handler = handler;
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut read) = ws.split();
        while let Some(Ok(msg)) = read.next().await {
            match msg {
                Message::Text(text) => {
                    let req: Value = serde_json::from_str(&text).unwrap();
                    let method = req["method"].as_str().unwrap_or_default().to_string();
                    let params = req.get("params").cloned().unwrap_or_else(|| json!({}));
                    let mut resp = match handler(&method, &params) {
                        Some(Ok(result)) => json!({"id": req["id"], "result": result}),
                        Some(Err(message)) => {
                            json!({"id": req["id"], "error": {"message": message}})
                        }
                        None => continue,
                    };
                    if let Some(sid) = req.get("sessionId") {
                        resp["sessionId"] = sid.clone();
                    }
                    if sink.send(Message::Text(resp.to_string())).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    format!("ws://{addr}/devtools/browser/test")
}

/// Wrap a handler with the open-time boilerplate every toolset issues:
/// target discovery, flatten attach, domain enables, and the viewport probe.
pub fn with_open_boilerplate<F>(
    mut inner: F,
) -> impl FnMut(&str, &Value) -> Result<Value, String> + Send + 'static
where
    F: FnMut(&str, &Value) -> Result<Value, String> + Send + 'static,
{
    move |method, params| match method {
        "Target.getTargets" => Ok(json!({
            "targetInfos": [
                {"targetId": "T1", "type": "page", "url": "about:blank"}
            ]
        })),
        "Target.createTarget" => Ok(json!({"targetId": "T2"})),
        "Target.attachToTarget" => Ok(json!({"sessionId": "S1"})),
        "Page.enable" | "Runtime.enable" | "DOM.enable" => Ok(json!({})),
        "Runtime.evaluate"
            if params["expression"]
                .as_str()
                .unwrap_or_default()
                .contains("innerWidth") =>
        {
            Ok(eval_string(r#"{"width":1280,"height":720}"#))
        }
        _ => inner(method, params),
    }
}

/// A `Runtime.evaluate` result whose value is the given string.
pub fn eval_string(value: &str) -> Value {
    json!({"result": {"type": "string", "value": value}})
}

/// A `Runtime.evaluate` result for the page-info probe.
pub fn eval_page_info(url: &str, title: &str) -> Value {
    eval_string(&format!(r#"{{"url":"{url}","title":"{title}"}}"#))
}

/// A connected session backed by a fake CDP server, for tool tests.
pub async fn scoped_session<F>(handler: F) -> std::sync::Arc<crate::session::BrowserSession>
where
    F: FnMut(&str, &Value) -> Result<Value, String> + Send + 'static,
{
    let url = spawn_fake_cdp(handler).await;
    let cdp = std::sync::Arc::new(crate::cdp::CdpClient::connect(&url).await.unwrap());
    std::sync::Arc::new(crate::session::BrowserSession::new(
        cdp,
        "S1".to_string(),
        browser_use_core::Viewport {
            width: 1280,
            height: 720,
        },
    ))
}

/// Serve one HTTP GET with the given body, as a `/json/version` metadata
/// endpoint would. Returns the URL to fetch.
pub async fn spawn_fake_version_endpoint(body: String) -> String {
    spawn_fake_metadata_endpoint("/json/version", body).await
}

/// Serve one HTTP GET with the given JSON body, but only at `path`; any
/// other path gets a 404. Returns the URL of the served path.
pub async fn spawn_fake_metadata_endpoint(path: &'static str, body: String) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        let request = String::from_utf8_lossy(&buf[..n]);
        let requested = request
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string();
        let response = if requested == path {
            format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            )
        } else {
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string()
        };
        let _ = stream.write_all(response.as_bytes()).await;
    });

    format!("http://{addr}{path}")
}
