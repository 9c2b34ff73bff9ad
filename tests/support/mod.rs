#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use plant_care_tracker::{build_router, AppState, GatewaySettings, MemoryStore};
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

pub struct TestResponse {
    pub status: u16,
    pub head: String,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is json")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

pub async fn spawn_gateway(store: Arc<MemoryStore>) -> SocketAddr {
    spawn_gateway_with(store, GatewaySettings::default()).await
}

pub async fn spawn_gateway_with(store: Arc<MemoryStore>, settings: GatewaySettings) -> SocketAddr {
    let app = build_router(AppState::new(store, settings));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&Value>,
) -> TestResponse {
    let mut stream = TcpStream::connect(addr).await.expect("connect server");

    let payload = body.map(Value::to_string).unwrap_or_default();
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    if body.is_some() {
        req.push_str("Content-Type: application/json\r\n");
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n", payload.len()));
    req.push_str(&payload);

    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");

    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");

    TestResponse {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

pub async fn get(addr: SocketAddr, path: &str) -> TestResponse {
    send(addr, "GET", path, &[], None).await
}

pub async fn post(addr: SocketAddr, path: &str, body: &Value) -> TestResponse {
    send(addr, "POST", path, &[], Some(body)).await
}

pub async fn put(addr: SocketAddr, path: &str, body: &Value) -> TestResponse {
    send(addr, "PUT", path, &[], Some(body)).await
}

pub async fn delete(addr: SocketAddr, path: &str) -> TestResponse {
    send(addr, "DELETE", path, &[], None).await
}
