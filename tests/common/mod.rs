//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use forward_proxy::config::validate_config;
use forward_proxy::observability::LogSink;
use forward_proxy::{ProxyConfig, ProxyServer};

/// Start a simple mock origin that returns a fixed body.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move |_head| async move {
        (200, Vec::new(), response.to_string())
    })
    .await;
}

/// Start a mock origin whose answer is computed from the raw request head.
///
/// The closure returns the status, extra header lines and the body.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<(&'static str, String)>, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = std::sync::Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        drain_body(&mut socket, &head).await;
                        let (status, headers, body) = f(head).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };

                        let mut response = format!("HTTP/1.1 {status_text}\r\n");
                        for (name, value) in headers {
                            response.push_str(&format!("{name}: {value}\r\n"));
                        }
                        response.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        ));
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock origin that announces `body` in full, then sends it one byte
/// every `gap`.
pub async fn start_trickle_backend(addr: SocketAddr, body: &'static [u8], gap: Duration) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                drain_body(&mut socket, &head).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                if socket.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
                for byte in body {
                    tokio::time::sleep(gap).await;
                    if socket.write_all(std::slice::from_ref(byte)).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
}

/// Start a TCP server that echoes every byte back until the peer closes.
pub async fn start_echo_server(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });
}

/// Read up to and including the blank line that ends an HTTP head.
pub async fn read_head<S>(socket: &mut S) -> String
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Consume a `Content-Length` request body so closing the socket is clean.
async fn drain_body(socket: &mut TcpStream, head: &str) {
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    let _ = socket.read_exact(&mut body).await;
}

/// A proxy running on a background task.
pub struct RunningProxy {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RunningProxy {
    /// Trigger graceful shutdown and wait for it to complete.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("proxy did not shut down")
            .unwrap();
    }
}

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

/// Plain-HTTP proxy config bound to `127.0.0.1:port`.
pub fn http_config(port: u16) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.host = "127.0.0.1".into();
    config.http.enabled = true;
    config.http.port = port.into();
    config
}

/// Validate `config`, start the proxy and wait until its ports accept.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    start_proxy_with_log(config, LogSink::discard()).await
}

pub async fn start_proxy_with_log(mut config: ProxyConfig, log: LogSink) -> RunningProxy {
    validate_config(&mut config).unwrap();
    let addr: SocketAddr = config.http.address.parse().unwrap();
    let https = config.https.enabled;
    let https_addr: SocketAddr = if https {
        config.https.address.parse().unwrap()
    } else {
        addr
    };

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(ProxyServer::new(config).run_until(log, async {
        let _ = stopped.await;
    }));

    wait_for_port(addr).await;
    if https {
        wait_for_port(https_addr).await;
    }
    RunningProxy {
        addr,
        stop: Some(stop),
        task,
    }
}

/// Poll until something accepts on `addr`.
pub async fn wait_for_port(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing listening on {addr}");
}

/// reqwest client routing plain-HTTP URLs through the proxy.
pub fn proxied_client(proxy: SocketAddr, credentials: Option<(&str, &str)>) -> reqwest::Client {
    let mut proxy = reqwest::Proxy::http(format!("http://{proxy}")).unwrap();
    if let Some((user, pass)) = credentials {
        proxy = proxy.basic_auth(user, pass);
    }
    reqwest::Client::builder().proxy(proxy).build().unwrap()
}
