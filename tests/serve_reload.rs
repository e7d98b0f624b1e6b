// tests/serve_reload.rs

mod common;
use crate::common::{http_get, init_tracing, wait_until, with_timeout, SseClient};

use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use devpipe::serve::{start, ReloadHub, ServeOptions, ServerHandle, EVENTS_PATH, RELOAD_SCRIPT_PATH};

type TestResult = Result<(), Box<dyn Error>>;

async fn serve(root: &Path, hub: &ReloadHub) -> Result<ServerHandle, Box<dyn Error>> {
    let addr: SocketAddr = "127.0.0.1:0".parse()?;
    let handle = start(
        ServeOptions {
            root: root.to_path_buf(),
            index: "index.html".to_string(),
            addr,
        },
        hub.clone(),
    )
    .await?;
    Ok(handle)
}

fn site() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let dist = dir.path().join("dist");
    std::fs::create_dir_all(dist.join("docs"))?;
    std::fs::write(
        dist.join("index.html"),
        "<html><body><h1>Hello</h1></body></html>",
    )?;
    std::fs::write(dist.join("docs/index.html"), "<p>docs</p>")?;
    std::fs::write(dist.join("simple.umd.js"), "var simple = 1;")?;
    std::fs::write(dir.path().join("secret.txt"), "top secret")?;
    Ok(dir)
}

#[tokio::test]
async fn serves_index_with_reload_script() -> TestResult {
    init_tracing();
    let dir = site()?;
    let hub = ReloadHub::new();
    let server = serve(&dir.path().join("dist"), &hub).await?;

    let (status, body) = with_timeout(http_get(server.addr(), "/")).await?;
    assert_eq!(status, 200);
    assert!(body.contains("<h1>Hello</h1>"));
    let script = body.find(RELOAD_SCRIPT_PATH).ok_or("script not injected")?;
    let close = body.find("</body>").ok_or("body missing")?;
    assert!(script < close);

    let (status, body) = with_timeout(http_get(server.addr(), "/docs/")).await?;
    assert_eq!(status, 200);
    assert!(body.contains("<p>docs</p>"));
    assert!(body.contains(RELOAD_SCRIPT_PATH));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn serves_assets_verbatim() -> TestResult {
    let dir = site()?;
    let hub = ReloadHub::new();
    let server = serve(&dir.path().join("dist"), &hub).await?;

    let (status, body) = with_timeout(http_get(server.addr(), "/simple.umd.js")).await?;
    assert_eq!(status, 200);
    assert_eq!(body, "var simple = 1;");

    let (status, body) = with_timeout(http_get(server.addr(), RELOAD_SCRIPT_PATH)).await?;
    assert_eq!(status, 200);
    assert!(body.contains("EventSource"));
    assert!(body.contains(EVENTS_PATH));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn missing_files_and_traversal_are_not_found() -> TestResult {
    let dir = site()?;
    let hub = ReloadHub::new();
    let server = serve(&dir.path().join("dist"), &hub).await?;

    let (status, _) = with_timeout(http_get(server.addr(), "/nope.js")).await?;
    assert_eq!(status, 404);

    let (status, body) = with_timeout(http_get(server.addr(), "/../secret.txt")).await?;
    assert_eq!(status, 404);
    assert!(!body.contains("top secret"));

    let (status, body) = with_timeout(http_get(server.addr(), "/docs/../../secret.txt")).await?;
    assert_eq!(status, 404);
    assert!(!body.contains("top secret"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn reload_reaches_connected_clients() -> TestResult {
    init_tracing();
    let dir = site()?;
    let hub = ReloadHub::new();
    let server = serve(&dir.path().join("dist"), &hub).await?;

    let mut client = SseClient::connect(server.addr(), EVENTS_PATH).await?;
    assert!(client.head().contains("text/event-stream"));
    assert!(wait_until(Duration::from_secs(5), || hub.client_count() >= 1).await);

    assert_eq!(hub.notify_reload(), 1);
    assert!(client.wait_for_reloads(1, Duration::from_secs(5)).await?);

    hub.notify_reload();
    assert!(client.wait_for_reloads(2, Duration::from_secs(5)).await?);

    // Shutdown must not hang on the open event stream.
    with_timeout(server.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn reload_without_clients_is_noop() -> TestResult {
    let hub = ReloadHub::new();
    assert_eq!(hub.notify_reload(), 0);

    let dir = site()?;
    let server = serve(&dir.path().join("dist"), &hub).await?;
    assert_eq!(hub.notify_reload(), 0);
    server.shutdown().await;
    Ok(())
}
