//! End-to-end tests for the HEAD/OPTIONS proxy.

use std::time::Duration;

use edge_relay::EdgeConfig;
use reqwest::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, USER_AGENT,
};
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

fn assert_cors(headers: &reqwest::header::HeaderMap) {
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "HEAD, OPTIONS");
    assert_eq!(
        headers[ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization, X-Requested-With, Accept, Origin, User-Agent"
    );
    assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "86400");
}

#[tokio::test]
async fn options_preflight_is_local_and_repeatable() {
    let server = common::start_server(EdgeConfig::default()).await;
    let client = common::client();

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let res = client
            .request(Method::OPTIONS, format!("http://{}/any/path", server.addr))
            .send()
            .await
            .expect("edge unreachable");

        assert_eq!(res.status(), StatusCode::OK);
        assert_cors(res.headers());
        let mut headers = res.headers().clone();
        headers.remove(reqwest::header::DATE);
        assert!(res.bytes().await.unwrap().is_empty());
        snapshots.push(headers);
    }
    assert_eq!(snapshots[0], snapshots[1]);
}

#[tokio::test]
async fn head_relays_status_and_selected_headers() {
    let (upstream, seen) = common::start_upstream(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 1234\r\nSet-Cookie: a=b\r\nX-Upstream: yes\r\nConnection: close\r\n\r\n",
    )
    .await;
    let server = common::start_server(EdgeConfig::default()).await;

    let target = format!("http://{upstream}/page?x=1");
    let res = common::client()
        .head(common::proxy_url(server.addr, "/", &target))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_cors(res.headers());
    assert_eq!(res.headers()[CONTENT_TYPE], "text/html");
    assert_eq!(res.headers()[CONTENT_LENGTH], "1234");
    assert!(res.headers().get("x-upstream").is_none());
    assert!(res.headers().get("set-cookie").is_none());

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("HEAD /page?x=1 HTTP/1.1"));
}

#[tokio::test]
async fn head_relays_no_content_status() {
    let (upstream, _) = common::start_upstream(
        "HTTP/1.1 204 No Content\r\nContent-Type: text/plain\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let server = common::start_server(EdgeConfig::default()).await;

    let res = common::client()
        .head(common::proxy_url(server.addr, "/", &format!("http://{upstream}/")))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(res.headers()[CONTENT_LENGTH], "0");
    assert_cors(res.headers());
    assert!(res.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn head_forwards_only_user_agent() {
    let (upstream, seen) =
        common::start_upstream("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").await;
    let server = common::start_server(EdgeConfig::default()).await;

    let res = common::client()
        .head(common::proxy_url(server.addr, "/", &format!("http://{upstream}/")))
        .header(USER_AGENT, "custom-agent/2.0")
        .header(COOKIE, "session=secret")
        .header(AUTHORIZATION, "Bearer token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let head = seen.lock().unwrap()[0].to_ascii_lowercase();
    assert!(head.contains("user-agent: custom-agent/2.0"), "{head}");
    assert!(!head.contains("cookie"), "{head}");
    assert!(!head.contains("authorization"), "{head}");
}

#[tokio::test]
async fn head_uses_default_user_agent() {
    let (upstream, seen) =
        common::start_upstream("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").await;
    let server = common::start_server(EdgeConfig::default()).await;

    common::client()
        .head(common::proxy_url(server.addr, "/", &format!("http://{upstream}/")))
        .send()
        .await
        .unwrap();

    let head = seen.lock().unwrap()[0].to_ascii_lowercase();
    assert!(head.contains("user-agent: proxy-bot/1.0"), "{head}");
}

#[tokio::test]
async fn head_without_url_is_bad_request() {
    let server = common::start_server(EdgeConfig::default()).await;

    let res = common::client()
        .head(format!("http://{}/?other=1", server.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_cors(res.headers());
}

#[tokio::test]
async fn head_with_malformed_url_is_bad_request() {
    let server = common::start_server(EdgeConfig::default()).await;

    let res = common::client()
        .head(common::proxy_url(server.addr, "/", "definitely not a url"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_cors(res.headers());
}

#[tokio::test]
async fn head_to_unreachable_host_is_bad_request() {
    let server = common::start_server(EdgeConfig::default()).await;
    let dead = common::closed_addr().await;

    let res = tokio::time::timeout(
        Duration::from_secs(10),
        common::client()
            .head(common::proxy_url(server.addr, "/", &format!("http://{dead}/")))
            .send(),
    )
    .await
    .expect("edge should answer promptly")
    .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_cors(res.headers());
}

/// Send a raw HEAD for `target` through the edge and return the response head.
async fn raw_head(edge: std::net::SocketAddr, target: &str) -> String {
    let url = common::proxy_url(edge, "/", target);
    let path_and_query = format!("{}?{}", url.path(), url.query().unwrap());

    let mut stream = TcpStream::connect(edge).await.unwrap();
    let request = format!(
        "HEAD {path_and_query} HTTP/1.1\r\nHost: {edge}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    raw
}

#[tokio::test]
async fn head_leaves_content_length_unset_when_upstream_omits_it() {
    let (upstream, _) = common::start_upstream(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
    )
    .await;
    let server = common::start_server(EdgeConfig::default()).await;

    let raw = raw_head(server.addr, &format!("http://{upstream}/stream")).await;
    let head = raw.to_ascii_lowercase();

    assert!(head.starts_with("http/1.1 200 ok\r\n"), "{raw}");
    assert!(head.contains("content-type: text/html\r\n"), "{raw}");
    assert!(head.contains("access-control-allow-origin: *\r\n"), "{raw}");
    assert!(!head.contains("content-length"), "{raw}");
}

#[tokio::test]
async fn repeated_head_is_identical() {
    let (upstream, seen) = common::start_upstream(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 42\r\nConnection: close\r\n\r\n",
    )
    .await;
    let server = common::start_server(EdgeConfig::default()).await;
    let client = common::client();
    let url = common::proxy_url(server.addr, "/", &format!("http://{upstream}/resource"));

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let res = client.head(url.clone()).send().await.unwrap();
        let status = res.status();
        let mut headers = res.headers().clone();
        headers.remove(reqwest::header::DATE);
        assert!(res.bytes().await.unwrap().is_empty());
        snapshots.push((status, headers));
    }

    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[0].0, StatusCode::OK);
    assert_eq!(snapshots[0].1[CONTENT_LENGTH], "42");
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn head_relays_custom_status_text() {
    let (upstream, _) = common::start_upstream(
        "HTTP/1.1 200 Totally Fine\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let server = common::start_server(EdgeConfig::default()).await;

    let raw = raw_head(server.addr, &format!("http://{upstream}/")).await;
    assert!(raw.starts_with("HTTP/1.1 200 Totally Fine\r\n"), "{raw}");
}
