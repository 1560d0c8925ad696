//! End-to-end forwarding through a real upstream.

use axum::routing::{get, post};
use axum::Router;
use pixie_proxy::observability::RecordingDiagnostics;
use pixie_proxy::{relay, Encoding, ProxyConfig, ProxyFactory};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

mod common;

async fn factory() -> ProxyFactory {
    let upstream = common::start_upstream().await;
    ProxyFactory::new(ProxyConfig::new(format!("http://{}", upstream)))
}

#[tokio::test]
async fn test_sets_the_status_correctly() {
    let proxy = factory().await;
    let app = Router::new().route("/foo", get(relay).layer(proxy.proxy("/i500")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/foo", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "Internal Server Error");
}

#[tokio::test]
async fn test_proxies_get_requests() {
    let proxy = factory().await;
    let app = Router::new().route("/foo", get(relay).layer(proxy.proxy("/hurp")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/foo", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"hurp": "durp"}));
}

#[tokio::test]
async fn test_proxies_the_whole_url_without_template() {
    let proxy = factory().await;
    let app = Router::new().route("/hurp", post(relay).layer(proxy.proxy("")));
    let addr = common::serve(app).await;

    let res = common::client()
        .post(format!("http://{}/hurp", addr))
        .json(&json!({"bestHobbit": "Yolo Swaggins"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_proxies_post_requests() {
    let proxy = factory().await;
    let app = Router::new().route("/foo", post(relay).layer(proxy.proxy("/hurp")));
    let addr = common::serve(app).await;

    let post_body = json!({"bestHobbit": "Yolo Swaggins"});
    let res = common::client()
        .post(format!("http://{}/foo", addr))
        .json(&post_body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-some-dumb-header"], "Im-set-yo");
    assert_eq!(res.json::<Value>().await.unwrap(), post_body);
}

#[tokio::test]
async fn test_proxies_the_query_string() {
    let proxy = factory().await;
    let app = Router::new().route("/query", get(relay).layer(proxy.proxy("/query")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/query", addr))
        .query(&[("foo", "bar"), ("space", "a b&c")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"foo": "bar", "space": "a b&c"})
    );
}

#[tokio::test]
async fn test_proxies_non_json_content_types() {
    let proxy = factory().await;
    let app = Router::new().route("/static/mystery.gif", get(relay).layer(proxy.proxy("")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/static/mystery.gif", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/gif");
}

#[tokio::test]
async fn test_replaces_path_params() {
    let proxy = factory().await;
    let app = Router::new().route(
        "/haveparams/{hurp}",
        get(relay).layer(proxy.proxy("/haveparams/:hurp")),
    );
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/haveparams/bar", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"foo": "bar"}));
}

#[tokio::test]
async fn test_proxies_binary_data() {
    let proxy = factory().await;
    let app = Router::new().route(
        "/static/mystery.gif",
        get(relay).layer(proxy.proxy_with_encoding("", None)),
    );
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/static/mystery.gif", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/gif");
    assert_eq!(
        res.headers()["content-length"],
        common::MYSTERY_GIF.len().to_string().as_str()
    );
    assert_eq!(res.bytes().await.unwrap().as_ref(), common::MYSTERY_GIF);
}

#[tokio::test]
async fn test_latin1_text_round_trips_exact_bytes() {
    let proxy = factory().await;
    let app = Router::new().route(
        "/latin1",
        get(relay).layer(proxy.proxy_with_encoding("", Some(Encoding::Latin1))),
    );
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/latin1", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/plain; charset=iso-8859-1");
    assert_eq!(res.bytes().await.unwrap().as_ref(), common::LATIN1_TEXT);
}

#[tokio::test]
async fn test_head_keeps_upstream_length() {
    let proxy = factory().await;
    let app = Router::new().route(
        "/static/mystery.gif",
        get(relay).layer(proxy.proxy_with_encoding("", None)),
    );
    let addr = common::serve(app).await;

    let res = common::client()
        .head(format!("http://{}/static/mystery.gif", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["content-length"],
        common::MYSTERY_GIF.len().to_string().as_str()
    );
}

#[tokio::test]
async fn test_response_cap_is_separate_from_request_cap() {
    let upstream = common::start_upstream().await;
    let app = |config: ProxyConfig| {
        let proxy = ProxyFactory::new(config);
        Router::new().route(
            "/static/mystery.gif",
            get(relay).layer(proxy.proxy_with_encoding("", None)),
        )
    };
    let host = format!("http://{}", upstream);

    // A small request cap does not limit what comes back.
    let addr = common::serve(app(ProxyConfig {
        max_body_size: 8,
        ..ProxyConfig::new(host.clone())
    }))
    .await;
    let res = common::client()
        .get(format!("http://{}/static/mystery.gif", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.bytes().await.unwrap().as_ref(), common::MYSTERY_GIF);

    let addr = common::serve(app(ProxyConfig {
        max_response_size: 8,
        ..ProxyConfig::new(host)
    }))
    .await;
    let res = common::client()
        .get(format!("http://{}/static/mystery.gif", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
}

#[tokio::test]
async fn test_non_2xx_status_is_propagated() {
    let proxy = factory().await;
    let app = Router::new().route("/brew", get(relay).layer(proxy.proxy("/teapot")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/brew", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 418);
    assert_eq!(res.text().await.unwrap(), "short and stout");
}

#[tokio::test]
async fn test_silent_error_body() {
    let upstream = common::start_upstream().await;
    let proxy = ProxyFactory::new(ProxyConfig {
        propagate_error_body: false,
        ..ProxyConfig::new(format!("http://{}", upstream))
    });
    let app = Router::new().route("/brew", get(relay).layer(proxy.proxy("/teapot")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/brew", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 418);
    assert!(res.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_upstream_is_500() {
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let proxy = ProxyFactory::new(ProxyConfig::new(format!("http://{}", common::closed_addr())))
        .with_diagnostics(diagnostics.clone());
    let app = Router::new().route("/foo", get(relay).layer(proxy.proxy("/hurp")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/foo", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert!(diagnostics.events().iter().any(|e| matches!(
        e,
        pixie_proxy::observability::Diagnostic::UpstreamFailed { .. }
    )));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let backend = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "too late".to_string())
    })
    .await;

    let proxy = ProxyFactory::new(ProxyConfig {
        timeout_secs: 1,
        ..ProxyConfig::new(format!("http://{}", backend))
    });
    let app = Router::new().route("/slow", get(relay).layer(proxy.proxy("")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/slow", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
}

#[tokio::test]
async fn test_upstream_503_from_raw_backend() {
    let backend = common::start_programmable_backend(|| async {
        (503, "Service Unavailable".to_string())
    })
    .await;

    let proxy = ProxyFactory::new(ProxyConfig::new(format!("http://{}", backend)));
    let app = Router::new().route("/flaky", get(relay).layer(proxy.proxy("")));
    let addr = common::serve(app).await;

    let res = common::client()
        .get(format!("http://{}/flaky", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Service Unavailable");
}
