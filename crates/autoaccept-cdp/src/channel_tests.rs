use super::*;
use crate::bridge::{BRIDGE_SCRIPT, BridgeRequest};
use crate::testing::FakePage;
use autoaccept_agent::MemoryPage;
use serde_json::json;

async fn connect(fake: &FakePage) -> ControlChannel {
    ControlChannel::connect(&fake.ws_url(), Arc::new(AtomicU64::new(1)), Duration::from_secs(2))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_evaluate_installs_bridge() {
    let fake = FakePage::start("p1", MemoryPage::new()).await;
    let channel = connect(&fake).await;

    let probe = BridgeRequest::OverlayDismount.to_expression().unwrap();
    assert_eq!(channel.evaluate(&probe).await.unwrap(), json!({"missing": true}));

    assert_eq!(channel.evaluate(BRIDGE_SCRIPT).await.unwrap(), json!(true));
    assert_eq!(fake.injections(), 1);
    assert_eq!(
        channel.evaluate(&probe).await.unwrap(),
        json!({"ok": true, "value": null})
    );
}

#[tokio::test]
async fn test_protocol_error() {
    let fake = FakePage::start("p1", MemoryPage::new()).await;
    let channel = connect(&fake).await;

    let err = channel.call("Page.navigate", None).await.unwrap_err();
    assert!(matches!(err, CdpError::Protocol { code: -32601, .. }));
}

#[tokio::test]
async fn test_script_exception() {
    let fake = FakePage::start("p1", MemoryPage::new()).await;
    let channel = connect(&fake).await;

    let err = channel.evaluate("nope()").await.unwrap_err();
    match err {
        CdpError::JavaScript(msg) => assert!(msg.contains("ReferenceError")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_call_timeout() {
    let fake = FakePage::start("p1", MemoryPage::new()).await;
    let channel = ControlChannel::connect(
        &fake.ws_url(),
        Arc::new(AtomicU64::new(1)),
        Duration::from_millis(100),
    )
    .await
    .unwrap();

    fake.mute(true);
    let err = channel.evaluate("1").await.unwrap_err();
    assert!(matches!(err, CdpError::Timeout(_)));
    assert!(!channel.is_closed());

    fake.mute(false);
    assert!(channel.evaluate(BRIDGE_SCRIPT).await.is_ok());
}

#[tokio::test]
async fn test_ids_shared_across_channels() {
    let fake = FakePage::start("p1", MemoryPage::new()).await;
    let ids = Arc::new(AtomicU64::new(1));
    let a = ControlChannel::connect(&fake.ws_url(), ids.clone(), Duration::from_secs(2))
        .await
        .unwrap();
    let b = ControlChannel::connect(&fake.ws_url(), ids.clone(), Duration::from_secs(2))
        .await
        .unwrap();

    a.evaluate(BRIDGE_SCRIPT).await.unwrap();
    b.evaluate(BRIDGE_SCRIPT).await.unwrap();
    a.evaluate(BRIDGE_SCRIPT).await.unwrap();

    assert_eq!(fake.request_ids(), vec![1, 2, 3]);
    assert_eq!(ids.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_peer_disconnect_closes_channel() {
    let fake = FakePage::start("p1", MemoryPage::new()).await;
    let channel = connect(&fake).await;
    assert!(!channel.is_closed());

    fake.disconnect_all();
    tokio::time::timeout(Duration::from_secs(2), channel.closed())
        .await
        .unwrap();

    assert!(channel.is_closed());
    assert!(matches!(
        channel.evaluate("1").await,
        Err(CdpError::ChannelClosed)
    ));
}

#[tokio::test]
async fn test_connect_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = format!("ws://127.0.0.1:{}/devtools/page/x", port);
    let result = ControlChannel::connect(&url, Arc::new(AtomicU64::new(1)), Duration::from_millis(500)).await;
    assert!(matches!(result, Err(CdpError::ConnectionFailed(_))));

    let result = ControlChannel::connect("not a url", Arc::new(AtomicU64::new(1)), Duration::from_millis(500)).await;
    assert!(matches!(result, Err(CdpError::ConnectionFailed(_))));
}
