//! End-to-end polling against the mock backend over real HTTP.

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use bankroll_overlay::backend::http::HttpBackend;
use bankroll_overlay::backend::OverlayBackend;
use bankroll_overlay::poller::{reconcile, LivePoller};
use bankroll_overlay::types::{ViewModel, ViewSource};

use crate::mock_backend::{MockBackend, Reply};

const FAST: Duration = Duration::from_millis(50);

fn client(base_url: &str) -> Arc<dyn OverlayBackend> {
    Arc::new(HttpBackend::new(base_url, Duration::from_secs(2)).unwrap())
}

fn gg_bankroll() -> serde_json::Value {
    json!({ "name": "GGPoker", "current_amount": 850, "starting_amount": 700, "currency": "EUR" })
}

fn gg_session() -> serde_json::Value {
    json!({ "name": "Sunday Grind", "total_buyins": 150, "total_cashes": 280, "cash_count": 3 })
}

/// Wait until the poller publishes a model matching `pred`.
async fn wait_for(poller: &LivePoller, pred: impl Fn(&ViewModel) -> bool) -> ViewModel {
    let mut rx = poller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let vm = rx.borrow_and_update();
                if pred(&*vm) {
                    return (*vm).clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("poller did not reach the expected state in time")
}

#[tokio::test]
async fn test_live_round_trip() {
    let mock = MockBackend::start().await;
    mock.set_live("42", gg_bankroll(), gg_session());

    let poller = LivePoller::start("42", Some(client(&mock.base_url)), FAST);
    let vm = wait_for(&poller, |vm| !vm.is_loading).await;

    assert_eq!(vm.source, ViewSource::Live);
    assert_eq!(vm.bankroll.name, "GGPoker");
    assert_eq!(vm.bankroll.profit(), dec!(150));
    assert_eq!(vm.session.profit, dec!(130));
    assert_eq!(vm.session.cash_out_count, 3);
    assert!(vm.last_update.is_some());
}

#[tokio::test]
async fn test_backend_supplied_profit_is_used() {
    let mock = MockBackend::start().await;
    let mut session = gg_session();
    session["profit"] = json!(111.5);
    mock.set_live("42", gg_bankroll(), session);

    let vm = reconcile(Some(client(&mock.base_url).as_ref()), "42").await;
    assert_eq!(vm.source, ViewSource::Live);
    assert_eq!(vm.session.profit, dec!(111.5));
}

#[tokio::test]
async fn test_session_http_500_is_offline() {
    let mock = MockBackend::start().await;
    mock.set_live("42", gg_bankroll(), gg_session());
    mock.set_session("42", Reply::Raw(StatusCode::INTERNAL_SERVER_ERROR, "boom"));

    let vm = reconcile(Some(client(&mock.base_url).as_ref()), "42").await;
    assert_eq!(vm.source, ViewSource::Offline);
    assert_eq!(vm.bankroll.name, "Offline (ID: 42)");
    assert_eq!(vm.bankroll.current_amount, dec!(0));
}

#[tokio::test]
async fn test_success_false_is_offline() {
    let mock = MockBackend::start().await;
    mock.set_live("42", gg_bankroll(), gg_session());
    mock.set_bankroll(
        "42",
        Reply::Json(StatusCode::OK, json!({ "success": false, "error": "archived" })),
    );

    let vm = reconcile(Some(client(&mock.base_url).as_ref()), "42").await;
    assert_eq!(vm.source, ViewSource::Offline);
    assert_eq!(vm.session.name, "API Offline (ID: 42)");
}

#[tokio::test]
async fn test_malformed_body_is_offline() {
    let mock = MockBackend::start().await;
    mock.set_live("42", gg_bankroll(), gg_session());
    mock.set_bankroll("42", Reply::Raw(StatusCode::OK, "<html>maintenance</html>"));

    let vm = reconcile(Some(client(&mock.base_url).as_ref()), "42").await;
    assert_eq!(vm.source, ViewSource::Offline);
}

#[tokio::test]
async fn test_unknown_id_is_offline() {
    let mock = MockBackend::start().await;
    let vm = reconcile(Some(client(&mock.base_url).as_ref()), "404").await;
    assert_eq!(vm.source, ViewSource::Offline);
    assert_eq!(mock.requested_ids(), vec!["404".to_string(), "404".to_string()]);
}

#[tokio::test]
async fn test_unreachable_backend_is_offline() {
    // Bind then drop to obtain a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let vm = reconcile(Some(client(&format!("http://{addr}")).as_ref()), "42").await;
    assert_eq!(vm.source, ViewSource::Offline);
    assert!(!vm.is_loading);
}

#[tokio::test]
async fn test_id_is_url_encoded() {
    let mock = MockBackend::start().await;
    mock.set_live("team a/1", gg_bankroll(), gg_session());

    let vm = reconcile(Some(client(&mock.base_url).as_ref()), "team a/1").await;
    assert_eq!(vm.source, ViewSource::Live);
    assert!(mock.requested_ids().iter().all(|id| id == "team a/1"));
}

#[tokio::test]
async fn test_empty_id_never_hits_backend() {
    let mock = MockBackend::start().await;
    let poller = LivePoller::start("", Some(client(&mock.base_url)), FAST);

    let vm = wait_for(&poller, |vm| !vm.is_loading).await;
    assert_eq!(vm.source, ViewSource::Demo);
    tokio::time::sleep(FAST * 4).await;

    assert!(mock.requested_ids().is_empty());
    poller.stop();
}

#[tokio::test]
async fn test_recovers_after_outage() {
    let mock = MockBackend::start().await;
    mock.set_live("42", gg_bankroll(), gg_session());
    mock.set_error(StatusCode::SERVICE_UNAVAILABLE);

    let poller = LivePoller::start("42", Some(client(&mock.base_url)), FAST);
    wait_for(&poller, |vm| vm.source == ViewSource::Offline).await;

    mock.clear_error();
    let vm = wait_for(&poller, |vm| vm.source == ViewSource::Live).await;
    assert_eq!(vm.bankroll.name, "GGPoker");
    assert!(!vm.is_loading);
    poller.stop();
}

#[tokio::test]
async fn test_two_pollers_do_not_interfere() {
    let mock = MockBackend::start().await;
    mock.set_live("1", gg_bankroll(), gg_session());
    mock.set_live(
        "2",
        json!({
            "name": "Stars",
            "current_amount": "400",
            "starting_amount": "500",
            "currency": "USD"
        }),
        json!({ "name": "Turbo", "total_buyins": 50, "total_cashes": 0, "cash_count": 0 }),
    );

    let first = LivePoller::start("1", Some(client(&mock.base_url)), FAST);
    let second = LivePoller::start("2", Some(client(&mock.base_url)), FAST);

    let a = wait_for(&first, |vm| !vm.is_loading).await;
    let b = wait_for(&second, |vm| !vm.is_loading).await;

    assert_eq!(a.bankroll.name, "GGPoker");
    assert_eq!(b.bankroll.name, "Stars");
    assert_eq!(b.bankroll.profit(), dec!(-100));
    assert_eq!(b.session.profit, dec!(-50));

    second.stop();
    mock.set_error(StatusCode::BAD_GATEWAY);
    let a = wait_for(&first, |vm| vm.source == ViewSource::Offline).await;
    assert_eq!(a.bankroll_id, "1");

    // The stopped poller keeps its last live model.
    assert_eq!(second.current().bankroll.name, "Stars");
    first.stop();
}

#[tokio::test]
async fn test_profit_overflow_is_offline_and_polling_continues() {
    let mock = MockBackend::start().await;
    mock.set_live(
        "42",
        gg_bankroll(),
        json!({
            "name": "Whale",
            "total_buyins": "-79228162514264337593543950335",
            "total_cashes": "79228162514264337593543950335",
            "cash_count": 1
        }),
    );

    let poller = LivePoller::start("42", Some(client(&mock.base_url)), FAST);
    let vm = wait_for(&poller, |vm| !vm.is_loading).await;
    assert_eq!(vm.source, ViewSource::Offline);
    assert_eq!(vm.session.name, "API Offline (ID: 42)");

    // The task survived and keeps reconciling.
    mock.set_live("42", gg_bankroll(), gg_session());
    let vm = wait_for(&poller, |vm| vm.source == ViewSource::Live).await;
    assert_eq!(vm.session.profit, dec!(130));
    poller.stop();
}

#[tokio::test]
async fn test_stop_freezes_model() {
    let mock = MockBackend::start().await;
    mock.set_live("42", gg_bankroll(), gg_session());

    let poller = LivePoller::start("42", Some(client(&mock.base_url)), FAST);
    wait_for(&poller, |vm| vm.source == ViewSource::Live).await;
    poller.stop();
    let frozen = poller.current();
    let cycles = poller.cycle_count();

    mock.set_error(StatusCode::INTERNAL_SERVER_ERROR);
    tokio::time::sleep(FAST * 6).await;

    assert_eq!(poller.current(), frozen);
    assert_eq!(poller.cycle_count(), cycles);
}
