//! Integration tests for the HTTP control surface

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tower::ServiceExt;

use laser_tag_server::app::AppState;
use laser_tag_server::config::{Config, UdpConfig};
use laser_tag_server::game::Team;
use laser_tag_server::http::build_router;
use laser_tag_server::udp::BroadcastDispatcher;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

async fn setup() -> (AppState, Router, UdpSocket) {
    let hardware = UdpSocket::bind((LOOPBACK, 0)).await.unwrap();
    let config = Config {
        udp: UdpConfig {
            receive_addr: SocketAddr::new(LOOPBACK, 7501),
            broadcast_address: LOOPBACK,
            broadcast_port: hardware.local_addr().unwrap().port(),
            repeat_delay: Duration::from_millis(5),
            ..UdpConfig::default()
        },
        ..Config::default()
    };
    let dispatcher = BroadcastDispatcher::bind(&config.udp).await.unwrap();
    let state = AppState::new(config, dispatcher);
    let router = build_router(state.clone());
    (state, router, hardware)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn next_echo(hardware: &UdpSocket) -> String {
    let mut buf = [0u8; 64];
    let (len, _) = timeout(Duration::from_millis(500), hardware.recv_from(&mut buf))
        .await
        .expect("no echo received")
        .unwrap();
    String::from_utf8(buf[..len].to_vec()).unwrap()
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_memory_backend() {
        let (_state, router, _hw) = setup().await;

        let (status, body) = call(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["roster_backend"], "memory");
        assert_eq!(body["udp_listener"], "inactive");
        assert_eq!(body["match_active"], false);
    }
}

mod roster_tests {
    use super::*;

    #[tokio::test]
    async fn add_player_with_equipment_joins_match_and_announces() {
        let (state, router, hw) = setup().await;

        let (status, body) = call(
            &router,
            "POST",
            "/players",
            Some(json!({"id": 1, "codename": "Opus", "equipment_id": 2, "team": "green"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["codename"], "Opus");
        assert_eq!(next_echo(&hw).await, "2");

        let record = state.game.get_player(2).unwrap();
        assert_eq!(record.player_id, 1);
        assert_eq!(record.team, Team::Green);
        assert_eq!(record.score, 0);

        let (status, body) = call(&router, "GET", "/players/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["codename"], "Opus");
    }

    #[tokio::test]
    async fn known_player_reuses_stored_codename() {
        let (state, router, hw) = setup().await;
        call(&router, "POST", "/players", Some(json!({"id": 7, "codename": "Shark"}))).await;

        let (status, body) = call(
            &router,
            "POST",
            "/players",
            Some(json!({"id": 7, "equipment_id": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["codename"], "Shark");
        assert_eq!(next_echo(&hw).await, "3");
        assert_eq!(state.game.get_player(3).unwrap().team, Team::Red);
    }

    #[tokio::test]
    async fn new_player_without_codename_is_rejected() {
        let (_state, router, _hw) = setup().await;

        let (status, body) = call(&router, "POST", "/players", Some(json!({"id": 9}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn reserved_equipment_id_is_rejected() {
        let (state, router, _hw) = setup().await;

        for code in [43, 53, 202, 221] {
            let (status, _) = call(
                &router,
                "POST",
                "/players",
                Some(json!({"id": 1, "codename": "Opus", "equipment_id": code})),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert_eq!(state.game.player_count(), 0);
    }

    #[tokio::test]
    async fn overlong_codename_is_rejected() {
        let (_state, router, _hw) = setup().await;

        let (status, _) = call(
            &router,
            "POST",
            "/players",
            Some(json!({"id": 1, "codename": "x".repeat(31)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_player_is_not_found() {
        let (_state, router, _hw) = setup().await;

        let (status, body) = call(&router, "GET", "/players/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Player not found");
    }

    #[tokio::test]
    async fn non_numeric_ids_get_json_errors() {
        let (_state, router, _hw) = setup().await;

        let (status, body) = call(&router, "GET", "/players/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = call(&router, "POST", "/broadcast/nope", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = call(
            &router,
            "POST",
            "/players",
            Some(json!({"id": "seven", "codename": "Opus"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn clear_players_empties_roster_and_match() {
        let (state, router, _hw) = setup().await;
        call(&router, "POST", "/players", Some(json!({"id": 1, "codename": "Opus"}))).await;
        state.game.add_player(5, 1, "Opus", Team::Red);

        let (status, _) = call(&router, "DELETE", "/players", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.game.player_count(), 0);

        let (_, body) = call(&router, "GET", "/players", None).await;
        assert_eq!(body["count"], 0);
    }
}

mod network_tests {
    use super::*;

    #[tokio::test]
    async fn network_settings_round_trip() {
        let (state, router, _hw) = setup().await;

        let (status, body) = call(&router, "GET", "/network", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "127.0.0.1");
        assert_eq!(body["receive_port"], 7501);

        let (status, body) = call(
            &router,
            "POST",
            "/network",
            Some(json!({"address": "192.168.1.255"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "192.168.1.255");
        assert_eq!(
            state.dispatcher.address(),
            "192.168.1.255".parse::<IpAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let (state, router, _hw) = setup().await;

        let (status, _) = call(
            &router,
            "POST",
            "/network",
            Some(json!({"address": "not-an-ip"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.dispatcher.address(), LOOPBACK);
    }

    #[tokio::test]
    async fn manual_broadcast_sends_code() {
        let (_state, router, hw) = setup().await;

        let (status, _) = call(&router, "POST", "/broadcast/17", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(next_echo(&hw).await, "17");
    }
}

mod match_tests {
    use super::*;

    #[tokio::test]
    async fn start_and_end_broadcast_control_codes() {
        let (state, router, hw) = setup().await;

        let (status, _) = call(&router, "POST", "/game/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.game.is_active());
        assert_eq!(next_echo(&hw).await, "202");

        let (status, _) = call(&router, "POST", "/game/end", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!state.game.is_active());
        for _ in 0..3 {
            assert_eq!(next_echo(&hw).await, "221");
        }
    }

    #[tokio::test]
    async fn scoreboard_groups_teams_by_score() {
        let (state, router, _hw) = setup().await;
        state.game.add_player(1, 11, "Opus", Team::Red);
        state.game.add_player(2, 12, "Scooby", Team::Red);
        state.game.add_player(4, 14, "Velma", Team::Green);
        state.game.update_score(2, 30);
        state.game.update_score(4, -10);

        let (status, body) = call(&router, "GET", "/game/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["red_team"]["total_score"], 30);
        assert_eq!(body["red_team"]["players"][0]["codename"], "Scooby");
        assert_eq!(body["green_team"]["total_score"], -10);
    }

    #[tokio::test]
    async fn events_count_is_capped() {
        let (state, router, _hw) = setup().await;
        for i in 0..60 {
            state
                .game
                .append_event(format!("event {}", i), laser_tag_server::game::EventKind::Info);
        }

        let (_, body) = call(&router, "GET", "/game/events", None).await;
        assert_eq!(body["events"].as_array().unwrap().len(), 10);

        let (status, body) = call(&router, "GET", "/game/events?count=abc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"].as_array().unwrap().len(), 10);

        let (_, body) = call(&router, "GET", "/game/events?count=500", None).await;
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 50);
        assert_eq!(events[49]["message"], "event 59");
        assert_eq!(events[49]["type"], "info");
    }

    #[tokio::test]
    async fn reset_zeroes_scores_but_keeps_roster() {
        let (state, router, _hw) = setup().await;
        state.game.add_player(1, 11, "Opus", Team::Red);
        state.game.update_score(1, 40);
        state.game.start_match();

        let (status, _) = call(&router, "POST", "/game/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.game.get_player(1).unwrap().score, 0);
        assert!(!state.game.is_active());
    }
}
