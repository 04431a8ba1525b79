//! Integration tests for `anisync setup` and `anisync server-config`.


use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fixtures::{anisync, can_bind_localhost, json_response, mount_flag, temp_home};
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request};

#[tokio::test]
async fn test_setup_server_url_posts_trimmed_url() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/plex/setPlexServerUrl"))
        .and(body_json(json!({ "server_url": "http://192.168.1.10:32400" })))
        .respond_with(json_response(&json!({})))
        .expect(1)
        .mount(&server)
        .await;

    anisync(&home, &server)
        .args(["setup", "server-url", "  http://192.168.1.10:32400 "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next: anisync setup plex"));
}

#[tokio::test]
async fn test_setup_anilist_client_id_prints_authorize_steps() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/anilist/setAnilistToken"))
        .respond_with(json_response(&json!({})))
        .expect(0)
        .mount(&server)
        .await;

    anisync(&home, &server)
        .args(["setup", "anilist", "--client-id", "4242"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://anilist.co/api/v2/oauth/authorize?client_id=4242&response_type=token",
        ))
        .stdout(predicate::str::contains(format!(
            "{}/api/anilist/codeRedirect",
            server.uri()
        )))
        .stdout(predicate::str::contains("--redirect-url"));
}

#[tokio::test]
async fn test_setup_anilist_reads_token_from_redirect() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/anilist/setAnilistToken"))
        .and(body_json(json!({ "token": "abc/def" })))
        .respond_with(json_response(&json!({})))
        .expect(1)
        .mount(&server)
        .await;

    anisync(&home, &server)
        .args([
            "setup",
            "anilist",
            "--redirect-url",
            "http://localhost:5000/#access_token=abc%2Fdef&token_type=Bearer",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("AniList account connected."));
}

#[tokio::test]
async fn test_setup_anilist_reports_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/anilist/setAnilistToken"))
        .respond_with(json_response(&json!({ "error": "Invalid token" })))
        .mount(&server)
        .await;

    anisync(&home, &server)
        .args(["setup", "anilist", "--token", "bad"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("store AniList token"))
        .stderr(predicate::str::contains("Invalid token"));
}

#[tokio::test]
async fn test_setup_plex_already_linked_skips_pin() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    mount_flag(&server, "/api/plex/plexAuthenticated", "plexAuthenticated", true, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/plex/getPin"))
        .respond_with(json_response(&json!({ "pin": "UNUSED" })))
        .expect(0)
        .mount(&server)
        .await;

    anisync(&home, &server)
        .args(["setup", "plex"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already linked"));
}

#[tokio::test]
async fn test_setup_plex_shows_pin_and_waits_for_link() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    fs::write(home.path().join("config.toml"), "poll_interval_ms = 20\n").unwrap();
    let server = MockServer::start().await;

    let checks = Arc::new(AtomicUsize::new(0));
    let checks_clone = Arc::clone(&checks);
    Mock::given(method("GET"))
        .and(path("/api/plex/plexAuthenticated"))
        .respond_with(move |_: &Request| {
            let n = checks_clone.fetch_add(1, Ordering::SeqCst);
            json_response(&json!({ "plexAuthenticated": n >= 3 }))
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/plex/getPin"))
        .respond_with(json_response(&json!({ "pin": "K7QZ" })))
        .expect(1)
        .mount(&server)
        .await;

    anisync(&home, &server)
        .args(["setup", "plex"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Go to https://www.plex.tv/link/ and enter the code: K7QZ",
        ))
        .stdout(predicate::str::contains("Plex account linked."));

    assert_eq!(checks.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_server_config_prints_settings() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/config/getConfig"))
        .respond_with(json_response(&json!({
            "ANIME_LIBRARIES": ["Anime"],
            "MARK_UNWATCHED_EPISODES_AS_PLANNING": false,
            "SYNC_CRONTIME": "0 */6 * * *",
            "SYNC_SCHEDULE_ENABLED": true,
            "DATE_FORMAT": "YYYY-MM-DD"
        })))
        .mount(&server)
        .await;

    anisync(&home, &server)
        .arg("server-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Anime libraries: Anime"))
        .stdout(predicate::str::contains("Sync schedule: 0 */6 * * * (enabled)"));

    anisync(&home, &server)
        .args(["server-config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"SYNC_CRONTIME\": \"0 */6 * * *\""));
}
