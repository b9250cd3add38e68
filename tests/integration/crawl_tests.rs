//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full round cycle end-to-end against a SQLite file.

use outlet_mesh::config::{Config, CrawlerConfig, DatabaseConfig, OutletEntry, UserAgentConfig};
use outlet_mesh::crawler::{run_crawl, Coordinator};
use outlet_mesh::storage::{GraphStore, NewScrape, RunStatus, SqliteStorage, TargetState};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with one outlet at `outlet_url`
fn create_test_config(outlet_url: &str, db_path: &Path, max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            threads: 2,
            max_depth,
            request_timeout_secs: Some(5),
            ..Default::default()
        },
        user_agent: UserAgentConfig {
            user_agent: "TestBot/1.0".to_string(),
            from: "test@example.com".to_string(),
        },
        database: DatabaseConfig {
            path: db_path.display().to_string(),
            busy_timeout_ms: 30_000,
        },
        outlets: vec![OutletEntry {
            name: "Local Daily".to_string(),
            url: outlet_url.to_string(),
            country: "norway".to_string(),
            area: None,
            reach: Some("local".to_string()),
            city: None,
            owner: None,
            publisher: None,
            latitude: None,
            longitude: None,
            is_composite: false,
        }],
    }
}

/// Mounts a page that is expected to be requested `times` times, if given
async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET")).and(path(route)).respond_with(
        ResponseTemplate::new(status)
            .set_body_string(body)
            .insert_header("content-type", "text/html"),
    );
    match times {
        Some(n) => mock.expect(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

fn db_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("mesh.db")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seed_round_stores_scrape_and_links() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    mount_page(
        &server,
        "/",
        200,
        r#"<html><body>
            <a href="/about">About</a>
            <a href="https://example.org/story">Elsewhere</a>
            <a href="mailto:desk@example.org">Mail</a>
        </body></html>"#,
        Some(1),
    )
    .await;
    mount_page(&server, "/about", 200, "", Some(0)).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&root, &db_path(&dir), 1);

    let summary = run_crawl(config, "hash".to_string())
        .await
        .expect("Crawl failed");
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.leftover, 0);
    assert_eq!(summary.failed_workers, 0);

    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    assert_eq!(storage.count_scrapes().unwrap(), 1);

    let outlet = storage.get_outlet(1).unwrap();
    assert_eq!(outlet.country, "Norway");
    let seed_id = outlet.scrape_id.expect("Outlet should be resolved");
    let seed = storage.get_scrape(seed_id).unwrap();
    assert_eq!(seed.url_started, root);

    let links = storage.outgoing_links(seed_id).unwrap();
    assert_eq!(links.len(), 2);

    assert_eq!(links[0].url_target, format!("{}/about", server.uri()));
    assert!(links[0].is_internal);
    assert_eq!(links[0].fld_origin, links[0].fld_target);
    assert_eq!(links[0].target_state(), TargetState::Unresolved);

    assert_eq!(links[1].url_target, "https://example.org/story");
    assert_eq!(links[1].fld_target, "example.org");
    assert!(!links[1].is_internal);
    assert_eq!(links[1].target_state(), TargetState::Unresolved);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_known_target_is_attached_without_fetch() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    let known = format!("{}/known", server.uri());
    mount_page(&server, "/", 200, r#"<a href="/known">Known</a>"#, None).await;
    mount_page(&server, "/known", 200, "", Some(0)).await;

    let dir = tempfile::tempdir().unwrap();
    let known_id = {
        let mut storage = SqliteStorage::new(&db_path(&dir)).unwrap();
        storage
            .insert_scrape(&NewScrape {
                url_started: known.clone(),
                url_finished: Some(known.clone()),
                status_code: 200,
                seconds_elapsed: 0.1,
            })
            .unwrap()
            .id
    };

    let config = create_test_config(&root, &db_path(&dir), 1);
    run_crawl(config, "hash".to_string())
        .await
        .expect("Crawl failed");

    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    let seed_id = storage.get_outlet(1).unwrap().scrape_id.unwrap();
    let links = storage.outgoing_links(seed_id).unwrap();

    assert_eq!(links.len(), 1);
    assert_eq!(links[0].scrape_target_id, Some(known_id));
    assert_eq!(links[0].target_state(), TargetState::Succeeded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_server_error_counts_against_link() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    let broken = format!("{}/broken", server.uri());
    mount_page(&server, "/", 200, r#"<a href="/broken">Broken</a>"#, None).await;
    mount_page(&server, "/broken", 500, "", None).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&root, &db_path(&dir), 2);
    run_crawl(config, "hash".to_string())
        .await
        .expect("Crawl failed");

    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    let failures = storage.scrapes_for_url(&broken).unwrap();
    assert!(!failures.is_empty());
    assert!(failures.iter().all(|s| s.status_code == 500));

    let seed_id = storage.get_outlet(1).unwrap().scrape_id.unwrap();
    let links = storage.outgoing_links(seed_id).unwrap();
    assert_eq!(links[0].erroneous_scrapes as usize, failures.len());
    // Still unresolved, so later rounds keep retrying it
    assert_eq!(links[0].target_state(), TargetState::Unresolved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_target_recovers_in_later_round() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    mount_page(&server, "/", 200, r#"<a href="/flaky">Flaky</a>"#, None).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", 200, "<p>back online</p>", None).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&root, &db_path(&dir), 3);
    run_crawl(config, "hash".to_string())
        .await
        .expect("Crawl failed");

    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    let seed_id = storage.get_outlet(1).unwrap().scrape_id.unwrap();
    let links = storage.outgoing_links(seed_id).unwrap();

    assert_eq!(links[0].target_state(), TargetState::Succeeded);
    assert_eq!(links[0].erroneous_scrapes, 1);
    let target = storage.get_scrape(links[0].scrape_target_id.unwrap()).unwrap();
    assert!(target.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_two_stops_at_outlet_targets() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    mount_page(&server, "/", 200, r#"<a href="/a">A</a>"#, None).await;
    mount_page(&server, "/a", 200, r#"<a href="/b">B</a>"#, Some(1)).await;
    // Pages are counted from the outlet at level 1, so depth 2 ends at A
    mount_page(&server, "/b", 200, r#"<a href="/c">C</a>"#, Some(0)).await;
    mount_page(&server, "/c", 200, "", Some(0)).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&root, &db_path(&dir), 2);
    let summary = run_crawl(config, "hash".to_string())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.rounds, 3);
    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    assert_eq!(storage.count_scrapes().unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_three_reaches_b_but_never_c() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    mount_page(&server, "/", 200, r#"<a href="/a">A</a>"#, Some(1)).await;
    mount_page(&server, "/a", 200, r#"<a href="/b">B</a>"#, Some(1)).await;
    mount_page(&server, "/b", 200, r#"<a href="/c">C</a>"#, Some(1)).await;
    mount_page(&server, "/c", 200, "", Some(0)).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&root, &db_path(&dir), 3);
    run_crawl(config, "hash".to_string())
        .await
        .expect("Crawl failed");

    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    assert_eq!(storage.count_successful_scrapes().unwrap(), 3);
    let c = format!("{}/c", server.uri());
    assert!(storage.earliest_successful_scrape(&c).unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_crawl_does_not_refetch_outlets() {
    let server = MockServer::start().await;
    let root = format!("{}/", server.uri());
    mount_page(&server, "/", 200, "<p>front page</p>", Some(1)).await;

    let dir = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        let config = create_test_config(&root, &db_path(&dir), 1);
        let coordinator = Coordinator::new(config, "hash").unwrap();
        coordinator.seed().unwrap();
        coordinator.run().await.unwrap();
    }

    let storage = SqliteStorage::new(&db_path(&dir)).unwrap();
    assert_eq!(storage.count_outlets().unwrap(), 1);
    assert_eq!(storage.count_scrapes().unwrap(), 1);
}
