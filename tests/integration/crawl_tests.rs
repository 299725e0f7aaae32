//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and run submissions
//! through full crawl attempts against an on-disk database.

use pagescope::config::{Config, SchedulerConfig};
use pagescope::service::CrawlService;
use pagescope::{JobStatus, PageScopeError};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a service backed by a fresh database inside `dir`
fn create_test_service(dir: &TempDir) -> CrawlService {
    let mut config = Config::default();
    config.storage.database_path = dir
        .path()
        .join("pagescope.db")
        .to_string_lossy()
        .into_owned();
    config.scheduler = SchedulerConfig {
        poll_interval_secs: 1,
        batch_size: 10,
        max_in_flight: 10,
        ..Default::default()
    };
    CrawlService::open(config).expect("Failed to open service")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submitted_job_starts_queued() {
    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);

    let job = service.submit("https://example.com/start").unwrap();

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.headings.total(), 0);
    assert_eq!(job.internal_links, 0);
    assert_eq!(job.external_links, 0);
    assert_eq!(job.inaccessible_links, 0);
    assert!(!job.has_login_form);
    assert!(job.last_crawled_at.is_none());
}

#[tokio::test]
async fn test_invalid_submissions_create_nothing() {
    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);

    for input in [
        "ftp://example.com/file",
        "mailto:someone@example.com",
        "javascript:void(0)",
        "/relative/path",
        "http://",
        "   ",
    ] {
        let result = service.submit(input);
        assert!(
            matches!(result, Err(PageScopeError::Url(_))),
            "{:?} should be rejected, got {:?}",
            input,
            result
        );
    }

    assert_eq!(service.stats().unwrap().total, 0);
}

#[tokio::test]
async fn test_heading_counts_and_structure() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<!DOCTYPE html>
        <html><head><title>  Heading Test  </title></head>
        <body>
            <h1>First</h1>
            <div><h1>Second</h1></div>
            <h2>Sub</h2>
        </body></html>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    let job = service.submit(&format!("{}/", server.uri())).unwrap();

    let finished = service.crawl(job.id).unwrap().await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);

    let result = service.result(job.id).unwrap();
    let stored = result.job;
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.title.as_deref(), Some("Heading Test"));
    assert_eq!(stored.html_version.as_deref(), Some("HTML5"));
    assert_eq!(stored.headings.h1, 2);
    assert_eq!(stored.headings.h2, 1);
    assert_eq!(stored.headings.h3, 0);
    assert_eq!(stored.headings.h4, 0);
    assert_eq!(stored.headings.h5, 0);
    assert_eq!(stored.headings.h6, 0);
    assert!(stored.last_crawled_at.is_some());
    assert!(stored.error_message.is_none());
    assert!(result.broken_links.is_empty());
}

#[tokio::test]
async fn test_same_host_links_are_all_internal() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        format!(
            r##"<html><body>
            <a href="/a">A</a>
            <a href="b">B</a>
            <a href="{}/c">C</a>
            <a href="#section">Fragment</a>
            <a href="">Empty</a>
            <a href="/d#part">D</a>
        </body></html>"##,
            base
        ),
    )
    .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    let job = service.submit(&format!("{}/", base)).unwrap();
    service.crawl(job.id).unwrap().await.unwrap();

    let stored = service.result(job.id).unwrap().job;
    assert_eq!(stored.internal_links, 4);
    assert_eq!(stored.external_links, 0);
    assert_eq!(stored.inaccessible_links, 0);
}

#[tokio::test]
async fn test_only_first_fifty_links_are_probed() {
    let server = MockServer::start().await;
    let anchors: String = (0..80)
        .map(|i| format!(r#"<li><a href="/link/{}">Link {}</a></li>"#, i, i))
        .collect();
    mount_page(
        &server,
        "/",
        format!("<html><body><ul>{}</ul></body></html>", anchors),
    )
    .await;

    // Every probed link is broken, so every probe shows up as a BrokenLink
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/link/\d+$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(50)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    let job = service.submit(&format!("{}/", server.uri())).unwrap();
    service.crawl(job.id).unwrap().await.unwrap();

    let result = service.result(job.id).unwrap();
    assert_eq!(result.job.status, JobStatus::Completed);
    assert_eq!(result.job.internal_links, 80);
    assert_eq!(result.job.external_links, 0);
    assert_eq!(result.job.inaccessible_links, 50);
    assert_eq!(result.broken_links.len(), 50);

    let mut probed: Vec<u32> = result
        .broken_links
        .iter()
        .map(|b| {
            assert_eq!(b.status_code, 404);
            b.url
                .rsplit('/')
                .next()
                .and_then(|n| n.parse().ok())
                .expect("broken link URL ends with its index")
        })
        .collect();
    probed.sort_unstable();
    assert_eq!(probed, (0..50).collect::<Vec<u32>>());
}

#[tokio::test]
async fn test_login_form_detection() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/login",
        r#"<html><body><form action="/session" method="post">
            <input type="text" name="user_email">
            <input type="password" name="secret">
            <button type="submit">Sign in</button>
        </form></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/change-password",
        r#"<html><body><form><input type="password" name="new"></form></body></html>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);

    let login = service.submit(&format!("{}/login", server.uri())).unwrap();
    let change = service
        .submit(&format!("{}/change-password", server.uri()))
        .unwrap();
    service.crawl(login.id).unwrap().await.unwrap();
    service.crawl(change.id).unwrap().await.unwrap();

    assert!(service.result(login.id).unwrap().job.has_login_form);
    assert!(!service.result(change.id).unwrap().job.has_login_form);
}

#[tokio::test]
async fn test_fetch_failure_marks_job_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    let job = service.submit(&format!("{}/down", server.uri())).unwrap();

    let finished = service.crawl(job.id).unwrap().await.unwrap();
    assert_eq!(finished.status, JobStatus::Error);

    let stored = service.result(job.id).unwrap().job;
    assert_eq!(stored.status, JobStatus::Error);
    assert_eq!(stored.error_message.as_deref(), Some("HTTP error: 500"));
    assert_eq!(stored.headings.total(), 0);
}

#[tokio::test]
async fn test_recrawl_keeps_broken_links() {
    let server = MockServer::start().await;

    // First attempt succeeds and finds one broken link, later ones fail
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/gone">Gone</a></body></html>"#),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    let job = service.submit(&format!("{}/", server.uri())).unwrap();

    let first = service.crawl(job.id).unwrap().await.unwrap();
    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(first.inaccessible_links, 1);

    let second = service.crawl(job.id).unwrap().await.unwrap();
    assert_eq!(second.status, JobStatus::Error);
    assert_eq!(second.error_message.as_deref(), Some("HTTP error: 502"));
    assert_eq!(second.inaccessible_links, 0);

    assert_eq!(service.recrawl(&[job.id]).unwrap(), 1);

    let result = service.result(job.id).unwrap();
    assert_eq!(result.job.status, JobStatus::Queued);
    assert_eq!(result.job.error_message, None);
    assert_eq!(result.broken_links.len(), 1);
    assert!(result.broken_links[0].url.ends_with("/gone"));
}

#[tokio::test]
async fn test_redirected_page_resolves_links_against_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/docs/new"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/docs/new",
        r#"<html><body><a href="page">Sibling</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/docs/page"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    let job = service.submit(&format!("{}/old", server.uri())).unwrap();

    let finished = service.crawl(job.id).unwrap().await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
    assert_eq!(finished.internal_links, 1);
    assert_eq!(finished.inaccessible_links, 0);
}

#[tokio::test]
async fn test_competing_schedulers_never_double_process() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/job/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>ok</h1></body></html>")
                .set_delay(Duration::from_millis(100)),
        )
        .expect(12)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    // Two services on separate connections to the same database file
    let first = create_test_service(&dir);
    let second = create_test_service(&dir);

    for i in 0..12 {
        first.submit(&format!("{}/job/{}", server.uri(), i)).unwrap();
    }

    let a = first.scheduler();
    let b = second.scheduler();
    let mut dispatched = 0;
    for _ in 0..3 {
        dispatched += a.tick().unwrap();
        dispatched += b.tick().unwrap();
    }
    assert_eq!(dispatched, 12);

    // Nothing is left for a late tick, even while attempts are in flight
    assert_eq!(a.tick().unwrap() + b.tick().unwrap(), 0);

    wait_for_completion(&first, 12).await;
    let stats = first.stats().unwrap();
    assert_eq!(stats.completed, 12);
    assert_eq!(stats.running, 0);
}

#[tokio::test]
async fn test_starting_a_second_scheduler_keeps_live_claims() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>slow</h1></body></html>")
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let first = create_test_service(&dir);
    let second = create_test_service(&dir);

    let job = first.submit(&format!("{}/slow", server.uri())).unwrap();
    assert_eq!(first.scheduler().tick().unwrap(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Another replica comes up while the attempt is still in flight
    let mut late = second.scheduler();
    late.start().unwrap();
    assert_eq!(second.result(job.id).unwrap().job.status, JobStatus::Running);
    assert_eq!(late.tick().unwrap(), 0);
    late.stop().await;

    wait_for_completion(&first, 1).await;
    assert_eq!(
        first.result(job.id).unwrap().job.status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_scheduler_processes_queue_in_background() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = create_test_service(&dir);
    for i in 0..3 {
        service
            .submit(&format!("{}/page/{}", server.uri(), i))
            .unwrap();
    }

    let mut scheduler = service.scheduler();
    scheduler.start().unwrap();
    wait_for_completion(&service, 3).await;
    scheduler.stop().await;

    assert!(!scheduler.is_running());
    assert_eq!(service.stats().unwrap().completed, 3);
}

async fn wait_for_completion(service: &CrawlService, expected: u64) {
    for _ in 0..200 {
        let stats = service.stats().unwrap();
        if stats.completed + stats.error >= expected && stats.running == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("jobs did not finish in time");
}
