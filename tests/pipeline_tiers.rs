// tests/pipeline_tiers.rs
//! End-to-end runs over a scripted transport: one test per acquisition tier,
//! plus failure independence and the short-name write retry.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linkscribe::archive::AVAILABILITY_ENDPOINT;
use linkscribe::config::RunConfig;
use linkscribe::fetch::{FetchError, PageClient, RawResponse, Transport};
use linkscribe::input::{InlineMeta, SourceRecord};
use linkscribe::pipeline::Pipeline;

const ARTICLE: &str = include_str!("fixtures/article.html");

type Outcome = Result<RawResponse, FetchError>;

/// Per-URL queues of scripted outcomes. Lookup is longest-prefix so the
/// availability endpoint matches regardless of its query string.
#[derive(Default)]
struct FakeTransport {
    routes: Mutex<HashMap<String, VecDeque<Outcome>>>,
}

impl FakeTransport {
    fn stub(&self, url: &str, outcome: Outcome) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn remaining(&self, url: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .get(url)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Outcome {
        let mut routes = self.routes.lock().unwrap();
        let key = routes
            .keys()
            .filter(|k| url.starts_with(k.as_str()))
            .max_by_key(|k| k.len())
            .cloned();
        match key.and_then(|k| routes.get_mut(&k)?.pop_front()) {
            Some(outcome) => outcome,
            None => Err(FetchError::Network(format!("no stub for {url}"))),
        }
    }
}

fn page(status: u16, url: &str, body: &str) -> Outcome {
    Ok(RawResponse {
        status,
        final_url: url.to_string(),
        content_type: Some("text/html; charset=utf-8".into()),
        body: body.as_bytes().to_vec(),
    })
}

fn availability(body: &str) -> Outcome {
    Ok(RawResponse {
        status: 200,
        final_url: AVAILABILITY_ENDPOINT.to_string(),
        content_type: Some("application/json".into()),
        body: body.as_bytes().to_vec(),
    })
}

fn record(url: &str) -> SourceRecord {
    SourceRecord {
        url: url.to_string(),
        tags: Vec::new(),
        inline: InlineMeta::default(),
    }
}

fn pipeline(out_root: PathBuf, transport: Arc<FakeTransport>) -> Pipeline {
    let cfg = RunConfig {
        csv_path: PathBuf::from("links.csv"),
        out_root,
        sleep: Duration::ZERO,
        timeout: Duration::from_secs(5),
        user_agent: "test-agent".into(),
        accept_language: "en".into(),
        template: None,
        zip: false,
    };
    let client =
        PageClient::new(transport.clone(), cfg.timeout).with_backoff_base(Duration::ZERO);
    Pipeline::new(transport, cfg, None).with_page_client(client)
}

#[tokio::test]
async fn live_pages_become_success_notes() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::default());
    let feed_url = "https://site.example/posts/practical-parsers?ref=newsletter";
    transport.stub(feed_url, page(200, feed_url, ARTICLE));

    let mut rec = record(feed_url);
    rec.tags = vec!["rust".into(), "parsing".into()];

    let tally = pipeline(tmp.path().join("notes"), transport)
        .run(&[rec])
        .await;

    assert_eq!(tally.success.len(), 1);
    assert_eq!(tally.total(), 1);
    let path = &tally.success[0];
    assert!(path.ends_with("2024/03/practical-parsers-in-rust.md"));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("title: \"Practical Parsers in Rust\""));
    // canonical from the page wins over the query-string feed URL
    assert!(text.contains("source: \"https://site.example/posts/practical-parsers\""));
    assert!(text.contains("author: \"[[Ada Lovelace]]\""));
    assert!(text.contains("published: \"2024-03-05\""));
    assert!(text.contains("tags: [\"rust\", \"parsing\"]"));
    assert!(text.contains("recursive descent"));
    assert!(!text.contains("related story"));
}

#[tokio::test]
async fn redirected_pages_cite_the_final_url() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::default());
    // the short link redirects; the page itself declares no canonical URL
    let html = "<html><head><title>Settled at Home</title></head><body>\
         <div class=\"post\"><p>Moved paragraph, long enough to score, with a comma to spare.</p>\
         <p>Second paragraph, also long enough to be kept by the scorer.</p></div>\
         </body></html>";
    transport.stub(
        "https://moved.example/s/4821",
        Ok(RawResponse {
            status: 200,
            final_url: "https://moved.example/articles/settled-at-home".into(),
            content_type: Some("text/html; charset=utf-8".into()),
            body: html.as_bytes().to_vec(),
        }),
    );

    let tally = pipeline(tmp.path().join("notes"), transport)
        .run(&[record("https://moved.example/s/4821")])
        .await;

    assert_eq!(tally.success.len(), 1);
    let text = std::fs::read_to_string(&tally.success[0]).unwrap();
    assert!(text.contains("source: \"https://moved.example/articles/settled-at-home\""));
    // nothing in the note should still point at the short link
    assert!(!text.contains("https://moved.example/s/4821"));
}

#[tokio::test]
async fn forbidden_pages_fall_back_to_the_archive_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::default());
    let snapshot_url = "http://web.archive.org/web/20240301000000/https://blocked.example/post";
    transport.stub(
        "https://blocked.example/post",
        page(403, "https://blocked.example/post", "denied"),
    );
    transport.stub(
        AVAILABILITY_ENDPOINT,
        availability(&format!(
            r#"{{"archived_snapshots": {{"closest": {{"available": true, "url": "{snapshot_url}", "status": "200", "timestamp": "20240301000000"}}}}}}"#
        )),
    );
    transport.stub(snapshot_url, page(200, snapshot_url, ARTICLE));

    let tally = pipeline(tmp.path().join("notes"), transport)
        .run(&[record("https://blocked.example/post")])
        .await;

    assert_eq!(tally.archived.len(), 1);
    assert_eq!(tally.total(), 1);
    let text = std::fs::read_to_string(&tally.archived[0]).unwrap();
    // the note keeps pointing at the original page, not the snapshot or the
    // snapshot's canonical tag
    assert!(text.contains("source: \"https://blocked.example/post\""));
    assert!(text.contains("# Practical Parsers in Rust"));
    assert!(text.contains("recursive descent"));
}

#[tokio::test]
async fn missing_snapshots_yield_placeholder_notes() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::default());
    transport.stub(
        "https://gone.example/a",
        page(403, "https://gone.example/a", ""),
    );
    transport.stub(
        AVAILABILITY_ENDPOINT,
        availability(r#"{"archived_snapshots": {}}"#),
    );

    let mut rec = record("https://gone.example/a");
    rec.tags = vec!["reading".into()];
    rec.inline = InlineMeta {
        title: Some("Saved offline copy".into()),
        description: Some("Kept for reference".into()),
        tags: vec!["reading".into()],
    };

    let tally = pipeline(tmp.path().join("notes"), transport)
        .run(&[rec])
        .await;

    assert_eq!(tally.fallback.len(), 1);
    assert_eq!(tally.fallback[0].source_url, "https://gone.example/a");
    let entry = &tally.fallback[0];
    assert_eq!(entry.path.file_name().unwrap(), "saved-offline-copy.md");
    let text = std::fs::read_to_string(&entry.path).unwrap();
    assert!(text.contains("title: \"Saved offline copy\""));
    assert!(text.contains("description: \"Kept for reference\""));
    assert!(text.contains("tags: [\"reading\"]"));
    assert!(text.contains("**CONTENT NOT AVAILABLE**"));
    assert!(text.contains("[https://gone.example/a](https://gone.example/a)"));
}

#[tokio::test]
async fn one_bad_record_does_not_stop_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::default());
    // 404 is terminal for the live tier and skips the archive entirely
    transport.stub(
        "https://dead.example/x",
        page(404, "https://dead.example/x", ""),
    );
    let ok_url = "https://site.example/posts/practical-parsers";
    transport.stub(ok_url, page(200, ok_url, ARTICLE));

    let records = vec![record("https://dead.example/x"), record(ok_url)];
    let tally = pipeline(tmp.path().join("notes"), transport)
        .run(&records)
        .await;

    assert_eq!(tally.total(), 2);
    assert_eq!(tally.fallback.len(), 1);
    assert_eq!(tally.success.len(), 1);
    assert!(tally.failed.is_empty());
}

#[tokio::test]
async fn exhausted_retries_end_as_a_placeholder_note() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(FakeTransport::default());
    let url = "https://flaky.example/a";
    // one initial request plus the full retry budget
    for _ in 0..4 {
        transport.stub(url, page(500, url, ""));
    }

    let tally = pipeline(tmp.path().join("notes"), transport.clone())
        .run(&[record(url)])
        .await;

    assert_eq!(transport.remaining(url), 0);
    assert_eq!(tally.fallback.len(), 1);
    let text = std::fs::read_to_string(&tally.fallback[0].path).unwrap();
    // no inline metadata, so the URL doubles as the title
    assert!(text.contains("title: \"https://flaky.example/a\""));
    assert!(text.contains("**CONTENT NOT AVAILABLE**"));
}

#[tokio::test]
async fn unwritable_output_roots_land_in_the_failed_bucket() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let transport = Arc::new(FakeTransport::default());
    let url = "https://site.example/posts/practical-parsers";
    transport.stub(url, page(200, url, ARTICLE));

    let tally = pipeline(blocker.join("notes"), transport)
        .run(&[record(url)])
        .await;

    assert_eq!(tally.failed.len(), 1);
    assert_eq!(tally.failed[0].url, url);
    assert!(!tally.failed[0].reason.is_empty());
    assert_eq!(tally.notes_written(), 0);
}

#[tokio::test]
async fn overlong_file_names_are_retried_with_a_shorter_title() {
    let tmp = tempfile::tempdir().unwrap();
    // 100 CJK chars survive the title cap but overflow the 255-byte name
    // limit once encoded, which forces the shortened second attempt.
    let long_title = "漢".repeat(120);
    let html = format!(
        "<html><head><meta property=\"og:title\" content=\"{long_title}\">\
         <meta property=\"article:published_time\" content=\"2024-03-05T10:00:00+00:00\">\
         </head><body><p>Enough words here, with a comma, to count as real \
         content for the scorer.</p></body></html>"
    );
    let transport = Arc::new(FakeTransport::default());
    transport.stub(
        "https://cjk.example/post",
        page(200, "https://cjk.example/post", &html),
    );

    let tally = pipeline(tmp.path().join("notes"), transport)
        .run(&[record("https://cjk.example/post")])
        .await;

    assert_eq!(tally.success.len(), 1);
    let name = tally.success[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert_eq!(name, format!("{}.md", "漢".repeat(50)));
    assert!(tally.success[0].exists());
}
