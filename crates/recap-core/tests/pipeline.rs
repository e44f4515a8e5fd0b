//! Integration test: full capture pipeline against a local archive endpoint.
//!
//! Intercepts a stream through the archiver, lets the upload run over curl to
//! a minimal HTTP server, and checks the wire body, cache merge and
//! notifications.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use recap_core::control::InterceptError;
use recap_core::multipart::{self, Boundary};
use recap_core::notify::{IconKind, Notifier, NOTIFICATION_TITLE};
use recap_core::{
    Archiver, DocumentMetadata, MetadataCache, RecapConfig, StatsSnapshot, StreamListener,
};
use tokio::runtime::Handle;

#[derive(Default)]
struct CollectSink {
    started: bool,
    data: Vec<u8>,
    stopped: Option<u32>,
}

impl StreamListener for CollectSink {
    fn on_start(&mut self) {
        self.started = true;
    }

    fn on_data(&mut self, chunk: &[u8], _offset: u64, length: usize) {
        self.data.extend_from_slice(&chunk[..length]);
    }

    fn on_stop(&mut self, status: u32) {
        self.stopped = Some(status);
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(IconKind, String, String)>>);

impl Recorder {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(_, _, m)| m.clone()).collect()
    }
}

impl Notifier for Recorder {
    fn notify(&self, icon: IconKind, title: &str, message: &str) {
        self.0
            .lock()
            .unwrap()
            .push((icon, title.to_string(), message.to_string()));
    }
}

fn archiver_for(url: &str) -> (Archiver, Arc<Recorder>) {
    let cfg = RecapConfig {
        upload_url: url.to_string(),
        connect_timeout_secs: 2,
        timeout_secs: 10,
        ..RecapConfig::default()
    };
    let notifier = Arc::new(Recorder::default());
    let archiver = Archiver::new(
        cfg,
        Arc::new(MetadataCache::new()),
        notifier.clone(),
        Handle::current(),
    );
    (archiver, notifier)
}

/// Replay `payload` through a fresh session in `chunk`-sized pieces.
fn capture(archiver: &Archiver, meta: DocumentMetadata, payload: &[u8], chunk: usize) -> Vec<u8> {
    let mut sink = CollectSink::default();
    {
        let mut tee = archiver.intercept(meta, &mut sink).unwrap();
        tee.on_start();
        let mut offset = 0u64;
        for piece in payload.chunks(chunk) {
            tee.on_data(piece, offset, piece.len());
            offset += piece.len() as u64;
        }
        tee.on_stop(200);
    }
    assert!(sink.started);
    assert_eq!(sink.stopped, Some(200));
    sink.data
}

/// (name, filename, content type, value) for each part of a multipart body.
fn parts(body: &[u8], boundary: &str) -> Vec<(String, Option<String>, Option<String>, Vec<u8>)> {
    let text = String::from_utf8_lossy(body).into_owned();
    let delimiter = format!("--{boundary}");
    let mut out = Vec::new();
    for raw in text.split(delimiter.as_str()).skip(1) {
        if raw.starts_with("--") {
            break;
        }
        let raw = raw.strip_prefix("\r\n").unwrap();
        let raw = raw.strip_suffix("\r\n").unwrap_or(raw);
        let (head, value) = raw.split_once("\r\n\r\n").unwrap();
        let mut name = String::new();
        let mut filename = None;
        let mut content_type = None;
        for line in head.split("\r\n") {
            if let Some(rest) = line.strip_prefix("Content-Disposition: form-data; ") {
                for attr in rest.split("; ") {
                    let (k, v) = attr.split_once('=').unwrap();
                    let v = v.trim_matches('"').to_string();
                    match k {
                        "name" => name = v,
                        "filename" => filename = Some(v),
                        _ => {}
                    }
                }
            } else if let Some(ct) = line.strip_prefix("Content-Type: ") {
                content_type = Some(ct.to_string());
            }
        }
        out.push((name, filename, content_type, value.as_bytes().to_vec()));
    }
    out
}

#[tokio::test(flavor = "multi_thread")]
async fn pdf_capture_posts_framed_body_and_leaves_cache_alone() {
    let server = common::archive_server::start(200, r#"{"message": "ok"}"#);
    let (archiver, notifier) = archiver_for(&server.url);
    let meta = DocumentMetadata::pdf("cacd", "1234567890.pdf", "/doc1/1234567890");
    let payload = b"%PDF-1.4...";

    let forwarded = capture(&archiver, meta.clone(), payload, 4);
    assert_eq!(forwarded, payload);
    assert!(archiver.drain(Duration::from_secs(10)).await, "upload should finish");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/recap/upload/");

    let content_type = request.header("content-type").unwrap();
    let token = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");
    assert_eq!(
        request.header("content-length").unwrap(),
        request.body.len().to_string()
    );

    let expected = multipart::encode(&meta, &Boundary::from_token(token), payload).unwrap();
    assert_eq!(request.body, expected);

    let parts = parts(&request.body, token);
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0].0, "data");
    assert_eq!(parts[0].1.as_deref(), Some("1234567890.pdf"));
    assert_eq!(parts[0].2.as_deref(), Some("application/pdf"));
    assert_eq!(parts[0].3, payload);
    let text: Vec<(&str, &[u8])> = parts[1..]
        .iter()
        .map(|(n, _, _, v)| (n.as_str(), v.as_slice()))
        .collect();
    assert_eq!(
        text,
        vec![
            ("mimetype", &b"application/pdf"[..]),
            ("court", &b"cacd"[..]),
            ("url", &b"/doc1/1234567890"[..]),
        ]
    );
    assert!(!request.body_text().contains("name=\"name\""));

    assert!(archiver.cache().is_empty());
    let notes = notifier.0.lock().unwrap().clone();
    assert_eq!(
        notes,
        vec![(
            IconKind::LoggedIn,
            NOTIFICATION_TITLE.to_string(),
            "PDF uploaded to the public archive.".to_string()
        )]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn docket_reply_is_merged_into_cache() {
    let server = common::archive_server::start(
        200,
        r#"{"message": "ok", "cases": {"123": {"officialcasenum": "1:20-cv-456"}}, "documents": {"7": {"description": "Order"}}}"#,
    );
    let (archiver, notifier) = archiver_for(&server.url);

    capture(
        &archiver,
        DocumentMetadata::docket("nysd", "DktRpt.html", "123"),
        b"<html><body>docket</body></html>",
        8,
    );
    assert!(archiver.drain(Duration::from_secs(10)).await);

    let cache = archiver.cache();
    assert_eq!(
        cache.case("123").unwrap().official_case_num.as_deref(),
        Some("1:20-cv-456")
    );
    assert_eq!(
        cache.document("7").unwrap().get_str("description"),
        Some("Order")
    );
    assert_eq!(
        notifier.messages(),
        vec!["Docket uploaded to the public archive.".to_string()]
    );

    let body = server.requests()[0].body_text();
    assert!(body.contains("Content-Type: text/html\r\n"));
    assert!(body.contains("name=\"casenum\"\r\n\r\n123"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_reply_leaves_cache_unchanged() {
    let server =
        common::archive_server::start(200, r#"{"message": "ok", "cases": {"123": {"officialc"#);
    let (archiver, notifier) = archiver_for(&server.url);

    capture(
        &archiver,
        DocumentMetadata::docket("nysd", "DktRpt.html", "123"),
        b"<html></html>",
        64,
    );
    assert!(archiver.drain(Duration::from_secs(10)).await);

    assert!(archiver.cache().is_empty());
    assert!(notifier.messages().is_empty());
    assert_eq!(
        archiver.stats(),
        StatsSnapshot {
            uploads_started: 1,
            uploads_failed: 1,
            ..StatsSnapshot::default()
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_a_silent_failure() {
    let server = common::archive_server::start(503, "unavailable");
    let (archiver, notifier) = archiver_for(&server.url);

    let forwarded = capture(
        &archiver,
        DocumentMetadata::case_document("dcd", "doc.html"),
        b"<html>case</html>",
        5,
    );
    assert_eq!(forwarded, b"<html>case</html>");
    assert!(archiver.drain(Duration::from_secs(10)).await);

    assert_eq!(server.requests().len(), 1);
    assert!(archiver.cache().is_empty());
    assert!(notifier.messages().is_empty());
    assert_eq!(archiver.stats().uploads_failed, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_archive_does_not_disturb_pass_through() {
    let url = common::archive_server::closed_url();
    let (archiver, notifier) = archiver_for(&url);
    let payload: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();

    let forwarded = capture(
        &archiver,
        DocumentMetadata::pdf("cacd", "big.pdf", "/doc1/2"),
        &payload,
        1000,
    );
    assert_eq!(forwarded, payload);
    assert!(archiver.drain(Duration::from_secs(10)).await);
    assert!(notifier.messages().is_empty());
    assert_eq!(archiver.stats().uploads_failed, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_sessions_merge_every_reply() {
    let server = common::archive_server::start_with(|request| {
        let body = request.body_text();
        let casenum = body
            .split("name=\"casenum\"\r\n\r\n")
            .nth(1)
            .and_then(|rest| rest.split("\r\n").next())
            .unwrap_or("")
            .to_string();
        (
            200,
            format!(
                r#"{{"message": "ok", "cases": {{"{casenum}": {{"officialcasenum": "oc-{casenum}", "casename": "Case {casenum}"}}}}, "documents": {{"shared": {{"last": "{casenum}"}}, "d{casenum}": {{"n": 1}}}}}}"#
            ),
        )
    });
    let (archiver, notifier) = archiver_for(&server.url);

    let mut handles = Vec::new();
    for i in 0..8 {
        let archiver = archiver.clone();
        handles.push(std::thread::spawn(move || {
            let casenum = format!("{}", 100 + i);
            capture(
                &archiver,
                DocumentMetadata::docket("nysd", format!("docket-{i}.html"), casenum),
                format!("<html>{i}</html>").as_bytes(),
                3,
            )
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(archiver.drain(Duration::from_secs(20)).await);

    let cache = archiver.cache();
    assert_eq!(cache.case_count(), 8);
    for i in 0..8 {
        let casenum = format!("{}", 100 + i);
        let case = cache.case(&casenum).unwrap();
        assert_eq!(case.official_case_num, Some(format!("oc-{casenum}")));
        assert_eq!(case.case_name, Some(format!("Case {casenum}")));
        assert!(cache.document(&format!("d{casenum}")).is_some());
    }
    let last = cache.document("shared").unwrap();
    assert!(last.get_str("last").unwrap().starts_with('1'));
    assert_eq!(notifier.messages().len(), 8);
    assert_eq!(archiver.stats().uploads_succeeded, 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_lets_in_flight_upload_finish() {
    let server = common::archive_server::start(
        200,
        r#"{"cases": {"9": {"casename": "In re Nine"}}}"#,
    );
    let (archiver, _) = archiver_for(&server.url);

    capture(
        &archiver,
        DocumentMetadata::docket("nysd", "DktRpt.html", "9"),
        b"<html/>",
        2,
    );
    archiver.shutdown();

    let mut sink = CollectSink::default();
    assert!(matches!(
        archiver.intercept(DocumentMetadata::docket("nysd", "x.html", "10"), &mut sink),
        Err(InterceptError::ShuttingDown)
    ));

    assert!(archiver.drain(Duration::from_secs(10)).await);
    assert_eq!(
        archiver.cache().case("9").unwrap().case_name.as_deref(),
        Some("In re Nine")
    );
    assert_eq!(archiver.in_flight(), 0);
}
