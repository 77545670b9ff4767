//! Integration tests for the call-forwarding webhook.
//!
//! Each test spins up the real axum router on a random port with an
//! in-memory session store and drives it with form-encoded carrier posts,
//! exercising whole leg sequences end to end.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use tokio::time::timeout;

use ringline::config::RoutingConfig;
use ringline::error::StoreError;
use ringline::routes::{AppState, router};
use ringline::store::{CursorSnapshot, MemoryStore, SessionStore, WriteOutcome};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

struct TestApp {
    base: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
    // Keep the list files alive for the duration of the test.
    _forward_file: NamedTempFile,
    _block_file: Option<NamedTempFile>,
}

impl TestApp {
    async fn spawn(forward_json: &str, block_lines: Option<&str>) -> Self {
        let mut forward_file = NamedTempFile::new().unwrap();
        forward_file.write_all(forward_json.as_bytes()).unwrap();

        let block_file = block_lines.map(|lines| {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(lines.as_bytes()).unwrap();
            file
        });

        let config = RoutingConfig {
            forward_list_path: forward_file.path().to_path_buf(),
            block_list_path: block_file.as_ref().map(|f| f.path().to_path_buf()),
            caller_id: Some("+15550009999".to_string()),
            ..RoutingConfig::default()
        };

        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            config: Arc::new(config),
            store: Arc::clone(&store) as Arc<dyn SessionStore>,
            notifier: None,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.ok();
        });

        Self {
            base: format!("http://{addr}"),
            store,
            client: reqwest::Client::new(),
            _forward_file: forward_file,
            _block_file: block_file,
        }
    }

    /// Post one call leg and return the markup body.
    async fn leg(&self, fields: &[(&str, &str)]) -> String {
        let response = self
            .client
            .post(format!("{}/voice", self.base))
            .form(fields)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        response.text().await.unwrap()
    }

    async fn cursor(&self) -> u32 {
        self.store.get_cursor("dial-cursor").await.unwrap().cursor
    }
}

const THREE_UNNAMED: &str = r#"[
    {"number": "+15550000001"},
    {"number": "+15550000002"},
    {"number": "+15550000003"}
]"#;

#[tokio::test]
async fn cascade_dials_in_order_then_voicemail() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;

        let leg1 = app.leg(&[("CallSid", "CA1"), ("From", "+16005551234")]).await;
        assert!(leg1.contains(">+15550000001</Dial>"), "leg1: {leg1}");
        assert!(leg1.contains("recipient 1"));
        assert_eq!(app.cursor().await, 1);

        let leg2 = app
            .leg(&[("CallSid", "CA1"), ("From", "+16005551234"), ("DialCallStatus", "no-answer")])
            .await;
        assert!(leg2.contains(">+15550000002</Dial>"), "leg2: {leg2}");
        assert_eq!(app.cursor().await, 2);

        let leg3 = app
            .leg(&[("CallSid", "CA1"), ("From", "+16005551234"), ("DialCallStatus", "no-answer")])
            .await;
        assert!(leg3.contains(">+15550000003</Dial>"), "leg3: {leg3}");
        assert_eq!(app.cursor().await, 3);

        let leg4 = app
            .leg(&[("CallSid", "CA1"), ("From", "+16005551234"), ("DialCallStatus", "no-answer")])
            .await;
        assert!(leg4.contains("<Record"), "leg4: {leg4}");
        assert!(leg4.contains("transcribeCallback=\"/voicemail\""));
        assert_eq!(app.cursor().await, 3, "voicemail leg must not move the cursor");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn answered_call_acknowledges_without_touching_cursor() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;

        app.leg(&[("From", "+16005551234")]).await;
        assert_eq!(app.cursor().await, 1);

        let ack = app
            .leg(&[("From", "+16005551234"), ("DialCallStatus", "completed")])
            .await;
        assert!(ack.contains("<Hangup/>"), "ack: {ack}");
        assert!(!ack.contains("<Dial"));
        assert_eq!(app.cursor().await, 1);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn stale_cursor_resets_on_fresh_call() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;

        // Exhaust the list.
        app.leg(&[("From", "+16005551234")]).await;
        for _ in 0..3 {
            app.leg(&[("From", "+16005551234"), ("DialCallStatus", "no-answer")]).await;
        }
        assert_eq!(app.cursor().await, 3);

        // A brand-new call wraps back to the top of the list.
        let fresh = app.leg(&[("From", "+16005559999")]).await;
        assert!(fresh.contains(">+15550000001</Dial>"), "fresh: {fresh}");
        assert_eq!(app.cursor().await, 1);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn blacklisted_caller_is_rejected_and_cursor_untouched() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, Some("+15551234567\n")).await;

        let rejected = app.leg(&[("From", "+15551234567")]).await;
        assert!(rejected.contains("<Reject reason=\"rejected\"/>"), "rejected: {rejected}");
        assert!(!rejected.contains("<Dial"));
        assert_eq!(app.cursor().await, 0);

        // A different caller still gets the first entry.
        let admitted = app.leg(&[("From", "+16005551234")]).await;
        assert!(admitted.contains(">+15550000001</Dial>"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn blacklist_applies_to_every_leg_status() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, Some("+15551234567\n")).await;

        // Even a leg that claims a prior dial attempt must be rejected
        // before any cursor logic runs.
        for status in ["no-answer", "busy", "failed", "completed"] {
            let leg = app
                .leg(&[("From", "+15551234567"), ("DialCallStatus", status)])
                .await;
            assert!(leg.contains("<Reject reason=\"rejected\"/>"), "status {status}: {leg}");
            assert!(!leg.contains("<Dial"), "status {status}: {leg}");
        }
        assert_eq!(app.cursor().await, 0);
    })
    .await
    .unwrap();
}

const SPAMMY_ADDONS: &str = r#"{"status":"successful","results":{"cleancall":{"status":"successful","result":{"result":{"match":true,"score":95}}}}}"#;

#[tokio::test]
async fn spam_gate_applies_only_to_the_initial_leg() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;

        let rejected = app
            .leg(&[("From", "+16005551234"), ("AddOns", SPAMMY_ADDONS)])
            .await;
        assert!(rejected.contains("<Reject"), "rejected: {rejected}");
        assert_eq!(app.cursor().await, 0);

        // Admit a clean initial leg, then replay the spammy annotation on a
        // retry leg: the gate must not run again.
        app.leg(&[("From", "+16005551234")]).await;
        let retry = app
            .leg(&[
                ("From", "+16005551234"),
                ("DialCallStatus", "no-answer"),
                ("AddOns", SPAMMY_ADDONS),
            ])
            .await;
        assert!(retry.contains(">+15550000002</Dial>"), "retry: {retry}");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn malformed_addons_fails_open() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;
        let leg = app
            .leg(&[("From", "+16005551234"), ("AddOns", "{broken json")])
            .await;
        assert!(leg.contains("<Dial"), "leg: {leg}");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn empty_and_all_invalid_lists_are_unavailable() {
    timeout(TEST_TIMEOUT, async {
        for list in ["[]", r#"[{"number": "bogus"}, {"number": "12345"}]"#] {
            let app = TestApp::spawn(list, None).await;
            let leg = app.leg(&[("From", "+16005551234")]).await;
            assert!(leg.contains("no one is available"), "leg: {leg}");
            assert!(leg.contains("<Hangup/>"));
            assert!(!leg.contains("<Dial"));
            assert_eq!(app.cursor().await, 0);
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn dial_leg_carries_configured_caller_id_and_action() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(
            r#"[{"number": "+15550000001", "name": "Rachel"}]"#,
            None,
        )
        .await;
        let leg = app.leg(&[("From", "+16005551234")]).await;
        assert!(leg.contains("callerId=\"+15550009999\""), "leg: {leg}");
        assert!(leg.contains("action=\"/voice\""));
        assert!(leg.contains("timeout=\"15\""));
        assert!(leg.contains("Rachel"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn transcript_callback_is_always_answered() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;
        let response = app
            .client
            .post(format!("{}/voicemail", app.base))
            .form(&[
                ("RecordingUrl", "https://carrier.example/rec/RE1"),
                ("TranscriptionText", "hello"),
                ("From", "+16005551234"),
            ])
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        // Even a callback with no recording URL gets a clean 200.
        let empty = app
            .client
            .post(format!("{}/voicemail", app.base))
            .form(&[("From", "+16005551234")])
            .send()
            .await
            .unwrap();
        assert!(empty.status().is_success());
    })
    .await
    .unwrap();
}

/// Store stub whose every operation fails, for the degraded-answer path.
struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn get_cursor(&self, _session: &str) -> Result<CursorSnapshot, StoreError> {
        Err(StoreError::Query("connection refused".to_string()))
    }

    async fn set_cursor(
        &self,
        _session: &str,
        _cursor: u32,
        _expected_version: i64,
    ) -> Result<WriteOutcome, StoreError> {
        Err(StoreError::Query("connection refused".to_string()))
    }
}

#[tokio::test]
async fn store_failure_degrades_to_apology() {
    timeout(TEST_TIMEOUT, async {
        let mut forward_file = NamedTempFile::new().unwrap();
        forward_file.write_all(THREE_UNNAMED.as_bytes()).unwrap();

        let config = RoutingConfig {
            forward_list_path: forward_file.path().to_path_buf(),
            ..RoutingConfig::default()
        };
        let state = AppState {
            config: Arc::new(config),
            store: Arc::new(BrokenStore),
            notifier: None,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.ok();
        });

        // The carrier must still get a spoken answer, never an error status.
        let response = reqwest::Client::new()
            .post(format!("http://{addr}/voice"))
            .form(&[("From", "+16005551234")])
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let body = response.text().await.unwrap();
        assert!(body.contains("something went wrong"), "body: {body}");
        assert!(body.contains("<Hangup/>"));
        assert!(!body.contains("<Dial"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn duplicate_delivery_does_not_double_advance() {
    timeout(TEST_TIMEOUT, async {
        let app = TestApp::spawn(THREE_UNNAMED, None).await;

        // Simulate the carrier delivering the same initial leg twice,
        // concurrently. Both legs answer, but the cursor only moves once per
        // committed snapshot version.
        let (a, b) = tokio::join!(
            app.leg(&[("CallSid", "CA1"), ("From", "+16005551234")]),
            app.leg(&[("CallSid", "CA1"), ("From", "+16005551234")]),
        );
        assert!(a.contains("<Dial"));
        assert!(b.contains("<Dial"));

        let cursor = app.cursor().await;
        assert!(
            (1..=2).contains(&cursor),
            "cursor advanced by committed legs only, got {cursor}"
        );
    })
    .await
    .unwrap();
}
