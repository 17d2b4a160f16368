use chrono::DateTime;
use policylog::{
    args, CallContext, ChannelSink, Environment, FixedClock, InMemorySink, Level, Logger,
    PipelineConfig, ProcessIdentity, RedactionAction, RedactionRuleConfig, Sink, SinkResult,
    WriterSink, DIAGNOSTIC_CATEGORY,
};
use serde_json::Value as Json;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

fn build(config: PipelineConfig) -> (Logger, Arc<InMemorySink>) {
    let sink = Arc::new(InMemorySink::new());
    let logger = Logger::builder()
        .config(config)
        .sink(sink.clone())
        .identity(Arc::new(ProcessIdentity::new("host-0a1b2c3d4e5f", 31337)))
        .clock(Arc::new(FixedClock(
            DateTime::parse_from_rfc3339("2026-10-19T12:00:00.000001+00:00").unwrap(),
        )))
        .build()
        .expect("valid config");
    (logger, sink)
}

#[test]
fn test_failed_login_scenario() {
    let (logger, sink) = build(PipelineConfig::default());

    logger.log(
        Level::Warn,
        "auth",
        "User: [{0}] failed login attempt {1}",
        args!["user" => "u123", "attempt" => 3],
        &CallContext::new()
            .request_id("req-42")
            .correlation_id("corr-7"),
    );

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];

    assert!(line.starts_with(concat!(
        r#"{"timestamp":"2026-10-19T12:00:00.000001+00:00","level":"WARN","category":"auth","#,
        r#""message":"User: [u123] failed login attempt 3","#,
        r#""template":"User: [{0}] failed login attempt {1}","#,
        r#""host_id":"host-0a1b2c3d4e5f","process_id":31337,"thread_id":""#
    )));
    assert!(line.ends_with(concat!(
        r#","request_id":"req-42","correlation_id":"corr-7","#,
        r#""fields":{"user":"u123","attempt":3}}"#
    )));

    let parsed: serde_json::Map<String, Json> = serde_json::from_str(line).unwrap();
    let keys: Vec<_> = parsed.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "timestamp",
            "level",
            "category",
            "message",
            "template",
            "host_id",
            "process_id",
            "thread_id",
            "request_id",
            "correlation_id",
            "fields"
        ]
    );
    assert!(!parsed["thread_id"].as_str().unwrap().is_empty());
}

#[test]
fn test_session_id_is_never_emitted_raw() {
    let (logger, sink) = build(PipelineConfig::default());

    for _ in 0..2 {
        logger.log(
            Level::Info,
            "web",
            "served {0}",
            args!["path" => "/cart"],
            &CallContext::new().field("session_id", "sess-abc"),
        );
    }
    logger.log(
        Level::Info,
        "web",
        "served {0}",
        args!["path" => "/cart"],
        &CallContext::new().field("session_id", "sess-xyz"),
    );

    let lines = sink.json_lines();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        let raw = line.to_string();
        assert!(!raw.contains("sess-abc"));
        assert!(!raw.contains("sess-xyz"));
    }

    let digest = |line: &Json| line["fields"]["session_id"].as_str().unwrap().to_string();
    assert!(digest(&lines[0]).starts_with("sha256:"));
    assert_eq!(digest(&lines[0]), digest(&lines[1]));
    assert_ne!(digest(&lines[0]), digest(&lines[2]));
}

#[test]
fn test_session_id_as_template_argument() {
    let (logger, sink) = build(PipelineConfig::default());

    logger.info("web", "session {0} expired", args!["sessionId" => "sess-abc"]);

    let line = &sink.json_lines()[0];
    let message = line["message"].as_str().unwrap();
    assert!(message.starts_with("session sha256:"));
    assert!(!line.to_string().contains("sess-abc"));
}

#[test]
fn test_default_thresholds_drop_debug_only() {
    let (logger, sink) = build(PipelineConfig::default());

    for level in Level::ALL {
        logger.log(level, "unconfigured", "at {0}", args![level.as_str()], &CallContext::new());
    }

    let levels: Vec<_> = sink
        .json_lines()
        .iter()
        .map(|line| line["level"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(levels, vec!["INFO", "WARN", "ERROR"]);
    assert_eq!(logger.stats().filtered, 1);
}

#[test]
fn test_category_thresholds() {
    let config = PipelineConfig::builder()
        .directives("warn,db=error")
        .category("auth", Level::Debug)
        .build();
    let (logger, sink) = build(config);

    logger.debug("auth", "token refreshed", args![]);
    logger.info("http", "request", args![]);
    logger.warn("http", "slow request", args![]);
    logger.warn("db", "slow query", args![]);
    logger.error("db", "connection lost", args![]);

    let messages: Vec<_> = sink
        .json_lines()
        .iter()
        .map(|line| line["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        messages,
        vec!["token refreshed", "slow request", "connection lost"]
    );
}

#[derive(Debug, Error)]
#[error("connection refused")]
struct SocketError;

#[derive(Debug, Error)]
#[error("query failed")]
struct QueryError {
    #[source]
    source: SocketError,
}

#[derive(Debug, Error)]
#[error("could not load order")]
struct OrderError {
    #[source]
    source: QueryError,
}

#[test]
fn test_cause_chain_is_serialized_link_by_link() {
    let (logger, sink) = build(PipelineConfig::default());
    let err = OrderError {
        source: QueryError {
            source: SocketError,
        },
    };

    logger.log(
        Level::Error,
        "orders",
        "loading order {0} failed",
        args!["order_id" => 991],
        &CallContext::new().error_code("ORD-500").error(&err),
    );

    let line = &sink.json_lines()[0];
    assert_eq!(line["error_code"], "ORD-500");

    let cause = line["cause"].as_array().unwrap();
    assert_eq!(cause.len(), 3);
    for link in cause {
        assert!(!link["type"].as_str().unwrap().is_empty());
        assert!(!link["message"].as_str().unwrap().is_empty());
        assert!(link["stack_frames"].is_array());
    }
    assert!(cause[0]["type"].as_str().unwrap().ends_with("OrderError"));
    assert_eq!(cause[1]["type"], "QueryError");
    assert_eq!(cause[2]["type"], "SocketError");
    assert_eq!(cause[2]["message"], "connection refused");
}

#[test]
fn test_mismatch_marks_once_and_reports() {
    let (logger, sink) = build(PipelineConfig::default());

    logger.info("billing", "charged {0} for {1} on {2}", args!["amount" => 10]);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].matches("[FORMAT_MISMATCH").count(), 1);

    let record: Json = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(
        record["message"],
        "charged 10 for [FORMAT_MISMATCH placeholders=3 args=1] on {2}"
    );
    assert_eq!(record["format_error"]["placeholders"], 3);
    assert_eq!(record["format_error"]["args"], 1);

    let diagnostic: Json = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(diagnostic["category"], DIAGNOSTIC_CATEGORY);
    assert_eq!(diagnostic["fields"]["diagnostic"], "format_mismatch");
}

#[test]
fn test_reject_record_emits_single_diagnostic() {
    let config = PipelineConfig::builder()
        .redaction_rule(RedactionRuleConfig::field("password", RedactionAction::Drop))
        .redaction_rule(RedactionRuleConfig::value_pattern(
            r"\b\d{4}-\d{4}-\d{4}-\d{4}\b",
            RedactionAction::RejectRecord,
        ))
        .build();
    let (logger, sink) = build(config);

    logger.log(
        Level::Info,
        "payments",
        "charging card {0}",
        args!["card" => "4111-1111-1111-1111"],
        &CallContext::new().request_id("req-1"),
    );

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains("4111-1111-1111-1111"));

    let line: Json = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(line["category"], DIAGNOSTIC_CATEGORY);
    assert_eq!(line["level"], "WARN");
    assert_eq!(line["request_id"], "req-1");
    assert_eq!(line["fields"]["diagnostic"], "redaction_rejection");
    assert_eq!(
        line["message"],
        "log record in category payments rejected by redaction rule 1 on field card"
    );
    assert_eq!(logger.stats().rejected, 1);
}

#[test]
fn test_rejection_diagnostic_carries_only_scrubbed_metadata() {
    let config = PipelineConfig::builder()
        .redaction_rule(RedactionRuleConfig::field(
            "request_id",
            RedactionAction::RejectRecord,
        ))
        .redaction_rule(RedactionRuleConfig::field(
            "correlation_id",
            RedactionAction::Hash,
        ))
        .build();
    let (logger, sink) = build(config);

    logger.log(
        Level::Info,
        "auth",
        "login",
        args![],
        &CallContext::new()
            .request_id("req-secret")
            .correlation_id("corr-RAW-SECRET"),
    );

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains("req-secret"));
    assert!(!lines[0].contains("corr-RAW-SECRET"));

    let line: Json = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(line["fields"]["diagnostic"], "redaction_rejection");
    assert!(line.get("request_id").is_none());
    assert!(line["correlation_id"]
        .as_str()
        .is_some_and(|id| id.starts_with("sha256:")));
}

#[test]
fn test_value_pattern_keeps_placeholders() {
    let config = PipelineConfig::builder()
        .redaction_rule(RedactionRuleConfig::value_pattern(r"\d+", RedactionAction::Drop))
        .build();
    let (logger, sink) = build(config);

    logger.warn(
        "auth",
        "User: [{0}] failed login attempt {1}",
        args!["user" => "alice", "attempt" => "third"],
    );

    let lines = sink.json_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"], "User: [alice] failed login attempt third");
    assert!(lines[0].get("format_error").is_none());
    assert_eq!(logger.stats().format_mismatches, 0);
}

#[test]
fn test_reject_in_message_text() {
    let config = PipelineConfig::builder()
        .redaction_rule(RedactionRuleConfig::value_pattern(
            r"\b\d{3}-\d{2}-\d{4}\b",
            RedactionAction::RejectRecord,
        ))
        .build();
    let (logger, sink) = build(config);

    logger.info("kyc", "checked 078-05-1120", args![]);

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains("078-05-1120"));
    assert!(lines[0].contains("on field template"));
}

#[test]
fn test_drop_keeps_placeholder_slot() {
    let config = PipelineConfig::builder()
        .redaction_rule(RedactionRuleConfig::field("password", RedactionAction::Drop))
        .build();
    let (logger, sink) = build(config);

    logger.info(
        "auth",
        "user {0} set password {1}",
        args!["user" => "u1", "password" => "hunter2"],
    );

    let lines = sink.json_lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(line["message"], "user u1 set password [REDACTED]");
    assert!(line["fields"].get("password").is_none());
    assert!(line.get("format_error").is_none());
    assert!(!line.to_string().contains("hunter2"));
}

struct PanicOnceSink {
    calls: AtomicUsize,
    lines: Mutex<Vec<String>>,
}

impl Sink for PanicOnceSink {
    fn emit(&self, line: &str) -> SinkResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("sink exploded");
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

#[test]
fn test_panicking_sink_does_not_reach_caller() {
    let sink = Arc::new(PanicOnceSink {
        calls: AtomicUsize::new(0),
        lines: Mutex::new(Vec::new()),
    });
    let logger = Logger::builder().sink(sink.clone()).build().unwrap();

    logger.error("app", "card {0}", args!["4111-1111-1111-1111"]);
    logger.info("app", "still alive", args![]);

    let lines = sink.lines.lock().unwrap().clone();
    assert_eq!(lines.len(), 2);

    let diagnostic: Json = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(diagnostic["fields"]["diagnostic"], "internal_failure");
    assert!(!lines[0].contains("4111"));

    let next: Json = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(next["message"], "still alive");
    assert_eq!(logger.stats().internal_failures, 1);
}

struct AlwaysPanics;

impl Sink for AlwaysPanics {
    fn emit(&self, _line: &str) -> SinkResult<()> {
        panic!("no way out");
    }
}

#[test]
fn test_sink_panicking_twice_is_contained() {
    let logger = Logger::builder().sink(AlwaysPanics).build().unwrap();
    logger.error("app", "boom", args![]);
    assert_eq!(logger.stats().internal_failures, 1);
    assert_eq!(logger.stats().emitted, 0);
}

#[test]
fn test_concurrent_threads_write_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.log");
    let logger = Logger::builder()
        .sink(WriterSink::append_file(&path).unwrap())
        .build()
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let logger = logger.clone();
            std::thread::Builder::new()
                .name(format!("worker-{}", worker))
                .spawn(move || {
                    for i in 0..200 {
                        logger.info(
                            "jobs",
                            "worker {0} finished job {1}",
                            args!["worker" => worker, "job" => i],
                        );
                    }
                })
                .unwrap()
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.flush().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 1600);
    for line in lines {
        let parsed: Json = serde_json::from_str(line).expect("complete JSON line");
        let thread = parsed["thread_id"].as_str().unwrap();
        assert!(thread.starts_with("worker-"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_through_channel_sink() {
    let memory = Arc::new(InMemorySink::new());
    let channel = Arc::new(ChannelSink::spawn(memory.clone()));
    let logger = Logger::builder().sink(channel.clone()).build().unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|task| {
            let logger = logger.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    logger.log(
                        Level::Info,
                        "tasks",
                        "task {0} step {1}",
                        args!["task" => task, "step" => i],
                        &CallContext::new().correlation_id(format!("corr-{}", task)),
                    );
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    channel.shutdown().await.unwrap();

    let lines = memory.json_lines();
    assert_eq!(lines.len(), 800);
    assert!(lines
        .iter()
        .all(|line| line["correlation_id"].as_str().unwrap().starts_with("corr-")));
    assert_eq!(logger.stats().emitted, 800);
}

#[test]
#[serial]
fn test_production_environment_preset() {
    std::env::set_var("POLICYLOG_ENV", "production");
    let env = Environment::current();
    assert!(env.is_production());

    let (logger, sink) = build(PipelineConfig::from_environment());
    std::env::remove_var("POLICYLOG_ENV");

    logger.debug("auth", "noise", args![]);
    logger.log(
        Level::Info,
        "auth",
        "login ok for {0}",
        args!["user" => "u1"],
        &CallContext::new()
            .field("password", "hunter2")
            .field("Authorization", "Bearer abc"),
    );

    let lines = sink.json_lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(line["environment"], "production");
    assert!(line["fields"].get("password").is_none());
    assert!(line["fields"].get("Authorization").is_none());
    assert_eq!(line["fields"]["user"], "u1");
}

#[test]
#[serial]
fn test_development_environment_preset() {
    std::env::remove_var("POLICYLOG_ENV");
    let (logger, sink) = build(PipelineConfig::from_environment());

    logger.debug("auth", "verbose detail", args![]);

    let lines = sink.json_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["environment"], "development");
}
