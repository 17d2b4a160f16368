//! Pipeline overhead benchmarks
//!
//! Measures each stage on its own and a full `Logger::log` call into an
//! in-memory sink.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use policylog::{
    args, render_message, Arg, CallContext, InMemorySink, JsonFormatter, Level, LevelFilter,
    LevelThresholds, LogFormatter, Logger, MetadataEnricher, PartialRecord, PipelineConfig,
    ProcessIdentity, RedactionAction, RedactionRuleConfig, Redactor,
};
use std::sync::Arc;

fn sample_args(count: usize) -> Vec<Arg> {
    (0..count)
        .map(|i| Arg::new(format!("arg{}", i), format!("value-{}", i)))
        .collect()
}

fn sample_template(count: usize) -> String {
    (0..count)
        .map(|i| format!("field {} is {{{}}}", i, i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Benchmark placeholder substitution
fn bench_render_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_message");

    for count in [0usize, 2, 8] {
        let template = sample_template(count);
        let args = sample_args(count);
        group.bench_with_input(BenchmarkId::new("args", count), &count, |b, _| {
            b.iter(|| render_message(black_box(&template), black_box(&args)))
        });
    }

    let args = sample_args(1);
    group.bench_function("mismatch", |b| {
        b.iter(|| render_message(black_box("a {0} b {1} c {2}"), black_box(&args)))
    });

    group.finish();
}

/// Benchmark the level gate
fn bench_level_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filter");

    let filter = LevelFilter::new(
        LevelThresholds::parse_directives("warn,auth=debug,db=error,http=info").unwrap(),
    );

    group.bench_function("override_hit", |b| {
        b.iter(|| filter.should_emit(black_box("auth"), black_box(Level::Debug)))
    });
    group.bench_function("default_miss", |b| {
        b.iter(|| filter.should_emit(black_box("unknown"), black_box(Level::Info)))
    });

    group.finish();
}

/// Benchmark redaction with growing rule lists
fn bench_redactor(c: &mut Criterion) {
    let mut group = c.benchmark_group("redactor");
    let enricher = MetadataEnricher::new(Arc::new(ProcessIdentity::new("host-bench", 1)));

    for rules in [0usize, 4, 16] {
        let config = (0..rules).fold(PipelineConfig::builder(), |builder, i| {
            builder.redaction_rule(RedactionRuleConfig::field(
                format!("secret{}", i),
                RedactionAction::Hash,
            ))
        });
        let redactor = Redactor::new(config.build().redaction_rules().unwrap());

        group.bench_with_input(BenchmarkId::new("field_rules", rules), &rules, |b, _| {
            b.iter(|| {
                let record = enricher.enrich(PartialRecord::new(
                    Level::Info,
                    "auth",
                    "user {0} from {1}",
                    args!["user" => "u123", "ip" => "10.0.0.1"],
                    CallContext::new().field("session_id", "sess-abc"),
                ));
                black_box(redactor.scrub(record))
            })
        });
    }

    let pattern = Redactor::new(
        PipelineConfig::builder()
            .redaction_rule(RedactionRuleConfig::value_pattern(
                r"\b\d{4}-\d{4}-\d{4}-\d{4}\b",
                RedactionAction::Hash,
            ))
            .build()
            .redaction_rules()
            .unwrap(),
    );
    group.bench_function("value_pattern", |b| {
        b.iter(|| {
            let record = enricher.enrich(PartialRecord::new(
                Level::Info,
                "payments",
                "charging {0}",
                args!["card" => "4111-1111-1111-1111"],
                CallContext::new(),
            ));
            black_box(pattern.scrub(record))
        })
    });

    group.finish();
}

/// Benchmark JSON line rendering
fn bench_formatter(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatter");
    let enricher = MetadataEnricher::new(Arc::new(ProcessIdentity::new("host-bench", 1)));
    let formatter = JsonFormatter::new();

    let record = enricher.enrich(PartialRecord::new(
        Level::Warn,
        "auth",
        "User: [{0}] failed login attempt {1}",
        args!["user" => "u123", "attempt" => 3],
        CallContext::new().request_id("req-1").correlation_id("corr-1"),
    ));

    group.bench_function("json_line", |b| b.iter(|| formatter.render(black_box(&record))));
    group.bench_function("json_line_parse_back", |b| {
        b.iter(|| {
            let line = formatter.render(black_box(&record));
            serde_json::from_str::<serde_json::Value>(&line).unwrap()
        })
    });

    group.finish();
}

/// Benchmark complete `Logger::log` calls
fn bench_logger(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger");

    let logger = Logger::builder()
        .config(PipelineConfig::production())
        .sink(InMemorySink::bounded(1024))
        .build()
        .unwrap();
    let context = CallContext::new().request_id("req-1");

    group.bench_function("filtered", |b| {
        b.iter(|| logger.debug(black_box("auth"), "ignored {0}", args!["x"]))
    });
    group.bench_function("emitted", |b| {
        b.iter(|| {
            logger.log(
                Level::Warn,
                black_box("auth"),
                "User: [{0}] failed login attempt {1}",
                args!["user" => "u123", "attempt" => 3],
                &context,
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_render_message,
    bench_level_filter,
    bench_redactor,
    bench_formatter,
    bench_logger,
);
criterion_main!(benches);
