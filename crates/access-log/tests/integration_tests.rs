//! 통합 테스트 -- 설정 → 조립 → 기록 전체 흐름 검증
//!
//! 내장 확장(파일 싱크, 필터, 키-값 포매터)을 실제 파일과 함께 사용합니다.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crosslog_access_log::{
    FILE_ACCESS_LOG_NAME, FileAccessLogManager, KV_FORMATTER_NAMESPACE, KeyValueRecord,
    PipelineHandle, build_pipeline, ensure_builtin_extensions, register_builtin_extensions,
};
use crosslog_core::config::{AccessLogConfig, AccessLogFilterConfig, ExtensionFilterConfig};
use crosslog_core::error::AccessLogError;
use crosslog_core::filter::{ExtensionFilter, ExtensionFilterFactory, ExtensionFilterPtr};
use crosslog_core::registry::{ExtensionRole, Registry};
use crosslog_core::runtime::{RandomGenerator, RuntimeLoader};
use crosslog_core::validation::ValidationVisitor;
use crosslog_core::{CrosslogConfig, FactoryContext, LogContext, WarningValidationVisitor};

// ─── 헬퍼 ────────────────────────────────────────────────────────────

fn builtin_registry() -> Registry {
    let registry = Registry::new();
    register_builtin_extensions(&registry).expect("builtin registration should succeed");
    registry
}

fn file_entry(path: &Path, extra: serde_json::Value) -> AccessLogConfig {
    let mut typed = json!({ "path": path.display().to_string() });
    if let (Some(typed), Some(extra)) = (typed.as_object_mut(), extra.as_object()) {
        typed.extend(extra.clone());
    }
    AccessLogConfig::new(FILE_ACCESS_LOG_NAME, typed)
}

fn extension_filter(name: &str, typed_config: serde_json::Value) -> AccessLogFilterConfig {
    AccessLogFilterConfig::extension(ExtensionFilterConfig {
        name: name.to_owned(),
        type_id: None,
        typed_config,
    })
}

fn health_check() -> KeyValueRecord {
    KeyValueRecord::new()
        .with("method", "GET")
        .with("path", "/health")
        .with("status", "200")
}

fn read_lines(manager: &FileAccessLogManager, path: &Path) -> Vec<String> {
    manager.flush_all().expect("flush should succeed");
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}

struct Setup {
    dir: tempfile::TempDir,
    manager: Arc<FileAccessLogManager>,
    context: FactoryContext,
    registry: Registry,
}

fn setup() -> Setup {
    let manager = Arc::new(FileAccessLogManager::new());
    Setup {
        dir: tempfile::tempdir().expect("should create temp dir"),
        context: FactoryContext::new(manager.clone()),
        manager,
        registry: builtin_registry(),
    }
}

// ─── 조립 실패 ───────────────────────────────────────────────────────

#[test]
fn unknown_sink_name_is_unknown_extension() {
    let s = setup();
    let entries = vec![AccessLogConfig::new(
        "crosslog.access_loggers.kafka",
        json!({}),
    )];
    let err = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .err()
        .expect("unknown sink should fail");
    assert!(matches!(
        err.root(),
        AccessLogError::UnknownExtension {
            role: ExtensionRole::SinkInstance,
            ..
        }
    ));
}

#[test]
fn unknown_formatter_namespace_is_unknown_extension() {
    let s = setup();
    let entries = vec![file_entry(&s.dir.path().join("a.log"), json!({}))];
    let err = build_pipeline(&entries, &s.context, "proto.dubbo", &s.registry)
        .err()
        .expect("unknown namespace should fail");
    assert!(matches!(
        err.root(),
        AccessLogError::UnknownExtension {
            role: ExtensionRole::Formatter,
            ..
        }
    ));
}

#[test]
fn unknown_filter_type_is_unknown_extension() {
    let s = setup();
    let entries = vec![
        file_entry(&s.dir.path().join("a.log"), json!({}))
            .with_filter(extension_filter("crosslog.filters.status_code", json!({}))),
    ];
    let err = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .err()
        .expect("unknown filter should fail");
    assert!(matches!(
        err.root(),
        AccessLogError::UnknownExtension {
            role: ExtensionRole::FilterExtension,
            ..
        }
    ));
}

#[test]
fn unsupported_filter_specifier_from_toml_is_fatal() {
    let s = setup();
    let toml = format!(
        r#"
[[access_log.entries]]
name = "crosslog.access_loggers.file"
typed_config = {{ path = "{}" }}
filter = {{ status_code_filter = {{ min = 500 }} }}
"#,
        s.dir.path().join("a.log").display()
    );
    let config = CrosslogConfig::parse(&toml).expect("unknown specifier still parses");

    let err = build_pipeline(
        &config.access_log.entries,
        &s.context,
        KV_FORMATTER_NAMESPACE,
        &s.registry,
    )
    .err()
    .expect("corrupt filter must not fall back to pass-all");
    assert!(matches!(
        err.root(),
        AccessLogError::CorruptConfiguration { .. }
    ));
    assert!(err.is_fatal());
}

#[test]
fn non_string_json_format_value_is_invalid_format_spec() {
    let s = setup();
    let entries = vec![file_entry(
        &s.dir.path().join("a.log"),
        json!({ "json_format": { "method": "%METHOD%", "status": 200 } }),
    )];
    let err = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .err()
        .expect("numeric json_format value should fail");

    let AccessLogError::InvalidFormatSpec { field, .. } = err.root() else {
        panic!("expected InvalidFormatSpec, got {err:?}");
    };
    assert_eq!(field, "json_format.status");
}

#[test]
fn failed_build_leaves_no_file_and_no_handle() {
    let s = setup();
    let written = s.dir.path().join("a.log");
    let entries = vec![
        file_entry(&written, json!({ "format": "%STATUS%" })),
        AccessLogConfig::new("crosslog.access_loggers.kafka", json!({})),
    ];

    let err = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .err()
        .expect("unknown sink should fail");
    assert!(matches!(err, AccessLogError::Entry { index: 1, .. }));

    assert!(!written.exists());
    assert_eq!(s.manager.open_count(), 0);
}

#[test]
fn failed_sink_creation_leaves_no_file_and_no_handle() {
    let s = setup();
    let written = s.dir.path().join("a.log");
    let entries = vec![
        file_entry(&written, json!({})),
        file_entry(
            &s.dir.path().join("b.log"),
            json!({ "json_format": { "status": 200 } }),
        ),
    ];

    build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .err()
        .expect("non-string json_format should fail");

    assert!(!written.exists());
    assert_eq!(s.manager.open_count(), 0);
}

#[test]
fn failing_entry_is_reported_with_position() {
    let s = setup();
    let entries = vec![
        file_entry(&s.dir.path().join("a.log"), json!({})),
        file_entry(&s.dir.path().join("b.log"), json!({ "path": "" })),
    ];
    let err = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .err()
        .expect("empty path should fail");
    assert!(matches!(err, AccessLogError::Entry { index: 1, .. }));
    assert!(matches!(
        err.root(),
        AccessLogError::InvalidSinkConfig { .. }
    ));
}

// ─── 기록 ───────────────────────────────────────────────────────────

#[test]
fn text_format_renders_one_line_per_call_in_order() {
    let s = setup();
    let path = s.dir.path().join("access.log");
    let entries = vec![file_entry(
        &path,
        json!({ "format": "%METHOD% %PATH% %STATUS%" }),
    )];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    for status in ["200", "404", "503"] {
        let record = health_check().with("status", status);
        pipeline_log(&pipeline, &record);
    }

    assert_eq!(
        read_lines(&s.manager, &path),
        vec!["GET /health 200", "GET /health 404", "GET /health 503"]
    );
}

#[test]
fn identical_contexts_render_identical_lines() {
    let s = setup();
    let path = s.dir.path().join("access.log");
    let entries = vec![file_entry(&path, json!({ "format": "%METHOD% %STATUS%" }))];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    let record = health_check();
    pipeline_log(&pipeline, &record);
    pipeline_log(&pipeline, &record);

    let lines = read_lines(&s.manager, &path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn json_format_renders_object_per_line() {
    let s = setup();
    let path = s.dir.path().join("access.json");
    let entries = vec![file_entry(
        &path,
        json!({ "json_format": { "method": "%METHOD%", "status": "%STATUS%" } }),
    )];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    pipeline_log(&pipeline, &health_check());

    let lines = read_lines(&s.manager, &path);
    assert_eq!(lines.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).expect("valid json line");
    assert_eq!(parsed, json!({ "method": "GET", "status": "200" }));
}

#[test]
fn zero_percent_sampling_writes_nothing() {
    let s = setup();
    let path = s.dir.path().join("sampled.log");
    let entries = vec![
        file_entry(&path, json!({ "format": "%STATUS%" }))
            .with_filter(extension_filter("crosslog.filters.sampling", json!({ "percent": 0 }))),
    ];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    let record = health_check();
    for _ in 0..1000 {
        pipeline_log(&pipeline, &record);
    }

    assert!(read_lines(&s.manager, &path).is_empty());
}

struct NeverFilter;

impl ExtensionFilter for NeverFilter {
    fn evaluate(&self, _context: &LogContext<'_>) -> bool {
        false
    }
}

struct NeverFilterFactory;

impl ExtensionFilterFactory for NeverFilterFactory {
    fn name(&self) -> &str {
        "test.never"
    }

    fn create_filter(
        &self,
        _config: &ExtensionFilterConfig,
        _runtime: &Arc<dyn RuntimeLoader>,
        _random: &Arc<dyn RandomGenerator>,
        _validation: &dyn ValidationVisitor,
    ) -> Result<ExtensionFilterPtr, AccessLogError> {
        Ok(Box::new(NeverFilter))
    }
}

#[test]
fn rejecting_filter_leaves_destination_untouched() {
    let s = setup();
    s.registry
        .register_filter_extension_factory(Arc::new(NeverFilterFactory))
        .expect("register test filter");

    let path = s.dir.path().join("never.log");
    let entries = vec![file_entry(&path, json!({})).with_filter(AccessLogFilterConfig::extension(
        ExtensionFilterConfig {
            name: "drop-everything".to_owned(),
            type_id: Some("test.never".to_owned()),
            typed_config: json!({}),
        },
    ))];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    for _ in 0..100 {
        pipeline_log(&pipeline, &health_check());
    }

    assert!(read_lines(&s.manager, &path).is_empty());
}

#[test]
fn sinks_on_same_path_share_one_handle() {
    let s = setup();
    let path = s.dir.path().join("shared.log");
    let entries = vec![
        file_entry(&path, json!({ "format": "a %STATUS%" })),
        file_entry(&path, json!({ "format": "b %STATUS%" })),
    ];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    pipeline_log(&pipeline, &health_check());

    assert_eq!(s.manager.open_count(), 1);
    assert_eq!(read_lines(&s.manager, &path), vec!["a 200", "b 200"]);
}

#[test]
fn every_nth_filter_is_exact_under_concurrency() {
    let s = setup();
    let path = s.dir.path().join("nth.log");
    let entries = vec![
        file_entry(&path, json!({ "format": "%STATUS%" }))
            .with_filter(extension_filter("crosslog.filters.every_nth", json!({ "n": 4 }))),
    ];
    let pipeline = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("pipeline should build");

    let record = health_check();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..125 {
                    pipeline_log(&pipeline, &record);
                }
            });
        }
    });

    // 1000번 호출 중 ceil(1000 / 4)
    let lines = read_lines(&s.manager, &path);
    assert_eq!(lines.len(), 250);
    assert!(lines.iter().all(|line| line == "200"));
}

// ─── 검증 모드 ───────────────────────────────────────────────────────

#[test]
fn unknown_sink_field_depends_on_validation_mode() {
    let s = setup();
    let entries = vec![file_entry(
        &s.dir.path().join("a.log"),
        json!({ "rotate_size_mb": 100 }),
    )];

    let strict = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry);
    assert!(matches!(
        strict.err().map(|e| e.root().to_string()),
        Some(msg) if msg.contains("rotate_size_mb")
    ));

    let lenient = s
        .context
        .clone()
        .with_validation(Arc::new(WarningValidationVisitor));
    let pipeline = build_pipeline(&entries, &lenient, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("warn mode accepts unknown fields");
    assert_eq!(pipeline.len(), 1);
}

#[test]
fn unknown_filter_field_depends_on_validation_mode() {
    let s = setup();
    let entries = vec![file_entry(&s.dir.path().join("a.log"), json!({})).with_filter(
        extension_filter(
            "crosslog.filters.sampling",
            json!({ "percent": 100, "extra": true }),
        ),
    )];

    let strict = build_pipeline(&entries, &s.context, KV_FORMATTER_NAMESPACE, &s.registry);
    assert!(matches!(
        strict.err().as_ref().map(AccessLogError::root),
        Some(AccessLogError::InvalidFilterConfig { .. })
    ));

    let lenient = s
        .context
        .clone()
        .with_validation(Arc::new(WarningValidationVisitor));
    let pipeline = build_pipeline(&entries, &lenient, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect("warn mode accepts unknown filter fields");
    assert_eq!(pipeline.len(), 1);
}

// ─── 리로드 ──────────────────────────────────────────────────────────

#[test]
fn failed_reload_keeps_previous_pipeline() {
    let s = setup();
    let path = s.dir.path().join("reload.log");
    let good = vec![file_entry(&path, json!({ "format": "%STATUS%" }))];
    let handle = PipelineHandle::new(
        build_pipeline(&good, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
            .expect("initial pipeline should build"),
    );

    let broken = vec![
        file_entry(&s.dir.path().join("new.log"), json!({})),
        AccessLogConfig::new("crosslog.access_loggers.kafka", json!({})),
    ];
    let err = handle
        .reload(&broken, &s.context, KV_FORMATTER_NAMESPACE, &s.registry)
        .expect_err("broken reload should fail");
    assert!(matches!(err, AccessLogError::Entry { index: 1, .. }));

    handle.log(&LogContext::new(&health_check()));
    assert_eq!(read_lines(&s.manager, &path), vec!["200"]);
    assert_eq!(handle.load().len(), 1);
}

#[test]
fn successful_reload_switches_destination() {
    let s = setup();
    let old_path = s.dir.path().join("old.log");
    let new_path = s.dir.path().join("new.log");
    let handle = PipelineHandle::new(
        build_pipeline(
            &[file_entry(&old_path, json!({ "format": "%METHOD%" }))],
            &s.context,
            KV_FORMATTER_NAMESPACE,
            &s.registry,
        )
        .expect("initial pipeline should build"),
    );

    let sinks = handle
        .reload(
            &[file_entry(&new_path, json!({ "format": "%PATH%" }))],
            &s.context,
            KV_FORMATTER_NAMESPACE,
            &s.registry,
        )
        .expect("reload should succeed");
    assert_eq!(sinks, 1);

    handle.log(&LogContext::new(&health_check()));
    assert!(read_lines(&s.manager, &old_path).is_empty());
    assert_eq!(read_lines(&s.manager, &new_path), vec!["/health"]);
}

#[test]
fn reloads_release_handles_of_replaced_pipelines() {
    let s = setup();
    let handle = PipelineHandle::new(crosslog_access_log::AccessLogPipeline::empty());

    for i in 0..5 {
        let path = s.dir.path().join(format!("gen-{i}.log"));
        handle
            .reload(
                &[file_entry(&path, json!({}))],
                &s.context,
                KV_FORMATTER_NAMESPACE,
                &s.registry,
            )
            .expect("reload should succeed");
        assert_eq!(s.manager.open_count(), 1);
    }
}

// ─── 전역 레지스트리 ────────────────────────────────────────────────

#[test]
#[serial_test::serial]
fn ensure_builtin_extensions_is_idempotent() {
    let first = ensure_builtin_extensions().expect("first call registers");
    let second = ensure_builtin_extensions().expect("second call is a no-op");

    assert!(std::ptr::eq(first, second));
    assert!(first.contains(ExtensionRole::SinkInstance, FILE_ACCESS_LOG_NAME));
    assert_eq!(
        first.registered_names(ExtensionRole::FilterExtension).len(),
        2
    );
}

#[test]
#[serial_test::serial]
fn ensure_builtin_extensions_recovers_after_clear() {
    let global = ensure_builtin_extensions().expect("registers");
    global.clear();
    assert!(!global.contains(ExtensionRole::Formatter, KV_FORMATTER_NAMESPACE));

    ensure_builtin_extensions().expect("re-registers after clear");
    assert!(global.contains(ExtensionRole::Formatter, KV_FORMATTER_NAMESPACE));
}

fn pipeline_log(pipeline: &crosslog_access_log::AccessLogPipeline, record: &KeyValueRecord) {
    use crosslog_core::AccessLogInstance;
    pipeline.log(&LogContext::new(record));
}
