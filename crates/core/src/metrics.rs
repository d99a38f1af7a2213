//! 메트릭 상수 및 설명 등록
//!
//! 액세스 로그 파이프라인의 진단 채널입니다. `log()` 경로의 쓰기 실패는
//! 호출자에게 전파되지 않으므로 여기 정의된 카운터로만 관찰할 수 있습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `crosslog_access_log_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(crosslog_core::metrics::ACCESS_LOG_WRITE_FAILURES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 로그 출력 경로 레이블 키
pub const LABEL_PATH: &str = "path";

/// 확장 이름 레이블 키 (싱크/필터 이름)
pub const LABEL_EXTENSION: &str = "extension";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Access Log 메트릭 ─────────────────────────────────────────────

/// 기록된 레코드 수 (counter, label: path)
pub const ACCESS_LOG_RECORDS_WRITTEN_TOTAL: &str = "crosslog_access_log_records_written_total";

/// 쓰기 실패 수 (counter, label: path)
pub const ACCESS_LOG_WRITE_FAILURES_TOTAL: &str = "crosslog_access_log_write_failures_total";

/// 파이프라인 조립 시도 수 (counter, label: result)
pub const ACCESS_LOG_PIPELINE_BUILDS_TOTAL: &str = "crosslog_access_log_pipeline_builds_total";

/// 현재 게시된 파이프라인의 싱크 수 (gauge)
pub const ACCESS_LOG_PIPELINE_SINKS: &str = "crosslog_access_log_pipeline_sinks";

/// 경고 모드에서 무시된 알 수 없는 설정 필드 수 (counter, label: extension)
pub const ACCESS_LOG_UNKNOWN_FIELDS_TOTAL: &str = "crosslog_access_log_unknown_fields_total";

/// 열린 로그 파일 핸들 수 (gauge)
pub const ACCESS_LOG_OPEN_FILES: &str = "crosslog_access_log_open_files";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        ACCESS_LOG_RECORDS_WRITTEN_TOTAL,
        "Access log records written to their destination"
    );
    describe_counter!(
        ACCESS_LOG_WRITE_FAILURES_TOTAL,
        "Access log writes that failed and were dropped"
    );
    describe_counter!(
        ACCESS_LOG_PIPELINE_BUILDS_TOTAL,
        "Access log pipeline assembly attempts by result"
    );
    describe_gauge!(
        ACCESS_LOG_PIPELINE_SINKS,
        "Number of sinks in the currently published access log pipeline"
    );
    describe_counter!(
        ACCESS_LOG_UNKNOWN_FIELDS_TOTAL,
        "Unknown configuration fields ignored under lenient validation"
    );
    describe_gauge!(
        ACCESS_LOG_OPEN_FILES,
        "Number of distinct access log destinations held open"
    );
}
