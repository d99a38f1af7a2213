#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`assembler`]: 설정 항목을 싱크로 조립 (formatter → sink → filter → config → instance)
//! - [`pipeline`]: 싱크 팬아웃 및 `ArcSwap` 기반 원자적 교체
//! - [`file`]: 파일 싱크 (필터 → 포맷 → 쓰기)
//! - [`manager`]: 경로별 파일 핸들 중복 제거 및 버퍼링
//! - [`filters`]: 내장 필터 확장 (샘플링, N번째마다)
//! - [`formatter`]: 키-값 레코드 포매터
//! - [`builtin`]: 내장 확장 레지스트리 등록

pub mod assembler;
pub mod builtin;
pub mod file;
pub mod filters;
pub mod formatter;
pub mod manager;
pub mod pipeline;

// --- 주요 타입 re-export ---

// 조립기
pub use assembler::{AccessLogFactory, ExtensionAccessLogFilterFactory, build_pipeline};

// 파이프라인
pub use pipeline::{AccessLogPipeline, PipelineHandle};

// 파일 싱크
pub use file::{FILE_ACCESS_LOG_NAME, FileAccessLog, FileAccessLogConfig, FileAccessLogFactory};

// 파일 핸들 관리자
pub use manager::FileAccessLogManager;

// 필터
pub use filters::{EveryNthFilterFactory, SamplingFilterFactory};

// 포매터
pub use formatter::{KV_FORMATTER_NAMESPACE, KeyValueFormatterFactory, KeyValueRecord};

// 내장 확장 등록
pub use builtin::{ensure_builtin_extensions, register_builtin_extensions};
