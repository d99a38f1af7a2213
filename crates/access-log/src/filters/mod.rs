//! 내장 필터 확장
//!
//! | 타입 식별자 | 동작 |
//! |-------------|------|
//! | `crosslog.filters.sampling` | 백분율 샘플링 (런타임 키로 재정의 가능) |
//! | `crosslog.filters.every_nth` | N번째 호출마다 하나씩 통과 |
//!
//! `typed_config`에 정의되지 않은 필드는 `access_log.validation` 모드에 따라
//! 거부되거나 경고로 남습니다.

mod every_nth;
mod sampling;

pub use every_nth::{EVERY_NTH_FILTER_NAME, EveryNthFilter, EveryNthFilterConfig, EveryNthFilterFactory};
pub use sampling::{SAMPLING_FILTER_NAME, SamplingFilter, SamplingFilterConfig, SamplingFilterFactory};
