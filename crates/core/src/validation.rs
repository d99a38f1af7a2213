//! 설정 검증 방문자: 알 수 없는/여분의 설정 필드 처리 정책
//!
//! 정적 설정(시작 시 로드)은 [`StrictValidationVisitor`]로 여분 필드를
//! 거부하고, 동적 설정(리로드)은 [`WarningValidationVisitor`]로 경고만
//! 남기는 식으로 사용합니다.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::AccessLogError;
use crate::metrics::{ACCESS_LOG_UNKNOWN_FIELDS_TOTAL, LABEL_EXTENSION};

/// 검증 대상 설정의 범위 (에러 종류를 결정)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    /// 싱크 설정 (`InvalidSinkConfig`)
    Sink(String),
    /// 필터 확장 설정 (`InvalidFilterConfig`)
    Filter(String),
}

impl ConfigScope {
    /// 확장 이름
    pub fn name(&self) -> &str {
        match self {
            Self::Sink(name) | Self::Filter(name) => name,
        }
    }

    /// 이 범위에 맞는 설정 거부 에러를 만듭니다.
    pub fn reject(&self, reason: impl Into<String>) -> AccessLogError {
        match self {
            Self::Sink(name) => AccessLogError::InvalidSinkConfig {
                name: name.clone(),
                reason: reason.into(),
            },
            Self::Filter(name) => AccessLogError::InvalidFilterConfig {
                name: name.clone(),
                reason: reason.into(),
            },
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sink(name) => write!(f, "sink '{name}'"),
            Self::Filter(name) => write!(f, "filter '{name}'"),
        }
    }
}

/// 알 수 없는 설정 필드를 만났을 때의 정책
pub trait ValidationVisitor: Send + Sync {
    /// `field`가 `scope` 설정의 스키마에 없을 때 호출됩니다.
    fn on_unknown_field(&self, scope: &ConfigScope, field: &str) -> Result<(), AccessLogError>;
}

/// 알 수 없는 필드를 거부하는 방문자
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictValidationVisitor;

impl ValidationVisitor for StrictValidationVisitor {
    fn on_unknown_field(&self, scope: &ConfigScope, field: &str) -> Result<(), AccessLogError> {
        Err(scope.reject(format!("unknown field '{field}'")))
    }
}

/// 알 수 없는 필드를 경고로만 남기는 방문자
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningValidationVisitor;

impl ValidationVisitor for WarningValidationVisitor {
    fn on_unknown_field(&self, scope: &ConfigScope, field: &str) -> Result<(), AccessLogError> {
        warn!(%scope, field, "ignoring unknown config field");
        metrics::counter!(
            ACCESS_LOG_UNKNOWN_FIELDS_TOTAL,
            LABEL_EXTENSION => scope.name().to_owned()
        )
        .increment(1);
        Ok(())
    }
}

/// `raw`의 최상위 키 중 `known`에 없는 키마다 방문자를 호출합니다.
///
/// `known`은 역직렬화된 설정을 다시 직렬화한 값이므로 스키마의 모든
/// 필드를 키로 가집니다.
pub fn check_unknown_fields(
    raw: &Value,
    known: &Value,
    scope: &ConfigScope,
    visitor: &dyn ValidationVisitor,
) -> Result<(), AccessLogError> {
    let (Some(raw), Some(known)) = (raw.as_object(), known.as_object()) else {
        return Ok(());
    };
    for field in raw.keys() {
        if !known.contains_key(field) {
            visitor.on_unknown_field(scope, field)?;
        }
    }
    Ok(())
}

/// 원시 설정을 `T`로 변환하고 알 수 없는 필드를 방문자에게 보고합니다.
///
/// `null`은 빈 객체로 취급합니다. 싱크와 필터 설정 모두 이 경로를 거칩니다.
pub fn translate_value<T>(
    raw: &Value,
    scope: &ConfigScope,
    visitor: &dyn ValidationVisitor,
) -> Result<T, AccessLogError>
where
    T: DeserializeOwned + Serialize,
{
    let raw = if raw.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        raw.clone()
    };
    if !raw.is_object() {
        return Err(scope.reject("typed_config must be a table"));
    }

    let typed: T = serde_json::from_value(raw.clone()).map_err(|e| scope.reject(e.to_string()))?;
    let known = serde_json::to_value(&typed).map_err(|e| scope.reject(e.to_string()))?;
    check_unknown_fields(&raw, &known, scope, visitor)?;
    Ok(typed)
}
