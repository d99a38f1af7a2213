//! 에러 타입: 도메인별 에러 정의
//!
//! 설정/조립 단계의 에러는 모두 [`AccessLogError`]로 표현되며 호출자에게
//! 동기적으로 전파됩니다. 반면 `log()` 경로의 쓰기 실패는 이 분류에 속하지
//! 않습니다. 싱크가 흡수하고 메트릭으로만 관찰할 수 있습니다.

use crate::registry::ExtensionRole;

/// crosslog 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CrosslogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 액세스 로그 파이프라인 조립 에러
    #[error("access log error: {0}")]
    AccessLog(#[from] AccessLogError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 파일 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 액세스 로그 확장 해석 및 파이프라인 조립 에러
#[derive(Debug, thiserror::Error)]
pub enum AccessLogError {
    /// 레지스트리에 등록되지 않은 확장
    #[error("unknown {role} extension '{name}'")]
    UnknownExtension { role: ExtensionRole, name: String },

    /// 같은 (role, name)으로 두 번 등록됨
    #[error("duplicate {role} extension '{name}'")]
    DuplicateExtension { role: ExtensionRole, name: String },

    /// 필터 설정 거부
    #[error("invalid filter config for '{name}': {reason}")]
    InvalidFilterConfig { name: String, reason: String },

    /// 싱크 설정 거부 (형태 불일치, 알 수 없는 필드 등)
    #[error("invalid sink config for '{name}': {reason}")]
    InvalidSinkConfig { name: String, reason: String },

    /// 포맷 명세 거부
    #[error("invalid format spec at '{field}': {reason}")]
    InvalidFormatSpec { field: String, reason: String },

    /// tagged union 판별자가 알려진 variant 집합 밖에 있음
    ///
    /// 사용자 입력 오류가 아니라 배포/프로그래밍 결함으로 취급합니다.
    #[error("corrupt configuration at '{field}': {reason}")]
    CorruptConfiguration { field: String, reason: String },

    /// 특정 설정 엔트리 조립 실패 (원인 에러를 감쌈)
    #[error("access_log entry #{index} ('{name}'): {source}")]
    Entry {
        /// 설정 목록 내 엔트리 위치 (0부터)
        index: usize,
        /// 엔트리의 싱크 이름
        name: String,
        /// 원인 에러
        #[source]
        source: Box<AccessLogError>,
    },

    /// I/O 에러 (로그 파일 열기 실패 등)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AccessLogError {
    /// 엔트리 정보를 덧붙여 에러를 감쌉니다.
    pub fn in_entry(self, index: usize, name: impl Into<String>) -> Self {
        Self::Entry {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// `Entry` 래퍼를 벗긴 원인 에러를 반환합니다.
    pub fn root(&self) -> &AccessLogError {
        match self {
            Self::Entry { source, .. } => source.root(),
            other => other,
        }
    }

    /// 시작(또는 리로드)을 중단시켜야 하는 에러인지 여부
    pub fn is_fatal(&self) -> bool {
        !matches!(self.root(), Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_display_names_role_and_name() {
        let err = AccessLogError::UnknownExtension {
            role: ExtensionRole::SinkInstance,
            name: "crosslog.access_loggers.kafka".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sink-instance"));
        assert!(msg.contains("kafka"));
    }

    #[test]
    fn entry_wrapper_reports_index_and_root() {
        let err = AccessLogError::InvalidFormatSpec {
            field: "json_format.status".to_owned(),
            reason: "only string values are supported".to_owned(),
        }
        .in_entry(2, "crosslog.access_loggers.file");

        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("json_format.status"));
        assert!(matches!(
            err.root(),
            AccessLogError::InvalidFormatSpec { .. }
        ));
    }

    #[test]
    fn io_error_is_not_fatal() {
        let err: AccessLogError = std::io::Error::other("disk full").into();
        assert!(!err.is_fatal());

        let err = AccessLogError::CorruptConfiguration {
            field: "filter".to_owned(),
            reason: "no filter specifier set".to_owned(),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn converts_to_crosslog_error() {
        let err = AccessLogError::InvalidSinkConfig {
            name: "file".to_owned(),
            reason: "path must not be empty".to_owned(),
        };
        let top: CrosslogError = err.into();
        assert!(matches!(top, CrosslogError::AccessLog(_)));
    }
}
