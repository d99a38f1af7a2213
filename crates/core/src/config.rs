//! 설정 관리: crosslog.toml 파싱 및 액세스 로그 설정 모델
//!
//! [`CrosslogConfig`]는 최상위 설정 구조체이고, 파이프라인 조립기가
//! 소비하는 단위는 [`AccessLogConfig`] 엔트리 하나입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`CROSSLOG_GENERAL_LOG_LEVEL=debug` 형식)
//! 2. 설정 파일 (`crosslog.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 예시
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [runtime]
//! "access_log.sample_percent" = 10
//!
//! [access_log]
//! formatter_namespace = "crosslog.formatters.kv"
//!
//! [[access_log.entries]]
//! name = "crosslog.access_loggers.file"
//! typed_config = { path = "/var/log/access.log", format = "%METHOD% %PATH% %STATUS%" }
//! filter = { extension_filter = { name = "crosslog.filters.sampling", typed_config = { percent = 50 } } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ConfigError, CrosslogError};

/// 기본 포매터 네임스페이스
pub const DEFAULT_FORMATTER_NAMESPACE: &str = "crosslog.formatters.kv";

/// 필터 설정 테이블에서 확장 필터 variant의 키
pub const EXTENSION_FILTER_KEY: &str = "extension_filter";

/// crosslog 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrosslogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 런타임 정수 값 (필터 팩토리가 참조)
    #[serde(default)]
    pub runtime: BTreeMap<String, u64>,
    /// 액세스 로그 설정
    #[serde(default)]
    pub access_log: AccessLogSection,
}

impl CrosslogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CrosslogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CrosslogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CrosslogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CrosslogError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CrosslogError> {
        toml::from_str(toml_str).map_err(|e| {
            CrosslogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CROSSLOG_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "CROSSLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CROSSLOG_GENERAL_LOG_FORMAT");
        override_string(
            &mut self.access_log.formatter_namespace,
            "CROSSLOG_ACCESS_LOG_FORMATTER_NAMESPACE",
        );
        if let Ok(val) = std::env::var("CROSSLOG_ACCESS_LOG_VALIDATION") {
            match val.as_str() {
                "strict" => self.access_log.validation = ValidationMode::Strict,
                "warn" => self.access_log.validation = ValidationMode::Warn,
                _ => warn!(
                    env_key = "CROSSLOG_ACCESS_LOG_VALIDATION",
                    value = val.as_str(),
                    "unknown validation mode in env var, ignoring"
                ),
            }
        }
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 확장 이름의 존재 여부나 `typed_config`의 형태는 여기서 보지 않습니다.
    /// 그것은 파이프라인 조립 단계의 책임입니다.
    pub fn validate(&self) -> Result<(), CrosslogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.access_log.formatter_namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "access_log.formatter_namespace".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        for (index, entry) in self.access_log.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("access_log.entries[{index}].name"),
                    reason: "sink name must not be empty".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 알 수 없는 설정 필드 처리 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// 거부 (기본값)
    #[default]
    Strict,
    /// 경고 후 무시
    Warn,
}

/// `[access_log]` 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessLogSection {
    /// 모든 엔트리가 사용할 포매터 네임스페이스
    pub formatter_namespace: String,
    /// 알 수 없는 설정 필드 처리 모드
    pub validation: ValidationMode,
    /// 싱크 엔트리 목록
    pub entries: Vec<AccessLogConfig>,
}

impl Default for AccessLogSection {
    fn default() -> Self {
        Self {
            formatter_namespace: DEFAULT_FORMATTER_NAMESPACE.to_owned(),
            validation: ValidationMode::Strict,
            entries: Vec::new(),
        }
    }
}

/// 싱크 엔트리 하나의 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogConfig {
    /// 싱크 종류 이름 (레지스트리 `sink-instance` 키)
    pub name: String,
    /// 선택적 필터 설정
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<AccessLogFilterConfig>,
    /// 싱크별 설정 페이로드 (싱크 팩토리가 해석)
    #[serde(default = "empty_table")]
    pub typed_config: Value,
}

impl AccessLogConfig {
    /// 필터 없는 엔트리를 생성합니다.
    pub fn new(name: impl Into<String>, typed_config: Value) -> Self {
        Self {
            name: name.into(),
            filter: None,
            typed_config,
        }
    }

    /// 필터를 지정합니다.
    pub fn with_filter(mut self, filter: AccessLogFilterConfig) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// 필터 설정 (tagged union)
///
/// 설정 테이블의 유일한 키가 variant를 결정합니다.
/// 알 수 없는 키나 빈 테이블도 파싱은 성공하며, 조립 단계에서
/// `CorruptConfiguration`으로 거부됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct AccessLogFilterConfig {
    /// 필터 판별자
    pub specifier: FilterSpecifier,
}

impl AccessLogFilterConfig {
    /// 확장 필터 설정을 생성합니다.
    pub fn extension(config: ExtensionFilterConfig) -> Self {
        Self {
            specifier: FilterSpecifier::ExtensionFilter(config),
        }
    }
}

/// 필터 판별자
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpecifier {
    /// 확장 필터 (이 계층에서 지원하는 유일한 variant)
    ExtensionFilter(ExtensionFilterConfig),
    /// 알 수 없는 variant 키
    Unrecognized(String),
    /// variant가 설정되지 않음
    NotSet,
}

impl FilterSpecifier {
    /// 판별자 이름 (진단용)
    pub fn kind(&self) -> &str {
        match self {
            Self::ExtensionFilter(_) => EXTENSION_FILTER_KEY,
            Self::Unrecognized(kind) => kind,
            Self::NotSet => "<not set>",
        }
    }
}

impl TryFrom<Map<String, Value>> for AccessLogFilterConfig {
    type Error = String;

    fn try_from(mut table: Map<String, Value>) -> Result<Self, Self::Error> {
        if table.len() > 1 {
            let keys: Vec<&str> = table.keys().map(String::as_str).collect();
            return Err(format!(
                "filter must set exactly one specifier, found: {}",
                keys.join(", ")
            ));
        }

        let specifier = match table.remove(EXTENSION_FILTER_KEY) {
            Some(value) => FilterSpecifier::ExtensionFilter(
                serde_json::from_value(value).map_err(|e| format!("{EXTENSION_FILTER_KEY}: {e}"))?,
            ),
            None => match table.keys().next() {
                Some(kind) => FilterSpecifier::Unrecognized(kind.clone()),
                None => FilterSpecifier::NotSet,
            },
        };

        Ok(Self { specifier })
    }
}

impl From<AccessLogFilterConfig> for Map<String, Value> {
    fn from(config: AccessLogFilterConfig) -> Self {
        let mut table = Map::new();
        match config.specifier {
            FilterSpecifier::ExtensionFilter(ext) => {
                let mut body = Map::new();
                body.insert("name".to_owned(), Value::String(ext.name));
                if let Some(type_id) = ext.type_id {
                    body.insert("type".to_owned(), Value::String(type_id));
                }
                body.insert("typed_config".to_owned(), ext.typed_config);
                table.insert(EXTENSION_FILTER_KEY.to_owned(), Value::Object(body));
            }
            FilterSpecifier::Unrecognized(kind) => {
                table.insert(kind, empty_table());
            }
            FilterSpecifier::NotSet => {}
        }
        table
    }
}

/// 확장 필터 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionFilterConfig {
    /// 확장 이름
    pub name: String,
    /// 확장 타입 식별자 (없으면 `name`으로 조회)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    /// 확장별 설정 페이로드
    #[serde(default = "empty_table")]
    pub typed_config: Value,
}

impl ExtensionFilterConfig {
    /// 레지스트리 조회에 쓸 타입 식별자
    pub fn resolved_type(&self) -> &str {
        self.type_id.as_deref().unwrap_or(&self.name)
    }
}

fn empty_table() -> Value {
    Value::Object(Map::new())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}
