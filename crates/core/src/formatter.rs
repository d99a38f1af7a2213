//! 포매터 확장 포인트: 트랜잭션 컨텍스트를 로그 라인으로 렌더링
//!
//! 포매터는 조립 시점에 고정된 포맷 명세([`FormatSpec`])로 만들어지며
//! 호출마다 바뀌는 가변 상태를 갖지 않습니다. 따라서 같은 명세로 설정된
//! 여러 싱크가 하나의 인스턴스를 공유할 수 있습니다.
//!
//! # 생성 모드
//! - [`FormatSpec::Text`]: 텍스트 템플릿
//! - [`FormatSpec::Json`]: 출력 필드명 → 템플릿 문자열 매핑 (구조화 출력)

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::LogContext;
use crate::error::AccessLogError;

/// 로그 포매터
pub trait Formatter: Send + Sync {
    /// 컨텍스트를 렌더링합니다.
    ///
    /// 실패하지 않습니다. 누락되거나 형식이 잘못된 필드는 구현체의
    /// 자리표시자로 대체됩니다.
    fn format(&self, context: &LogContext<'_>) -> String;
}

/// 여러 싱크가 공유할 수 있는 포매터 포인터
pub type FormatterSharedPtr = Arc<dyn Formatter>;

/// 포맷 명세
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatSpec {
    /// 텍스트 템플릿 (빈 문자열이면 팩토리 기본 형식)
    Text(String),
    /// 출력 필드명 → 템플릿
    Json(BTreeMap<String, String>),
}

impl FormatSpec {
    /// 싱크 설정의 `format` / `json_format` 필드에서 명세를 결정합니다.
    ///
    /// 우선순위: `format`이 있으면 텍스트 모드(둘 다 있어도 텍스트가 우선),
    /// 그다음 `json_format`, 둘 다 없으면 빈 텍스트 템플릿입니다.
    /// `json_format`에 문자열이 아닌 값이 있으면 `InvalidFormatSpec`입니다.
    pub fn from_parts(
        format: Option<&str>,
        json_format: Option<&Map<String, Value>>,
    ) -> Result<Self, AccessLogError> {
        match (format, json_format) {
            (Some(text), json) => {
                if json.is_some() {
                    debug!("both format and json_format set, plain text format takes priority");
                }
                Ok(Self::Text(text.to_owned()))
            }
            (None, Some(json)) => Ok(Self::Json(json_format_to_map(json)?)),
            (None, None) => Ok(Self::Text(String::new())),
        }
    }
}

/// `json_format` 매핑을 문자열 템플릿 맵으로 변환합니다.
///
/// 문자열이 아닌 값은 강제 변환하지 않고 거부합니다.
pub fn json_format_to_map(
    json_format: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, AccessLogError> {
    let mut output = BTreeMap::new();
    for (key, value) in json_format {
        match value {
            Value::String(template) => {
                output.insert(key.clone(), template.clone());
            }
            other => {
                return Err(AccessLogError::InvalidFormatSpec {
                    field: format!("json_format.{key}"),
                    reason: format!(
                        "only string values are supported in the JSON access log format, got {}",
                        json_kind(other)
                    ),
                });
            }
        }
    }
    Ok(output)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 포매터 팩토리
///
/// 프로토콜 모듈 하나가 하나의 네임스페이스로 등록합니다. 그 프로토콜의
/// 컨텍스트 타입에서 필드를 꺼내는 방법은 이 팩토리가 만든 포매터만 압니다.
pub trait FormatterFactory: Send + Sync {
    /// 포매터 네임스페이스
    fn name(&self) -> &str;

    /// 텍스트 템플릿 포매터를 생성합니다.
    fn create_text_formatter(&self, template: &str) -> Result<FormatterSharedPtr, AccessLogError>;

    /// 구조화(JSON) 포매터를 생성합니다.
    fn create_json_formatter(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<FormatterSharedPtr, AccessLogError>;

    /// 명세 종류에 따라 생성 모드를 선택합니다.
    fn create_formatter(&self, spec: &FormatSpec) -> Result<FormatterSharedPtr, AccessLogError> {
        match spec {
            FormatSpec::Text(template) => self.create_text_formatter(template),
            FormatSpec::Json(fields) => self.create_json_formatter(fields),
        }
    }
}

/// 조립 1회 동안 같은 명세의 포매터를 재사용하는 팩토리 래퍼
pub struct CachingFormatterFactory {
    inner: Arc<dyn FormatterFactory>,
    cache: Mutex<HashMap<FormatSpec, FormatterSharedPtr>>,
}

impl CachingFormatterFactory {
    /// 팩토리를 감쌉니다.
    pub fn new(inner: Arc<dyn FormatterFactory>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 서로 다른 명세로 생성된 포매터 수
    pub fn cached_count(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn get_or_create(&self, spec: FormatSpec) -> Result<FormatterSharedPtr, AccessLogError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(formatter) = cache.get(&spec) {
            return Ok(Arc::clone(formatter));
        }
        let formatter = self.inner.create_formatter(&spec)?;
        cache.insert(spec, Arc::clone(&formatter));
        Ok(formatter)
    }
}

impl FormatterFactory for CachingFormatterFactory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn create_text_formatter(&self, template: &str) -> Result<FormatterSharedPtr, AccessLogError> {
        self.get_or_create(FormatSpec::Text(template.to_owned()))
    }

    fn create_json_formatter(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<FormatterSharedPtr, AccessLogError> {
        self.get_or_create(FormatSpec::Json(fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ConstFormatter(String);

    impl Formatter for ConstFormatter {
        fn format(&self, _context: &LogContext<'_>) -> String {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl FormatterFactory for CountingFactory {
        fn name(&self) -> &str {
            "test.counting"
        }

        fn create_text_formatter(
            &self,
            template: &str,
        ) -> Result<FormatterSharedPtr, AccessLogError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ConstFormatter(template.to_owned())))
        }

        fn create_json_formatter(
            &self,
            fields: &BTreeMap<String, String>,
        ) -> Result<FormatterSharedPtr, AccessLogError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ConstFormatter(format!("{} fields", fields.len()))))
        }
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn text_format_takes_priority_over_json() {
        let json = as_map(json!({"method": "%METHOD%"}));
        let spec = FormatSpec::from_parts(Some("%METHOD%"), Some(&json)).unwrap();
        assert_eq!(spec, FormatSpec::Text("%METHOD%".to_owned()));
    }

    #[test]
    fn json_format_used_when_text_absent() {
        let json = as_map(json!({"method": "%METHOD%", "status": "%STATUS%"}));
        let spec = FormatSpec::from_parts(None, Some(&json)).unwrap();
        let FormatSpec::Json(fields) = spec else {
            panic!("expected json spec");
        };
        assert_eq!(fields.get("status").map(String::as_str), Some("%STATUS%"));
    }

    #[test]
    fn neither_format_defaults_to_empty_text() {
        let spec = FormatSpec::from_parts(None, None).unwrap();
        assert_eq!(spec, FormatSpec::Text(String::new()));
    }

    #[test]
    fn non_string_json_value_is_rejected() {
        let json = as_map(json!({"method": "%METHOD%", "status": 200}));
        let err = FormatSpec::from_parts(None, Some(&json)).unwrap_err();
        assert!(matches!(err, AccessLogError::InvalidFormatSpec { .. }));
        assert!(err.to_string().contains("json_format.status"));
    }

    #[test]
    fn nested_json_value_is_rejected() {
        let json = as_map(json!({"upstream": {"host": "%UPSTREAM_HOST%"}}));
        let err = json_format_to_map(&json).unwrap_err();
        assert!(err.to_string().contains("object"));
    }

    #[test]
    fn caching_factory_shares_identical_specs() {
        let inner = Arc::new(CountingFactory::default());
        let caching = CachingFormatterFactory::new(inner.clone());

        let a = caching.create_text_formatter("%METHOD%").unwrap();
        let b = caching.create_text_formatter("%METHOD%").unwrap();
        let c = caching.create_text_formatter("%PATH%").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(inner.created.load(Ordering::SeqCst), 2);
        assert_eq!(caching.cached_count(), 2);
        assert_eq!(caching.name(), "test.counting");
    }
}
