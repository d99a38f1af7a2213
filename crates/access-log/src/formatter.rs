//! 키-값 레코드 포매터 (`crosslog.formatters.kv`)
//!
//! 컨텍스트가 [`KeyValueRecord`]인 프로토콜을 위한 포매터 네임스페이스입니다.
//!
//! # 템플릿 문법
//! - `%NAME%`: 레코드 필드 `name` 값 (대소문자 무시). 없으면 `-`
//! - `%%`: 리터럴 `%`
//! - 그 외 문자는 그대로 출력, 닫히지 않은 `%`도 리터럴
//!
//! 빈 텍스트 템플릿은 모든 필드를 `key=value` 형태로 공백 구분해 출력합니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crosslog_core::context::LogContext;
use crosslog_core::error::AccessLogError;
use crosslog_core::formatter::{Formatter, FormatterFactory, FormatterSharedPtr};

/// 키-값 포매터 네임스페이스
pub const KV_FORMATTER_NAMESPACE: &str = "crosslog.formatters.kv";

/// 필드 값이 없을 때의 자리표시자
const MISSING_VALUE: &str = "-";

// ─── 레코드 ──────────────────────────────────────────────────────────

/// 문자열 필드로 이루어진 트랜잭션 레코드
///
/// 필드 이름은 소문자로 정규화되어 저장됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValueRecord {
    fields: BTreeMap<String, String>,
}

impl KeyValueRecord {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드를 추가한 레코드를 반환합니다 (빌더).
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// 필드를 추가하거나 덮어씁니다.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.fields
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// 필드 값을 조회합니다 (대소문자 무시).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// JSON 객체에서 레코드를 만듭니다.
    ///
    /// 문자열은 그대로, `null`은 건너뛰고, 나머지 값은 JSON 표기로 저장합니다.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut record = Self::new();
        for (key, value) in object {
            match value {
                Value::Null => {}
                Value::String(s) => record.insert(key, s.clone()),
                other => record.insert(key, other.to_string()),
            }
        }
        record
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 필드를 이름 순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for KeyValueRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

// ─── 템플릿 ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// 조립 시점에 한 번 파싱되는 템플릿
#[derive(Debug, Clone)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(start) = rest.find('%') {
            literal.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            if let Some(stripped) = after.strip_prefix('%') {
                literal.push('%');
                rest = stripped;
                continue;
            }

            match after.find('%') {
                Some(end) if is_field_name(&after[..end]) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(after[..end].to_ascii_lowercase()));
                    rest = &after[end + 1..];
                }
                _ => {
                    literal.push('%');
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    fn render(&self, record: Option<&KeyValueRecord>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => out.push_str(
                    record
                        .and_then(|r| r.get(name))
                        .filter(|v| !v.is_empty())
                        .unwrap_or(MISSING_VALUE),
                ),
            }
        }
        out
    }
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

// ─── 포매터 ──────────────────────────────────────────────────────────

/// 텍스트 템플릿 포매터
pub struct KeyValueTextFormatter {
    template: Option<Template>,
}

impl Formatter for KeyValueTextFormatter {
    fn format(&self, context: &LogContext<'_>) -> String {
        let record = context.downcast_ref::<KeyValueRecord>();
        match &self.template {
            Some(template) => template.render(record),
            None => record
                .map(|r| {
                    r.iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_else(|| MISSING_VALUE.to_owned()),
        }
    }
}

/// 구조화(JSON) 포매터
pub struct KeyValueJsonFormatter {
    fields: Vec<(String, Template)>,
}

impl Formatter for KeyValueJsonFormatter {
    fn format(&self, context: &LogContext<'_>) -> String {
        let record = context.downcast_ref::<KeyValueRecord>();
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(key, template)| (key.clone(), Value::String(template.render(record))))
            .collect();
        Value::Object(object).to_string()
    }
}

/// [`KV_FORMATTER_NAMESPACE`] 포매터 팩토리
pub struct KeyValueFormatterFactory;

impl FormatterFactory for KeyValueFormatterFactory {
    fn name(&self) -> &str {
        KV_FORMATTER_NAMESPACE
    }

    fn create_text_formatter(&self, template: &str) -> Result<FormatterSharedPtr, AccessLogError> {
        let template = (!template.is_empty()).then(|| Template::parse(template));
        Ok(Arc::new(KeyValueTextFormatter { template }))
    }

    fn create_json_formatter(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<FormatterSharedPtr, AccessLogError> {
        if let Some(key) = fields.keys().find(|k| k.is_empty()) {
            return Err(AccessLogError::InvalidFormatSpec {
                field: format!("json_format.{key}"),
                reason: "output field name must not be empty".to_owned(),
            });
        }
        let fields = fields
            .iter()
            .map(|(key, template)| (key.clone(), Template::parse(template)))
            .collect();
        Ok(Arc::new(KeyValueJsonFormatter { fields }))
    }
}
