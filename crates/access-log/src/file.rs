//! 파일 싱크 (`crosslog.access_loggers.file`)
//!
//! 레코드 하나당 한 줄을 공유 파일 핸들에 씁니다.
//!
//! # 설정
//! ```toml
//! [[access_log.entries]]
//! name = "crosslog.access_loggers.file"
//! typed_config = { path = "/var/log/crosslog/access.log", format = "%METHOD% %PATH% %STATUS%" }
//! ```
//!
//! `format`과 `json_format`이 모두 있으면 `format`(텍스트)이 우선하고,
//! 둘 다 없으면 포매터 네임스페이스의 기본 형식을 씁니다.

use std::sync::Arc;

use metrics::Counter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crosslog_core::context::LogContext;
use crosslog_core::error::AccessLogError;
use crosslog_core::filter::ExtensionFilterPtr;
use crosslog_core::formatter::{FormatSpec, FormatterFactory, FormatterSharedPtr};
use crosslog_core::instance::{
    AccessLogInstance, AccessLogInstanceFactory, FactoryContext, InstanceSharedPtr, TypedConfig,
};
use crosslog_core::manager::{AccessLogFileSharedPtr, AccessLogManager, FileDestination};
use crosslog_core::metrics as m;
use crosslog_core::validation::{ConfigScope, ValidationVisitor};

/// 파일 싱크 이름
pub const FILE_ACCESS_LOG_NAME: &str = "crosslog.access_loggers.file";

/// 파일 싱크 설정
///
/// 알 수 없는 키는 검증 방문자가 처리합니다 (엄격 모드에서는 에러).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAccessLogConfig {
    /// 출력 경로 (`/dev/stdout`, `/dev/stderr` 허용)
    pub path: String,
    /// 텍스트 템플릿
    #[serde(default)]
    pub format: Option<String>,
    /// 출력 필드명 → 템플릿 (문자열 값만 허용)
    #[serde(default)]
    pub json_format: Option<Map<String, Value>>,
}

impl FileAccessLogConfig {
    fn validate(&self) -> Result<(), AccessLogError> {
        if self.path.trim().is_empty() {
            return Err(AccessLogError::InvalidSinkConfig {
                name: FILE_ACCESS_LOG_NAME.to_owned(),
                reason: "path must not be empty".to_owned(),
            });
        }
        Ok(())
    }

    /// 포맷 필드에서 포맷 명세를 결정합니다.
    pub fn format_spec(&self) -> Result<FormatSpec, AccessLogError> {
        FormatSpec::from_parts(self.format.as_deref(), self.json_format.as_ref())
    }
}

/// 파일 싱크
///
/// 필터는 이 싱크가 독점 소유하고, 포매터와 파일 핸들은 다른 싱크와
/// 공유될 수 있습니다.
pub struct FileAccessLog {
    destination: FileDestination,
    filter: Option<ExtensionFilterPtr>,
    formatter: FormatterSharedPtr,
    log_file: AccessLogFileSharedPtr,
    written: Counter,
    write_failures: Counter,
}

impl FileAccessLog {
    /// 관리자에서 출력 대상 핸들을 얻어 싱크를 생성합니다.
    pub fn new(
        destination: FileDestination,
        filter: Option<ExtensionFilterPtr>,
        formatter: FormatterSharedPtr,
        manager: &dyn AccessLogManager,
    ) -> Result<Self, AccessLogError> {
        let log_file = manager.create_access_log(&destination)?;
        let label = destination.path.display().to_string();
        Ok(Self {
            written: metrics::counter!(m::ACCESS_LOG_RECORDS_WRITTEN_TOTAL, m::LABEL_PATH => label.clone()),
            write_failures: metrics::counter!(m::ACCESS_LOG_WRITE_FAILURES_TOTAL, m::LABEL_PATH => label),
            destination,
            filter,
            formatter,
            log_file,
        })
    }

    /// 출력 대상
    pub fn destination(&self) -> &FileDestination {
        &self.destination
    }

    /// 이 싱크가 쓰는 포매터
    pub fn formatter(&self) -> &FormatterSharedPtr {
        &self.formatter
    }

    /// 이 싱크가 쓰는 파일 핸들
    pub fn log_file(&self) -> &AccessLogFileSharedPtr {
        &self.log_file
    }
}

impl AccessLogInstance for FileAccessLog {
    fn log(&self, context: &LogContext<'_>) {
        if let Some(filter) = &self.filter {
            if !filter.evaluate(context) {
                return;
            }
        }

        let mut line = self.formatter.format(context);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        match self.log_file.write(&line) {
            Ok(()) => self.written.increment(1),
            Err(e) => {
                self.write_failures.increment(1);
                warn!(destination = %self.destination, error = %e, "failed to write access log record");
            }
        }
    }
}

/// [`FileAccessLog`] 팩토리
pub struct FileAccessLogFactory;

impl AccessLogInstanceFactory for FileAccessLogFactory {
    fn name(&self) -> &str {
        FILE_ACCESS_LOG_NAME
    }

    fn translate_config(
        &self,
        raw: &Value,
        validation: &dyn ValidationVisitor,
    ) -> Result<TypedConfig, AccessLogError> {
        let scope = ConfigScope::Sink(FILE_ACCESS_LOG_NAME.to_owned());
        let typed = TypedConfig::translate::<FileAccessLogConfig>(raw, &scope, validation)?;
        Ok(typed)
    }

    fn create_instance(
        &self,
        config: TypedConfig,
        filter: Option<ExtensionFilterPtr>,
        context: &FactoryContext,
        formatter_factory: &dyn FormatterFactory,
    ) -> Result<InstanceSharedPtr, AccessLogError> {
        let config: FileAccessLogConfig = config.downcast(FILE_ACCESS_LOG_NAME)?;
        config.validate()?;

        let spec = config.format_spec()?;
        let formatter = formatter_factory.create_formatter(&spec)?;
        let destination = FileDestination::from_path(&config.path);
        debug!(%destination, namespace = formatter_factory.name(), "creating file access log");

        let sink = FileAccessLog::new(destination, filter, formatter, context.access_log_manager())?;
        Ok(Arc::new(sink))
    }
}
