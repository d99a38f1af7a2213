//! 내장 확장 등록

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crosslog_core::error::AccessLogError;
use crosslog_core::registry::{self, ExtensionRole, Registry};

use crate::file::{FILE_ACCESS_LOG_NAME, FileAccessLogFactory};
use crate::filters::{EveryNthFilterFactory, SamplingFilterFactory};
use crate::formatter::KeyValueFormatterFactory;

/// 파일 싱크, 내장 필터, 키-값 포매터를 레지스트리에 등록합니다.
///
/// 이미 같은 이름이 등록되어 있으면 `DuplicateExtension`입니다.
pub fn register_builtin_extensions(registry: &Registry) -> Result<(), AccessLogError> {
    registry.register_sink_factory(Arc::new(FileAccessLogFactory))?;
    registry.register_formatter_factory(Arc::new(KeyValueFormatterFactory))?;
    registry.register_filter_extension_factory(Arc::new(SamplingFilterFactory))?;
    registry.register_filter_extension_factory(Arc::new(EveryNthFilterFactory))?;
    debug!("registered builtin access log extensions");
    Ok(())
}

/// 전역 레지스트리에 내장 확장이 등록되어 있도록 보장합니다.
///
/// 여러 번 호출해도 안전합니다. 파일 싱크가 이미 있으면 아무것도 하지 않습니다.
pub fn ensure_builtin_extensions() -> Result<&'static Registry, AccessLogError> {
    static INIT: Mutex<()> = Mutex::new(());

    let global = registry::global();
    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if !global.contains(ExtensionRole::SinkInstance, FILE_ACCESS_LOG_NAME) {
        register_builtin_extensions(global)?;
    }
    Ok(global)
}
