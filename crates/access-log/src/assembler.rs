//! 액세스 로그 조립기: 설정 항목을 동작하는 싱크로 변환
//!
//! # 조립 순서 (항목 하나)
//! 1. 포매터 네임스페이스로 포매터 팩토리 조회
//! 2. 싱크 이름으로 싱크 팩토리 조회
//! 3. 필터가 있으면 필터 확장 생성
//! 4. `typed_config`를 싱크 설정 형태로 변환/검증
//! 5. 싱크 생성 (필터, 포매터 팩토리 주입)
//!
//! 어느 단계든 실패하면 에러를 그대로 반환합니다. 조립은 시작/리로드
//! 시점에만 동기적으로 실행되며 트래픽 경로와 겹치지 않습니다.
//!
//! [`build_pipeline`]은 모든 항목의 2~4단계를 먼저 끝낸 뒤에야 5단계를
//! 시작합니다. 뒤쪽 항목의 설정 오류는 어떤 싱크도 만들기 전에 드러납니다.

use std::sync::Arc;

use tracing::{debug, info};

use crosslog_core::config::{AccessLogConfig, AccessLogFilterConfig, FilterSpecifier};
use crosslog_core::error::AccessLogError;
use crosslog_core::filter::ExtensionFilterPtr;
use crosslog_core::formatter::{CachingFormatterFactory, FormatterFactory};
use crosslog_core::instance::{
    AccessLogInstanceFactory, FactoryContext, InstanceSharedPtr, TypedConfig,
};
use crosslog_core::metrics as m;
use crosslog_core::registry::Registry;
use crosslog_core::runtime::{RandomGenerator, RuntimeLoader};
use crosslog_core::validation::ValidationVisitor;

use crate::pipeline::AccessLogPipeline;

/// 싱크 조립기
pub struct AccessLogFactory;

impl AccessLogFactory {
    /// 설정 항목 하나로 싱크를 만듭니다.
    ///
    /// # Errors
    /// - 포매터 네임스페이스/싱크 이름/필터 타입 미등록: `UnknownExtension`
    /// - 필터 판별자 누락/미지원: `CorruptConfiguration`
    /// - 필터/싱크 설정 불일치: `InvalidFilterConfig` / `InvalidSinkConfig`
    /// - 포맷 명세 오류: `InvalidFormatSpec`
    pub fn from_config(
        config: &AccessLogConfig,
        context: &FactoryContext,
        formatter_namespace: &str,
        registry: &Registry,
    ) -> Result<InstanceSharedPtr, AccessLogError> {
        let formatter_factory = registry.resolve_formatter_factory(formatter_namespace)?;
        debug!(namespace = formatter_namespace, "resolved formatter factory");
        Self::from_config_with_formatter(config, context, formatter_factory.as_ref(), registry)
    }

    /// 이미 조회한 포매터 팩토리로 2~5단계를 수행합니다.
    pub fn from_config_with_formatter(
        config: &AccessLogConfig,
        context: &FactoryContext,
        formatter_factory: &dyn FormatterFactory,
        registry: &Registry,
    ) -> Result<InstanceSharedPtr, AccessLogError> {
        Self::prepare(config, context, registry)?.create(context, formatter_factory)
    }

    /// 2~4단계: 싱크 팩토리 조회, 필터 생성, 설정 변환
    fn prepare<'a>(
        config: &'a AccessLogConfig,
        context: &FactoryContext,
        registry: &Registry,
    ) -> Result<PreparedEntry<'a>, AccessLogError> {
        let sink_factory = registry.resolve_sink_factory(&config.name)?;
        debug!(sink = %config.name, "resolved sink factory");

        let filter = config
            .filter
            .as_ref()
            .map(|filter| {
                ExtensionAccessLogFilterFactory::from_config(
                    filter,
                    context.runtime(),
                    context.random(),
                    context.validation(),
                    registry,
                )
            })
            .transpose()?;

        let typed = sink_factory.translate_config(&config.typed_config, context.validation())?;
        debug!(sink = %config.name, config_type = typed.type_name(), "translated sink config");

        Ok(PreparedEntry {
            config,
            sink_factory,
            filter,
            typed,
        })
    }
}

/// 싱크 생성만 남은 설정 항목
struct PreparedEntry<'a> {
    config: &'a AccessLogConfig,
    sink_factory: Arc<dyn AccessLogInstanceFactory>,
    filter: Option<ExtensionFilterPtr>,
    typed: TypedConfig,
}

impl PreparedEntry<'_> {
    /// 5단계: 싱크 생성
    fn create(
        self,
        context: &FactoryContext,
        formatter_factory: &dyn FormatterFactory,
    ) -> Result<InstanceSharedPtr, AccessLogError> {
        let instance =
            self.sink_factory
                .create_instance(self.typed, self.filter, context, formatter_factory)?;
        debug!(sink = %self.config.name, "created access log instance");
        Ok(instance)
    }
}

/// 필터 조립기
pub struct ExtensionAccessLogFilterFactory;

impl ExtensionAccessLogFilterFactory {
    /// 필터 설정의 판별자에 따라 필터를 만듭니다.
    ///
    /// 판별자가 없거나 알 수 없으면 설정 손상으로 보고 실패합니다.
    /// 모두 통과시키는 필터로 대체하지 않습니다.
    pub fn from_config(
        config: &AccessLogFilterConfig,
        runtime: &Arc<dyn RuntimeLoader>,
        random: &Arc<dyn RandomGenerator>,
        validation: &dyn ValidationVisitor,
        registry: &Registry,
    ) -> Result<ExtensionFilterPtr, AccessLogError> {
        match &config.specifier {
            FilterSpecifier::ExtensionFilter(extension) => {
                if extension.name.trim().is_empty() {
                    return Err(AccessLogError::InvalidFilterConfig {
                        name: extension.name.clone(),
                        reason: "extension filter name must not be empty".to_owned(),
                    });
                }

                let type_id = extension.resolved_type();
                let factory = registry.resolve_filter_extension_factory(type_id)?;
                debug!(filter = %extension.name, type_id, "resolved filter extension factory");
                factory.create_filter(extension, runtime, random, validation)
            }
            FilterSpecifier::Unrecognized(kind) => Err(AccessLogError::CorruptConfiguration {
                field: "filter".to_owned(),
                reason: format!("unsupported filter specifier '{kind}'"),
            }),
            FilterSpecifier::NotSet => Err(AccessLogError::CorruptConfiguration {
                field: "filter".to_owned(),
                reason: "filter specifier not set".to_owned(),
            }),
        }
    }
}

/// 설정 항목 목록 전체를 새 파이프라인으로 조립합니다.
///
/// 포매터 팩토리는 한 번만 조회하고, 같은 포맷 명세를 쓰는 싱크들은
/// 이번 조립 동안 하나의 포매터를 공유합니다. 모든 항목의 설정 검증이
/// 끝난 뒤에 싱크를 만들며, 첫 실패에서 중단합니다. 에러는 항목 위치와
/// 싱크 이름으로 감싸집니다.
pub fn build_pipeline(
    entries: &[AccessLogConfig],
    context: &FactoryContext,
    formatter_namespace: &str,
    registry: &Registry,
) -> Result<AccessLogPipeline, AccessLogError> {
    let result = assemble_entries(entries, context, formatter_namespace, registry);
    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!(m::ACCESS_LOG_PIPELINE_BUILDS_TOTAL, m::LABEL_RESULT => outcome).increment(1);
    result
}

fn assemble_entries(
    entries: &[AccessLogConfig],
    context: &FactoryContext,
    formatter_namespace: &str,
    registry: &Registry,
) -> Result<AccessLogPipeline, AccessLogError> {
    let formatter_factory = CachingFormatterFactory::new(
        registry.resolve_formatter_factory(formatter_namespace)?,
    );

    let prepared = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            AccessLogFactory::prepare(entry, context, registry)
                .map_err(|e| e.in_entry(index, entry.name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut instances = Vec::with_capacity(prepared.len());
    for (index, entry) in prepared.into_iter().enumerate() {
        let name = entry.config.name.clone();
        let instance = entry
            .create(context, &formatter_factory)
            .map_err(|e| e.in_entry(index, name))?;
        instances.push(instance);
    }

    info!(
        sinks = instances.len(),
        formatters = formatter_factory.cached_count(),
        namespace = formatter_namespace,
        "access log pipeline assembled"
    );
    Ok(AccessLogPipeline::new(instances))
}
