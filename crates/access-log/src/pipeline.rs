//! 액세스 로그 파이프라인: 싱크 팬아웃과 원자적 교체
//!
//! 트래픽 경로는 [`PipelineHandle::log`]로 현재 게시된 파이프라인을 읽기만 하고,
//! 리로드는 새 파이프라인을 완전히 조립한 뒤에만 포인터를 교체합니다.
//! 교체 이전에 시작된 `log()` 호출은 이전 파이프라인으로 끝까지 진행됩니다.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crosslog_core::config::AccessLogConfig;
use crosslog_core::context::LogContext;
use crosslog_core::error::AccessLogError;
use crosslog_core::instance::{AccessLogInstance, FactoryContext, InstanceSharedPtr};
use crosslog_core::metrics as m;
use crosslog_core::registry::Registry;

use crate::assembler::build_pipeline;

/// 조립이 끝난 싱크 목록
///
/// 설정 순서대로 각 싱크에 같은 컨텍스트를 전달합니다.
#[derive(Clone, Default)]
pub struct AccessLogPipeline {
    instances: Vec<InstanceSharedPtr>,
}

impl AccessLogPipeline {
    pub fn new(instances: Vec<InstanceSharedPtr>) -> Self {
        Self { instances }
    }

    /// 싱크가 없는 파이프라인
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[InstanceSharedPtr] {
        &self.instances
    }
}

impl AccessLogInstance for AccessLogPipeline {
    fn log(&self, context: &LogContext<'_>) {
        for instance in &self.instances {
            instance.log(context);
        }
    }
}

/// 현재 게시된 파이프라인에 대한 공유 핸들
///
/// 읽기는 잠금 없이 `ArcSwap`에서 스냅샷을 얻습니다.
pub struct PipelineHandle {
    current: ArcSwap<AccessLogPipeline>,
}

impl PipelineHandle {
    pub fn new(pipeline: AccessLogPipeline) -> Self {
        metrics::gauge!(m::ACCESS_LOG_PIPELINE_SINKS).set(pipeline.len() as f64);
        Self {
            current: ArcSwap::from_pointee(pipeline),
        }
    }

    /// 현재 파이프라인 스냅샷
    pub fn load(&self) -> Arc<AccessLogPipeline> {
        self.current.load_full()
    }

    /// 현재 파이프라인으로 레코드를 기록합니다.
    pub fn log(&self, context: &LogContext<'_>) {
        self.current.load().log(context);
    }

    /// 새 파이프라인을 게시하고 이전 파이프라인을 반환합니다.
    pub fn publish(&self, pipeline: AccessLogPipeline) -> Arc<AccessLogPipeline> {
        let sinks = pipeline.len();
        let previous = self.current.swap(Arc::new(pipeline));
        metrics::gauge!(m::ACCESS_LOG_PIPELINE_SINKS).set(sinks as f64);
        info!(sinks, previous_sinks = previous.len(), "published access log pipeline");
        previous
    }

    /// 설정으로 새 파이프라인을 조립해 게시합니다.
    ///
    /// 조립이 실패하면 아무것도 바꾸지 않고 에러를 반환합니다.
    /// 성공하면 게시된 싱크 수를 반환합니다.
    pub fn reload(
        &self,
        entries: &[AccessLogConfig],
        context: &FactoryContext,
        formatter_namespace: &str,
        registry: &Registry,
    ) -> Result<usize, AccessLogError> {
        let pipeline = build_pipeline(entries, context, formatter_namespace, registry)
            .inspect_err(|e| warn!(error = %e, "access log reload failed, keeping current pipeline"))?;
        let sinks = pipeline.len();
        self.publish(pipeline);
        Ok(sinks)
    }
}

impl Default for PipelineHandle {
    fn default() -> Self {
        Self::new(AccessLogPipeline::empty())
    }
}
