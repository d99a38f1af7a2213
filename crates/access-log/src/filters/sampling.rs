//! 백분율 샘플링 필터

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crosslog_core::config::ExtensionFilterConfig;
use crosslog_core::context::LogContext;
use crosslog_core::error::AccessLogError;
use crosslog_core::filter::{
    ExtensionFilter, ExtensionFilterFactory, ExtensionFilterPtr, parse_filter_config,
};
use crosslog_core::runtime::{RandomGenerator, RuntimeLoader};
use crosslog_core::validation::ValidationVisitor;

/// 샘플링 필터 타입 식별자
pub const SAMPLING_FILTER_NAME: &str = "crosslog.filters.sampling";

/// 샘플링 필터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingFilterConfig {
    /// 통과 비율 (0..=100)
    pub percent: u64,
    /// 설정되면 런타임 값이 `percent`를 재정의
    #[serde(default)]
    pub runtime_key: Option<String>,
}

/// 백분율 샘플링 필터
///
/// 평가마다 난수를 하나 뽑아 `random % 100 < percent`이면 통과시킵니다.
pub struct SamplingFilter {
    percent: u64,
    runtime_key: Option<String>,
    runtime: Arc<dyn RuntimeLoader>,
    random: Arc<dyn RandomGenerator>,
}

impl SamplingFilter {
    pub fn new(
        config: SamplingFilterConfig,
        runtime: Arc<dyn RuntimeLoader>,
        random: Arc<dyn RandomGenerator>,
    ) -> Self {
        Self {
            percent: config.percent,
            runtime_key: config.runtime_key,
            runtime,
            random,
        }
    }
}

impl ExtensionFilter for SamplingFilter {
    fn evaluate(&self, _context: &LogContext<'_>) -> bool {
        let value = self.random.random();
        match &self.runtime_key {
            Some(key) => self.runtime.feature_enabled(key, self.percent, value),
            None => value % 100 < self.percent,
        }
    }
}

/// [`SamplingFilter`] 팩토리
pub struct SamplingFilterFactory;

impl ExtensionFilterFactory for SamplingFilterFactory {
    fn name(&self) -> &str {
        SAMPLING_FILTER_NAME
    }

    fn create_filter(
        &self,
        config: &ExtensionFilterConfig,
        runtime: &Arc<dyn RuntimeLoader>,
        random: &Arc<dyn RandomGenerator>,
        validation: &dyn ValidationVisitor,
    ) -> Result<ExtensionFilterPtr, AccessLogError> {
        let parsed: SamplingFilterConfig = parse_filter_config(config, validation)?;
        if parsed.percent > 100 {
            return Err(AccessLogError::InvalidFilterConfig {
                name: config.name.clone(),
                reason: format!("percent must be within 0..=100, got {}", parsed.percent),
            });
        }
        if parsed.runtime_key.as_deref() == Some("") {
            return Err(AccessLogError::InvalidFilterConfig {
                name: config.name.clone(),
                reason: "runtime_key must not be empty".to_owned(),
            });
        }

        Ok(Box::new(SamplingFilter::new(
            parsed,
            Arc::clone(runtime),
            Arc::clone(random),
        )))
    }
}
