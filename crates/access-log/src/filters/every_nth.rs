//! N번째 호출마다 통과시키는 결정적 샘플링 필터

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crosslog_core::config::ExtensionFilterConfig;
use crosslog_core::context::LogContext;
use crosslog_core::error::AccessLogError;
use crosslog_core::filter::{
    ExtensionFilter, ExtensionFilterFactory, ExtensionFilterPtr, parse_filter_config,
};
use crosslog_core::runtime::{RandomGenerator, RuntimeLoader};
use crosslog_core::validation::ValidationVisitor;

/// every-nth 필터 타입 식별자
pub const EVERY_NTH_FILTER_NAME: &str = "crosslog.filters.every_nth";

/// every-nth 필터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EveryNthFilterConfig {
    /// 주기 (1 이상)
    pub n: u64,
}

/// 1번째, (n+1)번째, (2n+1)번째 ... 호출만 통과시키는 필터
///
/// 카운터는 원자적으로 증가하므로 동시 평가에서도 `k`번 호출 중
/// 정확히 `ceil(k / n)`번 통과합니다.
pub struct EveryNthFilter {
    n: NonZeroU64,
    calls: AtomicU64,
}

impl EveryNthFilter {
    pub fn new(n: NonZeroU64) -> Self {
        Self {
            n,
            calls: AtomicU64::new(0),
        }
    }
}

impl ExtensionFilter for EveryNthFilter {
    fn evaluate(&self, _context: &LogContext<'_>) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed) % self.n == 0
    }
}

/// [`EveryNthFilter`] 팩토리
pub struct EveryNthFilterFactory;

impl ExtensionFilterFactory for EveryNthFilterFactory {
    fn name(&self) -> &str {
        EVERY_NTH_FILTER_NAME
    }

    fn create_filter(
        &self,
        config: &ExtensionFilterConfig,
        _runtime: &Arc<dyn RuntimeLoader>,
        _random: &Arc<dyn RandomGenerator>,
        validation: &dyn ValidationVisitor,
    ) -> Result<ExtensionFilterPtr, AccessLogError> {
        let parsed: EveryNthFilterConfig = parse_filter_config(config, validation)?;
        let n = NonZeroU64::new(parsed.n).ok_or_else(|| AccessLogError::InvalidFilterConfig {
            name: config.name.clone(),
            reason: "n must be at least 1".to_owned(),
        })?;
        Ok(Box::new(EveryNthFilter::new(n)))
    }
}
