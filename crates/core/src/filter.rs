//! 필터 확장 포인트: 트랜잭션 단위 기록 여부 판단
//!
//! 필터는 싱크 하나가 독점 소유하며 여러 트랜잭션에서 동시에 평가됩니다.
//! 샘플링 카운터 같은 내부 상태는 원자 연산이나 잠금으로 갱신해야 합니다.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ExtensionFilterConfig;
use crate::context::LogContext;
use crate::error::AccessLogError;
use crate::runtime::{RandomGenerator, RuntimeLoader};
use crate::validation::{ConfigScope, ValidationVisitor, translate_value};

/// 액세스 로그 필터
pub trait ExtensionFilter: Send + Sync {
    /// 이 트랜잭션을 기록해야 하면 `true`를 반환합니다.
    ///
    /// 컨텍스트를 변경해서는 안 되며, 자기 내부 상태 외의 부수 효과가 없어야 합니다.
    fn evaluate(&self, context: &LogContext<'_>) -> bool;
}

/// 싱크가 독점 소유하는 필터 포인터
pub type ExtensionFilterPtr = Box<dyn ExtensionFilter>;

/// 필터 확장 팩토리
///
/// 레지스트리의 `filter-extension` 역할에 자기 [`name`](Self::name)으로 등록됩니다.
pub trait ExtensionFilterFactory: Send + Sync {
    /// 확장 타입 식별자
    fn name(&self) -> &str;

    /// 설정에서 필터를 생성합니다.
    ///
    /// 필터가 평가 시점에 런타임/난수를 참조해야 하면 핸들을 복제해 보관합니다.
    /// `typed_config`의 알 수 없는 필드는 `validation`이 처리합니다.
    /// 설정을 받아들일 수 없으면 `InvalidFilterConfig`를 반환합니다.
    fn create_filter(
        &self,
        config: &ExtensionFilterConfig,
        runtime: &Arc<dyn RuntimeLoader>,
        random: &Arc<dyn RandomGenerator>,
        validation: &dyn ValidationVisitor,
    ) -> Result<ExtensionFilterPtr, AccessLogError>;
}

/// 필터 확장의 `typed_config`를 구체 설정 타입으로 변환합니다.
///
/// 알 수 없는 필드는 `ConfigScope::Filter` 범위로 방문자에게 보고됩니다.
pub fn parse_filter_config<T: DeserializeOwned + Serialize>(
    config: &ExtensionFilterConfig,
    validation: &dyn ValidationVisitor,
) -> Result<T, AccessLogError> {
    let scope = ConfigScope::Filter(config.name.clone());
    translate_value(&config.typed_config, &scope, validation)
}
