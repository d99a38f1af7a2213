//! 싱크("instance") 확장 포인트: 필터 적용, 포맷, 영속화
//!
//! 프로토콜 모듈이 트랜잭션마다 호출하는 유일한 진입점은
//! [`AccessLogInstance::log`]입니다.
//!
//! # 조립 계약
//! ```text
//! raw typed_config ──translate_config──▶ TypedConfig ──create_instance──▶ InstanceSharedPtr
//!                       (검증/변환)            (filter + formatter factory 주입)
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::LogContext;
use crate::error::AccessLogError;
use crate::filter::ExtensionFilterPtr;
use crate::formatter::FormatterFactory;
use crate::manager::AccessLogManager;
use crate::runtime::{RandomGenerator, RuntimeLoader, StaticRuntime, UuidRandomGenerator};
use crate::validation::{ConfigScope, StrictValidationVisitor, ValidationVisitor, translate_value};

/// 로그 싱크
pub trait AccessLogInstance: Send + Sync {
    /// 트랜잭션 하나를 기록합니다.
    ///
    /// 순서: 필터 평가 → 포맷 → 쓰기. 필터가 거부하면 부수 효과 없이 반환합니다.
    /// 쓰기 실패는 호출자에게 전파하지 않습니다.
    fn log(&self, context: &LogContext<'_>);
}

/// 싱크 공유 포인터
pub type InstanceSharedPtr = Arc<dyn AccessLogInstance>;

/// 검증을 마친 싱크별 설정 값 (타입 소거)
pub struct TypedConfig {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl TypedConfig {
    /// 이미 구체 타입으로 만들어진 설정을 감쌉니다.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 원시 설정을 `T`로 변환하고 알 수 없는 필드를 방문자에게 보고합니다.
    ///
    /// `null`은 빈 객체로 취급합니다.
    pub fn translate<T>(
        raw: &Value,
        scope: &ConfigScope,
        visitor: &dyn ValidationVisitor,
    ) -> Result<Self, AccessLogError>
    where
        T: DeserializeOwned + Serialize + Any + Send,
    {
        translate_value::<T>(raw, scope, visitor).map(Self::new)
    }

    /// 기대하는 설정 타입으로 꺼냅니다. 타입이 다르면 `InvalidSinkConfig`입니다.
    pub fn downcast<T: Any>(self, factory: &str) -> Result<T, AccessLogError> {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| AccessLogError::InvalidSinkConfig {
                name: factory.to_owned(),
                reason: format!(
                    "expected config of type {}, got {}",
                    std::any::type_name::<T>(),
                    type_name
                ),
            })
    }

    /// 담긴 설정의 타입 이름
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for TypedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedConfig")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 싱크/필터 팩토리에 주입되는 외부 협력자 묶음
#[derive(Clone)]
pub struct FactoryContext {
    runtime: Arc<dyn RuntimeLoader>,
    random: Arc<dyn RandomGenerator>,
    access_log_manager: Arc<dyn AccessLogManager>,
    validation: Arc<dyn ValidationVisitor>,
}

impl FactoryContext {
    /// 파일 핸들 관리자로 컨텍스트를 생성합니다.
    ///
    /// 기본값: 빈 런타임 스냅샷, OS 난수, 엄격한 검증.
    pub fn new(access_log_manager: Arc<dyn AccessLogManager>) -> Self {
        Self {
            runtime: Arc::new(StaticRuntime::new()),
            random: Arc::new(UuidRandomGenerator),
            access_log_manager,
            validation: Arc::new(StrictValidationVisitor),
        }
    }

    /// 런타임 평가기를 교체합니다.
    pub fn with_runtime(mut self, runtime: Arc<dyn RuntimeLoader>) -> Self {
        self.runtime = runtime;
        self
    }

    /// 난수 소스를 교체합니다.
    pub fn with_random(mut self, random: Arc<dyn RandomGenerator>) -> Self {
        self.random = random;
        self
    }

    /// 검증 방문자를 교체합니다.
    pub fn with_validation(mut self, validation: Arc<dyn ValidationVisitor>) -> Self {
        self.validation = validation;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn RuntimeLoader> {
        &self.runtime
    }

    pub fn random(&self) -> &Arc<dyn RandomGenerator> {
        &self.random
    }

    pub fn access_log_manager(&self) -> &dyn AccessLogManager {
        self.access_log_manager.as_ref()
    }

    pub fn validation(&self) -> &dyn ValidationVisitor {
        self.validation.as_ref()
    }
}

/// 싱크 팩토리
///
/// 레지스트리의 `sink-instance` 역할에 자기 [`name`](Self::name)으로 등록됩니다.
pub trait AccessLogInstanceFactory: Send + Sync {
    /// 싱크 종류 이름
    fn name(&self) -> &str;

    /// 원시 `typed_config`를 이 싱크가 기대하는 설정 형태로 검증/변환합니다.
    fn translate_config(
        &self,
        raw: &Value,
        validation: &dyn ValidationVisitor,
    ) -> Result<TypedConfig, AccessLogError>;

    /// 검증된 설정, 필터, 포매터 팩토리로 완성된 싱크를 만듭니다.
    ///
    /// 포매터 생성 모드는 팩토리가 자기 설정 형태에서 선택합니다.
    fn create_instance(
        &self,
        config: TypedConfig,
        filter: Option<ExtensionFilterPtr>,
        context: &FactoryContext,
        formatter_factory: &dyn FormatterFactory,
    ) -> Result<InstanceSharedPtr, AccessLogError>;
}
