#![doc = include_str!("../README.md")]

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod instance;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod runtime;
pub mod validation;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{AccessLogError, ConfigError, CrosslogError};

// 설정
pub use config::{
    AccessLogConfig, AccessLogFilterConfig, CrosslogConfig, ExtensionFilterConfig,
    FilterSpecifier, ValidationMode,
};

// 컨텍스트
pub use context::LogContext;

// 확장 포인트 trait
pub use filter::{ExtensionFilter, ExtensionFilterFactory, ExtensionFilterPtr};
pub use formatter::{
    CachingFormatterFactory, FormatSpec, Formatter, FormatterFactory, FormatterSharedPtr,
};
pub use instance::{
    AccessLogInstance, AccessLogInstanceFactory, FactoryContext, InstanceSharedPtr, TypedConfig,
};

// 외부 협력자
pub use manager::{AccessLogFile, AccessLogFileSharedPtr, AccessLogManager, FileDestination};
pub use runtime::{RandomGenerator, RuntimeLoader, StaticRuntime, UuidRandomGenerator};
pub use validation::{
    ConfigScope, StrictValidationVisitor, ValidationVisitor, WarningValidationVisitor,
};

// 레지스트리
pub use registry::{ExtensionRole, Registry};
