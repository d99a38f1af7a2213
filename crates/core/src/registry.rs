//! 확장 레지스트리: (역할, 이름) → 팩토리 조회 테이블
//!
//! 독립적으로 컴파일된 확장 모듈들이 프로세스 시작 시 자기 팩토리를
//! 등록하고, 이후 조립기는 읽기만 합니다.
//!
//! # 역할
//! | 역할 | 팩토리 trait |
//! |------|--------------|
//! | `sink-instance` | [`AccessLogInstanceFactory`] |
//! | `formatter` | [`FormatterFactory`] |
//! | `filter-extension` | [`ExtensionFilterFactory`] |
//!
//! # 사용 예시
//! ```ignore
//! let registry = Registry::new();
//! registry.register_sink_factory(Arc::new(FileAccessLogFactory))?;
//! let factory = registry.resolve_sink_factory("crosslog.access_loggers.file")?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AccessLogError;
use crate::filter::ExtensionFilterFactory;
use crate::formatter::FormatterFactory;
use crate::instance::AccessLogInstanceFactory;

/// 레지스트리 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionRole {
    /// 싱크 팩토리
    SinkInstance,
    /// 포매터 팩토리 (네임스페이스)
    Formatter,
    /// 필터 확장 팩토리
    FilterExtension,
}

impl ExtensionRole {
    /// 모든 역할 (표시 순서)
    pub const ALL: [ExtensionRole; 3] = [
        ExtensionRole::SinkInstance,
        ExtensionRole::Formatter,
        ExtensionRole::FilterExtension,
    ];
}

impl fmt::Display for ExtensionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinkInstance => write!(f, "sink-instance"),
            Self::Formatter => write!(f, "formatter"),
            Self::FilterExtension => write!(f, "filter-extension"),
        }
    }
}

/// 역할 하나의 이름 → 팩토리 테이블
struct FactoryTable<F: ?Sized> {
    role: ExtensionRole,
    entries: RwLock<HashMap<String, Arc<F>>>,
}

impl<F: ?Sized> FactoryTable<F> {
    fn new(role: ExtensionRole) -> Self {
        Self {
            role,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn register(&self, name: &str, factory: Arc<F>) -> Result<(), AccessLogError> {
        // 테이블은 추가만 되므로 poison 이후에도 내용은 일관적
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(AccessLogError::DuplicateExtension {
                role: self.role,
                name: name.to_owned(),
            });
        }
        entries.insert(name.to_owned(), factory);
        debug!(role = %self.role, name, "registered extension factory");
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Arc<F>, AccessLogError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| AccessLogError::UnknownExtension {
                role: self.role,
                name: name.to_owned(),
            })
    }

    fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// 확장 레지스트리
///
/// 시작 시 한 번 채워지고 이후에는 읽기 전용으로 쓰입니다.
/// 같은 (역할, 이름)의 중복 등록은 `DuplicateExtension` 에러입니다.
pub struct Registry {
    sinks: FactoryTable<dyn AccessLogInstanceFactory>,
    formatters: FactoryTable<dyn FormatterFactory>,
    filters: FactoryTable<dyn ExtensionFilterFactory>,
}

impl Registry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self {
            sinks: FactoryTable::new(ExtensionRole::SinkInstance),
            formatters: FactoryTable::new(ExtensionRole::Formatter),
            filters: FactoryTable::new(ExtensionRole::FilterExtension),
        }
    }

    /// 싱크 팩토리를 자기 이름으로 등록합니다.
    pub fn register_sink_factory(
        &self,
        factory: Arc<dyn AccessLogInstanceFactory>,
    ) -> Result<(), AccessLogError> {
        let name = factory.name().to_owned();
        self.sinks.register(&name, factory)
    }

    /// 포매터 팩토리를 자기 네임스페이스로 등록합니다.
    pub fn register_formatter_factory(
        &self,
        factory: Arc<dyn FormatterFactory>,
    ) -> Result<(), AccessLogError> {
        let name = factory.name().to_owned();
        self.formatters.register(&name, factory)
    }

    /// 필터 확장 팩토리를 자기 타입 식별자로 등록합니다.
    pub fn register_filter_extension_factory(
        &self,
        factory: Arc<dyn ExtensionFilterFactory>,
    ) -> Result<(), AccessLogError> {
        let name = factory.name().to_owned();
        self.filters.register(&name, factory)
    }

    /// 싱크 종류 이름으로 팩토리를 조회합니다.
    pub fn resolve_sink_factory(
        &self,
        name: &str,
    ) -> Result<Arc<dyn AccessLogInstanceFactory>, AccessLogError> {
        self.sinks.resolve(name)
    }

    /// 네임스페이스로 포매터 팩토리를 조회합니다.
    pub fn resolve_formatter_factory(
        &self,
        namespace: &str,
    ) -> Result<Arc<dyn FormatterFactory>, AccessLogError> {
        self.formatters.resolve(namespace)
    }

    /// 타입 식별자로 필터 확장 팩토리를 조회합니다.
    pub fn resolve_filter_extension_factory(
        &self,
        type_id: &str,
    ) -> Result<Arc<dyn ExtensionFilterFactory>, AccessLogError> {
        self.filters.resolve(type_id)
    }

    /// 해당 역할에 이름이 등록되어 있는지 확인합니다.
    pub fn contains(&self, role: ExtensionRole, name: &str) -> bool {
        match role {
            ExtensionRole::SinkInstance => self.sinks.contains(name),
            ExtensionRole::Formatter => self.formatters.contains(name),
            ExtensionRole::FilterExtension => self.filters.contains(name),
        }
    }

    /// 해당 역할에 등록된 이름 목록 (정렬됨)
    pub fn registered_names(&self, role: ExtensionRole) -> Vec<String> {
        match role {
            ExtensionRole::SinkInstance => self.sinks.names(),
            ExtensionRole::Formatter => self.formatters.names(),
            ExtensionRole::FilterExtension => self.filters.names(),
        }
    }

    /// 모든 등록을 지웁니다. 테스트 하네스 전용입니다.
    #[doc(hidden)]
    pub fn clear(&self) {
        self.sinks.clear();
        self.formatters.clear();
        self.filters.clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// 프로세스 전역 레지스트리
pub fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::new)
}
