//! 런타임 플래그 평가기와 난수 소스
//!
//! 둘 다 필터 팩토리만 소비하는 외부 협력자입니다. 기본 구현으로
//! 설정에서 읽은 정적 스냅샷([`StaticRuntime`])과 OS 난수 기반
//! 생성기([`UuidRandomGenerator`])를 제공합니다.

use std::collections::HashMap;

/// 런타임 기능 플래그 / 정수 값 조회
pub trait RuntimeLoader: Send + Sync {
    /// `key`의 정수 값을 반환합니다. 없으면 `default`.
    fn get_integer(&self, key: &str, default: u64) -> u64;

    /// 백분율 기반 기능 플래그를 평가합니다.
    ///
    /// `key`의 값(없으면 `default_percent`)을 백분율로 보고
    /// `random_value % 100 < percent`이면 활성으로 판단합니다.
    fn feature_enabled(&self, key: &str, default_percent: u64, random_value: u64) -> bool {
        let percent = self.get_integer(key, default_percent).min(100);
        random_value % 100 < percent
    }
}

/// 난수 소스
pub trait RandomGenerator: Send + Sync {
    /// 64비트 난수
    fn random(&self) -> u64;
}

/// 불변 런타임 스냅샷
///
/// 시작 시 설정 파일의 `[runtime]` 테이블에서 만들어지며 이후 변경되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct StaticRuntime {
    values: HashMap<String, u64>,
}

impl StaticRuntime {
    /// 빈 스냅샷을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 키/값 목록으로 스냅샷을 생성합니다.
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// 등록된 키 개수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 스냅샷이 비었는지 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl RuntimeLoader for StaticRuntime {
    fn get_integer(&self, key: &str, default: u64) -> u64 {
        self.values.get(key).copied().unwrap_or(default)
    }
}

/// `uuid` v4 비트를 이용한 난수 생성기 (OS 난수 기반)
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRandomGenerator;

impl RandomGenerator for UuidRandomGenerator {
    fn random(&self) -> u64 {
        let (high, low) = uuid::Uuid::new_v4().as_u64_pair();
        high ^ low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_runtime_returns_default_for_missing_key() {
        let runtime = StaticRuntime::new();
        assert_eq!(runtime.get_integer("access_log.sample", 7), 7);
        assert!(runtime.is_empty());
    }

    #[test]
    fn static_runtime_overrides_default() {
        let runtime = StaticRuntime::from_values([("access_log.sample", 25u64)]);
        assert_eq!(runtime.get_integer("access_log.sample", 100), 25);
        assert_eq!(runtime.len(), 1);
    }

    #[test]
    fn feature_enabled_respects_percent() {
        let runtime = StaticRuntime::from_values([("half", 50u64), ("none", 0u64)]);
        assert!(runtime.feature_enabled("half", 0, 149));
        assert!(!runtime.feature_enabled("half", 0, 150));
        assert!(!runtime.feature_enabled("none", 100, 0));
        // 키가 없으면 기본 백분율 사용
        assert!(runtime.feature_enabled("missing", 100, 99));
    }

    #[test]
    fn feature_enabled_clamps_percent_above_hundred() {
        let runtime = StaticRuntime::from_values([("over", 250u64)]);
        assert!(runtime.feature_enabled("over", 0, 99));
    }

    #[test]
    fn uuid_random_generator_produces_distinct_values() {
        let random = UuidRandomGenerator;
        let values: std::collections::HashSet<u64> = (0..64).map(|_| random.random()).collect();
        assert_eq!(values.len(), 64);
    }
}
