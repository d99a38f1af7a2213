//! 트랜잭션 컨텍스트: 프로토콜별 페이로드의 타입 소거 핸들
//!
//! 각 프로토콜 모듈(HTTP, RPC 계열 등)은 자기만의 구체 타입으로 트랜잭션을
//! 표현합니다. 파이프라인은 그 타입을 알지 못한 채 [`LogContext`]로 감싸
//! 필터와 포매터까지 전달만 합니다. 실제 필드가 필요한 구현체는
//! [`LogContext::downcast_ref`]로 자기 프로토콜 타입을 꺼내 씁니다.
//!
//! # 사용 예시
//! ```
//! use crosslog_core::context::LogContext;
//!
//! struct HttpExchange { status: u16 }
//!
//! let exchange = HttpExchange { status: 200 };
//! let ctx = LogContext::new(&exchange);
//! assert_eq!(ctx.downcast_ref::<HttpExchange>().map(|e| e.status), Some(200));
//! assert!(ctx.downcast_ref::<String>().is_none());
//! ```

use std::any::Any;
use std::fmt;

/// 한 번의 요청/응답 교환을 가리키는 불투명 핸들
///
/// 수명 `'a`가 `log()` 호출 범위에 묶이므로 파이프라인이 컨텍스트를
/// 호출 밖으로 보관할 수 없습니다.
#[derive(Clone, Copy)]
pub struct LogContext<'a> {
    inner: &'a (dyn Any + Send + Sync),
    type_name: &'static str,
}

impl<'a> LogContext<'a> {
    /// 프로토콜 페이로드를 빌려 컨텍스트를 만듭니다.
    pub fn new<T: Any + Send + Sync>(payload: &'a T) -> Self {
        Self {
            inner: payload,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 기대하는 프로토콜 타입이면 참조를 반환합니다.
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.inner.downcast_ref::<T>()
    }

    /// 페이로드가 `T` 타입인지 확인합니다.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// 페이로드 구체 타입 이름 (진단용)
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for LogContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext")
            .field("type_name", &self.type_name)
            .finish()
    }
}
