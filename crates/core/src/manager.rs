//! 파일 핸들 관리자 인터페이스
//!
//! 프로세스 전체에서 열린 로그 파일 디스크립터를 소유하고 중복 제거하는
//! 외부 협력자입니다. 같은 경로를 가리키는 싱크들은 하나의 핸들과
//! 하나의 쓰기 큐를 공유합니다. 코어는 이 계약에만 의존합니다.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AccessLogError;

/// 출력 대상 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationType {
    /// 일반 파일
    File,
    /// 표준 출력
    Stdout,
    /// 표준 에러
    Stderr,
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// 로그 출력 대상 기술자
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDestination {
    /// 출력 대상 종류
    pub kind: DestinationType,
    /// 파일 경로 (스트림 대상이면 `/dev/stdout` 등)
    pub path: PathBuf,
}

impl FileDestination {
    /// 경로에서 출력 대상을 만듭니다.
    ///
    /// `/dev/stdout`, `/dev/stderr`는 스트림 대상으로 매핑됩니다.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let kind = if path == Path::new("/dev/stdout") {
            DestinationType::Stdout
        } else if path == Path::new("/dev/stderr") {
            DestinationType::Stderr
        } else {
            DestinationType::File
        };
        Self {
            kind,
            path: path.to_path_buf(),
        }
    }
}

impl fmt::Display for FileDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.path.display())
    }
}

/// 공유 로그 파일 핸들
pub trait AccessLogFile: Send + Sync {
    /// 렌더링된 레코드를 씁니다. 여러 스레드에서 동시에 호출될 수 있습니다.
    fn write(&self, data: &str) -> io::Result<()>;

    /// 버퍼를 비웁니다.
    fn flush(&self) -> io::Result<()>;

    /// 파일을 다시 엽니다 (외부 로테이션 이후).
    fn reopen(&self) -> io::Result<()>;
}

/// 공유 로그 파일 핸들 포인터
pub type AccessLogFileSharedPtr = Arc<dyn AccessLogFile>;

/// 로그 파일 핸들 관리자
pub trait AccessLogManager: Send + Sync {
    /// 출력 대상에 대한 핸들을 반환합니다. 같은 대상이면 같은 핸들입니다.
    fn create_access_log(
        &self,
        destination: &FileDestination,
    ) -> Result<AccessLogFileSharedPtr, AccessLogError>;

    /// 관리 중인 모든 파일을 다시 엽니다.
    fn reopen_all(&self);
}
