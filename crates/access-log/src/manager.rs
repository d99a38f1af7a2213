//! 파일 핸들 관리자: 경로별 핸들 공유와 버퍼링
//!
//! 같은 출력 대상을 가리키는 싱크들은 하나의 [`ManagedFile`]을 공유하고,
//! 그 안의 `Mutex<BufWriter>`가 해당 경로의 유일한 쓰기 큐가 됩니다.
//! 서로 다른 싱크의 레코드가 한 줄 안에서 섞이지 않습니다.
//!
//! 파일은 첫 쓰기에서 열립니다. 조립 도중 실패한 파이프라인은 디스크에
//! 아무것도 남기지 않습니다. 관리자는 핸들을 약한 참조로만 추적하므로
//! 마지막 싱크가 사라지면 핸들도 닫힙니다.
//!
//! # 플러시 정책
//! - 버퍼에 쌓인 바이트가 `flush_threshold` 이상이면 즉시 플러시
//! - [`FileAccessLogManager::flush_all`] 호출 시
//! - 핸들이 drop될 때 (`BufWriter` drop)

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info, warn};

use crosslog_core::error::AccessLogError;
use crosslog_core::manager::{
    AccessLogFile, AccessLogFileSharedPtr, AccessLogManager, DestinationType, FileDestination,
};
use crosslog_core::metrics as m;

/// 기본 플러시 임계값 (바이트)
const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;

/// 관리 대상 하나의 실제 출력 스트림
enum Output {
    File(File),
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl Output {
    fn open(destination: &FileDestination) -> io::Result<Self> {
        match destination.kind {
            DestinationType::File => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&destination.path)
                .map(Self::File),
            DestinationType::Stdout => Ok(Self::Stdout(io::stdout())),
            DestinationType::Stderr => Ok(Self::Stderr(io::stderr())),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::File(file) => file.write(buf),
            Self::Stdout(out) => out.write(buf),
            Self::Stderr(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::File(file) => file.flush(),
            Self::Stdout(out) => out.flush(),
            Self::Stderr(err) => err.flush(),
        }
    }
}

/// 파일 출력 대상의 상위 디렉터리가 있는지 확인합니다 (파일은 만들지 않음).
fn check_parent(destination: &FileDestination) -> io::Result<()> {
    if destination.kind != DestinationType::File {
        return Ok(());
    }
    match destination.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("parent directory {} does not exist", parent.display()),
        )),
        _ => Ok(()),
    }
}

/// 경로 하나에 대한 공유 핸들
///
/// 출력 스트림은 첫 쓰기에서 열립니다.
pub struct ManagedFile {
    destination: FileDestination,
    flush_threshold: usize,
    writer: Mutex<Option<BufWriter<Output>>>,
}

impl ManagedFile {
    fn new(destination: &FileDestination, flush_threshold: usize) -> Self {
        metrics::gauge!(m::ACCESS_LOG_OPEN_FILES).increment(1.0);
        Self {
            destination: destination.clone(),
            flush_threshold,
            writer: Mutex::new(None),
        }
    }

    fn open_writer(&self) -> io::Result<BufWriter<Output>> {
        let output = Output::open(&self.destination)?;
        debug!(destination = %self.destination, "opened access log output");
        Ok(BufWriter::with_capacity(self.flush_threshold.max(1), output))
    }

    /// 이 핸들의 출력 대상
    pub fn destination(&self) -> &FileDestination {
        &self.destination
    }
}

impl Drop for ManagedFile {
    fn drop(&mut self) {
        metrics::gauge!(m::ACCESS_LOG_OPEN_FILES).decrement(1.0);
    }
}

impl AccessLogFile for ManagedFile {
    fn write(&self, data: &str) -> io::Result<()> {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(self.open_writer()?);
        }
        if let Some(writer) = guard.as_mut() {
            writer.write_all(data.as_bytes())?;
            if writer.buffer().len() >= self.flush_threshold {
                writer.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        match self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn reopen(&self) -> io::Result<()> {
        if self.destination.kind != DestinationType::File {
            return self.flush();
        }

        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(writer) = guard.as_mut() else {
            // 아직 열지 않았으면 다음 쓰기에서 새 경로로 열림
            return Ok(());
        };
        // 기존 파일에 남은 버퍼를 먼저 내보냄
        writer.flush()?;
        *guard = Some(self.open_writer()?);
        debug!(destination = %self.destination, "reopened access log file");
        Ok(())
    }
}

/// 참조 구현 파일 핸들 관리자
///
/// 출력 대상별로 핸들을 하나만 만들고, 그 핸들을 쓰는 싱크가 살아 있는
/// 동안 같은 대상에 대한 요청에는 같은 `Arc`를 돌려줍니다.
/// 파일의 상위 디렉터리는 미리 존재해야 합니다.
pub struct FileAccessLogManager {
    flush_threshold: usize,
    files: Mutex<HashMap<FileDestination, Weak<ManagedFile>>>,
}

impl FileAccessLogManager {
    /// 기본 플러시 임계값(64KB)으로 생성합니다.
    pub fn new() -> Self {
        Self::with_flush_threshold(DEFAULT_FLUSH_THRESHOLD)
    }

    /// 플러시 임계값을 지정해 생성합니다. `0`이면 매 쓰기마다 플러시합니다.
    pub fn with_flush_threshold(flush_threshold: usize) -> Self {
        Self {
            flush_threshold,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// 살아 있는 싱크가 참조하는 출력 대상 수
    pub fn open_count(&self) -> usize {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|file| file.strong_count() > 0)
            .count()
    }

    /// 모든 핸들의 버퍼를 비웁니다.
    ///
    /// 실패한 대상이 있어도 나머지는 계속 플러시하고, 첫 번째 에러를 반환합니다.
    pub fn flush_all(&self) -> io::Result<()> {
        let mut first_error = None;
        for file in self.snapshot() {
            if let Err(e) = file.flush() {
                warn!(destination = %file.destination(), error = %e, "failed to flush access log");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn snapshot(&self) -> Vec<Arc<ManagedFile>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl Default for FileAccessLogManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessLogManager for FileAccessLogManager {
    fn create_access_log(
        &self,
        destination: &FileDestination,
    ) -> Result<AccessLogFileSharedPtr, AccessLogError> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.retain(|_, file| file.strong_count() > 0);
        if let Some(existing) = files.get(destination).and_then(Weak::upgrade) {
            debug!(%destination, "reusing access log file handle");
            let shared: AccessLogFileSharedPtr = existing;
            return Ok(shared);
        }

        check_parent(destination)?;
        let file = Arc::new(ManagedFile::new(destination, self.flush_threshold));
        files.insert(destination.clone(), Arc::downgrade(&file));
        info!(%destination, handles = files.len(), "registered access log file");
        Ok(file)
    }

    fn reopen_all(&self) {
        for file in self.snapshot() {
            if let Err(e) = file.reopen() {
                warn!(destination = %file.destination(), error = %e, "failed to reopen access log");
            }
        }
    }
}
