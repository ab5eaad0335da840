use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::LogSink;

/// File-backed sink.
///
/// Each line is written with its newline in a single `write_all` and flushed before
/// `append` returns. Writers are serialized by an async mutex.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    write: Mutex<()>,
}

impl FileSink {
    /// Creates a sink for `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn clear(&self) -> io::Result<()> {
        let _write = self.write.lock().await;
        let mut file = fs::File::create(&self.path).await?;
        file.flush().await
    }

    async fn append(&self, line: &str) -> io::Result<()> {
        let _write = self.write.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!(
            "routergate-{tag}-{}-{nanos}.log",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn test_clear_then_append_lines() {
        let path = scratch_path("append");
        fs::write(&path, "stale\n").await.unwrap();

        let sink = FileSink::new(&path);
        sink.clear().await.unwrap();
        sink.append("- (A) (PC) Arrived").await.unwrap();
        sink.append("- Connection 1: A Occupied").await.unwrap();

        let text = fs::read_to_string(&path).await.unwrap();
        assert_eq!(text, "- (A) (PC) Arrived\n- Connection 1: A Occupied\n");
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let path = scratch_path("missing").join("nested").join("log.txt");
        let sink = FileSink::new(&path);
        assert!(sink.append("line").await.is_err());
        assert!(sink.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let path = scratch_path("concurrent");
        let sink = std::sync::Arc::new(FileSink::new(&path));
        sink.clear().await.unwrap();

        let mut set = tokio::task::JoinSet::new();
        for i in 0..16 {
            let sink = std::sync::Arc::clone(&sink);
            set.spawn(async move { sink.append(&format!("line-{i:02}-{}", "x".repeat(64))).await });
        }
        while let Some(res) = set.join_next().await {
            res.unwrap().unwrap();
        }

        let text = fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 16);
        assert!(lines.iter().all(|l| l.len() == "line-00-".len() + 64));
        let _ = fs::remove_file(&path).await;
    }
}
