//! Log output wiring.
//!
//! Without a `log` section the process logs to stderr through `env_logger`.
//! With one, log lines are pushed through an unbounded channel and appended
//! to the configured file by a single-threaded background service, so request
//! handlers never block on file I/O.

use std::io::{self, Write};
use std::path::Path;

use async_trait::async_trait;
use env_logger::Builder;
use pingora::{
    server::{ListenFds, ShutdownWatch},
    services::Service,
};
use tokio::{
    fs::{create_dir_all, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};

use crate::config;

/// Initializes stderr logging; `RUST_LOG` overrides the default level.
pub fn init_stderr() {
    let _ = Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

struct ChannelWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(buf.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Background service appending log lines to `log.path`.
pub struct FileLogger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: config::Log,
}

impl FileLogger {
    pub fn new(config: config::Log) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    /// Installs `env_logger` piping into this service's channel.
    pub fn install(&self) {
        let writer = ChannelWriter {
            sender: self.sender.clone(),
        };
        let _ = Builder::from_env(env_logger::Env::default())
            .filter(None, self.config.level.into())
            .target(env_logger::Target::Pipe(Box::new(writer)))
            .try_init();
    }

    async fn open(&self) -> io::Result<BufWriter<tokio::fs::File>> {
        let path = Path::new(&self.config.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        Ok(BufWriter::new(file))
    }

    async fn drain(&mut self, file: &mut BufWriter<tokio::fs::File>, mut shutdown: ShutdownWatch) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                },
                data = self.receiver.recv() => match data {
                    Some(line) => {
                        if let Err(e) = file.write_all(&line).await {
                            eprintln!("consultd: failed to write log file: {e}");
                        }
                    }
                    None => break,
                },
            }
        }

        // pick up whatever was queued before shutdown
        while let Ok(line) = self.receiver.try_recv() {
            let _ = file.write_all(&line).await;
        }
    }
}

#[async_trait]
impl Service for FileLogger {
    async fn start_service(&mut self, _fds: Option<ListenFds>, shutdown: ShutdownWatch) {
        let mut file = match self.open().await {
            Ok(file) => file,
            Err(e) => {
                // the logger itself is the sink, so report on stderr
                eprintln!(
                    "consultd: cannot open log file {}: {e}",
                    self.config.path
                );
                return;
            }
        };

        self.drain(&mut file, shutdown).await;

        if let Err(e) = file.flush().await {
            eprintln!("consultd: failed to flush log file: {e}");
        }
    }

    fn name(&self) -> &'static str {
        "log file sync"
    }

    fn threads(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_channel_writer_forwards_bytes() {
        let logger = FileLogger::new(config::Log {
            path: "/tmp/consultd-test.log".to_string(),
            level: LogLevel::Info,
        });
        let mut writer = ChannelWriter {
            sender: logger.sender.clone(),
        };
        writer.write_all(b"hello\n").unwrap();

        let FileLogger { mut receiver, .. } = logger;
        assert_eq!(receiver.try_recv().unwrap(), b"hello\n".to_vec());
    }

    #[test]
    fn test_channel_writer_closed_receiver() {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        drop(receiver);
        let mut writer = ChannelWriter { sender };
        assert!(writer.write(b"lost").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_file_logger_writes_queued_lines_on_shutdown() {
        let dir = std::env::temp_dir().join(format!("consultd-{}", uuid::Uuid::new_v4().simple()));
        let path = dir.join("nested").join("consultd.log");
        let mut logger = FileLogger::new(config::Log {
            path: path.to_string_lossy().into_owned(),
            level: LogLevel::Info,
        });

        let mut writer = ChannelWriter {
            sender: logger.sender.clone(),
        };
        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(async move {
            logger.start_service(None, shutdown_rx).await;
        });
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "first line\nsecond line\n");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
