use crate::config::LoggingConfig;
use crate::domains::logger::DomainLogger;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Forwards to the `tracing` subscriber installed by the binary.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!("{}", msg);
    }
}

pub fn init_tracing_logger() -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge)
}

/// Forwards to the `log` facade, which `fast_log` writes to disk.
struct FastLogBridge;

impl DomainLogger for FastLogBridge {
    fn info(&self, msg: &str) {
        log::info!("{} - {}", chrono::Utc::now().to_rfc3339(), msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{} - {}", chrono::Utc::now().to_rfc3339(), msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{} - {}", chrono::Utc::now().to_rfc3339(), msg);
    }
}

/// Installs `fast_log` with a file appender at `path` and returns a logger writing to it.
pub fn init_file_logger(path: &str) -> Result<Arc<dyn DomainLogger>, String> {
    fast_log::init(
        fast_log::config::Config::new()
            .file(path)
            .level(log::LevelFilter::Info),
    )
    .map_err(|e| format!("Failed to initialize fast_log: {}", e))?;
    Ok(Arc::new(FastLogBridge))
}

struct NoOp;

impl DomainLogger for NoOp {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

pub fn init_noop_logger() -> Arc<dyn DomainLogger> {
    Arc::new(NoOp)
}

/// Fans every message out to each of its sinks, in order.
pub struct MultiLogger {
    sinks: Vec<Arc<dyn DomainLogger>>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<Arc<dyn DomainLogger>>) -> Self {
        Self { sinks }
    }

    fn each(&self, level: Level, msg: &str) {
        for sink in &self.sinks {
            level.write(sink.as_ref(), msg);
        }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.each(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.each(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.each(Level::Error, msg);
    }
}

/// Builds the patrol logger from `[logging]`.
///
/// Tracing output always; the log file is added when `file` is set and can be
/// opened. With `buffer_capacity` set, transitions are queued and written by a
/// background task, which requires a running tokio runtime.
pub fn init_patrol_logger(config: &LoggingConfig) -> Arc<dyn DomainLogger> {
    let console = init_tracing_logger();
    let logger: Arc<dyn DomainLogger> = match config.file.as_deref().map(init_file_logger) {
        None => console,
        Some(Ok(file_logger)) => Arc::new(MultiLogger::new(vec![console, file_logger])),
        Some(Err(e)) => {
            console.warn(&format!("{}; logging to console only", e));
            console
        }
    };
    match config.buffer_capacity {
        Some(capacity) => init_buffered_logger(logger, capacity),
        None => logger,
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn write(self, sink: &dyn DomainLogger, msg: &str) {
        match self {
            Level::Info => sink.info(msg),
            Level::Warn => sink.warn(msg),
            Level::Error => sink.error(msg),
        }
    }
}

struct BufferedLogger {
    queue: mpsc::Sender<(Level, String)>,
}

impl BufferedLogger {
    fn enqueue(&self, level: Level, msg: &str) {
        // Drops the line when the queue is full.
        let _ = self.queue.try_send((level, msg.to_string()));
    }
}

impl DomainLogger for BufferedLogger {
    fn info(&self, msg: &str) {
        self.enqueue(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.enqueue(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.enqueue(Level::Error, msg);
    }
}

/// Queues up to `capacity` lines and drains them into `sink` from a spawned task.
pub fn init_buffered_logger(sink: Arc<dyn DomainLogger>, capacity: usize) -> Arc<dyn DomainLogger> {
    let (queue, mut pending) = mpsc::channel::<(Level, String)>(capacity.max(1));
    tokio::spawn(async move {
        while let Some((level, msg)) = pending.recv().await {
            level.write(sink.as_ref(), &msg);
        }
    });
    Arc::new(BufferedLogger { queue })
}
