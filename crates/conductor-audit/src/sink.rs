//! Audit sinks: where events end up.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::event::AuditEvent;

/// Error type for audit writes.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit sink is poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, AuditError>;

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<()>;
}

#[derive(Serialize)]
struct AuditLine<'a> {
    level: &'static str,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

fn level_for(event: &AuditEvent) -> &'static str {
    if event.success {
        "INFO"
    } else {
        "ERROR"
    }
}

/// Writes one JSON object per line to any writer.
pub struct JsonLineSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JsonLineSink<std::fs::File> {
    /// Open (or create) an append-only audit file readable only by its owner.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        Ok(Self::new(options.open(path)?))
    }
}

impl<W: Write + Send> AuditSink for JsonLineSink<W> {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(&AuditLine {
            level: level_for(event),
            event,
        })?;
        let mut writer = self.writer.lock().map_err(|_| AuditError::Poisoned)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps events in memory; used by tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| AuditError::Poisoned)?
            .push(event.clone());
        Ok(())
    }
}

/// Discards every event.
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&self, _event: &AuditEvent) -> Result<()> {
        Ok(())
    }
}

/// Front door for emitting audit events.
///
/// Each event is mirrored to `tracing` under the `conductor::audit` target
/// before it reaches the sink. Sink failures are logged and never fail the
/// audited operation.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink))
    }

    pub fn emit(&self, event: AuditEvent) {
        if event.success {
            info!(
                target: "conductor::audit",
                event = %event.event_type,
                workspace = %event.workspace,
                integration = event.integration_name.as_deref().unwrap_or(""),
                "audit"
            );
        } else {
            error!(
                target: "conductor::audit",
                event = %event.event_type,
                workspace = %event.workspace,
                integration = event.integration_name.as_deref().unwrap_or(""),
                category = event.error_category.as_deref().unwrap_or(""),
                "audit"
            );
        }

        if let Err(e) = self.sink.record(&event) {
            warn!(error = %e, "failed to write audit event");
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}
