//! Audit logging for Conductor.
//!
//! Every credential path (create, read for use, update, delete, test) and
//! every binding decision emits an [`AuditEvent`]. Events are written as one
//! JSON object per line, `INFO` on success and `ERROR` on failure.

pub mod event;
pub mod sink;

pub use event::{AuditEvent, AuditEventBuilder, AuditEventType, BindingMethod, ChangedField};
pub use sink::{AuditError, AuditLog, AuditSink, JsonLineSink, MemorySink, NullSink};
