//! Core abstractions shared by the source, target and orchestrator.
//!
//! - [`value`]: SQL value and record representation
//! - [`traits`]: reader, writer and transaction-scope traits

pub mod traits;
pub mod value;

pub use traits::{SourceReader, TargetWriter, Transactional};
pub use value::{Record, SqlValue};
