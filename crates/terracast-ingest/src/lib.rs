//! # Terracast Ingest
//!
//! The operator-only pipeline that builds new pricing snapshots. Seven
//! phases in a strict line:
//!
//! ```text
//! Fetching -> Normalizing -> Validating -> Staging -> BackedUp -> Committing -> Active
//! ```
//!
//! Any failure moves to `Failed` with a phase marker and the snapshot
//! under construction is discarded. Two rules are load-bearing:
//!
//! - **Completeness**: fetching pulls the provider's whole catalog for
//!   a region, never a mapper-filtered slice, so adding a mapper later
//!   needs no re-ingestion.
//! - **Backup before commit**: a gzipped dump of the normalized rates
//!   must exist on disk before the store sees a single write.
//!
//! Staging is pluggable: [`MemoryStaging`] for the common case,
//! [`StreamingStaging`] for low-memory environments (gzipped
//! JSON-lines temp files per service with a resume checkpoint). Both
//! satisfy the same phase contracts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backup;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod normalize;
pub mod phase;
pub mod staging;
pub mod validate;

pub use backup::{read_backup, BackupFile};
pub use error::{IngestError, IngestFailure, IngestResult};
pub use fetch::{CatalogSource, RawCatalogEntry};
pub use lifecycle::{restore, run, IngestConfig, IngestReport, IngestRequest};
pub use normalize::NormalizedRate;
pub use phase::IngestPhase;
pub use staging::{MemoryStaging, Staging, StreamingStaging};
pub use validate::ServiceContract;
