//! Query cache and mutation orchestration for the CT scan dashboard.
//!
//! A [`Session`] owns the remote client handle and the query cache; a
//! [`Dashboard`] resolves cached queries and runs write-through mutations on
//! top of it.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod dicom;
pub mod error;
pub mod models;
pub mod notify;
pub mod queries;
pub mod session;
pub mod telemetry;
pub mod validation;

pub use api::HttpBackend;
pub use backend::ScanBackend;
pub use cache::{QueryCache, QueryFamily, QueryKey};
pub use config::DashboardConfig;
pub use error::{AnalysisFailure, BackendError, BackendResult, MutationError, ValidationError};
pub use models::{CtScan, ExternalApiConfig, ScanId, TumorDetectionResult, TumorStage, UserProfile, UserRole};
pub use notify::{LogNotifier, Notice, NoticeLevel, NoticeLog, Notifier};
pub use queries::{Dashboard, Landing, QueryOutcome};
pub use session::Session;
