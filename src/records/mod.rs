//! CSV-backed record views: the EHR dashboard, patient search and the
//! per-patient clinical workflow.
//!
//! Files are read from the data directory on every call; nothing is cached.

pub mod csv;
pub mod dashboard;
pub mod workflow;

pub use self::csv::CsvTable;
pub use dashboard::{load_dashboard, search_patients, DashboardSummary, PatientSearch};
pub use workflow::{load_workflow, PatientWorkflow};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Column '{0}' not found")]
    MissingColumn(String),
}
