//! CSV import of courrier, user and service exports into a dashboard snapshot.

mod parser;

use std::io::Read;
use std::path::Path;

use crate::workflows::courrier::{Courrier, Service, User};
use crate::workflows::dashboard::DashboardSnapshot;

use parser::{CourrierRow, ServiceRow, UserRow};

/// Failure of a whole export. Individual bad rows are reported as
/// [`RowRejection`]s instead.
#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// A row left out of the import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub export: &'static str,
    pub line: u64,
    pub message: String,
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} line {}: {}", self.export, self.line, self.message)
    }
}

#[derive(Debug)]
pub struct Imported<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RowRejection>,
}

impl<T> Default for Imported<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Snapshot built from the readable rows, with the rows that were skipped.
#[derive(Debug, Default)]
pub struct SnapshotImport {
    pub snapshot: DashboardSnapshot,
    pub rejected: Vec<RowRejection>,
}

pub struct SnapshotImporter;

impl SnapshotImporter {
    /// Build a snapshot from a courrier export plus optional user and service exports.
    pub fn from_paths<P: AsRef<Path>>(
        courriers: P,
        users: Option<P>,
        services: Option<P>,
    ) -> Result<SnapshotImport, ImportError> {
        let courriers = Self::courriers(std::fs::File::open(courriers)?)?;
        let users = match users {
            Some(path) => Self::users(std::fs::File::open(path)?)?,
            None => Imported::default(),
        };
        let services = match services {
            Some(path) => Self::services(std::fs::File::open(path)?)?,
            None => Imported::default(),
        };

        let mut rejected = courriers.rejected;
        rejected.extend(users.rejected);
        rejected.extend(services.rejected);

        Ok(SnapshotImport {
            snapshot: DashboardSnapshot {
                courriers: courriers.records,
                users: users.records,
                services: services.records,
            },
            rejected,
        })
    }

    pub fn courriers<R: Read>(reader: R) -> Result<Imported<Courrier>, ImportError> {
        parser::parse_rows("courriers", reader, CourrierRow::into_courrier)
    }

    pub fn users<R: Read>(reader: R) -> Result<Imported<User>, ImportError> {
        parser::parse_rows("users", reader, UserRow::into_user)
    }

    pub fn services<R: Read>(reader: R) -> Result<Imported<Service>, ImportError> {
        parser::parse_rows("services", reader, ServiceRow::into_service)
    }
}
