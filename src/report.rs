//! CSV reports of model output.
//!
//! A report type is a `serde::Serialize` struct; each value sent becomes one
//! row of the file registered for that type.
use std::any::TypeId;
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::Path;

use csv::Writer;

use crate::context::Context;
use crate::error::SimError;
use crate::{define_data_plugin, HashMap, HashMapExt};

/// A row type with its own output file. Implement it with
/// `create_report_trait!`.
pub trait Report: 'static {
    fn type_id(&self) -> TypeId;
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Implements `Report` for a serializable row type.
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
}

// Maps each report type to the writer for its file.
define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::new()),
    }
);

// Checks that the path names a CSV file, creating the file and any missing
// parent directories. Called by `add_report`.
fn create_report_file(path: &Path) -> Result<File, SimError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(SimError::ReportError(format!(
            "report output files must be CSVs, got {}",
            path.display()
        ))),
    }
}

pub trait ContextReportExt {
    /// Registers the report type `T` and the CSV file its rows go to.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the path is not a CSV file or cannot be
    /// created.
    fn add_report<T: Report + 'static>(&mut self, path: &Path) -> Result<(), SimError>;

    /// Appends `report` as a row of its type's file and flushes it.
    ///
    /// # Panics
    ///
    /// Panics if the report type was never added or the row cannot be
    /// written.
    fn send_report<T: Report>(&self, report: T);
}

impl ContextReportExt for Context {
    fn add_report<T: Report + 'static>(&mut self, path: &Path) -> Result<(), SimError> {
        let file = create_report_file(path)?;

        let data_container = self.get_data_container_mut(ReportPlugin);
        let writer = Writer::from_writer(file);
        let mut file_writers = data_container.file_writers.borrow_mut();
        file_writers.insert(TypeId::of::<T>(), writer);
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) {
        let data_container = self
            .get_data_container(ReportPlugin)
            .expect("No writer found for the report type");
        let mut file_writers = data_container.file_writers.borrow_mut();
        let writer = file_writers
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        report
            .serialize(writer)
            .expect("Failed to write report row");
        writer.flush().expect("Failed to flush writer");
    }
}
