//! Export of a resolved receipt batch.
//!
//! - [`write_table`] writes the expense report as CSV.
//! - [`write_archive`] zips the original receipts together with that table.
//!
//! Both take the results by reference and never modify them.

mod archive;
mod error;
mod table;

pub use archive::write_archive;
pub use error::ExportError;
pub use table::{
    table_file_name, write_table, write_table_dated, ExportConfig, DEFAULT_OWNER, TABLE_HEADER,
    TABLE_TITLE,
};
