//! Output side of the ADE engine: lays normalized tables out in an output
//! workbook, writes it as XLSX and persists the run artifact.

pub mod artifact;
pub mod render;
pub mod sheet_name;
pub mod xlsx;

pub use artifact::{read_artifact, write_artifact};
pub use render::render;
pub use sheet_name::{MAX_SHEET_NAME_LEN, SheetNamer, sanitize_sheet_name};
pub use xlsx::write_workbook;
