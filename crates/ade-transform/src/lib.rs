//! Field pipeline: runs every field's transforms and validators over the
//! values of one mapped table and lays the result out in canonical order.

pub mod pipeline;

pub use pipeline::{FieldOutcome, field_order, normalize_table, run_field};
