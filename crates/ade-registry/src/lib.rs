//! Extension registry for the ADE engine.
//!
//! Packages register canonical fields and the callables that detect, map,
//! transform, validate and observe them. The resulting [`Registry`] is
//! immutable and shared read-only by a run.

pub mod builtins;
pub mod callable;
pub mod context;
pub mod error;
pub mod package;
pub mod params;
pub mod registry;
pub mod score;
pub mod state;
pub mod text;

pub use callable::{
    ColumnDetector, Hook, IssueDraft, Replacement, RowDetector, Transform, TransformOutcome,
    Validator,
};
pub use context::{
    ColumnContext, HookContext, NoteSink, RowContext, TransformContext, ValidatorContext,
};
pub use error::ExtensionError;
pub use package::{DeclarativePackage, MANIFEST_FILE, Manifest};
pub use params::{CallableKind, Params};
pub use registry::{
    CONFIG_SCHEMA, Entry, ExtensionPackage, PackageInfo, Registration, Registry, RegistryBuilder,
};
pub use score::{ColumnPatch, RowPatch, ScoreDelta, ScorePatch};
pub use state::{RunState, StateScope};
pub use text::normalize_header;
