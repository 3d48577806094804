//! Collection-level graph operations: index building and persistence,
//! session-start surfacing, and structural health checking.

pub mod builder;
pub mod error;
pub mod health;
pub mod index;
pub mod surface;

pub use builder::{build_index, scan_notes, BuildReport};
pub use error::{IndexError, IndexResult};
pub use health::{
    run_health_checks, EdgeList, Finding, FindingDetail, HealthReport, Priority, VaultContents,
};
pub use index::NoteIndex;
pub use surface::{surface, surface_from_index, SessionContext, SurfacePayload};
