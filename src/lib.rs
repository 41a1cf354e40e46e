pub mod builder;
pub mod decision;
pub mod document;
pub mod error;
pub mod gridref;
pub mod matching;
pub mod model;
pub mod summary;
pub mod transform;

pub use builder::{LocationBuilder, LocationFacts, NullRegionLookup, RegionLookup};
pub use decision::{Decision, DecisionEngine, Decisions, HoldReason, Move};
pub use error::{ErrorKind, LocationError};
pub use matching::{matches_rounded_original, statement_matches_template, verify_statement, Statement};
pub use model::{
    ExistingLocation, GridSystem, LocationFact, ModerationStatus, Provenance, Role, SourceArchive,
    SourceRecord,
};
pub use transform::{GeodesyProvider, ProjGeodesy};
