//! Entity model, builder, and validator.
//!
//! The canonical data shapes of the ledger (assets, events, bundles), the
//! pure transformations over them (bundle assembly, redaction, metadata
//! edits), the ingress validation pipeline, and the query-parameter
//! validators. Everything here is deterministic and side-effect free.

pub mod builder;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod params;
pub mod schema;
pub mod type_schemas;
pub mod types;
pub mod validator;

pub use error::{JsonValidationError, Result, SchemaViolation, ValidationError};
pub use params::{
    validate_and_cast_find_assets_params, validate_and_cast_find_events_params, FindAssetsParams,
    FindEventsParams, GeoQuery,
};
pub use type_schemas::TypeSchemaRegistry;
pub use types::{Asset, Bundle, BundleMember, Event};
pub use validator::{EntityValidator, DEFAULT_TIMESTAMP_LIMIT_SECS};
