//! Terse Schema
//!
//! Validates nested JSON values against schemas written in a compact string
//! notation, without a full JSON Schema engine.
//!
//! ## Features
//!
//! - **Terse Notation**: one string per field, e.g. `"$?>2"` for an optional
//!   string longer than two characters
//! - **Object and Array Shapes**: nested maps, `'*'` wildcards, `'[]'` elements
//! - **Bounds and Enums**: exclusive length/value bounds and JSON enum literals
//! - **References**: `(#/path)` into a caller-supplied definitions table
//! - **JSON Schema Export**: emit a Draft 7 document from the same schema
//!
//! ## Notation
//!
//! ```text
//! $ string   b boolean   # number   0 integer   ! null
//! { object   [ array     * any      ~ undefined
//!
//! ? optional   - nullable   >N min   <N max   =[..]= enum   (#/a/b) reference
//! ```
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//!
//! let result = terse_schema::validate(
//!     &json!({"name": "Ada", "tags": ["math"]}),
//!     &json!({"name": "$>0", "tags": ["$"], "age": "0?"}),
//!     None,
//!     None,
//! ).unwrap();
//! assert!(result.ok);
//! ```

pub mod cache;
pub mod config;
pub mod emit;
pub mod error;
pub mod model;
pub mod notation;
pub mod resolve;
pub mod validator;

pub use cache::DecodeCache;
pub use config::ValidatorConfig;
pub use error::{Result, SchemaError};
pub use model::{read_document, CanonicalModel, ModelEntry, Selector};
pub use notation::{decode, encode, Kind, TypeDescriptor};
pub use resolve::resolve;
pub use validator::{validate, FailureKind, Step, ValidateOptions, ValidationResult, Validator};
