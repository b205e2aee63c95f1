//! # Query Compiler
//!
//! Pure compilation of group lookups into engine SQL with bound parameters.
//! The compiler owns the security contract: identifiers are grammar-checked
//! before interpolation, subject values never enter the statement text.

mod compiler;
pub mod errors;
pub mod ident;

pub use compiler::{
    compile, count_statement, paged_statement, CompiledQuery, FilterMode, ParamValue,
    RECORD_COLUMN,
};
pub use errors::{CompileError, CompileResult};
