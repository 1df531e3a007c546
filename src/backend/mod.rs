//! Machine-code backends for lowered modules.
//!
//! The only backend is Cranelift, used both to JIT-execute a module in
//! process and to emit a relocatable object file.

pub mod cranelift;

use thiserror::Error;

pub use self::cranelift::{CraneliftBackend, JitProgram};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid IR: {0}")]
    InvalidIr(String),

    #[error("code generation failed: {0}")]
    Codegen(String),

    #[error("host machine is not supported by Cranelift: {0}")]
    UnsupportedHost(String),

    #[error("failed to emit object file: {0}")]
    Emit(String),

    #[error("no function named `{0}`")]
    MissingFunction(String),

    #[error("`{name}` cannot be called from the host: {reason}")]
    UnsupportedSignature { name: String, reason: String },
}
