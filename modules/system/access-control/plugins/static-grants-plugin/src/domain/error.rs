use thiserror::Error;

/// Errors detected while building the grant table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("role '{role}' cannot extend itself")]
    SelfInheritance { role: String },

    #[error("cyclic role inheritance through '{role}'")]
    CyclicInheritance { role: String },
}
