//! Schema/Definition Provisioner
//!
//! Idempotent publication of the issuer's ledger objects:
//! - Schema (create, or discover by issuer DID, name and version)
//! - Revocable credential definition (create, or discover by schema id)

pub mod provisioner;
pub mod spec;

pub use provisioner::{ProvisionedIds, Provisioner};
pub use spec::{CredDefSpec, SchemaSpec};
