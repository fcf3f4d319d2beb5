//! Client for the VMware Lab Manager SOAP API.
//!
//! ```no_run
//! use labmanager_rs::{CredentialOverrides, Credentials, DeleteOptions, LabManager};
//!
//! # fn main() -> labmanager_rs::Result<()> {
//! let credentials = Credentials::resolve_default(CredentialOverrides::default())?;
//! let lab = LabManager::new("POS", credentials)?.with_workspace("Main");
//!
//! let id = lab.clone("base", "base_copy")?;
//! println!("cloned into {id}");
//! lab.delete("base_copy", &DeleteOptions { force: true })?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod credentials;
pub mod lab;
pub mod soap;

pub use common::{AuthenticationHeader, Error, Result, Transport};
pub use credentials::*;
pub use lab::*;
pub use soap::SoapTransport;
