//! Permission system for checking user roles.
//!
//! Routes declare the `Permission` they need; a `RolePolicy` maps each role
//! to the permissions it holds. Adding a role only touches the policy.
//!
//! ## Usage
//!
//! ```rust
//! let perms = Permissions::new(RolePolicy::default());
//!
//! if perms.allows(&principal.role, Permission::ManageCatalog) {
//!     // ...
//! }
//! ```

mod checker;

pub use checker::{Permission, Permissions, RolePolicy};
