//! `printshop-auth`: authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows the
//! three dashboard roles, what each may do, how to check a password and how to
//! mint/verify the bearer token that carries a role.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtIssuer, JwtValidator, TokenError};
pub use password::{Argon2Params, verify_password};
pub use permissions::{Permission, permissions_for};
pub use roles::Role;
pub use user::{AuthError, NewUser, User, UserDirectory, hash_new_password};
