#![deny(missing_docs)]

//! # Prism Models
//!
//! Wire types exchanged between the Prism admin tooling and the platform
//! API.
//!
//! ## Payload shapes
//!
//! ```text
//! business endpoint   { "success": bool, "data": T, "message"?: string }
//!                     or a bare T for legacy list endpoints
//! login               AdminProfile { token, refreshToken, displayName, … }
//! refresh             { accessToken | token, refreshToken }, bare or enveloped
//! stream message      JSON document, one per transport message
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`credential`] | Access/refresh token pair |
//! | [`endpoints`] | REST paths and stream endpoint names |
//! | [`envelope`] | Response envelope decoding into [`ApiResult`] |
//! | [`page`] | Paginated list payloads and page requests |
//! | [`admin`] | Users, feeds, notices, category channels, admin profile |
//! | [`stream`] | Live stream payloads (`UserCounts`) |

pub mod admin;
pub mod credential;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod page;
pub mod stream;

// Re-export all public types at crate root for convenience.
// Downstream crates can use `prism_models::Credential` directly.
pub use admin::*;
pub use credential::*;
pub use endpoints::*;
pub use envelope::*;
pub use error::*;
pub use page::*;
pub use stream::*;
