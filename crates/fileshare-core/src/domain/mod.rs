//! Domain entities for FileShare.
//!
//! This module contains pure data types with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the workspace.  Domain code has **no** imports from
//! sockets, file systems, or the async runtime, so it compiles and tests on
//! any platform without setup.  Outer layers (the server's registry, the
//! client's driver) depend on the domain; the domain never depends on them.

/// Session identity and historical records.
///
/// See [`session::SessionRecord`] for the main type.
pub mod session;
