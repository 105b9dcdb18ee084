//! Database backend implementations.
//!
//! Each backend provides one [`ResourceModel`](crate::core::ResourceModel)
//! implementation, instantiated once per resource type over a shared store.
//!
//! # Available Backends
//!
//! | Backend | Name | Feature | Description |
//! |---------|------|---------|-------------|
//! | SQLite | `sqlite` | `sqlite` | Relational storage with an extracted search index |
//! | Document | `memory` | always | Process-local JSON document collections |

pub mod document;

#[cfg(feature = "sqlite")]
pub mod sqlite;
