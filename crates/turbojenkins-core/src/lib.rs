#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core building blocks for the TurboJenkins ecosystem.
//!
//! Everything in this crate is a pure function of its input: no I/O, no
//! async runtime, no HTTP types. The client crate composes these pieces
//! into the session and item wrappers.
//!
//! - **Name/URL codec** ([`naming`]): `folder/sub/job` ⇄ `.../job/folder/job/sub/job/job/`
//! - **Case conversion** ([`case`]): Jenkins camelCase fields ⇄ Rust snake_case names
//! - **Type tags** ([`class_tag`]): `_class` discriminator ⇄ registry key
//! - **Tree projections** ([`tree`]): `tree=` query builders
//!
//! # Examples
//!
//! ```rust
//! use turbojenkins_core::prelude::*;
//!
//! let root = "http://ci.example.com/";
//! let url = name_to_url(root, "team/build1");
//! assert_eq!(url, "http://ci.example.com/job/team/job/build1/");
//! assert_eq!(url_to_name(root, &url).unwrap(), "team/build1");
//!
//! assert_eq!(type_tag("hudson.model.Queue$LeftItem"), "LeftItem");
//! assert_eq!(snake_to_camel("next_build_number"), "nextBuildNumber");
//! ```

pub mod case;
pub mod class_tag;
pub mod error;
pub mod naming;
pub mod tree;

pub use case::{camel_to_snake, snake_to_camel};
pub use class_tag::type_tag;
pub use error::{CoreError, Result};
pub use naming::{
    append_slash, is_absolute_url, name_to_url, split_full_name, url_to_name, validate_full_name,
};
pub use tree::{EXECUTABLES_QUERY, computers_executables_query, nested_jobs_query};

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use turbojenkins_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::case::{camel_to_snake, snake_to_camel};
    pub use crate::class_tag::type_tag;
    pub use crate::error::{CoreError, Result};
    pub use crate::naming::{
        append_slash, is_absolute_url, name_to_url, split_full_name, url_to_name,
        validate_full_name,
    };
    pub use crate::tree::{EXECUTABLES_QUERY, computers_executables_query, nested_jobs_query};
}
