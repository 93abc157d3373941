// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-load
//!
//! Require/load resolution and single-load coordination for the Spacey
//! runtime.
//!
//! - `require(name)` resolves a name against the current directory, the
//!   search path and the resource space, then loads the unit at most once
//!   per runtime instance
//! - `load(name, isolate)` resolves the same way and always runs the unit
//! - concurrent requires of the same canonical name block until the first
//!   finishes; different names never block each other
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_load::{Executor, LoadConfig, LoadService};
//! use std::sync::Arc;
//!
//! let service = LoadService::new(LoadConfig::load(None)?, Arc::new(MyRuntime));
//! let executor = Executor::new();
//! assert!(service.require(&executor, "net/http")?);
//! assert!(!service.require(&executor, "net/http")?);
//! ```
//!
//! ## Unit kinds
//!
//! | Suffix | Unit |
//! |--------|------|
//! | `.src` | source text handed to [`Runtime::eval_source`] |
//! | `.archive` | tar archive merged into the resource space |
//! | `.compiled` | bytes handed to [`Runtime::run_compiled`] |
//! | `.so`, `.dll`, `.bundle` | refused as unsupported |
//!
//! Names that match nothing fall back to an [`Extension`] registered under
//! an identifier derived from the name.

#![warn(missing_docs)]

pub mod archive;
pub mod canonical;
pub mod config;
pub mod error;
pub mod executor;
pub mod extension;
pub mod features;
pub mod lock_pool;
pub mod policy;
pub mod resolver;
pub mod resource;
pub mod runtime;
pub mod search_path;
pub mod service;
pub mod suffix;
pub mod timer;
pub mod unit;

pub use config::LoadConfig;
pub use error::{Disposition, LoadError, Result};
pub use executor::{Executor, ExecutorId};
pub use extension::{DefaultNaming, Extension, ExtensionNaming, ExtensionRegistry};
pub use features::FeatureIndex;
pub use lock_pool::{Acquired, LockPool};
pub use policy::{AllowAll, DenyList, LoadPolicy};
pub use resolver::Resolution;
pub use runtime::{LoadContext, Runtime};
pub use search_path::SearchPath;
pub use service::LoadService;
pub use suffix::LoadMode;
pub use unit::{Loadable, Origin, ResolvedUnit};
