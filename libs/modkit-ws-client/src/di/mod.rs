//! Minimal, type-keyed service container hosting the client factory.
//!
//! Design goals:
//! - Setup code registers services once in a [`ServiceCollection`], then freezes it into a
//!   [`ServiceProvider`]; there is no process-wide state.
//! - Consumers resolve by *service type*, which may be a trait object: `get::<dyn my::Api>()`.
//! - Singletons live for the root provider, scoped services for one
//!   [`ServiceProvider::create_scope`] child, transient services for one resolution.
//! - Named options: many independent setup calls append actions for `(O, name)`; the provider
//!   merges them on first use and memoizes the result.
//!
//! Implementation details:
//! - Key = [`TypeKey`] (`TypeId` plus `type_name` for diagnostics), so `T = dyn Trait` works.
//! - Value = `Arc<T>` stored as `Box<dyn Any + Send + Sync>` (downcast on read).
//! - Cached instances are created outside the lock; concurrent first resolutions keep the
//!   first stored instance and every caller observes it.

mod collection;
mod options;
mod provider;
mod type_key;

pub use collection::{ServiceCollection, ServiceLifetime};
pub use options::OptionsAction;
pub use provider::{ScopeKey, ServiceError, ServiceProvider};
pub use type_key::{short_type_name, TypeKey};
