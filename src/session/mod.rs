// SPDX-License-Identifier: MIT

//! Session state: identity + profile reconciliation.

pub mod reconcile;
pub mod store;

pub use reconcile::ProfileState;
pub use store::{Session, SessionStore};
