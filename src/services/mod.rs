// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod auth;
pub mod profile;

pub use auth::{AuthService, LoginForm, RegisterForm};
pub use profile::{ProfileService, SaveOutcome, AVATAR_MAX_BYTES};
