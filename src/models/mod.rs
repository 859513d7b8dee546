// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod chat;
pub mod user;

pub use chat::{Chat, Message, MessageRole};
pub use user::{LookingFor, User};
