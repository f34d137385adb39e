//! Core types and utilities for prompt-to-animate.
//!
//! This crate provides the foundational types shared by the service, the store
//! and the client:
//!
//! - **Identifiers**: `UserId`, `ChatId`, `JobId`
//! - **Render settings**: `VideoLength`, `Resolution`, `RenderRequest`
//! - **Usage**: `Tier`, `UserUsage`, `GenerationCheck`, `UsageSummary`
//! - **History**: `ChatRecord`, `ChatResponse`, `ChatListResponse`
//! - **Jobs**: `Job`, `JobStatus`, `JobProgress`
//!
//! # Quota model
//!
//! - Free users get 5 generations per calendar month.
//! - Basic credits are bought in packs of 5 and never expire.
//! - Pro users get 50 generations per 30-day subscription period.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod chat;
pub mod error;
pub mod ids;
pub mod job;
pub mod render;
pub mod usage;

pub use chat::{ChatListResponse, ChatRecord, ChatResponse, GenerateResponse};
pub use error::{TierError, ValidationError};
pub use ids::{ChatId, IdError, JobId, UserId};
pub use job::{Job, JobProgress, JobStatus};
pub use render::{RenderRequest, Resolution, VideoLength, MAX_PROMPT_CHARS};
pub use usage::{
    next_month_reset, subscription_reset, Consumption, GenerationCheck, Plan, Tier, UsageSummary,
    UserUsage, BASIC_PACK_CREDITS, FREE_MONTHLY_LIMIT, PRO_MONTHLY_LIMIT,
    PRO_SUBSCRIPTION_DAYS,
};
