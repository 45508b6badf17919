//! Client for the health coach gateway.
//!
//! [`GatewayClient`] exposes the gateway's operations (ping, plan, schedule,
//! nudge, feedback) on top of a single-request [`RequestExecutor`], reading
//! settings from and writing results to an injected
//! [`coach_client_core::KeyValueStore`].

pub mod client;
pub mod error;
pub mod executor;
pub mod responses;

pub use client::{
    FEEDBACK_PATH, GatewayClient, HEALTH_PATH, NUDGE_SEND_PATH, PING_FAILSAFE_MS,
    PLAN_TODAY_PATH, ROOT_PATH, SCHEDULE_COMMIT_PATH,
};
pub use error::GatewayError;
pub use executor::{
    DEFAULT_TIMEOUT_MS, RawResponse, RequestExecutor, RequestOptions, endpoint,
    extract_error_message, parse_body,
};
pub use responses::{DEFAULT_NUDGE_TEXT, Nudge, PingStatus, ScheduleResult, ScheduledItem};
