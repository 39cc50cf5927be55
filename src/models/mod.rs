// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod event;
pub mod schedule;
pub mod user;

pub use event::{CalendarEvent, EventDateTime, ListedEvent};
pub use schedule::{MandatoryTask, Schedule, ScheduleTemplate, Task, Weekday};
pub use user::{OAuthGrant, SecretToken, UpstreamCredential, User};
