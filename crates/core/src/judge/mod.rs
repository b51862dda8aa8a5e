//! Judgment capability used by goal-directed runs.
//!
//! A judge turns page snapshots into analyses, derives action plans from
//! them, and decides whether a set of success criteria holds.

pub mod base;
pub mod cli_executor;
pub mod command;
pub mod keyword;
pub mod scripted;

pub use base::{JudgeError, PageJudge};
pub use command::CommandJudge;
pub use keyword::KeywordJudge;
pub use scripted::ScriptedJudge;
