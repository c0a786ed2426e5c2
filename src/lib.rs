pub mod cli;
pub mod color;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod tui;
