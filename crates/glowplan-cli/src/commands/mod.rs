pub mod activity;
pub mod level;
pub mod plan;
pub mod score;
pub mod task;
