pub mod editor;
pub mod input_metrics;
pub mod layout;
pub mod markdown;
pub mod render;
