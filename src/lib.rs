pub mod bracket;
pub mod config;
pub mod montecarlo;
pub mod predict;
pub mod state;
pub mod teams;
