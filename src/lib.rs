pub mod app;
pub mod config;
pub mod gate;
pub mod hud;
pub mod render;
pub mod script;
pub mod sequencer;
pub mod stage;
