pub mod actions;
pub mod agent;
pub mod autopilot;
pub mod batch;
pub mod clock;
pub mod config;
pub mod errands;
pub mod events;
pub mod ledger;
pub mod navigation;
pub mod presentation;
pub mod seat;
pub mod spawner;
pub mod stats;
pub mod stock;
pub mod voice;
pub mod world;
