//! Backend for a community sustainability platform: time-boxed eco
//! challenges with a points leaderboard, community energy-reduction goals
//! with per-user contribution tracking, heuristic energy-saving
//! recommendations, a smart-device energy log, and a household waste log
//! with a recycling-center directory.
//!
//! The interesting state lives behind [`db::store::Store`]; request
//! handlers stay thin and the workflows in [`service`] carry the rules:
//! points are awarded at most once per (user, challenge), goal progress and
//! per-user contributions move together atomically, and advisory
//! recommendations accumulate without de-duplication.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod service;
pub mod telemetry;
