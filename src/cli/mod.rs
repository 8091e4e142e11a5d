//! CLI infrastructure for the platformer Q-learning agent
//!
//! This module provides the command-line interface for training, evaluating,
//! inspecting and exporting agents on the synthetic level.

pub mod commands;
pub mod config;
pub mod output;
