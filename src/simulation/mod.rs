//! Synthetic data for exercising the engine at scale.

pub mod group_generator;
