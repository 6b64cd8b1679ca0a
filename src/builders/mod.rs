//! Builders to construct scheduler components from configuration.

pub mod orchestrator_builder;

pub use orchestrator_builder::{
    build_action_builder, build_classes, build_orchestrator, build_resources, build_settings,
};
