pub mod exporter;
pub mod orchestrator;
