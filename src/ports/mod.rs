pub mod output_port;
pub mod source_port;
