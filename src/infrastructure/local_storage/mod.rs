pub mod file_output;
