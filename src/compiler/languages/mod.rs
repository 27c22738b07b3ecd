pub mod tsc_output;
pub mod typescript;
