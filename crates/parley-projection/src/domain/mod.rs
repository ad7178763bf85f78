pub mod read_model;
pub mod rules;
