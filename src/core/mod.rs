// src/core/mod.rs

pub mod aggregator;
pub mod arg_parser;
pub mod conf_file;
pub mod resolver;
pub mod validator;
