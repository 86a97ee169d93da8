#![allow(non_snake_case)]

pub mod clients;
pub mod config;
pub mod errors;
pub mod models;
pub mod schema;
pub mod service;
