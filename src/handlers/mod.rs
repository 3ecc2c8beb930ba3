// src/handlers/mod.rs

pub mod graphql;
pub mod health;
