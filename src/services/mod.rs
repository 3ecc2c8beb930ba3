// src/services/mod.rs

pub mod attempts;
pub mod catalog;
pub mod exams;
pub mod live_classes;
pub mod questions;
pub mod users;
