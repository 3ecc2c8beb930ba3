// src/utils/mod.rs

pub mod html;
pub mod jwt;
pub mod ordering;
pub mod validation;
