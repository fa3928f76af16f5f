//! HTTP handlers

pub mod health;
pub mod predict;
pub mod drift;
pub mod model;
#[cfg(test)]
mod tests;
