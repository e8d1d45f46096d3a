//! Relational persistence for the scraped catalog.

pub mod courses;
