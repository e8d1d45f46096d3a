//! TuffySearch: scrapes the CSUF course catalog, normalizes course records,
//! and loads them into a relational store and a vector index for semantic
//! search.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod logging;
pub mod utils;
pub mod vector;
