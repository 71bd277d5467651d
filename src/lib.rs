//! Product catalog backend: a PostgreSQL product store fronted by a listing
//! cache that is kept consistent by [`application::catalog::CatalogService`].

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
