pub mod blob_store;
pub mod product_repository;
pub mod product_service;
