pub mod account_repository;
pub mod password_policy;
pub mod password_reset_repository;
pub mod reset_delivery;
pub mod time_service;
