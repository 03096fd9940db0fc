//! Business logic split by concern; routes stay thin and delegate here.

pub mod admin_service;
pub mod auth_service;
pub mod documentation;
pub mod health_service;
pub mod storage_supervisor;
pub mod turn_service;
