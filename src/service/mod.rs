pub mod contract_gateway;
pub mod session_service;
pub mod session_watcher;
