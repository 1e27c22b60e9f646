/// Session lifecycle and rotation orchestration.
pub mod session_service;
