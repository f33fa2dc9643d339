pub mod analytics_service;
pub mod application_service;
pub mod eligibility;
pub mod job_service;
pub mod parser_service;
pub mod ranking_service;
pub mod recommendation_service;
pub mod resume_service;
pub mod storage_service;
pub mod student_service;
