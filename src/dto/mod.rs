pub mod application_dto;
pub mod job_dto;
pub mod student_dto;
