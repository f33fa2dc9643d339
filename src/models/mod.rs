pub mod application;
pub mod job;
pub mod parsed_resume;
pub mod student;
