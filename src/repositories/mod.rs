pub mod assignment_repository;
pub mod in_memory;
pub mod roster_repository;
pub mod submission_repository;

pub use assignment_repository::{AssignmentRepository, MongoAssignmentRepository};
pub use in_memory::{
    InMemoryAssignmentRepository, InMemoryRosterRepository, InMemorySubmissionRepository,
};
pub use roster_repository::{MongoRosterRepository, RosterRepository};
pub use submission_repository::{MongoSubmissionRepository, SubmissionRepository};
