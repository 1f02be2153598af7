pub mod assignments;
pub mod domain;
pub mod ports;
pub mod session;

pub use assignments::{AssignmentOutcome, AssignmentResult};
pub use domain::{
    AuthSession, ParseVariantError, Role, SatTest, SatTestDraft, Student, StudentDetails,
    TestAttempt, TestStatus, User,
};
pub use ports::{AssignmentStore, DatabaseService, PortError, PortResult};
pub use session::{AccessError, AuthContext, SessionPhase};
