//! crates/sat_prep_core/src/assignments.rs
//!
//! Bookkeeping for the denormalized `student_exams` list on each student.
//!
//! Every change is a read-modify-write of one student's list, applied with a
//! compare-and-set so that two concurrent assignment requests cannot silently
//! drop each other's ids. Bulk assignment visits students one at a time and
//! records an outcome per student; nothing is rolled back on partial failure.

use crate::domain::SatTest;
use crate::ports::{AssignmentStore, PortError, PortResult};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// How many times a lost compare-and-set is retried before giving up.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Appends `incoming` to `current`, keeping the order of first appearance and
/// dropping duplicates (including duplicates already present in `current`).
pub fn merge_exam_ids(current: &[Uuid], incoming: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(current.len() + incoming.len());
    current
        .iter()
        .chain(incoming)
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Removes every occurrence of `exam_id`. Absent ids leave the list as is.
pub fn remove_exam_id(current: &[Uuid], exam_id: Uuid) -> Vec<Uuid> {
    current.iter().copied().filter(|id| *id != exam_id).collect()
}

/// Orders fetched tests the way they appear in the assignment list.
pub fn order_by_assignment(mut tests: Vec<SatTest>, assigned: &[Uuid]) -> Vec<SatTest> {
    tests.sort_by_key(|t| {
        assigned
            .iter()
            .position(|id| *id == t.id)
            .unwrap_or(usize::MAX)
    });
    tests
}

/// What happened to one student during a bulk assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    /// The exams are now on the student's list, which is returned in full.
    Assigned { student_exams: Vec<Uuid> },
    NotFound,
    /// The list kept changing underneath us for `MAX_WRITE_ATTEMPTS` rounds.
    Conflict,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentResult {
    pub student_id: Uuid,
    pub outcome: AssignmentOutcome,
}

/// Adds `exam_ids` to each student's list, sequentially, isolating failures.
///
/// The returned list has one entry per input student id, in input order.
pub async fn assign_exams<S>(
    store: &S,
    student_ids: &[Uuid],
    exam_ids: &[Uuid],
) -> Vec<AssignmentResult>
where
    S: AssignmentStore + ?Sized,
{
    let mut results = Vec::with_capacity(student_ids.len());
    for &student_id in student_ids {
        let outcome =
            match rewrite_exams(store, student_id, |current| merge_exam_ids(current, exam_ids))
                .await
            {
                Ok(student_exams) => AssignmentOutcome::Assigned { student_exams },
                Err(PortError::NotFound(_)) => AssignmentOutcome::NotFound,
                Err(PortError::Conflict(_)) => AssignmentOutcome::Conflict,
                Err(PortError::Unexpected(reason)) => {
                    warn!(%student_id, "Failed to assign exams: {}", reason);
                    AssignmentOutcome::Failed { reason }
                }
            };
        results.push(AssignmentResult {
            student_id,
            outcome,
        });
    }
    results
}

/// Drops one exam from a student's list and returns the resulting list.
pub async fn unassign_exam<S>(store: &S, student_id: Uuid, exam_id: Uuid) -> PortResult<Vec<Uuid>>
where
    S: AssignmentStore + ?Sized,
{
    rewrite_exams(store, student_id, |current| remove_exam_id(current, exam_id)).await
}

async fn rewrite_exams<S, F>(store: &S, student_id: Uuid, edit: F) -> PortResult<Vec<Uuid>>
where
    S: AssignmentStore + ?Sized,
    F: Fn(&[Uuid]) -> Vec<Uuid>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = store.get_student_exams(student_id).await?;
        let updated = edit(&current);
        if updated == current {
            return Ok(current);
        }
        if store
            .replace_student_exams(student_id, &current, &updated)
            .await?
        {
            return Ok(updated);
        }
        debug!(%student_id, attempt, "student_exams changed during update, re-reading");
    }
    Err(PortError::Conflict(format!(
        "assignments of student {} changed {} times in a row",
        student_id, MAX_WRITE_ATTEMPTS
    )))
}
