//! Moderation authority: who may do what to which post or user.
//!
//! Every function here is a pure decision over the caller's
//! [`Principal`], the ownership of the subject and the role of its author.
//! Nothing touches the store.

use campus_shared::constants::SUPER_ADMIN_DEPARTMENT;
use campus_shared::{Role, UserId};
use campus_store::User;
use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// A moderation-relevant action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Edit,
    Delete,
    Pin,
    Lock,
    Block,
    ToggleGlobalLock,
}

/// What an action is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A query or reply, identified by its author.
    Post { author_id: UserId, author_role: Role },
    /// Another forum member.
    User(&'a User),
    /// The forum as a whole.
    Forum,
}

/// An administrator whose department is `ALL_BRANCHES`.
pub fn is_super_administrator(role: Role, department: Option<&str>) -> bool {
    role.is_administrator() && department == Some(SUPER_ADMIN_DEPARTMENT)
}

/// Only the author may change the text of a post.  Moderators cannot.
pub fn can_edit(actor: &Principal, author_id: UserId) -> bool {
    actor.user_id == author_id
}

pub fn can_delete(actor: &Principal, author_id: UserId, author_role: Role) -> bool {
    actor.is_super_administrator()
        || (actor.is_administrator() && author_role == Role::Student)
        || actor.user_id == author_id
}

pub fn can_pin(actor: &Principal) -> bool {
    actor.is_administrator()
}

pub fn can_lock(actor: &Principal) -> bool {
    actor.is_administrator()
}

pub fn can_toggle_global_lock(actor: &Principal) -> bool {
    actor.is_administrator()
}

/// Outcome of a block (or unblock) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDecision {
    Allowed,
    ActorBlocked,
    NotAdministrator,
    SelfBlock,
    /// A department administrator tried to block another administrator.
    AdministratorTarget,
    /// A super administrator tried to block another super administrator.
    SuperAdministratorTarget,
}

impl BlockDecision {
    pub fn is_allowed(self) -> bool {
        self == BlockDecision::Allowed
    }

    /// Reason shown to the caller when the request is refused.
    pub fn reason(self) -> &'static str {
        match self {
            BlockDecision::Allowed => "",
            BlockDecision::ActorBlocked => "You cannot moderate while blocked from the forum.",
            BlockDecision::NotAdministrator => "Only administrators can block users.",
            BlockDecision::SelfBlock => "You cannot block yourself.",
            BlockDecision::AdministratorTarget => {
                "You are not authorized to block another administrator."
            }
            BlockDecision::SuperAdministratorTarget => {
                "A super admin cannot block another super admin."
            }
        }
    }
}

/// Decide whether `actor` may flip the block flag of `target`.
///
/// Students can be blocked by any administrator.  Administrators can only be
/// blocked by a super administrator, and super administrators by nobody.
pub fn block_decision(actor: &Principal, target: &User) -> BlockDecision {
    if actor.is_forum_blocked {
        return BlockDecision::ActorBlocked;
    }
    if !actor.is_administrator() {
        return BlockDecision::NotAdministrator;
    }
    if actor.user_id == target.id {
        return BlockDecision::SelfBlock;
    }

    match target.role {
        Role::Student => BlockDecision::Allowed,
        Role::Administrator => {
            let target_is_super =
                is_super_administrator(target.role, target.department.as_deref());
            match (actor.is_super_administrator(), target_is_super) {
                (true, false) => BlockDecision::Allowed,
                (true, true) => BlockDecision::SuperAdministratorTarget,
                (false, _) => BlockDecision::AdministratorTarget,
            }
        }
    }
}

/// Single entry point over all of the above.
pub fn can_perform(action: Action, actor: &Principal, subject: Subject<'_>) -> bool {
    match (action, subject) {
        (Action::Edit, Subject::Post { author_id, .. }) => can_edit(actor, author_id),
        (Action::Delete, Subject::Post { author_id, author_role }) => {
            can_delete(actor, author_id, author_role)
        }
        (Action::Pin, Subject::Post { .. }) => can_pin(actor),
        (Action::Lock, Subject::Post { .. }) => can_lock(actor),
        (Action::Block, Subject::User(target)) => block_decision(actor, target).is_allowed(),
        (Action::ToggleGlobalLock, Subject::Forum) => can_toggle_global_lock(actor),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn principal(role: Role, department: Option<&str>) -> Principal {
        Principal {
            user_id: UserId::new(),
            display_name: "actor".into(),
            role,
            department: department.map(str::to_string),
            is_forum_blocked: false,
            blocked_by_name: None,
        }
    }

    fn user(role: Role, department: Option<&str>) -> User {
        User {
            id: UserId::new(),
            display_name: "target".into(),
            role,
            department: department.map(str::to_string),
            is_forum_blocked: false,
            blocked_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn super_administrator_needs_role_and_department() {
        assert!(is_super_administrator(Role::Administrator, Some("ALL_BRANCHES")));
        assert!(!is_super_administrator(Role::Administrator, Some("CSE")));
        assert!(!is_super_administrator(Role::Administrator, None));
        assert!(!is_super_administrator(Role::Student, Some("ALL_BRANCHES")));
    }

    #[test]
    fn only_author_may_edit() {
        let student = principal(Role::Student, None);
        let admin = principal(Role::Administrator, Some("ALL_BRANCHES"));

        assert!(can_edit(&student, student.user_id));
        assert!(!can_edit(&admin, student.user_id));
    }

    #[test]
    fn delete_rules() {
        let author = principal(Role::Student, None);
        let other_student = principal(Role::Student, None);
        let dept_admin = principal(Role::Administrator, Some("CSE"));
        let super_admin = principal(Role::Administrator, Some("ALL_BRANCHES"));
        let admin_author = UserId::new();

        assert!(can_delete(&author, author.user_id, Role::Student));
        assert!(!can_delete(&other_student, author.user_id, Role::Student));
        assert!(can_delete(&dept_admin, author.user_id, Role::Student));
        assert!(!can_delete(&dept_admin, admin_author, Role::Administrator));
        assert!(can_delete(&super_admin, admin_author, Role::Administrator));
        assert!(can_delete(&dept_admin, dept_admin.user_id, Role::Administrator));
    }

    #[test]
    fn moderation_switches_are_administrator_only() {
        let student = principal(Role::Student, None);
        let admin = principal(Role::Administrator, Some("ECE"));

        for check in [can_pin, can_lock, can_toggle_global_lock] {
            assert!(!check(&student));
            assert!(check(&admin));
        }
    }

    #[test]
    fn block_matrix() {
        let dept_admin = principal(Role::Administrator, Some("CSE"));
        let super_admin = principal(Role::Administrator, Some("ALL_BRANCHES"));
        let student = principal(Role::Student, None);

        let student_target = user(Role::Student, None);
        let admin_target = user(Role::Administrator, Some("MECH"));
        let super_target = user(Role::Administrator, Some("ALL_BRANCHES"));

        assert_eq!(block_decision(&dept_admin, &student_target), BlockDecision::Allowed);
        assert_eq!(
            block_decision(&dept_admin, &admin_target),
            BlockDecision::AdministratorTarget
        );
        assert_eq!(
            block_decision(&dept_admin, &super_target),
            BlockDecision::AdministratorTarget
        );
        assert_eq!(block_decision(&super_admin, &admin_target), BlockDecision::Allowed);
        assert_eq!(
            block_decision(&super_admin, &super_target),
            BlockDecision::SuperAdministratorTarget
        );
        assert_eq!(
            block_decision(&student, &student_target),
            BlockDecision::NotAdministrator
        );
    }

    #[test]
    fn cannot_block_self_or_while_blocked() {
        let mut admin = principal(Role::Administrator, Some("ALL_BRANCHES"));
        let mut me = user(Role::Administrator, Some("ALL_BRANCHES"));
        me.id = admin.user_id;
        assert_eq!(block_decision(&admin, &me), BlockDecision::SelfBlock);

        admin.is_forum_blocked = true;
        let student = user(Role::Student, None);
        assert_eq!(block_decision(&admin, &student), BlockDecision::ActorBlocked);
    }

    #[test]
    fn can_perform_rejects_mismatched_subjects() {
        let admin = principal(Role::Administrator, Some("ALL_BRANCHES"));
        let student = user(Role::Student, None);

        assert!(can_perform(Action::Block, &admin, Subject::User(&student)));
        assert!(!can_perform(Action::Block, &admin, Subject::Forum));
        assert!(!can_perform(Action::Edit, &admin, Subject::User(&student)));
        assert!(can_perform(Action::ToggleGlobalLock, &admin, Subject::Forum));
        assert!(can_perform(
            Action::Delete,
            &admin,
            Subject::Post {
                author_id: student.id,
                author_role: Role::Student,
            }
        ));
    }
}
