//! Pure membership decision logic. No I/O: given the current aggregate
//! and one operation, compute the next valid state or reject. Every
//! function validates fully before touching a copy of the group, so a
//! rejected operation leaves no partial mutation behind.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gather_types::models::{Group, Invite, Outcome, Visibility};

use crate::error::GovernanceError;

/// One governance operation. `actor` is the authenticated caller in
/// every variant; target users are carried alongside.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    RequestJoin {
        actor: Uuid,
    },
    ApproveJoin {
        actor: Uuid,
        requester: Uuid,
    },
    DeclineJoin {
        actor: Uuid,
        requester: Uuid,
    },
    Invite {
        actor: Uuid,
        target: Uuid,
    },
    RespondInvite {
        actor: Uuid,
        accept: bool,
    },
    AddModerator {
        actor: Uuid,
        target: Uuid,
    },
    RemoveModerator {
        actor: Uuid,
        target: Uuid,
    },
    /// Covers both "leave" (actor == target) and "owner removes member".
    RemoveMember {
        actor: Uuid,
        target: Uuid,
        new_owner: Option<Uuid>,
    },
}

/// The next state plus what happened, for caller notification.
#[derive(Debug, Clone)]
pub struct Transition {
    pub group: Group,
    pub outcome: Outcome,
}

impl Transition {
    fn new(group: Group, outcome: Outcome) -> Self {
        Self { group, outcome }
    }
}

/// Apply one operation to the group. `now` stamps any invite created by
/// this operation; passing it in keeps the engine deterministic.
pub fn apply(
    group: &Group,
    op: &Operation,
    now: DateTime<Utc>,
) -> Result<Transition, GovernanceError> {
    match *op {
        Operation::RequestJoin { actor } => request_join(group, actor),
        Operation::ApproveJoin { actor, requester } => approve_join(group, actor, requester),
        Operation::DeclineJoin { actor, requester } => decline_join(group, actor, requester),
        Operation::Invite { actor, target } => invite(group, actor, target, now),
        Operation::RespondInvite { actor, accept } => respond_invite(group, actor, accept),
        Operation::AddModerator { actor, target } => add_moderator(group, actor, target),
        Operation::RemoveModerator { actor, target } => remove_moderator(group, actor, target),
        Operation::RemoveMember {
            actor,
            target,
            new_owner,
        } => remove_member(group, actor, target, new_owner),
    }
}

fn request_join(group: &Group, actor: Uuid) -> Result<Transition, GovernanceError> {
    if group.is_member(actor) {
        return Ok(Transition::new(group.clone(), Outcome::AlreadyMember));
    }

    let mut next = group.clone();
    match group.visibility {
        Visibility::Public => {
            next.members.push(actor);
            // Clears a stale request left over from a visibility change.
            remove_id(&mut next.join_requests, actor);
            Ok(Transition::new(next, Outcome::Joined))
        }
        Visibility::Private => {
            push_unique(&mut next.join_requests, actor);
            Ok(Transition::new(next, Outcome::RequestPending))
        }
    }
}

fn approve_join(group: &Group, actor: Uuid, requester: Uuid) -> Result<Transition, GovernanceError> {
    if actor != group.owner {
        return Err(GovernanceError::Unauthorized(
            "only the owner can approve join requests",
        ));
    }

    // Both halves are safe no-ops when the requester is absent/present
    // already, which makes approval idempotent.
    let mut next = group.clone();
    remove_id(&mut next.join_requests, requester);
    push_unique(&mut next.members, requester);
    Ok(Transition::new(next, Outcome::Approved))
}

fn decline_join(group: &Group, actor: Uuid, requester: Uuid) -> Result<Transition, GovernanceError> {
    if actor != group.owner {
        return Err(GovernanceError::Unauthorized(
            "only the owner can decline join requests",
        ));
    }

    let mut next = group.clone();
    remove_id(&mut next.join_requests, requester);
    Ok(Transition::new(next, Outcome::Declined))
}

fn invite(
    group: &Group,
    actor: Uuid,
    target: Uuid,
    now: DateTime<Utc>,
) -> Result<Transition, GovernanceError> {
    if actor != group.owner && !group.is_moderator(actor) {
        return Err(GovernanceError::Unauthorized(
            "only the owner or a moderator can invite",
        ));
    }

    // Matched on `to` only: a second invite is dropped regardless of
    // who sent the first one.
    if group.invite_for(target).is_some() {
        return Ok(Transition::new(group.clone(), Outcome::Invited));
    }

    let mut next = group.clone();
    next.invites.push(Invite {
        to: target,
        from: actor,
        created_at: now,
    });
    Ok(Transition::new(next, Outcome::Invited))
}

fn respond_invite(group: &Group, actor: Uuid, accept: bool) -> Result<Transition, GovernanceError> {
    if group.invite_for(actor).is_none() {
        return Err(GovernanceError::InvalidOperation("no pending invite"));
    }

    let mut next = group.clone();
    next.invites.retain(|i| i.to != actor);

    if !accept {
        return Ok(Transition::new(next, Outcome::InviteDeclined));
    }

    // An accepted invite always grants membership, bypassing visibility
    // and the join-request flow entirely.
    push_unique(&mut next.members, actor);
    // A join request filed before the invite arrived would now point at
    // a member; requests and members stay disjoint.
    remove_id(&mut next.join_requests, actor);
    Ok(Transition::new(next, Outcome::InviteAccepted))
}

fn add_moderator(group: &Group, actor: Uuid, target: Uuid) -> Result<Transition, GovernanceError> {
    if actor != group.owner {
        return Err(GovernanceError::Unauthorized(
            "only the owner can manage moderators",
        ));
    }
    if target == group.owner {
        return Err(GovernanceError::InvalidOperation(
            "the owner cannot be a moderator",
        ));
    }
    if !group.is_member(target) {
        return Err(GovernanceError::InvalidOperation("must be a member first"));
    }

    let mut next = group.clone();
    push_unique(&mut next.moderators, target);
    Ok(Transition::new(next, Outcome::ModeratorAdded))
}

fn remove_moderator(
    group: &Group,
    actor: Uuid,
    target: Uuid,
) -> Result<Transition, GovernanceError> {
    if actor != group.owner {
        return Err(GovernanceError::Unauthorized(
            "only the owner can manage moderators",
        ));
    }

    // No membership check: demoting someone who already left is a
    // harmless no-op.
    let mut next = group.clone();
    remove_id(&mut next.moderators, target);
    Ok(Transition::new(next, Outcome::ModeratorRemoved))
}

fn remove_member(
    group: &Group,
    actor: Uuid,
    target: Uuid,
    new_owner: Option<Uuid>,
) -> Result<Transition, GovernanceError> {
    if actor != target && actor != group.owner {
        return Err(GovernanceError::Unauthorized(
            "only the owner can remove other members",
        ));
    }

    if target == group.owner {
        return transfer_and_remove_owner(group, new_owner);
    }

    let mut next = group.clone();
    remove_id(&mut next.members, target);
    remove_id(&mut next.moderators, target);
    Ok(Transition::new(next, Outcome::Removed))
}

/// The owner is leaving: ownership must land on a valid moderator
/// before the departure is allowed.
fn transfer_and_remove_owner(
    group: &Group,
    new_owner: Option<Uuid>,
) -> Result<Transition, GovernanceError> {
    // Moderators who are current members, in moderator-list order. The
    // owner is never listed as a moderator, so no extra exclusion is
    // needed.
    let successors: Vec<Uuid> = group
        .moderators
        .iter()
        .copied()
        .filter(|m| group.is_member(*m))
        .collect();

    if successors.is_empty() {
        return Err(GovernanceError::InvalidOperation(
            "owner cannot leave: add a moderator first to transfer ownership",
        ));
    }

    let successor = match new_owner {
        Some(pick) => {
            if !successors.contains(&pick) {
                return Err(GovernanceError::InvalidOperation(
                    "selected new owner is not a valid moderator",
                ));
            }
            pick
        }
        // Deterministic: first valid successor in moderator-list order.
        None => successors[0],
    };

    let departing = group.owner;
    let mut next = group.clone();
    next.owner = successor;
    remove_id(&mut next.moderators, successor);
    remove_id(&mut next.members, departing);
    remove_id(&mut next.moderators, departing);
    Ok(Transition::new(
        next,
        Outcome::OwnershipTransferred {
            new_owner: successor,
        },
    ))
}

fn push_unique(list: &mut Vec<Uuid>, id: Uuid) {
    if !list.contains(&id) {
        list.push(id);
    }
}

fn remove_id(list: &mut Vec<Uuid>, id: Uuid) {
    list.retain(|x| *x != id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn group(visibility: Visibility) -> Group {
        Group::new(
            uid(99),
            "hikers".into(),
            "weekend hikes".into(),
            visibility,
            uid(1),
            now(),
        )
    }

    /// Apply and assert the group invariants still hold afterwards.
    fn apply_ok(group: &Group, op: Operation) -> Transition {
        let transition = apply(group, &op, now()).expect("operation should succeed");
        transition
            .group
            .validate()
            .expect("transition broke a group invariant");
        transition
    }

    fn apply_err(group: &Group, op: Operation) -> GovernanceError {
        apply(group, &op, now()).expect_err("operation should be rejected")
    }

    // -- RequestJoin --

    #[test]
    fn public_join_adds_member_immediately() {
        let g = group(Visibility::Public);
        let t = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        assert_eq!(t.outcome, Outcome::Joined);
        assert_eq!(t.group.members, vec![uid(1), uid(2)]);
        assert!(t.group.join_requests.is_empty());
    }

    #[test]
    fn private_join_queues_request() {
        let g = group(Visibility::Private);
        let t = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        assert_eq!(t.outcome, Outcome::RequestPending);
        assert_eq!(t.group.members, vec![uid(1)]);
        assert_eq!(t.group.join_requests, vec![uid(2)]);
    }

    #[test]
    fn join_by_member_is_noop() {
        let g = group(Visibility::Public);
        let t = apply_ok(&g, Operation::RequestJoin { actor: uid(1) });
        assert_eq!(t.outcome, Outcome::AlreadyMember);
        assert_eq!(t.group, g);
    }

    #[test]
    fn private_join_is_idempotent() {
        let g = group(Visibility::Private);
        let once = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        let twice = apply_ok(&once.group, Operation::RequestJoin { actor: uid(2) });
        assert_eq!(twice.group.join_requests, vec![uid(2)]);
    }

    #[test]
    fn public_join_clears_stale_request() {
        // A request filed while the group was private survives a flip
        // to public; joining must clear it.
        let mut g = group(Visibility::Public);
        g.join_requests.push(uid(2));
        let t = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        assert_eq!(t.outcome, Outcome::Joined);
        assert!(t.group.join_requests.is_empty());
        assert!(t.group.is_member(uid(2)));
    }

    // -- ApproveJoin / DeclineJoin --

    #[test]
    fn approve_moves_requester_to_members() {
        let g = group(Visibility::Private);
        let pending = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        let t = apply_ok(
            &pending.group,
            Operation::ApproveJoin {
                actor: uid(1),
                requester: uid(2),
            },
        );
        assert_eq!(t.group.members, vec![uid(1), uid(2)]);
        assert!(t.group.join_requests.is_empty());
    }

    #[test]
    fn approve_twice_equals_once() {
        let g = group(Visibility::Private);
        let pending = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        let op = Operation::ApproveJoin {
            actor: uid(1),
            requester: uid(2),
        };
        let once = apply_ok(&pending.group, op);
        let twice = apply_ok(&once.group, op);
        assert_eq!(once.group, twice.group);
    }

    #[test]
    fn approve_requires_owner() {
        let g = group(Visibility::Private);
        let pending = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        let err = apply_err(
            &pending.group,
            Operation::ApproveJoin {
                actor: uid(2),
                requester: uid(2),
            },
        );
        assert!(matches!(err, GovernanceError::Unauthorized(_)));
    }

    #[test]
    fn decline_removes_request_only() {
        let g = group(Visibility::Private);
        let pending = apply_ok(&g, Operation::RequestJoin { actor: uid(2) });
        let t = apply_ok(
            &pending.group,
            Operation::DeclineJoin {
                actor: uid(1),
                requester: uid(2),
            },
        );
        assert_eq!(t.outcome, Outcome::Declined);
        assert!(t.group.join_requests.is_empty());
        assert!(!t.group.is_member(uid(2)));
    }

    #[test]
    fn decline_requires_owner() {
        let g = group(Visibility::Private);
        let err = apply_err(
            &g,
            Operation::DeclineJoin {
                actor: uid(3),
                requester: uid(2),
            },
        );
        assert!(matches!(err, GovernanceError::Unauthorized(_)));
    }

    // -- Invite / RespondInvite --

    #[test]
    fn owner_and_moderator_can_invite() {
        let mut g = group(Visibility::Private);
        g.members.push(uid(2));
        g.moderators.push(uid(2));

        let by_owner = apply_ok(
            &g,
            Operation::Invite {
                actor: uid(1),
                target: uid(3),
            },
        );
        assert_eq!(by_owner.group.invites.len(), 1);
        assert_eq!(by_owner.group.invites[0].from, uid(1));

        let by_moderator = apply_ok(
            &g,
            Operation::Invite {
                actor: uid(2),
                target: uid(3),
            },
        );
        assert_eq!(by_moderator.group.invites[0].from, uid(2));
    }

    #[test]
    fn plain_member_cannot_invite() {
        let mut g = group(Visibility::Private);
        g.members.push(uid(2));
        let err = apply_err(
            &g,
            Operation::Invite {
                actor: uid(2),
                target: uid(3),
            },
        );
        assert!(matches!(err, GovernanceError::Unauthorized(_)));
    }

    #[test]
    fn second_invite_is_ignored() {
        let mut g = group(Visibility::Private);
        g.members.push(uid(2));
        g.moderators.push(uid(2));
        let first = apply_ok(
            &g,
            Operation::Invite {
                actor: uid(1),
                target: uid(3),
            },
        );
        // Different sender, same target: still dropped.
        let second = apply_ok(
            &first.group,
            Operation::Invite {
                actor: uid(2),
                target: uid(3),
            },
        );
        assert_eq!(second.group.invites.len(), 1);
        assert_eq!(second.group.invites[0].from, uid(1));
    }

    #[test]
    fn accepted_invite_bypasses_private_visibility() {
        let g = group(Visibility::Private);
        let invited = apply_ok(
            &g,
            Operation::Invite {
                actor: uid(1),
                target: uid(3),
            },
        );
        let t = apply_ok(
            &invited.group,
            Operation::RespondInvite {
                actor: uid(3),
                accept: true,
            },
        );
        assert_eq!(t.outcome, Outcome::InviteAccepted);
        assert!(t.group.is_member(uid(3)));
        assert!(t.group.invites.is_empty());
        assert!(t.group.join_requests.is_empty());
    }

    #[test]
    fn declined_invite_changes_nothing_else() {
        let g = group(Visibility::Private);
        let invited = apply_ok(
            &g,
            Operation::Invite {
                actor: uid(1),
                target: uid(3),
            },
        );
        let t = apply_ok(
            &invited.group,
            Operation::RespondInvite {
                actor: uid(3),
                accept: false,
            },
        );
        assert_eq!(t.outcome, Outcome::InviteDeclined);
        assert!(!t.group.is_member(uid(3)));
        assert!(t.group.invites.is_empty());
    }

    #[test]
    fn responding_without_invite_is_rejected() {
        let g = group(Visibility::Private);
        let err = apply_err(
            &g,
            Operation::RespondInvite {
                actor: uid(3),
                accept: true,
            },
        );
        assert!(matches!(err, GovernanceError::InvalidOperation(_)));
    }

    #[test]
    fn accepting_invite_clears_stale_join_request() {
        let g = group(Visibility::Private);
        let pending = apply_ok(&g, Operation::RequestJoin { actor: uid(3) });
        let invited = apply_ok(
            &pending.group,
            Operation::Invite {
                actor: uid(1),
                target: uid(3),
            },
        );
        let t = apply_ok(
            &invited.group,
            Operation::RespondInvite {
                actor: uid(3),
                accept: true,
            },
        );
        assert!(t.group.is_member(uid(3)));
        assert!(t.group.join_requests.is_empty());
    }

    // -- AddModerator / RemoveModerator --

    #[test]
    fn promote_requires_membership() {
        let g = group(Visibility::Public);
        let err = apply_err(
            &g,
            Operation::AddModerator {
                actor: uid(1),
                target: uid(2),
            },
        );
        assert!(matches!(err, GovernanceError::InvalidOperation(_)));
    }

    #[test]
    fn promote_is_idempotent() {
        let mut g = group(Visibility::Public);
        g.members.push(uid(2));
        let op = Operation::AddModerator {
            actor: uid(1),
            target: uid(2),
        };
        let once = apply_ok(&g, op);
        let twice = apply_ok(&once.group, op);
        assert_eq!(twice.group.moderators, vec![uid(2)]);
    }

    #[test]
    fn owner_cannot_be_promoted() {
        let g = group(Visibility::Public);
        let err = apply_err(
            &g,
            Operation::AddModerator {
                actor: uid(1),
                target: uid(1),
            },
        );
        assert!(matches!(err, GovernanceError::InvalidOperation(_)));
    }

    #[test]
    fn moderator_changes_require_owner() {
        let mut g = group(Visibility::Public);
        g.members.extend([uid(2), uid(3)]);
        g.moderators.push(uid(2));

        let add = apply_err(
            &g,
            Operation::AddModerator {
                actor: uid(2),
                target: uid(3),
            },
        );
        assert!(matches!(add, GovernanceError::Unauthorized(_)));

        let remove = apply_err(
            &g,
            Operation::RemoveModerator {
                actor: uid(2),
                target: uid(2),
            },
        );
        assert!(matches!(remove, GovernanceError::Unauthorized(_)));
    }

    #[test]
    fn demote_is_unconditional() {
        let mut g = group(Visibility::Public);
        g.members.push(uid(2));
        g.moderators.push(uid(2));
        let op = Operation::RemoveModerator {
            actor: uid(1),
            target: uid(2),
        };
        let once = apply_ok(&g, op);
        assert!(once.group.moderators.is_empty());
        // Demoting again, or demoting someone never promoted, still works.
        let twice = apply_ok(&once.group, op);
        assert!(twice.group.moderators.is_empty());
    }

    // -- RemoveMember / ownership transfer --

    #[test]
    fn member_can_leave() {
        let mut g = group(Visibility::Public);
        g.members.push(uid(2));
        let t = apply_ok(
            &g,
            Operation::RemoveMember {
                actor: uid(2),
                target: uid(2),
                new_owner: None,
            },
        );
        assert_eq!(t.outcome, Outcome::Removed);
        assert_eq!(t.group.members, vec![uid(1)]);
    }

    #[test]
    fn leaving_moderator_loses_both_entries() {
        let mut g = group(Visibility::Public);
        g.members.push(uid(2));
        g.moderators.push(uid(2));
        let t = apply_ok(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(2),
                new_owner: None,
            },
        );
        assert!(!t.group.is_member(uid(2)));
        assert!(!t.group.is_moderator(uid(2)));
    }

    #[test]
    fn bystander_cannot_remove_others() {
        let mut g = group(Visibility::Public);
        g.members.extend([uid(2), uid(3)]);
        let err = apply_err(
            &g,
            Operation::RemoveMember {
                actor: uid(2),
                target: uid(3),
                new_owner: None,
            },
        );
        assert!(matches!(err, GovernanceError::Unauthorized(_)));
    }

    #[test]
    fn owner_cannot_leave_without_successor() {
        let mut g = group(Visibility::Public);
        g.members.push(uid(2));
        let err = apply_err(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: None,
            },
        );
        assert!(matches!(err, GovernanceError::InvalidOperation(_)));
    }

    #[test]
    fn owner_leave_promotes_first_moderator_in_order() {
        let mut g = group(Visibility::Public);
        g.members.extend([uid(2), uid(3)]);
        g.moderators.extend([uid(3), uid(2)]);
        let t = apply_ok(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: None,
            },
        );
        assert_eq!(
            t.outcome,
            Outcome::OwnershipTransferred { new_owner: uid(3) }
        );
        assert_eq!(t.group.owner, uid(3));
        // The successor leaves the moderator list; uid(2) stays on it.
        assert_eq!(t.group.moderators, vec![uid(2)]);
        assert!(!t.group.is_member(uid(1)));
    }

    #[test]
    fn owner_leave_single_moderator_scenario() {
        // Literal scenario: {owner: U1, members: [U1, U2], moderators: [U2]}.
        let mut g = group(Visibility::Public);
        g.members.push(uid(2));
        g.moderators.push(uid(2));
        let t = apply_ok(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: None,
            },
        );
        assert_eq!(t.group.owner, uid(2));
        assert!(t.group.moderators.is_empty());
        assert_eq!(t.group.members, vec![uid(2)]);
    }

    #[test]
    fn explicit_successor_is_honored() {
        let mut g = group(Visibility::Public);
        g.members.extend([uid(2), uid(3)]);
        g.moderators.extend([uid(2), uid(3)]);
        let t = apply_ok(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: Some(uid(3)),
            },
        );
        assert_eq!(t.group.owner, uid(3));
        assert_eq!(t.group.moderators, vec![uid(2)]);
    }

    #[test]
    fn explicit_successor_must_be_valid_moderator() {
        let mut g = group(Visibility::Public);
        g.members.extend([uid(2), uid(3)]);
        g.moderators.push(uid(2));
        let err = apply_err(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: Some(uid(3)),
            },
        );
        assert!(matches!(err, GovernanceError::InvalidOperation(_)));
    }

    #[test]
    fn rejected_operations_leave_state_untouched() {
        let g = group(Visibility::Private);
        let before = g.clone();
        let _ = apply_err(
            &g,
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: None,
            },
        );
        assert_eq!(g, before);
    }

    #[test]
    fn invariants_hold_across_a_full_lifecycle() {
        let mut g = group(Visibility::Private);
        let ops = [
            Operation::RequestJoin { actor: uid(2) },
            Operation::ApproveJoin {
                actor: uid(1),
                requester: uid(2),
            },
            Operation::Invite {
                actor: uid(1),
                target: uid(3),
            },
            Operation::RespondInvite {
                actor: uid(3),
                accept: true,
            },
            Operation::AddModerator {
                actor: uid(1),
                target: uid(2),
            },
            Operation::AddModerator {
                actor: uid(1),
                target: uid(3),
            },
            Operation::RemoveModerator {
                actor: uid(1),
                target: uid(3),
            },
            Operation::RemoveMember {
                actor: uid(3),
                target: uid(3),
                new_owner: None,
            },
            Operation::RemoveMember {
                actor: uid(1),
                target: uid(1),
                new_owner: None,
            },
        ];
        for op in ops {
            g = apply_ok(&g, op).group;
        }
        assert_eq!(g.owner, uid(2));
        assert_eq!(g.members, vec![uid(2)]);
        assert!(g.moderators.is_empty());
    }
}
