//! Room-level access policy. Every mutating handler asks `allows` before
//! touching state; the check always runs before the first write.

/// Privilege ladder within a room: `Creator > Admin > Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Member,
    Admin,
    Creator,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creator" => Some(Self::Creator),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SendMessage,
    EditOwnMessage,
    DeleteOwnMessage,
    DeleteAnyMessage,
    CreateInvite,
    DeleteInvite,
    ProcessAccessRequest,
    ManageAnnouncements,
    PromoteMember,
    DemoteAdmin,
    RemoveMember,
    DeleteRoom,
}

/// Pure decision function: may a holder of `role` perform `action`?
/// Non-members never reach this point (callers treat a missing
/// membership as an outright deny).
pub fn allows(role: Role, action: Action) -> bool {
    use Action::*;
    match action {
        SendMessage | EditOwnMessage | DeleteOwnMessage => true,
        DeleteAnyMessage | CreateInvite | DeleteInvite | ProcessAccessRequest
        | ManageAnnouncements => role >= Role::Admin,
        PromoteMember | DemoteAdmin | RemoveMember | DeleteRoom => role == Role::Creator,
    }
}
