//! Comment Vote State Machine
//!
//! Every (user, comment) pair is in exactly one of three states. Casting a
//! vote of the same type as the current one withdraws it; casting the other
//! type flips it. [`VoteState::transition`] is pure and tells the storage
//! layer which row action to apply and how the comment's counters move.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ============================================================================
// Vote Type
// ============================================================================

/// A cast vote, carried on the wire and in storage as `1` / `-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteType {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("vote_type must be 1 or -1, got {0}")]
pub struct InvalidVoteType(pub i64);

impl VoteType {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteType {
    type Error = InvalidVoteType;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteType::Up),
            -1 => Ok(VoteType::Down),
            other => Err(InvalidVoteType(other)),
        }
    }
}

impl Serialize for VoteType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for VoteType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        VoteType::try_from(raw).map_err(de::Error::custom)
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// The caller's standing on one comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteState {
    NoVote,
    Upvoted,
    Downvoted,
}

/// What to do with the (user, comment) vote row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRowAction {
    Insert(VoteType),
    Update(VoteType),
    Delete,
}

/// Outcome of applying a requested vote to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub action: VoteRowAction,
    pub next: VoteState,
    pub upvote_delta: i64,
    pub downvote_delta: i64,
}

impl VoteState {
    /// State implied by the stored vote row, if any
    pub fn from_vote(vote: Option<VoteType>) -> Self {
        match vote {
            None => VoteState::NoVote,
            Some(VoteType::Up) => VoteState::Upvoted,
            Some(VoteType::Down) => VoteState::Downvoted,
        }
    }

    /// The vote row this state corresponds to
    pub fn vote(self) -> Option<VoteType> {
        match self {
            VoteState::NoVote => None,
            VoteState::Upvoted => Some(VoteType::Up),
            VoteState::Downvoted => Some(VoteType::Down),
        }
    }

    pub fn transition(self, requested: VoteType) -> VoteTransition {
        match (self.vote(), requested) {
            (None, VoteType::Up) => VoteTransition {
                action: VoteRowAction::Insert(VoteType::Up),
                next: VoteState::Upvoted,
                upvote_delta: 1,
                downvote_delta: 0,
            },
            (None, VoteType::Down) => VoteTransition {
                action: VoteRowAction::Insert(VoteType::Down),
                next: VoteState::Downvoted,
                upvote_delta: 0,
                downvote_delta: 1,
            },
            (Some(VoteType::Up), VoteType::Up) => VoteTransition {
                action: VoteRowAction::Delete,
                next: VoteState::NoVote,
                upvote_delta: -1,
                downvote_delta: 0,
            },
            (Some(VoteType::Down), VoteType::Down) => VoteTransition {
                action: VoteRowAction::Delete,
                next: VoteState::NoVote,
                upvote_delta: 0,
                downvote_delta: -1,
            },
            (Some(VoteType::Up), VoteType::Down) => VoteTransition {
                action: VoteRowAction::Update(VoteType::Down),
                next: VoteState::Downvoted,
                upvote_delta: -1,
                downvote_delta: 1,
            },
            (Some(VoteType::Down), VoteType::Up) => VoteTransition {
                action: VoteRowAction::Update(VoteType::Up),
                next: VoteState::Upvoted,
                upvote_delta: 1,
                downvote_delta: -1,
            },
        }
    }
}
