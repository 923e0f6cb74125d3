//! Wire form of the world state sent from the authoritative world to mirrors
//!
//! Every snapshot is a full state: all actors in join order. Join and leave are
//! visible as ids appearing in or disappearing from the list. Sequence numbers
//! only grow, so a mirror can drop duplicates and late arrivals.

use crate::actor::ActorId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: ActorId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub on_ground: bool,
    pub facing: f32,
    pub round_score: u32,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sequence: u64,
    pub tick: u64,
    pub round: u32,
    pub actors: Vec<ActorState>,
}

impl Snapshot {
    /// True if a mirror that last applied `last_applied` should apply this one.
    pub fn is_newer_than(&self, last_applied: Option<u64>) -> bool {
        match last_applied {
            Some(last) => self.sequence > last,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(sequence: u64) -> Snapshot {
        Snapshot {
            sequence,
            tick: 0,
            round: 1,
            actors: vec![ActorState {
                id: 4,
                name: "Player 4".into(),
                x: 1.0,
                y: 2.0,
                vel_x: 0.0,
                vel_y: 0.0,
                on_ground: true,
                facing: 1.0,
                round_score: 0,
                wins: 0,
            }],
        }
    }

    #[test]
    fn test_sequence_ordering() {
        assert!(snapshot(1).is_newer_than(None));
        assert!(snapshot(5).is_newer_than(Some(4)));
        assert!(!snapshot(4).is_newer_than(Some(4)));
        assert!(!snapshot(3).is_newer_than(Some(4)));
    }
}
