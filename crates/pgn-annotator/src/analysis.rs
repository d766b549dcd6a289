/// Move quality classification: pure functions only
/// (No Board/Tree/Engine dependencies)

use serde::{Deserialize, Serialize};

use crate::judge::Judgment;

/// Evaluation loss (normalized units, 100 ≈ one pawn) that earns an annotation
const THRESHOLD_ANNOTATE: i32 = 50;
const THRESHOLD_DUBIOUS: i32 = 75;
const THRESHOLD_MISTAKE: i32 = 150;
const THRESHOLD_BLUNDER: i32 = 300;

/// Beyond this evaluation the game is decided and losses are not flagged
const DECIDED_EVAL: i32 = 800;

/// Standard NAG codes
pub const NAG_MISTAKE: u8 = 2;
pub const NAG_BLUNDER: u8 = 4;
pub const NAG_DUBIOUS_MOVE: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    None,
    Dubious,
    Mistake,
    Blunder,
}

impl MoveQuality {
    /// Glyphs for this category: empty, or exactly one NAG.
    pub fn nags(self) -> Vec<u8> {
        match self {
            MoveQuality::None => vec![],
            MoveQuality::Dubious => vec![NAG_DUBIOUS_MOVE],
            MoveQuality::Mistake => vec![NAG_MISTAKE],
            MoveQuality::Blunder => vec![NAG_BLUNDER],
        }
    }
}

/// Whether the played move lost enough to be worth a comment and variation.
pub fn needs_annotation(judgment: &Judgment) -> bool {
    judgment.delta() < -THRESHOLD_ANNOTATE
}

pub fn classify_delta(delta: i32, best_eval: i32, played_eval: i32) -> MoveQuality {
    let quality = if delta < -THRESHOLD_BLUNDER {
        MoveQuality::Blunder
    } else if delta < -THRESHOLD_MISTAKE {
        MoveQuality::Mistake
    } else if delta < -THRESHOLD_DUBIOUS {
        MoveQuality::Dubious
    } else {
        MoveQuality::None
    };

    // Still overwhelming after the move, or lost whatever was played
    if played_eval > DECIDED_EVAL || best_eval < -DECIDED_EVAL {
        return MoveQuality::None;
    }

    quality
}

pub fn classify(judgment: &Judgment) -> MoveQuality {
    classify_delta(judgment.delta(), judgment.best_eval, judgment.played_eval)
}
