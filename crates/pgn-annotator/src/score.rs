/// Engine score normalization: one numeric scale for mate and centipawn
/// scores, plus the text used in move comments.

use crate::error::AnnotateError;

/// Numeric value of "mate now". Mate-in-N maps to `MATE_SCORE - N`, which
/// stays above any centipawn score an engine reports.
pub const MATE_SCORE: i32 = 10_000;

/// Engine score from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawns
    Cp(i32),
    /// Mate in N plies (positive = side to move mates, 0 or negative = gets mated)
    Mate(i32),
}

impl Score {
    /// Build a score from a UCI `info` line's optional fields. Mate wins if
    /// both are present.
    pub fn from_parts(cp: Option<i32>, mate: Option<i32>) -> Result<Self, AnnotateError> {
        match (mate, cp) {
            (Some(m), _) => Ok(Score::Mate(m)),
            (None, Some(cp)) => Ok(Score::Cp(cp)),
            (None, None) => Err(AnnotateError::EngineProtocol(
                "engine reported neither a mate nor a centipawn score".into(),
            )),
        }
    }

    pub fn numeric(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(m) if m > 0 => MATE_SCORE - m,
            Score::Mate(m) => -(MATE_SCORE - m.abs()),
        }
    }

    /// "Mate in N" or the score in pawns, shortest form with at least one
    /// decimal ("1.5", "-4.0", "0.35").
    pub fn human(self) -> String {
        match self {
            Score::Mate(m) => format!("Mate in {}", m.abs()),
            Score::Cp(cp) => {
                let pawns = f64::from(cp) / 100.0;
                if pawns.fract() == 0.0 {
                    format!("{pawns:.1}")
                } else {
                    format!("{pawns}")
                }
            }
        }
    }

    /// The same score seen from the other side.
    pub fn negated(self) -> Self {
        match self {
            Score::Cp(cp) => Score::Cp(-cp),
            Score::Mate(m) => Score::Mate(-m),
        }
    }

    /// Comment text: mate announcement, or White-relative pawns.
    pub fn comment(self, white_to_move: bool) -> String {
        match self {
            Score::Mate(_) => self.human(),
            Score::Cp(cp) => absolute(f64::from(cp) / 100.0, white_to_move),
        }
    }
}

/// Convert a side-to-move evaluation into White's point of view, two decimals.
pub fn absolute(number: f64, white_to_move: bool) -> String {
    let value = if white_to_move { number } else { -number };
    // never print "-0.00"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.2}")
}
