//! Move judgment: compare the played move against the engine's choice.

use shakmaty::{uci::UciMove, Chess, Color, Move, Position};
use tracing::{debug, warn};

use crate::error::AnnotateError;
use crate::stockfish::SearchEngine;

/// Engine verdict on one played move. Built per node and thrown away once the
/// node has been annotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    /// Engine's best move in the judged position
    pub best_move: Move,
    /// Normalized evaluation of the best move (side to move's view)
    pub best_eval: i32,
    /// Comment describing the best line's evaluation
    pub best_comment: String,
    /// Principal variation, starting with the best move
    pub pv: Vec<Move>,
    /// Normalized evaluation of the played move (same point of view)
    pub played_eval: i32,
    /// Comment describing the played move's evaluation
    pub played_comment: String,
}

impl Judgment {
    /// Evaluation lost by the played move; negative means worse than best.
    pub fn delta(&self) -> i32 {
        self.played_eval - self.best_eval
    }
}

/// Judge `played` in `position` by searching to `depth`.
///
/// One search when the played move is the engine's best move, two otherwise.
/// `position` is never modified.
pub async fn judge_move<E: SearchEngine>(
    engine: &mut E,
    position: &Chess,
    played: &Move,
    depth: u32,
) -> Result<Judgment, AnnotateError> {
    let white_to_move = position.turn() == Color::White;

    let best = engine.search(position, depth).await?;
    let best_score = best.score()?;
    let best_uci = best.best_move.as_deref().ok_or_else(|| {
        AnnotateError::EngineProtocol("engine returned no best move for a playable position".into())
    })?;
    let best_move = uci_to_move(position, best_uci)?;

    let mut pv = pv_to_moves(position, &best.pv)?;
    if pv.first() != Some(&best_move) {
        warn!(best_move = best_uci, pv = ?best.pv, "PV does not start with the best move, using the best move alone");
        pv = vec![best_move.clone()];
    }

    let best_eval = best_score.numeric();
    let best_comment = best_score.comment(white_to_move);

    let (played_eval, played_comment) = if *played == best_move {
        (best_eval, best_comment.clone())
    } else {
        let mut after = position.clone();
        after.play_unchecked(played.clone());
        let reply = engine.search(&after, depth).await?;
        // The reply is scored for the opponent
        let reply_score = reply.score()?;
        (
            -reply_score.numeric(),
            reply_score.negated().comment(white_to_move),
        )
    };

    debug!(
        best_move = best_uci,
        best_eval,
        played_eval,
        pv_len = pv.len(),
        "Move judged"
    );

    Ok(Judgment {
        best_move,
        best_eval,
        best_comment,
        pv,
        played_eval,
        played_comment,
    })
}

/// Resolve a UCI move string against `position`.
pub fn uci_to_move(position: &Chess, uci: &str) -> Result<Move, AnnotateError> {
    let uci_move: UciMove = uci
        .parse()
        .map_err(|_| AnnotateError::EngineProtocol(format!("unparseable move '{uci}'")))?;
    uci_move
        .to_move(position)
        .map_err(|_| AnnotateError::EngineProtocol(format!("illegal move '{uci}' from engine")))
}

/// Resolve a UCI line move by move from `position`.
fn pv_to_moves(position: &Chess, pv: &[String]) -> Result<Vec<Move>, AnnotateError> {
    let mut pos = position.clone();
    let mut moves = Vec::with_capacity(pv.len());
    for uci in pv {
        let mv = uci_to_move(&pos, uci)?;
        pos.play_unchecked(mv.clone());
        moves.push(mv);
    }
    Ok(moves)
}
