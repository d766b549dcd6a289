use std::collections::HashMap;

use pgn_annotator::error::AnnotateError;
use pgn_annotator::stockfish::{SearchEngine, SearchInfo};
use shakmaty::{fen::Fen, uci::UciMove, CastlingMode, Chess, EnPassantMode, Position};

/// In-process engine answering from a FEN-keyed script.
///
/// Unscripted positions get the first legal move at 0.00, which never
/// triggers an annotation.
pub struct ScriptedEngine {
    replies: HashMap<String, SearchInfo>,
    /// FEN of every searched position, in request order
    pub searched: Vec<String>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            searched: Vec::new(),
        }
    }

    pub fn cp(mut self, fen: String, cp: i32, pv: &[&str]) -> Self {
        self.replies.insert(
            fen,
            SearchInfo {
                cp: Some(cp),
                mate: None,
                best_move: pv.first().map(|s| s.to_string()),
                pv: pv.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }
}

impl SearchEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn search(&mut self, position: &Chess, _depth: u32) -> Result<SearchInfo, AnnotateError> {
        let key = fen_of(position);
        self.searched.push(key.clone());
        if let Some(reply) = self.replies.get(&key) {
            return Ok(reply.clone());
        }

        let first = position
            .legal_moves()
            .first()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string());
        let (cp, mate) = if position.is_checkmate() {
            (None, Some(0))
        } else {
            (Some(0), None)
        };
        Ok(SearchInfo {
            cp,
            mate,
            pv: first.iter().cloned().collect(),
            best_move: first,
        })
    }
}

pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// FEN after playing `ucis` from the standard start.
pub fn fen_after(ucis: &[&str]) -> String {
    let mut pos = Chess::default();
    for uci in ucis {
        let mv = uci.parse::<UciMove>().unwrap().to_move(&pos).unwrap();
        pos.play_unchecked(mv);
    }
    fen_of(&pos)
}
