//! Core game annotation loop
//!
//! Walks the main line from the last move back to the first so the engine's
//! hash table keeps serving closely related positions.

use chess_core::{Game, GameTree, NodeId};
use serde::{Deserialize, Serialize};
use shakmaty::{san::San, CastlingMode, Chess, Move};
use tracing::{debug, info};

use crate::analysis::{self, MoveQuality};
use crate::annotate::{annotate_node, variation_end_comment};
use crate::error::AnnotateError;
use crate::judge::{judge_move, Judgment};
use crate::stockfish::SearchEngine;

/// Per-move output for JSON serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReport {
    pub ply: usize,
    pub san: String,
    #[serde(rename = "move")]
    pub move_uci: String,
    pub best_move: String,
    pub best_eval: i32,
    pub played_eval: i32,
    pub delta: i32,
    pub quality: MoveQuality,
    pub annotated: bool,
}

/// Annotate every move of the main line of `game`.
///
/// Returns one report per judged move in game order. A final move that ends
/// the game is described, not judged; any other final move is always
/// annotated, whatever it lost.
pub async fn annotate_game<E: SearchEngine>(
    engine: &mut E,
    game: &mut Game,
    depth: u32,
) -> Result<Vec<MoveReport>, AnnotateError> {
    let tree = &mut game.tree;
    let root = tree.root();
    let mut reports = Vec::new();

    let last = tree.mainline_end();
    info!(plies = tree.mainline().len() - 1, depth, "Starting annotation");

    if last != root {
        if tree.is_game_over(last)? {
            let comment = variation_end_comment(tree, last, "")?;
            info!(comment = %comment, "Game over at final position");
            tree.set_comment(last, comment)?;
        } else {
            reports.push(judge_and_annotate(engine, tree, last, depth, true).await?);
        }

        let mut node = tree.parent(last)?.unwrap_or(root);
        while node != root {
            reports.push(judge_and_annotate(engine, tree, node, depth, false).await?);
            node = tree.parent(node)?.unwrap_or(root);
        }
    }

    tree.set_comment(root, format!("{} Depth: {}", engine.name(), depth))?;

    reports.reverse();
    info!(
        judged = reports.len(),
        annotated = reports.iter().filter(|r| r.annotated).count(),
        "Annotation complete"
    );
    Ok(reports)
}

/// Judge the move leading to `node` and annotate it if it lost enough, or
/// unconditionally with `always_annotate`.
async fn judge_and_annotate<E: SearchEngine>(
    engine: &mut E,
    tree: &mut GameTree,
    node: NodeId,
    depth: u32,
    always_annotate: bool,
) -> Result<MoveReport, AnnotateError> {
    let parent = tree.parent(node)?.ok_or(chess_core::TreeError::RootHasNoMove)?;
    let played = tree.move_of(node)?.clone();
    let before = tree.position(parent)?.clone();

    let judgment = judge_move(engine, &before, &played, depth).await?;
    let annotated = always_annotate || analysis::needs_annotation(&judgment);
    if annotated {
        annotate_node(tree, node, &judgment, depth)?;
    }

    let report = MoveReport {
        ply: ply_of(tree, node)?,
        san: tree.node(node)?.san().unwrap_or_default().to_string(),
        move_uci: to_uci(&played),
        best_move: to_uci(&judgment.best_move),
        best_eval: judgment.best_eval,
        played_eval: judgment.played_eval,
        delta: judgment.delta(),
        quality: analysis::classify(&judgment),
        annotated,
    };

    info!(
        ply = report.ply,
        played = %report.san,
        best = %San::from_move(&before, judgment.best_move.clone()),
        best_eval = report.best_eval,
        played_eval = report.played_eval,
        delta = report.delta,
        annotated,
        "Move judged"
    );
    debug!(
        fen = %shakmaty::fen::Fen::from_position(tree.position(node)?, shakmaty::EnPassantMode::Legal),
        best_comment = %judgment.best_comment,
        played_comment = %judgment.played_comment,
        pv = %pv_san(&before, &judgment),
        "Judgment detail"
    );

    Ok(report)
}

/// Half-move number of `node` counted from the root (first move = 1).
fn ply_of(tree: &GameTree, node: NodeId) -> Result<usize, AnnotateError> {
    let mut ply = 0;
    let mut current = node;
    while let Some(parent) = tree.parent(current)? {
        ply += 1;
        current = parent;
    }
    Ok(ply)
}

fn to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Principal variation in SAN for diagnostics.
fn pv_san(position: &Chess, judgment: &Judgment) -> String {
    let mut pos = position.clone();
    let mut moves = Vec::with_capacity(judgment.pv.len());
    for mv in &judgment.pv {
        moves.push(San::from_move(&pos, mv.clone()).to_string());
        shakmaty::Position::play_unchecked(&mut pos, mv.clone());
    }
    moves.join(" ")
}
