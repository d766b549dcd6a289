//! Writes a judgment into the game tree: comment, engine line, glyphs.

use chess_core::{GameTree, NodeId, TreeError};
use tracing::debug;

use crate::analysis::classify;
use crate::judge::Judgment;

/// Longest engine line worth showing for a search of `depth` plies. Lines get
/// unreliable near the search horizon.
pub fn max_variation_len(depth: u32) -> usize {
    (depth / 2) as usize
}

/// Text for the end of an inserted line: how the game stands there, or
/// `score` when nothing ended it. Checkmate needs no words.
pub fn variation_end_comment(tree: &GameTree, id: NodeId, score: &str) -> Result<String, TreeError> {
    let comment = if tree.is_stalemate(id)? {
        "Stalemate"
    } else if tree.is_insufficient_material(id)? {
        "Insufficient material to mate"
    } else if tree.can_claim_fifty_moves(id)? {
        "Fifty move rule"
    } else if tree.can_claim_threefold_repetition(id)? {
        "Three-fold repetition"
    } else if tree.is_checkmate(id)? {
        ""
    } else {
        score
    };
    Ok(comment.to_string())
}

/// Annotate `node` (a played move) with `judgment`.
///
/// The engine line is built under the parent while it is the main line, then
/// demoted so the played move is main again.
pub fn annotate_node(
    tree: &mut GameTree,
    node: NodeId,
    judgment: &Judgment,
    depth: u32,
) -> Result<(), TreeError> {
    let parent = tree.parent(node)?.ok_or(TreeError::RootHasNoMove)?;

    if tree.move_of(node)? != &judgment.best_move {
        tree.set_comment(node, judgment.played_comment.clone())?;
    }

    let branch = tree.attach_child(parent, judgment.best_move.clone())?;
    tree.set_main(parent, branch)?;

    let mut var_node = branch;
    for mv in judgment.pv.iter().take(max_variation_len(depth)) {
        if tree.move_of(var_node)? == mv {
            continue;
        }
        let next = tree.attach_child(var_node, mv.clone())?;
        tree.set_main(var_node, next)?;
        var_node = next;
    }

    let end_comment = variation_end_comment(tree, var_node, &judgment.best_comment)?;
    tree.set_comment(var_node, end_comment)?;

    tree.demote(parent, branch)?;

    let quality = classify(judgment);
    tree.set_nags(node, quality.nags())?;

    debug!(?quality, variation_end = ?var_node, "Node annotated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{uci::UciMove, Move};

    fn mv(tree: &GameTree, at: NodeId, uci: &str) -> Move {
        let uci: UciMove = uci.parse().unwrap();
        uci.to_move(tree.position(at).unwrap()).unwrap()
    }

    fn line(tree: &GameTree, from: NodeId, ucis: &[&str]) -> Vec<Move> {
        let mut pos = tree.position(from).unwrap().clone();
        ucis.iter()
            .map(|u| {
                let m = u.parse::<UciMove>().unwrap().to_move(&pos).unwrap();
                shakmaty::Position::play_unchecked(&mut pos, m.clone());
                m
            })
            .collect()
    }

    fn judgment(best_move: Move, pv: Vec<Move>, best_eval: i32, played_eval: i32) -> Judgment {
        Judgment {
            best_move,
            best_eval,
            best_comment: "0.30".to_string(),
            pv,
            played_eval,
            played_comment: "-4.00".to_string(),
        }
    }

    #[test]
    fn test_annotate_blunder() {
        let mut tree = GameTree::default();
        let root = tree.root();
        let f3 = tree.attach_child(root, mv(&tree, root, "f2f3")).unwrap();

        let pv = line(&tree, root, &["e2e4", "e7e5", "g1f3", "b8c6"]);
        let j = judgment(pv[0].clone(), pv, 30, -400);
        annotate_node(&mut tree, f3, &j, 12).unwrap();

        let node = tree.node(f3).unwrap();
        assert_eq!(node.comment, "-4.00");
        assert_eq!(node.nags, vec![4]);

        // played move is main again, engine line is the only side variation
        let children = tree.children(root).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], f3);

        let mut end = children[1];
        let mut inserted = 1;
        while let Some(next) = tree.main_child(end).unwrap() {
            end = next;
            inserted += 1;
        }
        assert_eq!(inserted, 4);
        assert_eq!(tree.node(end).unwrap().comment, "0.30");
    }

    #[test]
    fn test_variation_truncated_to_half_depth() {
        let mut tree = GameTree::default();
        let root = tree.root();
        let a3 = tree.attach_child(root, mv(&tree, root, "a2a3")).unwrap();

        let pv = line(
            &tree,
            root,
            &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6"],
        );
        let j = judgment(pv[0].clone(), pv, 30, -100);
        annotate_node(&mut tree, a3, &j, 6).unwrap();

        let branch = tree.children(root).unwrap()[1];
        let mut inserted = 1;
        let mut end = branch;
        while let Some(next) = tree.main_child(end).unwrap() {
            end = next;
            inserted += 1;
        }
        assert_eq!(inserted, 3);
        assert_eq!(tree.main_child(root).unwrap(), Some(a3));
        assert_eq!(tree.node(a3).unwrap().nags, vec![6]);
    }

    #[test]
    fn test_variation_ending_in_mate_has_empty_comment() {
        let mut tree = GameTree::default();
        let mut node = tree.root();
        for uci in ["f2f3", "e7e5", "g2g4"] {
            let m = mv(&tree, node, uci);
            node = tree.attach_child(node, m).unwrap();
        }
        let parent = node;
        let played = mv(&tree, parent, "a7a6");
        let a6 = tree.attach_child(parent, played).unwrap();

        let pv = line(&tree, parent, &["d8h4"]);
        let mut j = judgment(pv[0].clone(), pv, 9999, 0);
        j.best_comment = "Mate in 1".to_string();
        annotate_node(&mut tree, a6, &j, 12).unwrap();

        let branch = tree.children(parent).unwrap()[1];
        assert!(tree.is_checkmate(branch).unwrap());
        assert_eq!(tree.node(branch).unwrap().comment, "");
        assert_eq!(tree.node(a6).unwrap().nags, vec![4]);
    }

    #[test]
    fn test_best_move_played_keeps_comment() {
        let mut tree = GameTree::default();
        let root = tree.root();
        let e4 = tree.attach_child(root, mv(&tree, root, "e2e4")).unwrap();
        tree.set_comment(e4, "book").unwrap();

        let pv = line(&tree, root, &["e2e4", "e7e5"]);
        let j = judgment(pv[0].clone(), pv, 30, 30);
        annotate_node(&mut tree, e4, &j, 12).unwrap();

        assert_eq!(tree.node(e4).unwrap().comment, "book");
        assert!(tree.node(e4).unwrap().nags.is_empty());
        assert_eq!(tree.main_child(root).unwrap(), Some(e4));
    }

    fn tree_at(fen: &str) -> GameTree {
        let start: shakmaty::Chess = fen
            .parse::<shakmaty::fen::Fen>()
            .unwrap()
            .into_position(shakmaty::CastlingMode::Standard)
            .unwrap();
        GameTree::new(start)
    }

    fn end_comment_at(fen: &str) -> String {
        let tree = tree_at(fen);
        variation_end_comment(&tree, tree.root(), "0.00").unwrap()
    }

    #[test]
    fn test_stalemate_end_comment() {
        assert_eq!(end_comment_at("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1"), "Stalemate");
    }

    #[test]
    fn test_insufficient_material_end_comment() {
        assert_eq!(
            end_comment_at("8/8/8/4k3/8/8/8/4K3 w - - 0 1"),
            "Insufficient material to mate"
        );
    }

    #[test]
    fn test_fifty_move_end_comment() {
        assert_eq!(end_comment_at("4k3/8/8/8/8/8/8/R3K3 w - - 100 80"), "Fifty move rule");
        assert_eq!(end_comment_at("4k3/8/8/8/8/8/8/R3K3 w - - 99 80"), "0.00");
    }

    #[test]
    fn test_fifty_move_claim_before_checkmate() {
        // back rank mate with the clock already at 100
        let tree = tree_at("R5k1/5ppp/8/8/8/8/8/6K1 b - - 100 80");
        assert!(tree.is_checkmate(tree.root()).unwrap());
        assert_eq!(
            variation_end_comment(&tree, tree.root(), "").unwrap(),
            "Fifty move rule"
        );
    }

    #[test]
    fn test_threefold_end_comment() {
        let mut tree = GameTree::default();
        let mut node = tree.root();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = mv(&tree, node, uci);
            node = tree.attach_child(node, m).unwrap();
        }
        assert_eq!(
            variation_end_comment(&tree, node, "0.10").unwrap(),
            "Three-fold repetition"
        );
    }

    #[test]
    fn test_depth_one_inserts_best_move_only() {
        let mut tree = GameTree::default();
        let root = tree.root();
        let f3 = tree.attach_child(root, mv(&tree, root, "f2f3")).unwrap();

        let pv = line(&tree, root, &["e2e4", "e7e5", "g1f3"]);
        let j = judgment(pv[0].clone(), pv, 30, -400);
        annotate_node(&mut tree, f3, &j, 1).unwrap();

        let branch = tree.children(root).unwrap()[1];
        assert!(tree.main_child(branch).unwrap().is_none());
        assert_eq!(tree.node(branch).unwrap().san(), Some("e4"));
        assert_eq!(tree.node(branch).unwrap().comment, "0.30");
    }
}
