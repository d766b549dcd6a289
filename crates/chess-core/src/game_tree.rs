//! Arena-backed move tree for a single game record.
//!
//! Nodes are owned by the tree and addressed by [`NodeId`]. A node's children
//! are ordered: index 0 is the main line, the rest are side variations.
//! Reordering children never removes one, so ids stay valid for the lifetime
//! of the tree.

use shakmaty::{fen::Fen, san::San, Chess, EnPassantMode, Move, Position};
use thiserror::Error;

/// Halfmove clock at which a draw may be claimed.
const FIFTY_MOVE_PLIES: u32 = 100;

/// Halfmove clock at which the game is drawn without a claim.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {child:?} is not a variation of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0:?} is already the last variation")]
    AlreadyLast(NodeId),

    #[error("Illegal move {mv} at node {node:?}")]
    IllegalMove { node: NodeId, mv: String },

    #[error("The root node has no move")]
    RootHasNoMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct GameNode {
    parent: Option<NodeId>,
    mv: Option<Move>,
    san: Option<String>,
    position: Chess,
    children: Vec<NodeId>,
    pub comment: String,
    pub nags: Vec<u8>,
}

impl GameNode {
    /// The move that produced this node (None for the root).
    pub fn mv(&self) -> Option<&Move> {
        self.mv.as_ref()
    }

    /// SAN of the move that produced this node, with `+`/`#` suffix.
    pub fn san(&self) -> Option<&str> {
        self.san.as_deref()
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<GameNode>,
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new(Chess::default())
    }
}

impl GameTree {
    /// Create a tree whose root holds `start`.
    pub fn new(start: Chess) -> Self {
        Self {
            nodes: vec![GameNode {
                parent: None,
                mv: None,
                san: None,
                position: start,
                children: Vec::new(),
                comment: String::new(),
                nags: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Result<&GameNode, TreeError> {
        self.nodes.get(id.0).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut GameNode, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.node(id)?.children)
    }

    pub fn main_child(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(id)?.children.first().copied())
    }

    pub fn position(&self, id: NodeId) -> Result<&Chess, TreeError> {
        Ok(&self.node(id)?.position)
    }

    /// The move that produced `id`. Errors on the root.
    pub fn move_of(&self, id: NodeId) -> Result<&Move, TreeError> {
        self.node(id)?.mv.as_ref().ok_or(TreeError::RootHasNoMove)
    }

    /// Append `mv` as a new child of `parent`. The first child of a node is
    /// its main line; later children are side variations.
    pub fn attach_child(&mut self, parent: NodeId, mv: Move) -> Result<NodeId, TreeError> {
        let before = self.position(parent)?.clone();
        if !before.legal_moves().contains(&mv) {
            return Err(TreeError::IllegalMove {
                node: parent,
                mv: mv.to_uci(shakmaty::CastlingMode::Standard).to_string(),
            });
        }

        let san = San::from_move(&before, mv.clone()).to_string();
        let mut after = before;
        after.play_unchecked(mv.clone());
        let suffix = if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(GameNode {
            parent: Some(parent),
            mv: Some(mv),
            san: Some(format!("{san}{suffix}")),
            position: after,
            children: Vec::new(),
            comment: String::new(),
            nags: Vec::new(),
        });
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        self.node(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(TreeError::NotAChild { parent, child })
    }

    /// Make `child` the main line of `parent`. Other children keep their
    /// relative order.
    pub fn set_main(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let idx = self.child_index(parent, child)?;
        let children = &mut self.node_mut(parent)?.children;
        let id = children.remove(idx);
        children.insert(0, id);
        Ok(())
    }

    /// Move `child` one step down the variation list of `parent`.
    pub fn demote(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let idx = self.child_index(parent, child)?;
        let children = &mut self.node_mut(parent)?.children;
        if idx + 1 >= children.len() {
            return Err(TreeError::AlreadyLast(child));
        }
        children.swap(idx, idx + 1);
        Ok(())
    }

    /// First child of `parent` reached by `mv`.
    pub fn variation(&self, parent: NodeId, mv: &Move) -> Result<Option<NodeId>, TreeError> {
        for &child in &self.node(parent)?.children {
            if self.node(child)?.mv.as_ref() == Some(mv) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Node ids along the main line, root first.
    pub fn mainline(&self) -> Vec<NodeId> {
        let mut line = vec![self.root()];
        let mut current = self.root();
        while let Some(&next) = self.nodes[current.0].children.first() {
            line.push(next);
            current = next;
        }
        line
    }

    /// Last node of the main line (the root for an empty game).
    pub fn mainline_end(&self) -> NodeId {
        let mut current = self.root();
        while let Some(&next) = self.nodes[current.0].children.first() {
            current = next;
        }
        current
    }

    pub fn set_comment(&mut self, id: NodeId, comment: impl Into<String>) -> Result<(), TreeError> {
        self.node_mut(id)?.comment = comment.into();
        Ok(())
    }

    pub fn set_nags(&mut self, id: NodeId, nags: Vec<u8>) -> Result<(), TreeError> {
        self.node_mut(id)?.nags = nags;
        Ok(())
    }

    pub fn push_nag(&mut self, id: NodeId, nag: u8) -> Result<(), TreeError> {
        self.node_mut(id)?.nags.push(nag);
        Ok(())
    }

    /// Append to an existing comment, separated by a space.
    pub fn append_comment(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if !node.comment.is_empty() {
            node.comment.push(' ');
        }
        node.comment.push_str(text);
        Ok(())
    }

    /// How many times the position at `id` occurs on the path from the root,
    /// counting `id` itself.
    pub fn repetitions(&self, id: NodeId) -> Result<usize, TreeError> {
        let key = repetition_key(self.position(id)?);
        let mut count = 0;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            if repetition_key(&node.position) == key {
                count += 1;
            }
            current = node.parent;
        }
        Ok(count)
    }

    pub fn is_checkmate(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.position(id)?.is_checkmate())
    }

    pub fn is_stalemate(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.position(id)?.is_stalemate())
    }

    pub fn is_insufficient_material(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.position(id)?.is_insufficient_material())
    }

    pub fn can_claim_fifty_moves(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.position(id)?.halfmoves() >= FIFTY_MOVE_PLIES)
    }

    pub fn can_claim_threefold_repetition(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.repetitions(id)? >= 3)
    }

    /// Game over without any claim: mate, stalemate, dead position,
    /// seventy-five-move rule or fivefold repetition.
    pub fn is_game_over(&self, id: NodeId) -> Result<bool, TreeError> {
        let pos = self.position(id)?;
        Ok(pos.is_checkmate()
            || pos.is_stalemate()
            || pos.is_insufficient_material()
            || pos.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES
            || self.repetitions(id)? >= 5)
    }
}

/// Placement, side to move, castling rights and legal en passant square.
fn repetition_key(pos: &Chess) -> String {
    let fen = Fen::from_position(pos, EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}
