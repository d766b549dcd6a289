//! Game record shared by the annotator: move tree and PGN I/O.

pub mod game_tree;
pub mod pgn;

pub use game_tree::{GameNode, GameTree, NodeId, TreeError};
pub use pgn::{read_game, read_game_file, render_game, Game, PgnError};
