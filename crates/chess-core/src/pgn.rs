//! PGN reading and writing for a single game, backed by [`GameTree`].
//!
//! Reading goes through the `pgn-reader` visitor API and keeps comments,
//! NAGs and nested variations. Writing produces one canonical layout so that
//! rendering a re-read game gives back the same bytes.

use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{Nag, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{fen::Fen, CastlingMode, Chess, Color, Position};
use thiserror::Error;

use crate::game_tree::{GameTree, NodeId, TreeError};

/// Seven Tag Roster with the placeholder used when a tag is missing.
const SEVEN_TAG_ROSTER: [(&str, &str); 7] = [
    ("Event", "?"),
    ("Site", "?"),
    ("Date", "????.??.??"),
    ("Round", "?"),
    ("White", "?"),
    ("Black", "?"),
    ("Result", "*"),
];

#[derive(Error, Debug)]
pub enum PgnError {
    #[error("No game found in input")]
    NoGame,

    #[error("Illegal move {san} in position {fen}")]
    IllegalMove { san: String, fen: String },

    #[error("Invalid FEN tag: {0}")]
    InvalidFen(String),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed game: tag pairs in input order, the move tree and the result.
#[derive(Debug, Clone)]
pub struct Game {
    pub headers: Vec<(String, String)>,
    pub tree: GameTree,
    pub result: String,
}

impl Game {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Movetext state while a game is being read.
struct GameState {
    headers: Vec<(String, String)>,
    tree: GameTree,
    current: NodeId,
    /// Nodes to return to when the open variations end.
    variation_stack: Vec<NodeId>,
}

/// Visitor that builds a [`Game`] from the first game in the input.
struct GameBuilder;

impl Visitor for GameBuilder {
    type Tags = Vec<(String, String)>;
    type Movetext = GameState;
    type Output = Result<Game, PgnError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.push((
            String::from_utf8_lossy(name).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, GameState> {
        let start = match start_position(&tags) {
            Ok(pos) => pos,
            Err(e) => return ControlFlow::Break(Err(e)),
        };
        let tree = GameTree::new(start);
        let current = tree.root();

        ControlFlow::Continue(GameState {
            headers: tags,
            tree,
            current,
            variation_stack: Vec::new(),
        })
    }

    fn san(&mut self, state: &mut GameState, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let pos = match state.tree.position(state.current) {
            Ok(pos) => pos,
            Err(e) => return ControlFlow::Break(Err(e.into())),
        };

        let mv = match san_plus.san.to_move(pos) {
            Ok(mv) => mv,
            Err(_) => {
                return ControlFlow::Break(Err(PgnError::IllegalMove {
                    san: san_plus.to_string(),
                    fen: Fen::from_position(pos, shakmaty::EnPassantMode::Legal).to_string(),
                }))
            }
        };

        match state.tree.attach_child(state.current, mv) {
            Ok(id) => {
                state.current = id;
                ControlFlow::Continue(())
            }
            Err(e) => ControlFlow::Break(Err(e.into())),
        }
    }

    fn nag(&mut self, state: &mut GameState, nag: Nag) -> ControlFlow<Self::Output> {
        match state.tree.push_nag(state.current, nag.0) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(Err(e.into())),
        }
    }

    fn comment(&mut self, state: &mut GameState, comment: RawComment<'_>) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes());
        let text = text.trim();
        if text.is_empty() {
            return ControlFlow::Continue(());
        }
        match state.tree.append_comment(state.current, text) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(Err(e.into())),
        }
    }

    fn begin_variation(&mut self, state: &mut GameState) -> ControlFlow<Self::Output, Skip> {
        // A variation replaces the last move, so it hangs off that move's parent
        let parent = match state.tree.parent(state.current) {
            Ok(parent) => parent.unwrap_or(state.current),
            Err(e) => return ControlFlow::Break(Err(e.into())),
        };
        state.variation_stack.push(state.current);
        state.current = parent;
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, state: &mut GameState) -> ControlFlow<Self::Output> {
        if let Some(resume) = state.variation_stack.pop() {
            state.current = resume;
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, state: GameState) -> Self::Output {
        let result = state
            .headers
            .iter()
            .find(|(k, _)| k == "Result")
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| final_result(&state.tree).to_string());

        Ok(Game {
            headers: state.headers,
            tree: state.tree,
            result,
        })
    }
}

/// Result implied by the end of the main line when no `Result` tag was given.
fn final_result(tree: &GameTree) -> &'static str {
    let Ok(pos) = tree.position(tree.mainline_end()) else {
        return "*";
    };
    if pos.is_checkmate() {
        if pos.turn() == Color::White {
            "0-1"
        } else {
            "1-0"
        }
    } else if pos.is_stalemate() || pos.is_insufficient_material() {
        "1/2-1/2"
    } else {
        "*"
    }
}

/// Starting position from the `FEN` tag, or the standard position.
fn start_position(tags: &[(String, String)]) -> Result<Chess, PgnError> {
    let Some((_, fen)) = tags.iter().find(|(k, _)| k == "FEN") else {
        return Ok(Chess::default());
    };
    let parsed: Fen = fen
        .parse()
        .map_err(|_| PgnError::InvalidFen(fen.clone()))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|_| PgnError::InvalidFen(fen.clone()))
}

/// Parse the first game in `pgn`.
pub fn read_game(pgn: &str) -> Result<Game, PgnError> {
    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut GameBuilder)? {
        Some(result) => result,
        None => Err(PgnError::NoGame),
    }
}

/// Read and parse the first game in the file at `path`.
pub fn read_game_file(path: &Path) -> Result<Game, PgnError> {
    let text = std::fs::read_to_string(path)?;
    read_game(&text)
}

/// Render a game as PGN: tag pairs, a blank line, single-line movetext.
pub fn render_game(game: &Game) -> Result<String, PgnError> {
    let mut out = String::new();

    for (name, default) in SEVEN_TAG_ROSTER {
        let value = if name == "Result" {
            game.result.as_str()
        } else {
            game.header(name).unwrap_or(default)
        };
        out.push_str(&tag_pair(name, value));
    }
    for (name, value) in &game.headers {
        if SEVEN_TAG_ROSTER.iter().any(|(n, _)| n == name) {
            continue;
        }
        out.push_str(&tag_pair(name, value));
    }
    out.push('\n');

    let mut writer = MovetextWriter::default();
    let tree = &game.tree;
    let root = tree.node(tree.root())?;
    if !root.comment.is_empty() {
        writer.comment(&root.comment);
    }
    writer.write_line(tree, tree.root(), true)?;
    writer.token(&game.result);

    out.push_str(&writer.out);
    out.push('\n');
    Ok(out)
}

fn tag_pair(name: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{name} \"{escaped}\"]\n")
}

#[derive(Default)]
struct MovetextWriter {
    out: String,
    after_open: bool,
}

impl MovetextWriter {
    fn token(&mut self, token: &str) {
        if !self.out.is_empty() && !self.after_open {
            self.out.push(' ');
        }
        self.out.push_str(token);
        self.after_open = false;
    }

    fn comment(&mut self, text: &str) {
        self.token(&format!("{{ {} }}", text.replace('}', "")));
    }

    fn open_variation(&mut self) {
        if !self.out.is_empty() {
            self.out.push(' ');
        }
        self.out.push('(');
        self.after_open = true;
    }

    fn close_variation(&mut self) {
        self.out.push(')');
        self.after_open = false;
    }

    fn write_move(&mut self, tree: &GameTree, id: NodeId, force_number: bool) -> Result<(), PgnError> {
        let node = tree.node(id)?;
        let parent = node.parent().ok_or(TreeError::RootHasNoMove)?;
        let before = tree.position(parent)?;
        let number = before.fullmoves().get();

        if before.turn() == Color::White {
            self.token(&format!("{number}."));
        } else if force_number {
            self.token(&format!("{number}..."));
        }
        self.token(node.san().ok_or(TreeError::RootHasNoMove)?);
        for nag in &node.nags {
            self.token(&format!("${nag}"));
        }
        if !node.comment.is_empty() {
            self.comment(&node.comment);
        }
        Ok(())
    }

    /// Write the continuation from `id`: main line moves, with each side
    /// variation in parentheses right after the main move it replaces.
    fn write_line(&mut self, tree: &GameTree, id: NodeId, force_number: bool) -> Result<(), PgnError> {
        let mut current = id;
        let mut force = force_number;

        while let Some((&main, variations)) = tree.children(current)?.split_first() {
            self.write_move(tree, main, force)?;

            for &variation in variations {
                self.open_variation();
                self.write_move(tree, variation, true)?;
                self.write_line(tree, variation, false)?;
                self.close_variation();
            }

            force = !variations.is_empty() || !tree.node(main)?.comment.is_empty();
            current = main;
        }
        Ok(())
    }
}
