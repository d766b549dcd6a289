//! Stockfish engine wrapper using UCI protocol (async I/O)

use shakmaty::{fen::Fen, Chess, EnPassantMode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use tracing::debug;

use crate::config::AnnotatorConfig;
use crate::error::AnnotateError;
use crate::score::Score;

/// Result of a single depth-bounded search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInfo {
    /// Centipawn score (from engine's perspective, i.e., side to move)
    pub cp: Option<i32>,
    /// Mate in N (positive = side to move mates)
    pub mate: Option<i32>,
    /// Best move in UCI notation, None for `bestmove (none)`
    pub best_move: Option<String>,
    /// Principal variation in UCI notation, starting with the best move
    pub pv: Vec<String>,
}

impl SearchInfo {
    pub fn score(&self) -> Result<Score, AnnotateError> {
        Score::from_parts(self.cp, self.mate)
    }
}

/// A move-search engine driven one request at a time.
#[allow(async_fn_in_trait)]
pub trait SearchEngine {
    /// Engine identity, used in the game's final comment.
    fn name(&self) -> &str;

    /// Search `position` to `depth` plies.
    async fn search(&mut self, position: &Chess, depth: u32) -> Result<SearchInfo, AnnotateError>;
}

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    name: String,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(config: &AnnotatorConfig) -> Result<Self, AnnotateError> {
        let mut process = Command::new(&config.stockfish_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| AnnotateError::Stockfish(format!("Failed to spawn Stockfish: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| AnnotateError::Stockfish("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| AnnotateError::Stockfish("Stockfish stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            name: String::from("Stockfish"),
        };

        // Initialize UCI, picking up the engine's name on the way
        engine.send("uci").await?;
        loop {
            let line = engine.read_line().await?;
            if let Some(name) = line.strip_prefix("id name ") {
                engine.name = name.trim().to_string();
            } else if line == "uciok" {
                break;
            }
        }

        engine
            .send(&format!("setoption name Threads value {}", config.engine_threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", config.engine_hash_mb))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("ucinewgame").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), AnnotateError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| AnnotateError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| AnnotateError::Stockfish(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one trimmed line; EOF means the engine went away
    async fn read_line(&mut self) -> Result<String, AnnotateError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| AnnotateError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
        if read == 0 {
            return Err(AnnotateError::Stockfish("Stockfish closed its output".into()));
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "SF >");
        Ok(trimmed)
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), AnnotateError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

impl SearchEngine for StockfishEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&mut self, position: &Chess, depth: u32) -> Result<SearchInfo, AnnotateError> {
        let fen = Fen::from_position(position, EnPassantMode::Legal);
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut info = SearchInfo::default();
        loop {
            let line = self.read_line().await?;
            if parse_info_line(&line, &mut info) {
                break;
            }
        }
        Ok(info)
    }
}

/// Fold one engine output line into `info`. Returns true on `bestmove`.
pub fn parse_info_line(line: &str, info: &mut SearchInfo) -> bool {
    if line.starts_with("info") && !line.starts_with("info string") {
        if let Some(cp) = parse_cp(line) {
            info.cp = Some(cp);
            info.mate = None;
        }
        if let Some(mate) = parse_mate(line) {
            info.mate = Some(mate);
            info.cp = None;
        }
        if line.contains(" pv ") {
            info.pv = parse_pv(line);
        }
        false
    } else if line.starts_with("bestmove") {
        info.best_move = parse_best_move(line);
        true
    } else {
        false
    }
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "cp" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "mate" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

fn parse_best_move(line: &str) -> Option<String> {
    line.split_whitespace()
        .nth(1)
        .filter(|mv| *mv != "(none)" && *mv != "0000")
        .map(str::to_string)
}
