//! Status line snapshot: current room plus a score or time readout.

/// Longest room label kept, in characters.
pub const ROOM_CAPACITY: usize = 63;

/// Longest score/time label kept, in characters.
pub const SCORE_CAPACITY: usize = 31;

/// How the interpreter wants the right-hand side of the status line shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMode {
    /// `p1` is the score, `p2` the move count.
    Score,
    /// `p1` is hours, `p2` minutes.
    Time,
}

/// Always replaced as a whole, so readers never see a room from one update
/// paired with a score from another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub room: String,
    pub score_or_time: String,
}

impl StatusLine {
    pub fn new(room: &str, score_or_time: &str) -> Self {
        Self {
            room: room.chars().take(ROOM_CAPACITY).collect(),
            score_or_time: score_or_time.chars().take(SCORE_CAPACITY).collect(),
        }
    }

    pub fn format(room: &str, mode: StatusMode, p1: i16, p2: i16) -> Self {
        let right = match mode {
            StatusMode::Score => format!("Score: {}  Moves: {}", p1, p2),
            StatusMode::Time => format!("Time: {}:{:02}", p1, p2),
        };
        Self::new(room, &right)
    }
}
