use serde::{Deserialize, Serialize};

use crate::starter::BoardSetup;


#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StartingPosition {
    Classic,
    Setup(BoardSetup),
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ChessRules {
    pub starting_position: StartingPosition,
}

impl ChessRules {
    pub fn classic() -> Self {
        Self { starting_position: StartingPosition::Classic }
    }

    pub fn from_setup(setup: BoardSetup) -> Self {
        Self { starting_position: StartingPosition::Setup(setup) }
    }
}
