// Branching record of the moves played on a board.
//
// Moves form a tree: every position has an ordered list of continuations, the first of
// which is the mainline. A cursor marks the current position, and the board always
// reflects exactly the moves on the path from the root to the cursor.

use itertools::Itertools;
use log::{debug, warn};

use crate::board::Board;
use crate::error::ChessResult;
use crate::invalid_operation;
use crate::moves::{GameResult, Move};
use crate::rules::ChessRules;


#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MoveId(usize);

// Moves following a position. Index 0 is the mainline. Empty means the position is terminal.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ContinuationList {
    moves: Vec<MoveId>,
}

impl ContinuationList {
    pub fn len(&self) -> usize { self.moves.len() }
    pub fn is_empty(&self) -> bool { self.moves.is_empty() }
    pub fn is_terminal(&self) -> bool { self.moves.is_empty() }
    pub fn is_fork(&self) -> bool { self.moves.len() > 1 }
    pub fn get(&self, index: usize) -> Option<MoveId> { self.moves.get(index).copied() }
    pub fn mainline(&self) -> Option<MoveId> { self.get(0) }
    pub fn index_of(&self, id: MoveId) -> Option<usize> { self.moves.iter().position(|&m| m == id) }
    pub fn iter(&self) -> impl Iterator<Item = MoveId> + '_ { self.moves.iter().copied() }

    fn push(&mut self, id: MoveId) { self.moves.push(id); }
    fn remove(&mut self, id: MoveId) { self.moves.retain(|&m| m != id); }
}

#[derive(Clone, Debug)]
struct MoveNode {
    mv: Move,
    parent: Option<MoveId>,
    continuations: ContinuationList,
}

#[derive(Clone, Debug)]
pub struct History {
    board: Board,
    nodes: Vec<Option<MoveNode>>,  // indexed by `MoveId`; `None` once disposed
    root: ContinuationList,
    cursor: Option<MoveId>,  // `None` is the position before the first move
}

impl History {
    pub fn new(rules: &ChessRules) -> ChessResult<Self> { Ok(Self::from_board(Board::new(rules)?)) }

    pub fn from_board(board: Board) -> Self {
        History {
            board,
            nodes: Vec::new(),
            root: ContinuationList::default(),
            cursor: None,
        }
    }

    pub fn board(&self) -> &Board { &self.board }
    pub fn current_move(&self) -> Option<MoveId> { self.cursor }
    pub fn root_continuations(&self) -> &ContinuationList { &self.root }

    pub fn get(&self, id: MoveId) -> Option<&Move> { self.node(id).ok().map(|node| &node.mv) }

    pub fn parent(&self, id: MoveId) -> ChessResult<Option<MoveId>> { Ok(self.node(id)?.parent) }

    pub fn continuations(&self, id: MoveId) -> ChessResult<&ContinuationList> {
        Ok(&self.node(id)?.continuations)
    }

    // Continuations of the current position.
    pub fn current_continuations(&self) -> ChessResult<&ContinuationList> {
        self.continuations_after(self.cursor)
    }

    // Executes the move and appends it to the continuations of the current position.
    // The move becomes current. A move carrying a result cannot be continued.
    pub fn add(&mut self, mut mv: Move) -> ChessResult<MoveId> {
        if let Some(parent) = self.cursor {
            if let Some(result) = self.node(parent)?.mv.result() {
                return Err(invalid_operation!("{:?} ends the game with {:?}", parent, result));
            }
        }
        self.continuations_after(self.cursor)?;
        mv.execute(&mut self.board)?;
        let id = MoveId(self.nodes.len());
        debug!("Adding {} as {:?} after {:?}", mv, id, self.cursor);
        self.nodes.push(Some(MoveNode {
            mv,
            parent: self.cursor,
            continuations: ContinuationList::default(),
        }));
        self.continuations_after_mut(self.cursor)?.push(id);
        self.cursor = Some(id);
        Ok(id)
    }

    // Follows the mainline one move. Returns `None` at a terminal position.
    pub fn next(&mut self) -> ChessResult<Option<MoveId>> {
        if self.current_continuations()?.is_terminal() {
            return Ok(None);
        }
        self.next_variation(0).map(Some)
    }

    pub fn next_variation(&mut self, index: usize) -> ChessResult<MoveId> {
        let continuations = self.current_continuations()?;
        let id = continuations.get(index).ok_or_else(|| {
            invalid_operation!("no continuation {} ({} available)", index, continuations.len())
        })?;
        self.execute(id)?;
        self.cursor = Some(id);
        Ok(id)
    }

    // Takes back the current move. Returns the move taken back, or `None` before the
    // first move.
    pub fn prev(&mut self) -> ChessResult<Option<MoveId>> {
        let Some(id) = self.cursor else {
            return Ok(None);
        };
        self.unexecute(id)?;
        self.cursor = self.node(id)?.parent;
        Ok(Some(id))
    }

    pub fn rewind(&mut self) -> ChessResult<()> {
        while self.prev()?.is_some() {}
        Ok(())
    }

    // Steps back at least once, then keeps going until the position has several
    // continuations or the start is reached.
    pub fn rewind_to_last_fork(&mut self) -> ChessResult<()> {
        if self.prev()?.is_none() {
            return Ok(());
        }
        while self.cursor.is_some() && !self.current_continuations()?.is_fork() {
            self.prev()?;
        }
        debug!("Rewound to fork at {:?}", self.cursor);
        Ok(())
    }

    // Moves the cursor to `target` (`None` for the starting position), taking back
    // and replaying only the moves that differ between the two paths.
    pub fn go_to(&mut self, target: Option<MoveId>) -> ChessResult<()> {
        let target_path = match target {
            Some(id) => self.path_to(id)?,
            None => Vec::new(),
        };
        let current_path = match self.cursor {
            Some(id) => self.path_to(id)?,
            None => Vec::new(),
        };
        let common = current_path
            .iter()
            .zip(&target_path)
            .take_while(|(a, b)| a == b)
            .count();
        for _ in common..current_path.len() {
            self.prev()?;
        }
        for &id in &target_path[common..] {
            if let Err(err) = self.execute(id) {
                warn!("Cannot replay {:?} on the way to {:?}: {}", id, target, err);
                return Err(err);
            }
            self.cursor = Some(id);
        }
        debug!("Went to {:?}", target);
        Ok(())
    }

    pub fn go_to_end(&mut self) -> ChessResult<()> {
        while self.next()?.is_some() {}
        Ok(())
    }

    // Moves from the first one up to and including `id`.
    pub fn path_to(&self, id: MoveId) -> ChessResult<Vec<MoveId>> {
        let mut path = vec![id];
        let mut parent = self.node(id)?.parent;
        while let Some(p) = parent {
            path.push(p);
            parent = self.node(p)?.parent;
        }
        path.reverse();
        Ok(path)
    }

    pub fn mainline(&self) -> Vec<MoveId> {
        let mut line = Vec::new();
        let mut continuations = &self.root;
        while let Some(id) = continuations.mainline() {
            line.push(id);
            match self.node(id) {
                Ok(node) => continuations = &node.continuations,
                Err(_) => break,
            }
        }
        line
    }

    pub fn set_annotation(&mut self, id: MoveId, annotation: Option<String>) -> ChessResult<()> {
        self.node_mut(id)?.mv.set_annotation(annotation);
        Ok(())
    }

    // Results belong to terminal moves only.
    pub fn set_result(&mut self, id: MoveId, result: Option<GameResult>) -> ChessResult<()> {
        let node = self.node_mut(id)?;
        if !node.continuations.is_terminal() {
            return Err(invalid_operation!("{:?} is not a terminal move", id));
        }
        node.mv.set_result(result);
        Ok(())
    }

    // Makes the line through `id` the mainline of its parent position. Other siblings
    // keep their relative order.
    pub fn promote_variation(&mut self, id: MoveId) -> ChessResult<()> {
        let parent = self.node(id)?.parent;
        let siblings = &mut self.continuations_after_mut(parent)?.moves;
        let index = siblings
            .iter()
            .position(|&m| m == id)
            .ok_or_else(|| invalid_operation!("{:?} is detached", id))?;
        siblings[..=index].rotate_right(1);
        Ok(())
    }

    // Removes the move and everything after it. Only allowed while the move is not
    // executed, i.e. not on the path to the cursor.
    pub fn dispose(&mut self, id: MoveId) -> ChessResult<()> {
        let node = self.node(id)?;
        if node.mv.is_executed() {
            return Err(invalid_operation!("cannot dispose executed move {}", node.mv));
        }
        let parent = node.parent;
        self.continuations_after_mut(parent)?.remove(id);
        let mut pending = vec![id];
        let mut num_disposed = 0;
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                pending.extend(node.continuations.iter());
                num_disposed += 1;
            }
        }
        debug!("Disposed {:?} with {} moves in total", id, num_disposed);
        Ok(())
    }

    // All live moves, in creation order.
    pub fn move_ids(&self) -> Vec<MoveId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(idx, _)| MoveId(idx))
            .collect_vec()
    }

    fn node(&self, id: MoveId) -> ChessResult<&MoveNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| invalid_operation!("no move {:?} in history", id))
    }

    fn node_mut(&mut self, id: MoveId) -> ChessResult<&mut MoveNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| invalid_operation!("no move {:?} in history", id))
    }

    // Continuations of the move `parent`, or of the starting position for `None`.
    fn continuations_after(&self, parent: Option<MoveId>) -> ChessResult<&ContinuationList> {
        match parent {
            Some(id) => Ok(&self.node(id)?.continuations),
            None => Ok(&self.root),
        }
    }

    fn continuations_after_mut(
        &mut self, parent: Option<MoveId>,
    ) -> ChessResult<&mut ContinuationList> {
        match parent {
            Some(id) => Ok(&mut self.node_mut(id)?.continuations),
            None => Ok(&mut self.root),
        }
    }

    fn execute(&mut self, id: MoveId) -> ChessResult<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| invalid_operation!("no move {:?} in history", id))?;
        node.mv.execute(&mut self.board)
    }

    fn unexecute(&mut self, id: MoveId) -> ChessResult<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| invalid_operation!("no move {:?} in history", id))?;
        node.mv.unexecute(&mut self.board)
    }
}
