//! Tile ledger - per-tile lifecycle bookkeeping for the terrain asset set
//!
//! The ledger owns whatever node handle the renderer gives back for an
//! inserted tile. Teardown hands every node out exactly once; after that the
//! ledger holds nothing, so a second teardown releases nothing.

use std::fmt;
use std::time::Duration;

/// Index of a tile in the configured asset list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub usize);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Failed(String),
    TimedOut,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Failed(e) => write!(f, "failed: {}", e),
            SkipReason::TimedOut => write!(f, "timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileState {
    /// Asset requested, not yet decoded
    Loading { requested_at: Duration },
    /// Decoded, waiting out the insertion delay
    Deferred { frames_left: u8 },
    /// Node is in the scene and owned by the ledger
    Inserted,
    /// Dropped from the set; never inserted
    Skipped(SkipReason),
    /// Node handed back for disposal
    Released,
}

#[derive(Debug)]
struct TileSlot<N> {
    url: String,
    state: TileState,
    node: Option<N>,
}

#[derive(Debug)]
pub struct TileLedger<N> {
    slots: Vec<TileSlot<N>>,
    insert_delay_frames: u8,
}

impl<N> TileLedger<N> {
    pub fn new(urls: Vec<String>, insert_delay_frames: u8, now: Duration) -> Self {
        let slots = urls
            .into_iter()
            .map(|url| TileSlot {
                url,
                state: TileState::Loading { requested_at: now },
                node: None,
            })
            .collect();
        Self {
            slots,
            insert_delay_frames,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn url(&self, id: TileId) -> Option<&str> {
        self.slots.get(id.0).map(|s| s.url.as_str())
    }

    /// Asset URLs in tile order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.url.as_str())
    }

    pub fn state(&self, id: TileId) -> Option<&TileState> {
        self.slots.get(id.0).map(|s| &s.state)
    }

    /// Tiles still waiting on their asset
    pub fn loading(&self) -> impl Iterator<Item = TileId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.state, TileState::Loading { .. }))
            .map(|(i, _)| TileId(i))
    }

    pub fn inserted_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == TileState::Inserted)
            .count()
    }

    /// Number of node handles the ledger still owns
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.slots.iter().filter_map(|s| s.node.as_ref())
    }

    /// Asset decoded; start the insertion delay
    pub fn mark_decoded(&mut self, id: TileId) -> bool {
        let delay = self.insert_delay_frames;
        match self.slots.get_mut(id.0) {
            Some(slot) if matches!(slot.state, TileState::Loading { .. }) => {
                slot.state = TileState::Deferred { frames_left: delay };
                true
            }
            _ => false,
        }
    }

    /// Step one frame boundary. Returns the tiles whose delay has run out.
    pub fn advance_frame(&mut self) -> Vec<TileId> {
        let mut due = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let TileState::Deferred { frames_left } = &mut slot.state {
                *frames_left = frames_left.saturating_sub(1);
                if *frames_left == 0 {
                    due.push(TileId(i));
                }
            }
        }
        due
    }

    /// Take ownership of an inserted tile's node.
    ///
    /// Gives the node back if the slot is not waiting for one, so the caller
    /// can dispose of it instead of leaking it.
    pub fn insert(&mut self, id: TileId, node: N) -> Result<(), N> {
        match self.slots.get_mut(id.0) {
            Some(slot) if matches!(slot.state, TileState::Deferred { frames_left: 0 }) => {
                slot.state = TileState::Inserted;
                slot.node = Some(node);
                Ok(())
            }
            _ => Err(node),
        }
    }

    /// Drop a tile that has not been inserted yet
    pub fn skip(&mut self, id: TileId, reason: SkipReason) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot)
                if matches!(
                    slot.state,
                    TileState::Loading { .. } | TileState::Deferred { .. }
                ) =>
            {
                slot.state = TileState::Skipped(reason);
                true
            }
            _ => false,
        }
    }

    /// Skip every tile that has been loading for at least `timeout`
    pub fn expire(&mut self, now: Duration, timeout: Duration) -> Vec<TileId> {
        let mut expired = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let TileState::Loading { requested_at } = slot.state {
                if now.saturating_sub(requested_at) >= timeout {
                    slot.state = TileState::Skipped(SkipReason::TimedOut);
                    expired.push(TileId(i));
                }
            }
        }
        expired
    }

    /// Hand out every owned node for disposal and mark all slots released
    pub fn teardown(&mut self) -> Vec<N> {
        let mut nodes = Vec::new();
        for slot in &mut self.slots {
            if let Some(node) = slot.node.take() {
                nodes.push(node);
            }
            slot.state = TileState::Released;
        }
        nodes
    }
}
