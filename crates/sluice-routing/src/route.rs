use serde::{Deserialize, Serialize};
use sluice_core::ChannelId;

/// An ordered list of channels from sender toward receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    hops: Vec<ChannelId>,
}

impl Route {
    pub fn new(hops: Vec<ChannelId>) -> Self {
        Self { hops }
    }

    /// A route over a single direct channel.
    pub fn direct(channel_id: ChannelId) -> Self {
        Self {
            hops: vec![channel_id],
        }
    }

    pub fn hops(&self) -> &[ChannelId] {
        &self.hops
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// The channel of a one-hop route.
    pub fn single_hop(&self) -> Option<ChannelId> {
        match self.hops.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl From<Vec<ChannelId>> for Route {
    fn from(hops: Vec<ChannelId>) -> Self {
        Self::new(hops)
    }
}
