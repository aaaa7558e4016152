//! Abstract storage traits for the DEXF engine.
//!
//! Every storage backend implements these traits; the engines depend only on
//! the traits. Values are opaque bytes so the store crate never depends on
//! the engine crates (which would create a cycle). Engines encode their own
//! types with [`encode`] and [`decode`].
//!
//! Layout: stake lists keyed by account, checkpoint ledgers and counters in
//! meta, proposals keyed by id, receipts keyed by (proposal id, voter), and
//! queued timelock transactions keyed by transaction hash.

pub mod codec;
pub mod error;
pub mod farm;
pub mod governance;
pub mod meta;
pub mod timelock;

pub use codec::{decode, decode_required, encode};
pub use error::StoreError;
pub use farm::FarmStore;
pub use governance::GovernanceStore;
pub use meta::MetaStore;
pub use timelock::TimelockStore;
