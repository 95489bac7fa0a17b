//! Curation Staking
//!
//! Delegators stake tokens into per-curation pools priced on a bonding
//! curve. A staking tax is burned on every deposit, unstaked tokens thaw for
//! a governance-set number of epochs before they can be withdrawn, and fees
//! collected against allocations are rebated with the Cobb-Douglas split.
//!
//! [`CurationProtocol`] is the entry point; the pieces it composes are
//! public for embedding and testing.

pub mod allocation;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod market;
pub mod params;
pub mod protocol;
pub mod thawing;

pub use allocation::{Allocation, AllocationBook, AllocationRegistry, AllocationStatus};
pub use config::{ParametersConfig, ProtocolConfig};
pub use engine::{custody_account, StakeOptions, StakingPoolEngine, CUSTODY_LABEL};
pub use errors::{Result, StakingError};
pub use events::{EventLog, ProtocolEvent};
pub use market::CurationPool;
pub use params::{ParameterStore, ProtocolParameters};
pub use protocol::CurationProtocol;
pub use thawing::{ThawingLedger, ThawingRequest};

pub use curation_economics::RebateRatio;
pub use curation_treasury::{RebateAccount, RebateClaim};
