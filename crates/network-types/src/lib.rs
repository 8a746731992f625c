//! Wire message types and per-method type contracts for request/response streams.
// SPDX-License-Identifier: Apache-2.0

mod contract;
mod messages;
mod method;
mod registry;
pub use contract::*;
pub use messages::*;
pub use method::*;
pub use registry::*;
