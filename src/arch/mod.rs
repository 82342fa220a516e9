//! # Architecture Abstraction Layer
//!
//! Binds the scheduler to a concrete tick interrupt. Currently implements
//! the Cortex-M4 port; extensible to other cores by adding sibling modules
//! that implement [`crate::timer::TickSource`].

pub mod cortex_m4;
