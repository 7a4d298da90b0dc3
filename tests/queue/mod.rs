//! Worker pools: plain, cargo and priority queues

mod variants;
