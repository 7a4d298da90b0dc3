//! Sequential composition, retries and timeouts

mod composition;
