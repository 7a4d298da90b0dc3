pub mod chain;
pub mod fanout;
