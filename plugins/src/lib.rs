pub mod factory;
pub mod gemini;
pub mod storage;
