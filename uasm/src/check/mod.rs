pub mod symbols;
pub mod typecheck;
