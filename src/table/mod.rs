pub mod columns;
pub mod request;
pub mod shell;
