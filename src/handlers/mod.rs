// handlers/mod.rs - HTTP handlers
//
// Handlers only translate HTTP to service calls: parse ids and bodies, pick
// the stale policy, wrap results in the response envelope. Routing and
// authorization are attached by `routes`.
pub mod custom;
pub mod entities;
pub mod system;
pub mod utils;
