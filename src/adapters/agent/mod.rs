//! Agent adapters implementing the capability port.

pub mod claude_code;
pub mod mock;

pub use claude_code::ClaudeCodeCapability;
pub use mock::MockCapability;
