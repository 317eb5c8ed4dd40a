// MCP (Model Context Protocol) server for x402 payments on Solana.
// Session servers are built per request from a shared tool registry; the
// HTTP transport lives in solx402-server, the stdio transport here.

pub mod normalize;
pub mod protocol;
pub mod session;
pub mod stdio;
pub mod tools;

pub use normalize::{normalize, RawContent, RawPayload, RawToolResult};
pub use session::{SessionError, SessionServer, SessionServerFactory};
pub use stdio::StdioServer;
pub use tools::{default_registry, CollaboratorSettings, Collaborators, Tool, ToolRegistry};
