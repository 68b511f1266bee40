//! # blippy-tools
//!
//! The tool system: the [`AgentTool`] trait and execution context, the
//! static registry, transport-safe name encoding, the concurrent executor
//! with dynamic `notify:*` and `fs_*` tool resolution, and the built-in
//! tool implementations.

#![deny(unsafe_code)]

pub mod call_agent;
pub mod errors;
pub mod executor;
pub mod fetch;
pub mod fs;
pub mod memory;
pub mod names;
pub mod notification;
pub mod registry;
pub mod sandbox;
pub mod schedule;
pub mod traits;

pub use call_agent::CallAgentTool;
pub use errors::{Result, ToolError};
pub use executor::{ToolCompletion, ToolExecutor};
pub use fetch::FetchTool;
pub use fs::{build_fs_tool, FS_TOOL_NAMES};
pub use memory::{
    MemoryCreateTool, MemoryDeleteTool, MemoryEditTool, MemoryViewTool, MEMORY_TOOL_NAMES,
};
pub use names::{decode_tool_name, encode_tool_name};
pub use notification::NotificationTool;
pub use registry::ToolRegistry;
pub use sandbox::{BashTool, SpritesClient};
pub use schedule::ScheduleAgentRunTool;
pub use traits::{
    tool_definition, AgentCaller, AgentFileEntry, AgentFileStore, AgentFsRootConfig, AgentTool,
    ChannelLister, FilesystemRoot, NewTrigger, NotificationChannel, RootLister, ToolContext,
    TriggerCreator, DEFAULT_MAX_DEPTH,
};
