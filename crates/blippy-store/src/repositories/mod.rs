//! Stateless repositories — every method takes `&Connection`.

pub mod agent;
pub mod agent_file;
pub mod channel;
pub mod conversation;
pub mod fsroot;
pub mod message;
pub mod trigger;

pub use agent::{AgentRepo, CreateAgentParams, UpdateAgentParams};
pub use agent_file::AgentFileRepo;
pub use channel::{ChannelRepo, CreateChannelParams, UpdateChannelParams};
pub use conversation::ConversationRepo;
pub use fsroot::{CreateRootParams, RootRepo, UpdateRootParams};
pub use message::{CreateMessageParams, MessageRepo};
pub use trigger::{CreateTriggerParams, TriggerRepo, TriggerRunRepo, UpdateTriggerParams};
