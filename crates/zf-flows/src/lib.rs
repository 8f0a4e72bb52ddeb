//! # zf-flows: External Services for ZF Ops
//!
//! Wrappers for everything that leaves the process.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ZF Ops External Calls                            │
//! │                                                                         │
//! │  Order page ("Predict status", "Draft reply", "Upload")                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     zf-flows (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │    flows      │   │ ObjectStorage  │   │ DriveClient   │   │   │
//! │  │   │ predict/chat/ │   │ (S3, SigV4)    │   │ (JWT bearer)  │   │   │
//! │  │   │ icon          │   │                │   │               │   │   │
//! │  │   └───────┬───────┘   └────────────────┘   └───────────────┘   │   │
//! │  │           │ TextModel                                           │   │
//! │  │   ┌───────▼───────┐                                             │   │
//! │  │   │  GenAiClient  │   IntegrationsConfig (toml + env)          │   │
//! │  │   └───────────────┘                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Credentials and endpoints
//! - [`genai`] - Model client and the [`TextModel`] seam
//! - [`flows`] - Status prediction, chat reply, category icon
//! - [`storage`] - Object storage and Drive clients
//! - [`error`] - Flow error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zf_flows::{flows, GenAiClient, IntegrationsConfig};
//!
//! let config = IntegrationsConfig::load(None)?;
//! let model = GenAiClient::new(&config.genai)?;
//! let icon = flows::suggest_category_icon(&model, &flows::IconInput::new("Lighting")).await?;
//! ```

pub mod config;
pub mod error;
pub mod flows;
pub mod genai;
pub mod storage;

pub use config::IntegrationsConfig;
pub use error::{FlowError, FlowResult};
pub use flows::{
    generate_chat_reply, predict_order_status, suggest_category_icon, ChatReplyInput,
    ChatReplyOutput, IconInput, IconOutput, PredictStatusInput, PredictStatusOutput,
};
pub use genai::{GenAiClient, Prompt, TextModel};
pub use storage::{DriveClient, DriveFile, ObjectStorage, StoredObject};
