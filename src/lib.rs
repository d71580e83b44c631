//! # docchat
//!
//! Chat with your documents. Upload PDF, DOCX, plain-text and Markdown files,
//! ask questions answered by a hosted language model (Gemini, OpenAI, or
//! Anthropic) with the documents as context, and run instant local searches
//! over the extracted text.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌───────────────┐
//! │  Uploads   │──▶│  Extractor │──▶│ DocumentStore │
//! │ pdf/docx/… │   │            │   │  (in memory)  │
//! └────────────┘   └────────────┘   └──────┬────────┘
//!                                          │
//!                     ┌────────────────────┤
//!                     ▼                    ▼
//!              ┌─────────────┐      ┌────────────┐
//!              │ Orchestrator│──▶   │   Search   │
//!              │  + adapters │ HTTP │  (local)   │
//!              └─────────────┘      └────────────┘
//! ```
//!
//! Documents live only for the session. Provider settings and the theme
//! preference persist in a small JSON key-value file.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`app`] | Event-driven controller and rendering seam |
//! | [`config`] | TOML configuration parsing |
//! | [`credentials`] | Provider key validation, persistence, connection test |
//! | [`error`] | Shared error type |
//! | [`extract`] | Text extraction from uploads |
//! | [`ingest`] | Loading files and directories from disk |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`models`] | Core data types |
//! | [`orchestrator`] | Prompt assembly, provider calls, canned fallbacks |
//! | [`provider`] | Per-provider request/response shapes |
//! | [`search`] | Local substring search and scoring |
//! | [`storage`] | Persistent key-value state |
//! | [`store`] | In-memory document store |
//! | [`terminal`] | Line-based chat front end |
//! | [`transport`] | HTTP POST seam for provider calls |

pub mod app;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod search;
pub mod storage;
pub mod store;
pub mod terminal;
pub mod transport;
