//! # pdf-chat
//!
//! Upload PDFs, extract their text, and ask questions about them through an
//! LLM chat API.
//!
//! ## Architecture
//!
//! ```text
//!        POST /upload/                      POST /ask/
//!             │                                  │
//!             ▼                                  ▼
//!  ┌─────────────────────────────────────────────────────┐
//!  │                   PdfChatService                    │
//!  └──┬──────────────┬───────────────┬──────────────┬────┘
//!     ▼              ▼               ▼              ▼
//! ┌────────┐   ┌───────────┐   ┌───────────┐   ┌─────────┐
//! │Extract │   │ Document  │   │ TextCache │   │   QA    │
//! │  PDF   │   │  Store    │   │ (memory)  │   │ (Gemini)│
//! └────────┘   └───────────┘   └───────────┘   └─────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF text extraction |
//! | [`store`] | Upload metadata storage |
//! | [`cache`] | Extracted-text cache |
//! | [`qa`] | QA provider abstraction and Gemini client |
//! | [`service`] | Upload/ask orchestration |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cache;
pub mod config;
pub mod db;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod qa;
pub mod server;
pub mod service;
pub mod store;
