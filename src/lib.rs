//! # docqa
//!
//! A local-first document question-answering pipeline.
//!
//! docqa ingests heterogeneous files (text, PDF, Word, PowerPoint, JSON,
//! XML, CSV, SQLite databases), splits their text into overlapping chunks,
//! embeds them into a persistent vector index, and answers questions by
//! retrieving the closest chunks and handing them to a generative model.
//! When generation fails, relevant sentences are extracted from the
//! retrieved context instead.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌────────────┐
//! │  Loaders    │──▶│  Chunk +    │──▶│  SQLite    │
//! │ pdf/docx/…  │   │  Embed      │   │  vectors   │
//! └─────────────┘   └─────────────┘   └─────┬──────┘
//!                                           │ search
//!                   ┌──────────┐      ┌─────▼──────┐
//!                   │   CLI    │◀─────│  Answer    │
//!                   │ (docqa)  │      │ LLM/extract│
//!                   └──────────┘      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa add notes.pdf slides.pptx   # copy into data/
//! docqa ingest                      # build vector_store/
//! docqa ask "What is parthenogenesis?"
//! docqa chat                        # multi-turn session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Library error taxonomy |
//! | [`models`] | Core data types |
//! | [`loaders`] | Per-format text extraction and directory loading |
//! | [`chunk`] | Recursive overlapping chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persistent vector index |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Index schema |
//! | [`prompt`] | Grounding prompts |
//! | [`llm`] | Generative model clients |
//! | [`fallback`] | Extractive answers |
//! | [`answer`] | Query pipeline |
//! | [`conversation`] | Multi-turn history |
//! | [`ingest`] | `ingest` command |
//! | [`chat`] | `ask` and `chat` commands |
//! | [`manage`] | `add`, `remove`, `delete-store` commands |
//! | [`stats`] | `status` command |

pub mod answer;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod conversation;
pub mod db;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod ingest;
pub mod llm;
pub mod loaders;
pub mod manage;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod stats;
pub mod store;
