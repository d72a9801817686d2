//! Shelf Server - HTTP API for a personal EPUB library
//!
//! Exposes the catalog and ingestion crates to a browser-based reader:
//!
//! - **Uploads**: multi-book multipart uploads with optional per-book
//!   metadata JSON and cover images, plus a standalone cover upload
//! - **Library**: listing, EPUB download, removal and cover images
//! - **Reading progress**: per-book CFI position save / load / clear
//! - **Health**: liveness probe and catalog counters
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /api/upload` - Upload one or more `.epub` files
//! - `POST /api/upload-cover` - Attach a cover to an existing book
//! - `POST /api/progress` - Save reading progress
//! - `GET /api/progress/{id}` - Load reading progress
//! - `DELETE /api/progress/{id}` - Clear reading progress
//! - `GET /api/books` - List books, newest first
//! - `GET|HEAD /api/book/{id}` - Download the EPUB
//! - `DELETE /api/book/{id}` - Remove a book and its files
//! - `GET /api/cover/{id}` - Cover image
//! - `GET /api/stats` - Catalog counters
//! - `GET /health` - Liveness probe
//!
//! Errors share one JSON shape:
//! `{"success": false, "error": {"code": "...", "message": "..."}, "message": "..."}`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{LogFormat, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{build_router, init_tracing, start_server};
pub use state::ServerState;
