// Library root
// -----------
// The `dbox` binary (`main.rs`) is a thin wrapper around these modules.
//
// Module responsibilities:
// - `layout`: column layout of directory listings for the terminal width.
// - `terminal`: terminal width probe with a fixed fallback.
// - `api`: blocking HTTP calls against the storage service.
// - `error`: error kinds for remote calls and the status classifier.
// - `metadata`: remote metadata model and the per-run metadata cache.
// - `transfer`: downloads to disk and direct/chunked uploads.
// - `local`: local file traversal for uploads.
// - `config`: configuration file (access token, endpoint overrides).
// - `ui`: interactive prompts and progress bars.
// - `commands`: command dispatch and the `Session` context.
pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod local;
pub mod metadata;
pub mod terminal;
pub mod transfer;
pub mod ui;
