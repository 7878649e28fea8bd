// SPDX-License-Identifier: GPL-3.0-only
pub mod path_sanitizer;
pub mod url_validator;

pub use path_sanitizer::{sanitize_dir_name, sanitize_filename};
pub use url_validator::{is_http_url, resolve_download_url};
