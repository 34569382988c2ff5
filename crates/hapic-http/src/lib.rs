//! # Hapic HTTP
//!
//! Reference context adapter for Hapic over the [`http`] crate types.
//!
//! - [`HttpRouter`] - in-memory route table with `:name` path parameters
//! - [`HttpContext`] - the [`Context`](hapic_core::Context) implementation
//! - [`HttpRequest`] - a buffered request, multipart bodies pre-parsed
//! - [`response`] - JSON, streamed and file response builders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hapic_http::{HttpContext, HttpRouter};
//! use hapic_pipeline::{ExecutionMode, Hapic, Reply};
//! use http::Method;
//!
//! let hapic = Hapic::<HttpContext>::new(ExecutionMode::Cooperative);
//! let get_user = hapic
//!     .controller("get_user")
//!     .input_path(path_schema)
//!     .output_body(user_schema)
//!     .async_handler(|_request, data| async move { load_user(data.path).await })?;
//!
//! let mut router = HttpRouter::new();
//! router.route(Method::GET, "/users/:id", &get_user);
//! hapic.set_context(router.context())?;
//!
//! let response = router.dispatch(request).await;
//! let doc = hapic.generate_doc("Users", "User management")?;
//! ```

#![doc(html_root_url = "https://docs.rs/hapic-http/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod multipart;
mod request;
pub mod response;
mod router;

pub use context::HttpContext;
pub use error::{HttpError, HttpResult, RequestSource};
pub use multipart::{MultipartConfig, MultipartForm};
pub use request::HttpRequest;
pub use response::{HttpResponse, ResponseBody};
pub use router::HttpRouter;
