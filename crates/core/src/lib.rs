//! # draftwright core
//!
//! Domain types, traits, and error definitions for the draftwright proposal
//! synthesis engine. Every other crate depends inward on this one.
//!
//! ## What lives here
//!
//! - The backend seams: [`Provider`] (text generation) and [`Embedder`]
//!   (vector embeddings). Implementations live in `draftwright-providers`
//!   and `draftwright-index`.
//! - The value objects that flow through a synthesis run: [`Passage`],
//!   [`RetrievalResult`], [`SectionSpec`], [`RequirementInfo`].
//! - The section identity catalog ([`SectionIdentity`]), the single table
//!   that retrieval, prompting, validation, and outline repair all read.

pub mod embedding;
pub mod error;
pub mod identity;
pub mod message;
pub mod passage;
pub mod provider;
pub mod requirement;
pub mod section;

pub use embedding::{Embedder, ProviderEmbedder};
pub use error::{Error, IndexError, ProviderError, Result};
pub use identity::SectionIdentity;
pub use message::{Message, Role};
pub use passage::{Passage, RetrievalResult, ScoredPassage};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use requirement::RequirementInfo;
pub use section::SectionSpec;
