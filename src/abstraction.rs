//! State-space abstraction.
//!
//! Compresses high-dimensional feature vectors into a small set of discrete
//! abstract states:
//!
//! 1. [`pca`] learns an orthonormal basis and projects onto the top-K directions
//! 2. [`clustering`] groups the projected training batch into prototypes
//! 3. [`abstractor`] ties both together and memoises projection lookups in a
//!    [`cache::ProjectionCache`]
//!
//! The trained basis and codebook can be persisted through [`codebook`].

pub mod abstractor;
pub mod cache;
pub mod clustering;
pub mod codebook;
pub mod pca;

pub use abstractor::{AbstractionConfig, ClusterMode, StateAbstractor};
pub use cache::{CacheKey, CacheStats, ProjectionCache};
pub use clustering::{Clustering, KMeans, Prototype, centroids, nearest_index};
pub use codebook::SavedCodebook;
pub use pca::{Basis, Pca};
