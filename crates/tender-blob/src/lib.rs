//! Abstract key→bytes object storage. The core treats values as opaque and
//! assumes no adapter-specific semantics beyond whole-object `put`/`get`.

pub mod error;
pub mod fs;
pub mod mock;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use fs::FsBlob;
pub use mock::MockBlob;
pub use traits::Blob;
