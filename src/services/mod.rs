pub mod blob_store;
pub mod canonical;
pub mod link_checker;
pub mod url_signer;
pub mod verifier;

pub use blob_store::{
    BlobObject, BlobStore, ByteStream, InMemoryBlobStore, LocalBlobStore, Resolution, Selection,
};
pub use canonical::canonical_message;
pub use link_checker::LinkChecker;
pub use url_signer::{SignTarget, SignedUrl, UrlSigner};
pub use verifier::{LinkRequest, LinkVerifier, VerifiedLink};
