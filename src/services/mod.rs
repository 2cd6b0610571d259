pub mod mime;
pub mod retrieval;
pub mod sniffer;
pub mod spool;
pub mod storage;
pub mod transcoder;
pub mod upload;
