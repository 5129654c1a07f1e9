//! Asset loading: the content-addressed cache and seekable video handles.

pub mod cache;
pub mod video;
