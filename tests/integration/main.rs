//! Integration tests: the real HTTP client and poller against an
//! in-process fake backend.

mod mock_backend;
mod live_polling;
