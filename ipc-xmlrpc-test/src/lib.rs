//! Integration tests for `ipc-xmlrpc` live under `tests/`.
