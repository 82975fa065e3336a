//! Unit and behavioural tests for the uploader.

mod support;
