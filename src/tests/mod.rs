pub(crate) mod common;

mod store_tests;
mod transfer_tests;
