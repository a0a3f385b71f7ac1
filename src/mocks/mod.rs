// This module is only compiled during tests.

pub mod mock_gpio;
pub mod stub_server;
pub mod mock_store;
