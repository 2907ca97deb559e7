pub mod driver;
pub mod mock_data_generator;

pub use driver::{MockConfig, MockResolver, MockSource, MOCK_SIGNAL_TYPE};
pub use mock_data_generator::EegGenerator;
